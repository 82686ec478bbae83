//! Error types for sluice.

use bytes::Bytes;
use derive_more::{Display, Error, From};

/// Boxed error type used for caller-defined failures.
///
/// Validators and interceptors may fail with their own error types; they are
/// carried boxed so the original type stays reachable through
/// [`Error::downcast_ref`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for sluice operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// The response status failed the expected-success check.
    ///
    /// Carries the status code and the body snapshot captured before the
    /// raw stream was handed onward.
    #[display("unexpected HTTP status {status}")]
    #[from(skip)]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Captured response body.
        #[error(not(source))]
        body: Bytes,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// An interceptor was registered against a phase the pipeline does not
    /// define.
    #[display("unknown pipeline phase: {_0}")]
    #[from(skip)]
    UnknownPhase(#[error(not(source))] &'static str),

    /// A field of the call context was read before the call produced it.
    #[display("{_0} is not available for this call")]
    #[from(skip)]
    NotAvailable(#[error(not(source))] &'static str),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// Form URL-encoded serialization error.
    #[display("form serialization error: {_0}")]
    #[from]
    FormSerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Response body is not valid UTF-8 text.
    #[display("response body is not valid UTF-8: {_0}")]
    #[from]
    Utf8(std::string::FromUtf8Error),

    /// A failure raised by caller code (a validator, handler, or
    /// interceptor) and carried through the pipeline unmodified.
    #[display("{_0}")]
    #[from(skip)]
    Other(#[error(not(source))] BoxError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap a caller-defined failure.
    ///
    /// The original type stays reachable through [`Error::downcast_ref`],
    /// so callers can still match on it after the pipeline re-raises.
    #[must_use]
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Try to view a caller-defined failure as its original type.
    #[must_use]
    pub fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: std::error::Error + 'static,
    {
        match self {
            Self::Other(inner) => inner.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Returns the HTTP status code if this is a rejected-response error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the captured response body if this is a rejected-response
    /// error.
    #[must_use]
    pub const fn body(&self) -> Option<&Bytes> {
        match self {
            Self::UnexpectedStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if validation rejected the response status.
    #[must_use]
    pub const fn is_unexpected_status(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { .. })
    }
}
