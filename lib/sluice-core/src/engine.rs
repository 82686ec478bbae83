//! Transport engine contract.
//!
//! An [`Engine`] performs the actual network I/O for a fully-built request
//! and hands back an [`EngineResponse`] whose body is still raw: a
//! single-read stream. The pipeline is responsible for capturing that body
//! exactly once (see [`RawBody::capture`]); every later reader observes the
//! captured snapshot, never a second raw read.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;

use crate::{Request, Response, Result};

/// A raw body: chunks of bytes arriving over time, readable once.
pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The single-read body of a raw response.
///
/// A `Stream` variant may be drained exactly once; [`RawBody::capture`]
/// turns it into an immutable `Snapshot` that all subsequent reads share.
pub enum RawBody {
    /// Unread transport stream.
    Stream(BodyStream),
    /// Captured body snapshot.
    Snapshot(Bytes),
}

impl RawBody {
    /// An empty, already-captured body.
    #[must_use]
    pub const fn empty() -> Self {
        Self::Snapshot(Bytes::new())
    }

    /// A body captured from in-memory bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Self::Snapshot(bytes.into())
    }

    /// A body backed by a transport stream.
    #[must_use]
    pub fn from_stream(stream: BodyStream) -> Self {
        Self::Stream(stream)
    }

    /// Capture the body.
    ///
    /// The first call drains the underlying stream and stores the snapshot;
    /// later calls return the snapshot without touching the transport.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk from the stream fails.
    pub async fn capture(&mut self) -> Result<Bytes> {
        match self {
            Self::Snapshot(bytes) => Ok(bytes.clone()),
            Self::Stream(stream) => {
                let mut collected = Vec::new();
                while let Some(chunk) = stream.next().await {
                    collected.extend_from_slice(&chunk?);
                }
                let bytes = Bytes::from(collected);
                *self = Self::Snapshot(bytes.clone());
                Ok(bytes)
            }
        }
    }

    /// The captured snapshot, if the body has been captured.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&Bytes> {
        match self {
            Self::Snapshot(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }
}

impl std::fmt::Debug for RawBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("RawBody::Stream(..)"),
            Self::Snapshot(bytes) => f.debug_tuple("RawBody::Snapshot").field(&bytes.len()).finish(),
        }
    }
}

/// A raw response produced by an [`Engine`]: status, headers, and a
/// single-read [`RawBody`].
#[derive(Debug)]
pub struct EngineResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: RawBody,
}

impl EngineResponse {
    /// Creates a new raw response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: RawBody) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Mutable access to the raw body, for capture.
    #[must_use]
    pub fn body_mut(&mut self) -> &mut RawBody {
        &mut self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HashMap<String, String>, RawBody) {
        (self.status, self.headers, self.body)
    }

    /// Capture the body and buffer the whole response.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the body fails.
    pub async fn into_response(mut self) -> Result<Response<Bytes>> {
        let body = self.body.capture().await?;
        Ok(Response::new(self.status, self.headers, body))
    }
}

/// Transport collaborator: executes a fully-built request.
///
/// Implementations should be async-first; the client invokes `execute` at
/// most once per call, and interceptors may pre-empt it entirely by
/// supplying a synthetic response.
pub trait Engine: Send + Sync + 'static {
    /// Execute an HTTP request and return the raw response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<EngineResponse>> + Send;
}
