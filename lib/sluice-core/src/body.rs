//! Body serialization utilities.
//!
//! The receive pipeline converts a captured body snapshot into the caller's
//! requested type through these helpers.

use bytes::Bytes;

use crate::Result;

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form` which supports `Vec<T>` for repeated form fields
/// (e.g., `tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if form serialization fails.
pub fn to_form<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so a failed conversion names the exact field
/// that rejected the input (e.g., "user.address.city").
///
/// # Errors
///
/// Returns an error if JSON deserialization fails.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};

    #[test]
    fn content_type_strings() {
        check!(ContentType::Json.as_str() == "application/json");
        check!(ContentType::FormUrlEncoded.as_str() == "application/x-www-form-urlencoded");
        check!(ContentType::PlainText.to_string() == "text/plain");
        check!(ContentType::OctetStream.to_string() == "application/octet-stream");
    }

    #[test]
    fn json_round() {
        #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
        struct User {
            name: String,
        }

        let bytes = to_json(&User {
            name: "Alice".to_string(),
        })
        .expect("serialize");
        check!(bytes.as_ref() == br#"{"name":"Alice"}"#);

        let user: User = from_json(&bytes).expect("deserialize");
        check!(user.name == "Alice");
    }

    #[test]
    fn from_json_reports_path() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Outer {
            inner: Inner,
        }

        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Inner {
            value: u32,
        }

        let result: Result<Outer> = from_json(br#"{"inner":{"value":"oops"}}"#);
        let_assert!(Err(crate::Error::JsonDeserialization { path, .. }) = result);
        check!(path == "inner.value");
    }

    #[test]
    fn form_serialize() {
        #[derive(serde::Serialize)]
        struct Login {
            username: String,
            password: String,
        }

        let bytes = to_form(&Login {
            username: "alice".to_string(),
            password: "secret".to_string(),
        })
        .expect("serialize");
        check!(bytes.as_ref() == b"username=alice&password=secret");
    }
}
