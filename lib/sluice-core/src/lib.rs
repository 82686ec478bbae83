//! Core types and contracts for the sluice pipeline HTTP client.
//!
//! This crate provides the foundational types used by sluice:
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`] - Buffered HTTP response snapshot
//! - [`EngineResponse`] and [`RawBody`] - Raw response with single-read body
//! - [`Engine`] - Transport collaborator trait
//! - [`Error`] and [`Result`] - Error handling
//! - [`Method`] and [`StatusCode`] - re-exported from the `http` crate

mod body;
mod engine;
mod error;
pub mod prelude;
mod request;
mod response;

pub use body::{ContentType, from_json, to_form, to_json};
pub use engine::{BodyStream, Engine, EngineResponse, RawBody};
pub use error::{BoxError, Error, Result};
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for methods, status codes, and headers
pub use http::{Method, StatusCode, header};
