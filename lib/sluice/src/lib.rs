//! Staged, interceptor-based pipeline HTTP client.
//!
//! Every call travels through three phase-ordered pipelines:
//!
//! 1. the **request pipeline** builds the outgoing request (an interceptor
//!    may supply a synthetic response and skip the engine entirely),
//! 2. the **response pipeline** vets the raw response as it arrives,
//! 3. the **receive pipeline** runs when the caller asks for a typed body.
//!
//! Interceptors attach to named [`phase`]s and run in phase order, in
//! registration order within a phase. The response-validation plugin
//! installs into the response and receive pipelines: an expect-success
//! policy (overridable per call), custom validators, and an exception
//! delegation chain that observes every failure before it reaches the
//! caller.
//!
//! # Example
//!
//! ```ignore
//! use sluice::{Client, HyperEngine};
//!
//! let client = Client::builder(HyperEngine::new())
//!     .expect_success(true)
//!     .response_validation(|cfg| {
//!         cfg.validate_response(|response| {
//!             if response.header("X-Deprecated").is_some() {
//!                 tracing::warn!("deprecated endpoint");
//!             }
//!             Ok(())
//!         });
//!     })
//!     .build();
//!
//! let call = client.get("https://api.example.com/users").await?;
//! let users: Vec<User> = call.body_json().await?;
//! ```

pub mod call;
mod client;
mod config;
mod engine;
pub mod phase;
pub mod pipeline;
pub mod prelude;
pub mod validation;

pub use call::{Call, ExceptionRequest, RequestContext, ResponseContext};
pub use client::{Client, ClientBuilder};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{HyperEngine, MockEngine};
pub use phase::Phase;
pub use pipeline::{Flow, Pipeline, PipelineBuilder};
pub use validation::ValidationConfig;

// Re-export core types
pub use sluice_core::{
    BodyStream, BoxError, ContentType, Engine, EngineResponse, Error, Method, RawBody, Request,
    RequestBuilder, Response, Result, StatusCode, from_json, header, to_form, to_json,
};
