//! Mock engine for tests.
//!
//! Answers every request from a caller-supplied handler instead of the
//! network. Handlers produce [`EngineResponse`] values whose bodies are
//! one-shot streams, so the single-read capture contract is exercised for
//! real.

use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;
use futures_util::stream;
use sluice_core::{Engine, EngineResponse, RawBody, Request, Result};

type Handler = Box<dyn Fn(&Request<Bytes>) -> Result<EngineResponse> + Send + Sync>;

/// Engine that serves synthetic responses.
///
/// # Example
///
/// ```ignore
/// use sluice::{Client, MockEngine};
///
/// let engine = MockEngine::new(|_request| Ok(MockEngine::respond(200, "ok")));
/// let client = Client::builder(engine).build();
/// ```
pub struct MockEngine {
    handler: Handler,
    requests: Mutex<Vec<Request<Bytes>>>,
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl MockEngine {
    /// Create a mock engine answering every request with `handler`.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> Result<EngineResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A synthetic response with the given status and body.
    ///
    /// The body is a one-shot stream: it can be drained once, after which
    /// only the captured snapshot remains readable.
    #[must_use]
    pub fn respond(status: u16, body: impl Into<Bytes>) -> EngineResponse {
        let bytes = body.into();
        let body = RawBody::from_stream(Box::pin(stream::once(async move { Ok(bytes) })));
        EngineResponse::new(status, HashMap::new(), body)
    }

    /// A synthetic `200 OK` response.
    #[must_use]
    pub fn respond_ok(body: impl Into<Bytes>) -> EngineResponse {
        Self::respond(200, body)
    }

    /// The requests this engine has served, in dispatch order.
    #[must_use]
    pub fn requests(&self) -> Vec<Request<Bytes>> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Number of requests served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl Engine for MockEngine {
    async fn execute(&self, request: Request<Bytes>) -> Result<EngineResponse> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(request.clone());
        (self.handler)(&request)
    }
}
