//! The pipeline HTTP client.
//!
//! A [`Client`] drives each call through three staged pipelines: the
//! request pipeline builds the outgoing request, the engine dispatches it,
//! the response pipeline vets the raw response, and the receive pipeline
//! converts it once the caller asks for a typed body. Any failure leaving
//! a pipeline passes through the exception delegation chain exactly once
//! before reaching the caller.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use sluice_core::{Engine, Error, Method, Request, Result};
use tracing::{Instrument, debug, info_span, warn};

use crate::call::{Call, ExceptionRequest, RequestContext, ResponseContext};
use crate::phase::{self, Phase};
use crate::pipeline::{Flow, Pipeline, PipelineBuilder};
use crate::validation::{CallValidator, ValidationConfig};

/// Frozen per-client state shared by every call.
pub(crate) struct ClientInner {
    pub(crate) request_pipeline: Pipeline<RequestContext>,
    pub(crate) response_pipeline: Pipeline<ResponseContext>,
    pub(crate) receive_pipeline: Pipeline<ResponseContext>,
    pub(crate) validator: Arc<CallValidator>,
}

/// Staged pipeline HTTP client.
///
/// Calls on one client run independently and may run concurrently; they
/// share only the immutable pipeline definitions and validation config.
///
/// # Example
///
/// ```ignore
/// use sluice::{Client, HyperEngine};
///
/// let client = Client::builder(HyperEngine::new())
///     .expect_success(true)
///     .response_validation(|cfg| {
///         cfg.handle_exception(|error| {
///             eprintln!("call failed: {error}");
///             Ok(())
///         });
///     })
///     .build();
/// ```
pub struct Client<E> {
    engine: Arc<E>,
    inner: Arc<ClientInner>,
}

impl<E> Clone for Client<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> std::fmt::Debug for Client<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("validator", &self.inner.validator)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> Client<E> {
    /// Create a new client builder around an engine.
    #[must_use]
    pub fn builder(engine: E) -> ClientBuilder<E> {
        ClientBuilder::new(engine)
    }

    /// Get a reference to the engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Execute a request through the full pipeline.
    ///
    /// Returns the completed [`Call`]; status and headers are readable
    /// without further validation, typed-body access runs the receive
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if an interceptor, the engine, or validation
    /// fails. The failure is dispatched to every exception handler before
    /// it is returned.
    pub async fn execute(&self, request: Request<Bytes>) -> Result<Call> {
        let method = request.method().clone();
        let url = request.url().to_string();
        let span = info_span!("http_call", %method, %url);

        async move {
            // Per-call override wins over the client default, for the
            // whole call.
            let expect_success = request
                .expect_success()
                .unwrap_or(self.inner.validator.expect_success());

            match self.run(request, expect_success).await {
                Ok(call) => Ok(call),
                Err((cause, exception_request)) => {
                    warn!(error = %cause, "call failed");
                    self.inner.validator.dispatch(&cause, &exception_request);
                    Err(cause)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Execute a GET request.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the call fails.
    pub async fn get(&self, url: &str) -> Result<Call> {
        let url = url::Url::parse(url)?;
        self.execute(Request::builder(Method::GET, url).build())
            .await
    }

    /// Execute a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, serialization fails, or the
    /// call fails.
    pub async fn post_json<T: serde::Serialize + Sync>(&self, url: &str, body: &T) -> Result<Call> {
        let url = url::Url::parse(url)?;
        let request = Request::builder(Method::POST, url).json(body)?.build();
        self.execute(request).await
    }

    async fn run(
        &self,
        request: Request<Bytes>,
        expect_success: bool,
    ) -> std::result::Result<Call, (Error, ExceptionRequest)> {
        // Snapshot taken before the pipeline runs: if building fails, the
        // handlers must not see partially-rendered content.
        let fallback = ExceptionRequest::new(&request);

        let context = RequestContext::new(request, expect_success);
        let context = self
            .inner
            .request_pipeline
            .execute(context)
            .await
            .map_err(|cause| (cause, fallback))?;
        let (request, synthetic) = context.into_parts();

        let built = ExceptionRequest::new(&request)
            .with_content(request.body().cloned().unwrap_or_default());

        let response = match synthetic {
            Some(response) => {
                debug!("using interceptor-supplied response");
                response
            }
            None => match self.engine.execute(request.clone()).await {
                Ok(response) => response,
                Err(cause) => return Err((cause, built)),
            },
        };
        debug!(status = response.status(), "response received");

        let context = ResponseContext::new(response, expect_success);
        let status = context.status();
        let context = self
            .inner
            .response_pipeline
            .execute(context)
            .await
            .map_err(|cause| (cause, built.with_status(status)))?;

        Ok(Call::new(request, context, Arc::clone(&self.inner)))
    }
}

/// Builder for [`Client`].
///
/// Pipeline definitions and the validation config are frozen by `build`;
/// afterwards the client is immutable and cheap to clone.
pub struct ClientBuilder<E> {
    engine: E,
    expect_success: bool,
    validation: ValidationConfig,
    request_pipeline: PipelineBuilder<RequestContext>,
    response_pipeline: PipelineBuilder<ResponseContext>,
    receive_pipeline: PipelineBuilder<ResponseContext>,
}

impl<E> std::fmt::Debug for ClientBuilder<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("expect_success", &self.expect_success)
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

impl<E: Engine> ClientBuilder<E> {
    fn new(engine: E) -> Self {
        Self {
            engine,
            expect_success: false,
            validation: ValidationConfig::default(),
            request_pipeline: PipelineBuilder::new()
                .phase(phase::request::BEFORE)
                .phase(phase::request::STATE)
                .phase(phase::request::RENDER)
                .phase(phase::request::SEND),
            response_pipeline: PipelineBuilder::new()
                .phase(phase::response::RECEIVE)
                .phase(phase::response::VALIDATE)
                .phase(phase::response::TRANSFORM)
                .phase(phase::response::AFTER),
            receive_pipeline: PipelineBuilder::new()
                .phase(phase::receive::BEFORE)
                .phase(phase::receive::STATE)
                .phase(phase::receive::AFTER),
        }
    }

    /// Sets the client-level expect-success default.
    #[must_use]
    pub fn expect_success(mut self, expect: bool) -> Self {
        self.expect_success = expect;
        self
    }

    /// Installs a response-validation block.
    ///
    /// May be called any number of times; validators and handlers from
    /// every block append, in install order.
    #[must_use]
    pub fn response_validation(mut self, install: impl FnOnce(&mut ValidationConfig)) -> Self {
        install(&mut self.validation);
        self
    }

    /// Registers an interceptor in the request pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the phase is not part of the
    /// request pipeline.
    pub fn intercept_request<F, Fut>(mut self, phase: Phase, interceptor: F) -> Result<Self>
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<RequestContext>>> + Send + 'static,
    {
        self.request_pipeline.intercept(phase, interceptor)?;
        Ok(self)
    }

    /// Registers an interceptor in the response pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the phase is not part of the
    /// response pipeline.
    pub fn intercept_response<F, Fut>(mut self, phase: Phase, interceptor: F) -> Result<Self>
    where
        F: Fn(ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<ResponseContext>>> + Send + 'static,
    {
        self.response_pipeline.intercept(phase, interceptor)?;
        Ok(self)
    }

    /// Registers an interceptor in the receive pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the phase is not part of the
    /// receive pipeline.
    pub fn intercept_receive<F, Fut>(mut self, phase: Phase, interceptor: F) -> Result<Self>
    where
        F: Fn(ResponseContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<ResponseContext>>> + Send + 'static,
    {
        self.receive_pipeline.intercept(phase, interceptor)?;
        Ok(self)
    }

    /// Freezes the pipelines and validation config and builds the client.
    #[must_use]
    pub fn build(mut self) -> Client<E> {
        let validator = Arc::new(CallValidator::new(self.expect_success, self.validation));
        validator.install(&mut self.response_pipeline, &mut self.receive_pipeline);

        Client {
            engine: Arc::new(self.engine),
            inner: Arc::new(ClientInner {
                request_pipeline: self.request_pipeline.build(),
                response_pipeline: self.response_pipeline.build(),
                receive_pipeline: self.receive_pipeline.build(),
                validator,
            }),
        }
    }
}
