//! Per-call state flowing through the pipelines.
//!
//! Each client call owns its contexts exclusively: a [`RequestContext`]
//! travels through the request pipeline, a [`ResponseContext`] through the
//! response and receive pipelines, and a [`Call`] hands the received
//! response back to the caller. Nothing here is shared between calls.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use sluice_core::{EngineResponse, Error, Method, RawBody, Request, Response, Result, from_json};

use crate::client::ClientInner;

// ============================================================================
// Request pipeline subject
// ============================================================================

/// The subject of the request pipeline: the outgoing request being built,
/// plus an optional synthetic response supplied by an interceptor.
#[derive(Debug)]
pub struct RequestContext {
    request: Request<Bytes>,
    expect_success: bool,
    response: Option<EngineResponse>,
}

impl RequestContext {
    pub(crate) fn new(request: Request<Bytes>, expect_success: bool) -> Self {
        Self {
            request,
            expect_success,
            response: None,
        }
    }

    /// The request under construction.
    #[must_use]
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// Mutable access to the request, for transforming interceptors.
    #[must_use]
    pub fn request_mut(&mut self) -> &mut Request<Bytes> {
        &mut self.request
    }

    /// The expect-success policy resolved for this call.
    #[must_use]
    pub const fn expect_success(&self) -> bool {
        self.expect_success
    }

    /// Supplies a synthetic response for this call.
    ///
    /// When set, the engine is never invoked; combine with
    /// [`crate::pipeline::Flow::Finish`] to skip the remaining request
    /// interceptors as well.
    pub fn supply_response(&mut self, response: EngineResponse) {
        self.response = Some(response);
    }

    pub(crate) fn into_parts(self) -> (Request<Bytes>, Option<EngineResponse>) {
        (self.request, self.response)
    }
}

// ============================================================================
// Response / receive pipeline subject
// ============================================================================

/// The subject of the response and receive pipelines: the raw response with
/// its single-read body, plus the per-call validation state.
#[derive(Debug)]
pub struct ResponseContext {
    status: u16,
    headers: HashMap<String, String>,
    body: RawBody,
    expect_success: bool,
    validated: bool,
}

impl ResponseContext {
    /// Wraps a raw engine response for this call.
    #[must_use]
    pub fn new(response: EngineResponse, expect_success: bool) -> Self {
        let (status, headers, body) = response.into_parts();
        Self {
            status,
            headers,
            body,
            expect_success,
            validated: false,
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

    /// Mutable access to the single-read body.
    #[must_use]
    pub fn body_mut(&mut self) -> &mut RawBody {
        &mut self.body
    }

    /// The expect-success policy resolved for this call.
    #[must_use]
    pub const fn expect_success(&self) -> bool {
        self.expect_success
    }

    /// Whether validation already ran for this response.
    #[must_use]
    pub const fn validated(&self) -> bool {
        self.validated
    }

    pub(crate) fn mark_validated(&mut self) {
        self.validated = true;
    }

    pub(crate) fn into_head(self) -> (u16, HashMap<String, String>) {
        (self.status, self.headers)
    }
}

// ============================================================================
// Call
// ============================================================================

/// A completed client call: the built request and its received response.
///
/// Status and headers are readable without triggering the receive pipeline;
/// the typed-body accessors run it.
pub struct Call {
    request: Request<Bytes>,
    context: ResponseContext,
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Call {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Call")
            .field("method", self.request.method())
            .field("url", &self.request.url().as_str())
            .field("status", &self.context.status())
            .finish_non_exhaustive()
    }
}

impl Call {
    pub(crate) fn new(
        request: Request<Bytes>,
        context: ResponseContext,
        inner: Arc<ClientInner>,
    ) -> Self {
        Self {
            request,
            context,
            inner,
        }
    }

    /// The request this call was made with.
    #[must_use]
    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// HTTP status code of the response.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.context.status()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        self.context.headers()
    }

    /// Single response header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.context.header(name)
    }

    /// Receives the body as text.
    ///
    /// Runs the receive pipeline, captures the body, and decodes it as
    /// UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if a receive interceptor fails, reading the body
    /// fails, or the body is not valid UTF-8.
    pub async fn body_text(self) -> Result<String> {
        self.receive(|_, _, bytes| String::from_utf8(bytes.to_vec()).map_err(Into::into))
            .await
    }

    /// Receives the body as JSON, converted to `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if a receive interceptor fails, reading the body
    /// fails, or deserialization fails.
    pub async fn body_json<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        self.receive(|_, _, bytes| from_json(&bytes)).await
    }

    /// Receives the body and buffers the whole response into a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if a receive interceptor fails or reading the body
    /// fails.
    pub async fn into_response(self) -> Result<Response<Bytes>> {
        self.receive(|status, headers, bytes| Ok(Response::new(status, headers, bytes)))
            .await
    }

    /// Runs the receive pipeline and converts the captured body.
    ///
    /// Failures raised anywhere on this path (interceptors, the body read,
    /// or the conversion itself) go through the exception delegation chain
    /// before reaching the caller.
    async fn receive<T, F>(self, convert: F) -> Result<T>
    where
        F: FnOnce(u16, HashMap<String, String>, Bytes) -> Result<T>,
    {
        let Self {
            request,
            context,
            inner,
        } = self;
        let exception_request = ExceptionRequest::new(&request)
            .with_content(request.body().cloned().unwrap_or_default())
            .with_status(context.status());

        let outcome = async {
            let mut context = inner.receive_pipeline.execute(context).await?;
            let bytes = context.body_mut().capture().await?;
            let (status, headers) = context.into_head();
            convert(status, headers, bytes)
        }
        .await;

        if let Err(cause) = &outcome {
            inner.validator.dispatch(cause, &exception_request);
        }
        outcome
    }
}

// ============================================================================
// Exception request
// ============================================================================

/// Best-effort view of the originating request handed to request-aware
/// exception handlers.
///
/// Method, URL, and headers are always present. Content and response
/// association exist only once the call actually produced them; reading
/// them earlier fails with [`Error::NotAvailable`] instead of exposing
/// stale data.
#[derive(Debug, Clone)]
pub struct ExceptionRequest {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    content: Option<Bytes>,
    status: Option<u16>,
}

impl ExceptionRequest {
    pub(crate) fn new(request: &Request<Bytes>) -> Self {
        Self {
            method: request.method().clone(),
            url: request.url().clone(),
            headers: request.headers().clone(),
            content: None,
            status: None,
        }
    }

    pub(crate) fn with_content(mut self, content: Bytes) -> Self {
        self.content = Some(content);
        self
    }

    pub(crate) fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// HTTP method of the failed call.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// URL of the failed call.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Headers of the failed call.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// The rendered request content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAvailable`] if the call failed before the
    /// request was fully built.
    pub fn content(&self) -> Result<&Bytes> {
        self.content
            .as_ref()
            .ok_or(Error::NotAvailable("request content"))
    }

    /// The status of the response associated with the failed call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotAvailable`] if the call failed before a
    /// response was received.
    pub fn response_status(&self) -> Result<u16> {
        self.status.ok_or(Error::NotAvailable("response"))
    }
}
