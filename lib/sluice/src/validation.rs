//! Response validation and exception delegation.
//!
//! The plugin is configured through [`ValidationConfig`] install blocks on
//! the client builder. Repeated installs append: all validators and all
//! handlers from every block run, in install order. The merged, frozen
//! result is a [`CallValidator`] whose interceptors sit in the response
//! pipeline (`Validate` phase) and the receive pipeline (`State` phase).
//!
//! Validation rules:
//! - the default status-range check (2xx) runs first, and only when the
//!   effective expect-success policy for the call is `true`;
//! - custom validators run strictly after the default check, in install
//!   order, whatever the policy says; they never suppress the default
//!   check, and it never suppresses them on a passing status.
//!
//! The exception delegation chain is observational: every handler sees the
//! failure, none can replace it, and the original cause is re-raised to the
//! caller. A handler's own failure is logged and swallowed.

use std::sync::Arc;

use sluice_core::{Error, Result};
use tracing::{debug, warn};

use crate::call::{ExceptionRequest, ResponseContext};
use crate::phase;
use crate::pipeline::{BoxedInterceptor, Flow, InterceptorFuture, PipelineBuilder};

type Validator = Arc<dyn Fn(&ResponseContext) -> Result<()> + Send + Sync>;
type ExceptionHandler = Arc<dyn Fn(&Error) -> Result<()> + Send + Sync>;
type RequestExceptionHandler = Arc<dyn Fn(&Error, &ExceptionRequest) -> Result<()> + Send + Sync>;

/// Accumulating configuration for the response validation plugin.
///
/// Passed to every `response_validation` install block on the client
/// builder; each block appends to the same accumulator.
#[derive(Default)]
pub struct ValidationConfig {
    expect_success: Option<bool>,
    validators: Vec<Validator>,
    handlers: Vec<ExceptionHandler>,
    request_handlers: Vec<RequestExceptionHandler>,
}

impl std::fmt::Debug for ValidationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationConfig")
            .field("expect_success", &self.expect_success)
            .field("validators", &self.validators.len())
            .field("handlers", &self.handlers.len())
            .field("request_handlers", &self.request_handlers.len())
            .finish()
    }
}

impl ValidationConfig {
    /// Sets the client-level expect-success default.
    ///
    /// When several install blocks set it, the last one wins.
    pub fn expect_success(&mut self, expect: bool) {
        self.expect_success = Some(expect);
    }

    /// Appends a response validator.
    ///
    /// A validator may reject an otherwise well-formed response by
    /// returning an error; [`Error::custom`] keeps the caller's own error
    /// type reachable.
    pub fn validate_response<F>(&mut self, validator: F)
    where
        F: Fn(&ResponseContext) -> Result<()> + Send + Sync + 'static,
    {
        self.validators.push(Arc::new(validator));
    }

    /// Appends a plain exception handler.
    pub fn handle_exception<F>(&mut self, handler: F)
    where
        F: Fn(&Error) -> Result<()> + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Appends a request-aware exception handler.
    pub fn handle_exception_with_request<F>(&mut self, handler: F)
    where
        F: Fn(&Error, &ExceptionRequest) -> Result<()> + Send + Sync + 'static,
    {
        self.request_handlers.push(Arc::new(handler));
    }
}

/// The merged, frozen validation plugin of one client.
pub(crate) struct CallValidator {
    expect_success: bool,
    validators: Vec<Validator>,
    handlers: Vec<ExceptionHandler>,
    request_handlers: Vec<RequestExceptionHandler>,
}

impl std::fmt::Debug for CallValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallValidator")
            .field("expect_success", &self.expect_success)
            .field("validators", &self.validators.len())
            .field(
                "handlers",
                &(self.handlers.len() + self.request_handlers.len()),
            )
            .finish()
    }
}

impl CallValidator {
    /// Freezes the accumulated configuration.
    ///
    /// `default_expect_success` is the client-builder value; an install
    /// block that set the policy overrides it.
    pub(crate) fn new(default_expect_success: bool, config: ValidationConfig) -> Self {
        Self {
            expect_success: config.expect_success.unwrap_or(default_expect_success),
            validators: config.validators,
            handlers: config.handlers,
            request_handlers: config.request_handlers,
        }
    }

    /// The client-level expect-success default.
    pub(crate) const fn expect_success(&self) -> bool {
        self.expect_success
    }

    /// Validates a response once per call.
    ///
    /// The `validated` flag on the context makes the two installation
    /// points idempotent: whichever pipeline sees the response first runs
    /// the checks, the other becomes a no-op.
    pub(crate) async fn validate(&self, context: &mut ResponseContext) -> Result<()> {
        if context.validated() {
            return Ok(());
        }
        context.mark_validated();

        if context.expect_success() {
            let status = context.status();
            if !(200..300).contains(&status) {
                // Capture before the raw stream is handed onward: the
                // error must keep serving the body after the stream is
                // gone.
                let body = context.body_mut().capture().await?;
                debug!(status, "response rejected by the expected-success check");
                return Err(Error::UnexpectedStatus { status, body });
            }
        }

        for validator in &self.validators {
            validator(context)?;
        }
        Ok(())
    }

    /// Fans a failure out to every handler, plain then request-aware, in
    /// install order. Handlers observe; they cannot replace the cause, and
    /// their own failures are swallowed.
    pub(crate) fn dispatch(&self, cause: &Error, request: &ExceptionRequest) {
        for handler in &self.handlers {
            if let Err(error) = handler(cause) {
                warn!(%error, "exception handler failed");
            }
        }
        for handler in &self.request_handlers {
            if let Err(error) = handler(cause, request) {
                warn!(%error, "exception handler failed");
            }
        }
    }

    /// Installs the validation interceptors into the response and receive
    /// pipelines.
    pub(crate) fn install(
        self: &Arc<Self>,
        response_pipeline: &mut PipelineBuilder<ResponseContext>,
        receive_pipeline: &mut PipelineBuilder<ResponseContext>,
    ) {
        response_pipeline.push_interceptor(
            phase::response::VALIDATE,
            Self::validate_interceptor(Arc::clone(self)),
        );
        receive_pipeline.push_interceptor(
            phase::receive::STATE,
            Self::validate_interceptor(Arc::clone(self)),
        );
    }

    fn validate_interceptor(validator: Arc<Self>) -> BoxedInterceptor<ResponseContext> {
        Arc::new(
            move |mut context: ResponseContext| -> InterceptorFuture<ResponseContext> {
                let validator = Arc::clone(&validator);
                Box::pin(async move {
                    validator.validate(&mut context).await?;
                    Ok(Flow::Continue(context))
                })
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert2::{check, let_assert};
    use bytes::Bytes;
    use sluice_core::{EngineResponse, RawBody};

    use super::*;

    fn context(status: u16, body: &'static str, expect_success: bool) -> ResponseContext {
        let response = EngineResponse::new(
            status,
            HashMap::new(),
            RawBody::from_bytes(Bytes::from_static(body.as_bytes())),
        );
        ResponseContext::new(response, expect_success)
    }

    fn validator(config: ValidationConfig) -> CallValidator {
        CallValidator::new(false, config)
    }

    #[tokio::test]
    async fn default_check_rejects_with_captured_body() {
        let v = validator(ValidationConfig::default());
        let mut context = context(900, "Awesome response", true);

        let result = v.validate(&mut context).await;
        let_assert!(Err(Error::UnexpectedStatus { status, body }) = result);
        check!(status == 900);
        check!(body.as_ref() == b"Awesome response");
    }

    #[tokio::test]
    async fn default_check_skipped_when_success_not_expected() {
        let v = validator(ValidationConfig::default());
        let mut context = context(900, "Awesome response", false);

        check!(v.validate(&mut context).await.is_ok());
    }

    #[tokio::test]
    async fn custom_validators_run_after_default_in_install_order() {
        static ORDER: AtomicUsize = AtomicUsize::new(0);

        let mut config = ValidationConfig::default();
        config.validate_response(|_| {
            check!(ORDER.fetch_add(1, Ordering::SeqCst) == 0);
            Ok(())
        });
        config.validate_response(|_| {
            check!(ORDER.fetch_add(1, Ordering::SeqCst) == 1);
            Ok(())
        });

        let v = validator(config);
        let mut context = context(200, "ok", true);
        check!(v.validate(&mut context).await.is_ok());
        check!(ORDER.load(Ordering::SeqCst) == 2);
    }

    #[tokio::test]
    async fn validation_runs_once_per_call() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);

        let mut config = ValidationConfig::default();
        config.validate_response(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let v = validator(config);
        let mut context = context(200, "ok", true);
        check!(v.validate(&mut context).await.is_ok());
        check!(v.validate(&mut context).await.is_ok());
        check!(count.load(Ordering::SeqCst) == 1);
    }

    #[tokio::test]
    async fn handler_failures_are_swallowed() {
        let observed = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&observed);
        let second = Arc::clone(&observed);

        let mut config = ValidationConfig::default();
        config.handle_exception(move |_| {
            first.fetch_add(1, Ordering::SeqCst);
            Err(Error::invalid_request("handler blew up"))
        });
        config.handle_exception(move |_| {
            second.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let v = validator(config);
        let url = url::Url::parse("https://example.com").expect("valid URL");
        let request = sluice_core::Request::builder(sluice_core::Method::GET, url).build();
        v.dispatch(
            &Error::Timeout,
            &crate::call::ExceptionRequest::new(&request),
        );

        check!(observed.load(Ordering::SeqCst) == 2);
    }
}
