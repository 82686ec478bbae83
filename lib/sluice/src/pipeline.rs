//! Phase-ordered interceptor pipeline.
//!
//! A [`Pipeline`] executes a subject through its phases in order; each phase
//! runs its interceptors in registration order. An interceptor receives the
//! subject by value and either continues with a (possibly transformed)
//! subject, finishes early with a terminal subject, or fails, in which case
//! execution stops immediately and the error propagates unmodified.
//!
//! Interceptors are futures awaited one at a time on the call's task:
//! suspension happens only between interceptor invocations, and no two
//! interceptors of one call ever run concurrently. A built pipeline is
//! immutable and may be shared across concurrent calls.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sluice_core::{Error, Result};
use tracing::trace;

use crate::phase::{Phase, Phases};

/// Outcome of one interceptor invocation.
#[derive(Debug)]
pub enum Flow<S> {
    /// Hand the subject to the next interceptor.
    Continue(S),
    /// Stop the pipeline with this terminal subject; remaining
    /// interceptors and phases do not run.
    Finish(S),
}

/// Boxed future returned by an interceptor.
pub type InterceptorFuture<S> = Pin<Box<dyn Future<Output = Result<Flow<S>>> + Send>>;

pub(crate) type BoxedInterceptor<S> = Arc<dyn Fn(S) -> InterceptorFuture<S> + Send + Sync>;

/// Builder for a [`Pipeline`].
///
/// The phase graph is fixed first; interceptors are then appended per
/// phase, and `build` freezes the whole definition.
pub struct PipelineBuilder<S> {
    phases: Phases,
    interceptors: HashMap<Phase, Vec<BoxedInterceptor<S>>>,
}

impl<S> Default for PipelineBuilder<S> {
    fn default() -> Self {
        Self {
            phases: Phases::new(),
            interceptors: HashMap::new(),
        }
    }
}

impl<S> std::fmt::Debug for PipelineBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("phases", &self.phases)
            .field(
                "interceptors",
                &self.interceptors.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl<S: Send + 'static> PipelineBuilder<S> {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a phase at the end of the order.
    #[must_use]
    pub fn phase(mut self, phase: Phase) -> Self {
        self.phases.push(phase);
        self
    }

    /// Inserts a phase immediately before an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the anchor is not registered.
    pub fn phase_before(mut self, anchor: Phase, phase: Phase) -> Result<Self> {
        self.phases.insert_before(anchor, phase)?;
        Ok(self)
    }

    /// Inserts a phase after an existing one, behind any phase previously
    /// inserted after the same anchor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the anchor is not registered.
    pub fn phase_after(mut self, anchor: Phase, phase: Phase) -> Result<Self> {
        self.phases.insert_after(anchor, phase)?;
        Ok(self)
    }

    /// Registers an interceptor in a phase.
    ///
    /// Interceptors run in registration order within their phase,
    /// independently of who registered them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPhase`] if the phase is not part of this
    /// pipeline.
    pub fn intercept<F, Fut>(&mut self, phase: Phase, interceptor: F) -> Result<()>
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Flow<S>>> + Send + 'static,
    {
        if !self.phases.contains(phase) {
            return Err(Error::UnknownPhase(phase.name()));
        }
        self.push_interceptor(
            phase,
            Arc::new(move |subject| -> InterceptorFuture<S> { Box::pin(interceptor(subject)) }),
        );
        Ok(())
    }

    /// Registers a pre-boxed interceptor against a phase this builder is
    /// known to define.
    pub(crate) fn push_interceptor(&mut self, phase: Phase, interceptor: BoxedInterceptor<S>) {
        debug_assert!(self.phases.contains(phase));
        self.interceptors.entry(phase).or_default().push(interceptor);
    }

    /// Freezes the definition.
    #[must_use]
    pub fn build(mut self) -> Pipeline<S> {
        let phases = self
            .phases
            .iter()
            .map(|phase| {
                let interceptors = self.interceptors.remove(&phase).unwrap_or_default();
                (phase, interceptors)
            })
            .collect();
        Pipeline { phases }
    }
}

/// An immutable, phase-ordered interceptor pipeline.
pub struct Pipeline<S> {
    phases: Vec<(Phase, Vec<BoxedInterceptor<S>>)>,
}

impl<S> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "phases",
                &self.phases.iter().map(|(p, _)| p.name()).collect::<Vec<_>>(),
            )
            .field(
                "interceptors",
                &self.phases.iter().map(|(_, i)| i.len()).sum::<usize>(),
            )
            .finish()
    }
}

impl<S: Send + 'static> Pipeline<S> {
    /// Runs the subject through every phase in order.
    ///
    /// # Errors
    ///
    /// Propagates the first interceptor failure unmodified; interceptors
    /// after the failure point never run.
    pub async fn execute(&self, mut subject: S) -> Result<S> {
        for (phase, interceptors) in &self.phases {
            for interceptor in interceptors {
                match interceptor(subject).await? {
                    Flow::Continue(next) => subject = next,
                    Flow::Finish(next) => {
                        trace!(phase = phase.name(), "pipeline finished early");
                        return Ok(next);
                    }
                }
            }
        }
        Ok(subject)
    }

    /// Returns `true` if no interceptor is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phases.iter().all(|(_, i)| i.is_empty())
    }
}
