//! Engine implementations.
//!
//! The [`Engine`](sluice_core::Engine) contract is defined in
//! `sluice-core`; this module provides the hyper-backed production engine
//! and a mock engine for tests.

mod hyper;
mod mock;

pub use hyper::HyperEngine;
pub use mock::MockEngine;
