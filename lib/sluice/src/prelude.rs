//! Prelude module for convenient imports.
//!
//! ```ignore
//! use sluice::prelude::*;
//! ```

pub use crate::phase::{self, Phase};
pub use crate::{
    Call, Client, ClientBuilder, Engine, EngineResponse, Error, Flow, HyperEngine, Method,
    MockEngine, RawBody, Request, RequestBuilder, Response, Result, ValidationConfig,
};
