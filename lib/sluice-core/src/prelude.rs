//! Prelude module for convenient imports.
//!
//! ```ignore
//! use sluice_core::prelude::*;
//! ```

pub use crate::{
    ContentType, Engine, EngineResponse, Error, Method, RawBody, Request, RequestBuilder, Response,
    Result, from_json, to_form, to_json,
};
