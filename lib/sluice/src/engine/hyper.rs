//! Production engine backed by hyper-util.

use std::collections::HashMap;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyStream, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use sluice_core::{Engine, EngineResponse, Error, RawBody, Request, Result};

use crate::config::EngineConfig;

/// HTTP engine using hyper-util with connection pooling and rustls TLS.
///
/// The response body is not buffered here: it is handed to the pipeline as
/// a raw stream, so the single-read capture point stays with the caller.
#[derive(Clone)]
pub struct HyperEngine {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: EngineConfig,
}

impl std::fmt::Debug for HyperEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperEngine {
    /// Create a new engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new engine with custom configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let connector = https_connector(&config);

        let inner = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(connector);

        Self { inner, config }
    }

    /// Get the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build a hyper request from a sluice request.
    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let mut builder = http::Request::builder().method(method).uri(url.as_str());

        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = body.map_or_else(Full::default, Full::new);
        builder
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))
    }

    /// Extract response headers as a `HashMap`.
    fn extract_headers(headers: &http::HeaderMap) -> HashMap<String, String> {
        headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.to_string(), v.to_string()))
            })
            .collect()
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_transport_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for HyperEngine {
    async fn execute(&self, request: Request<Bytes>) -> Result<EngineResponse> {
        let hyper_request = Self::build_hyper_request(request)?;

        let response = tokio::time::timeout(self.config.timeout, self.inner.request(hyper_request))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_transport_error)?;

        let status = response.status().as_u16();
        let headers = Self::extract_headers(response.headers());

        let stream = BodyStream::new(response.into_body())
            .map_ok(|frame| frame.into_data().unwrap_or_default())
            .map_err(|e| Error::connection(e.to_string()));

        Ok(EngineResponse::new(
            status,
            headers,
            RawBody::from_stream(Box::pin(stream)),
        ))
    }
}

/// Create an HTTPS connector with rustls and the Mozilla root
/// certificates, honoring the configured connect timeout.
fn https_connector(config: &EngineConfig) -> HttpsConnector<HttpConnector> {
    let mut http = HttpConnector::new();
    http.set_connect_timeout(Some(config.connect_timeout));
    http.enforce_http(false);

    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .wrap_connector(http)
}
