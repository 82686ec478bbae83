//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query
//! parameters, bodies, and the per-call expect-success override read by the
//! validation plugin.
//!
//! # Example
//!
//! ```
//! use sluice_core::{Method, Request};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::GET, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//! ```

use std::collections::HashMap;

use bytes::Bytes;
use http::Method;

/// An HTTP request with method, URL, headers, optional body, and the
/// per-call expect-success override.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    expect_success: Option<bool>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers, for interceptors that decorate the
    /// request in flight.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: B) {
        self.body = Some(body);
    }

    /// The per-call expect-success override, if set.
    ///
    /// `None` means the client-level default applies.
    #[must_use]
    pub const fn expect_success(&self) -> Option<bool> {
        self.expect_success
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HashMap<String, String>, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    expect_success: Option<bool>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            expect_success: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets multiple headers.
    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Overrides the client-level expect-success policy for this call only.
    ///
    /// The value is read once when the call starts and wins over the client
    /// default at every validation point of the call.
    #[must_use]
    pub fn expect_success(mut self, expect: bool) -> Self {
        self.expect_success = Some(expect);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            expect_success: self.expect_success,
        }
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self
            .header("Content-Type", crate::ContentType::Json.as_str())
            .body(body))
    }

    /// Set a form-urlencoded body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn form<T: serde::Serialize>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_form(value)?;
        Ok(self
            .header("Content-Type", crate::ContentType::FormUrlEncoded.as_str())
            .body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;

    #[test]
    fn request_builder_basic() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::GET, url)
            .header("Accept", "application/json")
            .build();

        check!(request.method() == Method::GET);
        check!(request.url().as_str() == "https://api.example.com/users");
        check!(request.header("Accept") == Some("application/json"));
        check!(request.body().is_none());
        check!(request.expect_success().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::GET, url)
            .query("page", "1")
            .query("limit", "10")
            .build();

        check!(request.url().as_str() == "https://api.example.com/users?page=1&limit=10");
    }

    #[test]
    fn request_builder_expect_success() {
        let url = url::Url::parse("https://api.example.com").expect("valid URL");
        let request = Request::<Bytes>::builder(Method::GET, url)
            .expect_success(false)
            .build();

        check!(request.expect_success() == Some(false));
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct User {
            name: String,
        }

        let url = url::Url::parse("https://api.example.com/users").expect("valid URL");
        let request = Request::builder(Method::POST, url)
            .json(&User {
                name: "test".to_string(),
            })
            .expect("json")
            .build();

        check!(request.header("Content-Type") == Some("application/json"));
        check!(request.body().is_some());
    }
}
