//! Per-request context.
//!
//! A [`Request`] is created for every inbound request and is owned by that
//! request's pipeline alone. Pipeline stages fill in what they learn: the
//! decoder attaches the parsed body, the route table the path parameters,
//! the guard the verified claims.

use std::collections::HashMap;
use std::str::FromStr;

use bytes::Bytes;
use http::HeaderMap;
use http::header::{HeaderValue, IntoHeaderName};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::guard::Claims;

/// An incoming HTTP request together with everything the pipeline has
/// learned about it so far.
#[derive(Debug)]
pub struct Request {
    method: http::Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    decoded: Option<Value>,
    params: HashMap<String, String>,
    claims: Option<Claims>,
}

impl Request {
    /// Creates a request for `uri` (path plus optional `?query`) with no
    /// headers and an empty body.
    pub fn new(method: http::Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p.to_owned(), Some(q.to_owned())),
            None => (uri.to_owned(), None),
        };
        Self {
            method,
            path,
            query,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            decoded: None,
            params: HashMap::new(),
            claims: None,
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            headers: parts.headers,
            body,
            decoded: None,
            params: HashMap::new(),
            claims: None,
        }
    }

    /// Appends a header; invalid values are ignored.
    pub fn with_header<K: IntoHeaderName>(mut self, name: K, value: &str) -> Self {
        if let Ok(v) = HeaderValue::from_str(value) {
            self.headers.append(name, v);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/orders/{id:\d+}`, `req.param("id")` on `/orders/42`
    /// returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Parses a path parameter. A missing or unparsable parameter is a
    /// validation failure.
    pub fn param_as<T: FromStr>(&self, key: &str) -> Result<T, Error> {
        let raw = self
            .param(key)
            .ok_or_else(|| Error::validation(format!("missing path parameter `{key}`")))?;
        raw.parse()
            .map_err(|_| Error::validation(format!("path parameter `{key}` is out of range: {raw}")))
    }

    /// The body as parsed by the decoder, if it ran and the body was JSON.
    pub fn decoded(&self) -> Option<&Value> {
        self.decoded.as_ref()
    }

    /// Deserializes the decoded body into `T`.
    ///
    /// Missing fields or wrong types are validation failures (400), distinct
    /// from the decode failure the decoder reports for malformed JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let value = self
            .decoded
            .as_ref()
            .ok_or_else(|| Error::validation("expected a JSON request body"))?;
        <T as serde::Deserialize>::deserialize(value).map_err(|e| Error::validation(e.to_string()))
    }

    /// Claims of the bearer token, present only behind a guard.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub(crate) fn set_decoded(&mut self, value: Value) {
        self.decoded = Some(value);
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) fn set_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }
}
