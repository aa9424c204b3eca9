//! Transport-neutral request representation.
//!
//! The HTTP adapter in [`crate::server`] converts each incoming
//! `may_minihttp` request into a [`Request`]; tests build them directly with
//! the chaining helpers below.

use crate::ids::RequestId;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

/// Maximum number of path/query parameters before heap allocation.
/// Most REST APIs have at most four path params (e.g. `/users/{id}/posts/{postId}`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum number of headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Ordered name/value pairs for path variables and query parameters.
///
/// Names use `Arc<str>` so that placeholder names compiled at startup can be
/// shared into every match without copying.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Header storage. Names are stored lower-cased by the HTTP adapter.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Look up a parameter by name with "last write wins" semantics.
///
/// A template may legally repeat a placeholder (`/org/{id}/user/{id}`); the
/// deepest capture is the one handlers see.
#[inline]
#[must_use]
pub fn param_value<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

/// An inbound HTTP request as seen by the router.
#[derive(Debug, Clone)]
pub struct Request {
    pub id: RequestId,
    pub method: Method,
    /// Path component only, without the query string.
    pub path: String,
    pub query: ParamVec,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and a request target such as
    /// `/api/v1/users/7?verbose=true`.
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((p, q)) => (p, parse_query(q)),
            None => (target, ParamVec::new()),
        };
        Self {
            id: RequestId::new(),
            method,
            path: path.to_string(),
            query,
            headers: HeaderVec::new(),
            body: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    #[must_use]
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    #[must_use]
    pub fn put(target: &str) -> Self {
        Self::new(Method::PUT, target)
    }

    #[must_use]
    pub fn delete(target: &str) -> Self {
        Self::new(Method::DELETE, target)
    }

    #[must_use]
    pub fn options(target: &str) -> Self {
        Self::new(Method::OPTIONS, target)
    }

    /// Append a header. The name is lower-cased.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers
            .push((Arc::from(name.to_ascii_lowercase()), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`.
    pub fn with_json<T: serde::Serialize>(self, value: &T) -> serde_json::Result<Self> {
        let bytes = serde_json::to_vec(value)?;
        Ok(self
            .with_header("content-type", "application/json")
            .with_body(bytes))
    }

    /// Case-insensitive header lookup; the first occurrence wins.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        param_value(&self.query, name)
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Decode an `application/x-www-form-urlencoded` query string.
#[must_use]
pub fn parse_query(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}
