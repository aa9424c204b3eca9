//! Response entities and the sink they are written to.
//!
//! Handlers return a [`ResponseEntity`]; the dispatcher writes it to a
//! [`ResponseSink`] once the middleware chain has finished. Middleware that
//! short-circuits a request may instead write to the sink directly, in which
//! case whatever was committed first is what the client receives.

use crate::request::HeaderVec;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Destination for a response: headers, then a status line, then body bytes.
///
/// Once a status has been written the response is committed. Later header
/// writes and status writes are ignored.
pub trait ResponseSink {
    fn set_header(&mut self, name: &str, value: &str);
    fn write_status(&mut self, status: u16);
    fn write_body(&mut self, bytes: &[u8]);
    /// The committed status, if any.
    fn status(&self) -> Option<u16>;

    fn is_committed(&self) -> bool {
        self.status().is_some()
    }
}

/// In-memory [`ResponseSink`]. The HTTP adapter flushes one of these to the
/// wire after dispatch; tests inspect it directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedResponse {
    status: Option<u16>,
    headers: HeaderVec,
    body: Vec<u8>,
}

impl RecordedResponse {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Status to put on the wire. An uncommitted response is a `200`.
    #[must_use]
    pub fn status_or_default(&self) -> u16 {
        self.status.unwrap_or(200)
    }

    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parse the body as JSON.
    pub fn body_json(&self) -> serde_json::Result<Value> {
        serde_json::from_slice(&self.body)
    }
}

impl ResponseSink for RecordedResponse {
    fn set_header(&mut self, name: &str, value: &str) {
        if self.status.is_some() {
            debug!(header = %name, "Header written after status; ignored");
            return;
        }
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.to_string()));
    }

    fn write_status(&mut self, status: u16) {
        match self.status {
            Some(existing) => warn!(
                existing_status = existing,
                ignored_status = status,
                "Superfluous status write"
            ),
            None => self.status = Some(status),
        }
    }

    fn write_body(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(200);
        }
        self.body.extend_from_slice(bytes);
    }

    fn status(&self) -> Option<u16> {
        self.status
    }
}

/// Status, headers and an optional JSON body produced by a handler.
///
/// # Example
///
/// ```
/// use routeward::response::ResponseEntity;
/// use serde_json::json;
///
/// let entity = ResponseEntity::created()
///     .header("Location", "/api/v1/users/7")
///     .body(json!({"id": 7}));
/// assert_eq!(entity.status(), 201);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEntity {
    status: u16,
    headers: HeaderVec,
    body: Option<Value>,
}

impl ResponseEntity {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn ok() -> Self {
        Self::new(200)
    }

    #[must_use]
    pub fn created() -> Self {
        Self::new(201)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// `{"error": message}` with the given status.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::new(status).body(json!({ "error": message }))
    }

    #[must_use]
    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message)
    }

    #[must_use]
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    #[must_use]
    pub fn method_not_allowed(message: &str) -> Self {
        Self::error(405, message)
    }

    #[must_use]
    pub fn internal_error(message: &str) -> Self {
        Self::error(500, message)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Add or replace a header (names compare case-insensitively).
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize any `Serialize` value as the body.
    pub fn json_body<T: Serialize>(mut self, body: &T) -> serde_json::Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.headers.push((Arc::from(name), value));
        }
    }

    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[must_use]
    pub fn body_value(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Write the entity to `sink`.
    ///
    /// Headers go out first, then `Content-Type: application/json` when there
    /// is a body and the status allows one, then the status, then the
    /// serialized body. A `204` never carries a body.
    pub fn send(self, sink: &mut dyn ResponseSink) {
        let has_content_type = self.get_header("content-type").is_some();
        for (name, value) in &self.headers {
            sink.set_header(name, value);
        }
        let body = match self.body {
            Some(body) if self.status != 204 => Some(body),
            _ => None,
        };
        if body.is_some() && !has_content_type {
            sink.set_header("Content-Type", "application/json");
        }
        sink.write_status(self.status);
        if let Some(body) = body {
            match serde_json::to_vec(&body) {
                Ok(bytes) => sink.write_body(&bytes),
                Err(err) => error!(error = %err, "Failed to encode response body"),
            }
        }
    }
}
