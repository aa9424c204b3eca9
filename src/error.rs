//! Error taxonomy.
//!
//! [`ConfigurationError`] is raised while building a router or loading
//! configuration and aborts startup. [`DispatchError`] is raised per request
//! and is always converted into a response, never propagated to the server.

use crate::binder::BindingError;
use crate::middleware::CorsConfigError;
use crate::response::ResponseEntity;
use http::Method;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("controller {controller} routes {method} {path} to unknown handler '{handler}'")]
    UnknownHandler {
        controller: String,
        method: String,
        path: String,
        handler: String,
    },

    #[error("invalid HTTP method '{method}' for route {path}")]
    InvalidMethod { method: String, path: String },

    #[error("invalid path template '{template}': {reason}")]
    InvalidTemplate {
        template: String,
        reason: &'static str,
    },

    #[error("failed to compile matcher for '{template}': {source}")]
    Pattern {
        template: String,
        #[source]
        source: regex::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid CORS settings: {0}")]
    Cors(#[from] CorsConfigError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Route not found")]
    RouteNotFound { method: Method, path: String },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error("{0}")]
    HandlerContract(String),

    #[error("middleware chain failed: {0}")]
    ChainFailed(String),
}

impl DispatchError {
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::Binding(_) => 400,
            DispatchError::HandlerContract(_) | DispatchError::ChainFailed(_) => 500,
        }
    }

    /// Render as `{"error": "<message>"}` with the matching status.
    #[must_use]
    pub fn into_response(self) -> ResponseEntity {
        ResponseEntity::error(self.status(), &self.to_string())
    }
}
