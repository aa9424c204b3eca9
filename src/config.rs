//! Application configuration.
//!
//! Loaded from a YAML (`.yaml`/`.yml`) or JSON file, chosen by extension.
//! Every section is optional:
//!
//! ```yaml
//! server:
//!   addr: 127.0.0.1
//!   port: 8080
//!   stack_size: 0x8000
//! static:
//!   - path: /assets
//!     directory: ./public
//! cors:
//!   allowed_origins: ["https://example.com"]
//!   allowed_methods: [GET, POST, PUT, DELETE, OPTIONS]
//!   allowed_headers: [Content-Type, Authorization]
//!   allow_credentials: true
//! logging:
//!   level: info
//!   format: json
//!   user_agent: false
//! ```
//!
//! `ROUTEWARD_ADDR`, `ROUTEWARD_PORT` and `ROUTEWARD_STACK_SIZE` override
//! the file. The stack size accepts decimal or `0x`-prefixed hex.

use crate::error::ConfigurationError;
use crate::middleware::{CorsConfigError, CorsMiddleware, CorsMiddlewareBuilder};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_STACK_SIZE: usize = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub port: u16,
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 8080,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl ServerConfig {
    /// `addr:port`, ready for `ToSocketAddrs`.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

/// A URL prefix served from a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMount {
    pub path: String,
    pub directory: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsSettings {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allow_credentials: false,
        }
    }
}

impl CorsSettings {
    /// # Errors
    ///
    /// See [`CorsMiddlewareBuilder::build`].
    pub fn build(&self) -> Result<CorsMiddleware, CorsConfigError> {
        fn as_refs(v: &[String]) -> Vec<&str> {
            v.iter().map(String::as_str).collect::<Vec<_>>()
        }
        CorsMiddlewareBuilder::new()
            .allowed_origins(&as_refs(&self.allowed_origins))
            .allowed_methods(&as_refs(&self.allowed_methods))
            .allowed_headers(&as_refs(&self.allowed_headers))
            .allow_credentials(self.allow_credentials)
            .build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
    /// Add the `User-Agent` header to request log lines.
    pub user_agent: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            user_agent: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(rename = "static")]
    pub static_mounts: Vec<StaticMount>,
    pub cors: Option<CorsSettings>,
    pub logging: LoggingSettings,
}

impl AppConfig {
    /// Read and parse `path`, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Io`] if the file cannot be read,
    /// [`ConfigurationError::Parse`] if it is not valid for its format.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(path, &text)?;
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse `text` as YAML or JSON depending on the extension of `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Parse`] on malformed input.
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigurationError> {
        let parse_err = |message: String| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string())),
            _ => serde_json::from_str(text).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Apply `ROUTEWARD_ADDR`, `ROUTEWARD_PORT` and `ROUTEWARD_STACK_SIZE`
    /// from `lookup`. Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("ROUTEWARD_ADDR") {
            self.server.addr = addr;
        }
        if let Some(port) = lookup("ROUTEWARD_PORT") {
            match port.trim().parse() {
                Ok(p) => self.server.port = p,
                Err(_) => warn!(value = %port, "Ignoring invalid ROUTEWARD_PORT"),
            }
        }
        if let Some(size) = lookup("ROUTEWARD_STACK_SIZE") {
            match parse_stack_size(&size) {
                Some(s) => self.server.stack_size = s,
                None => warn!(value = %size, "Ignoring invalid ROUTEWARD_STACK_SIZE"),
            }
        }
        self
    }
}

/// Decimal or `0x`-prefixed hexadecimal byte count.
#[must_use]
pub fn parse_stack_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn deserialize_stack_size<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => parse_stack_size(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size '{s}'"))),
    }
}
