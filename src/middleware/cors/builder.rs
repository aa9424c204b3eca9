use http::Method;

use super::{CorsConfigError, CorsMiddleware};

/// Fluent builder for [`CorsMiddleware`].
///
/// # Example
///
/// ```
/// use routeward::middleware::CorsMiddlewareBuilder;
///
/// let cors = CorsMiddlewareBuilder::new()
///     .allowed_origins(&["https://example.com"])
///     .allowed_methods(&["GET", "POST"])
///     .allowed_headers(&["Content-Type", "Authorization"])
///     .allow_credentials(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct CorsMiddlewareBuilder {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<String>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
}

impl CorsMiddlewareBuilder {
    /// Any origin, the common REST verbs, `Content-Type` and
    /// `Authorization` headers, no credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allow_credentials: false,
            expose_headers: vec![],
            max_age: None,
        }
    }

    /// Use `&["*"]` to allow any origin.
    #[must_use]
    pub fn allowed_origins(mut self, origins: &[&str]) -> Self {
        self.allowed_origins = origins.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn allowed_methods(mut self, methods: &[&str]) -> Self {
        self.allowed_methods = methods.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn allowed_headers(mut self, headers: &[&str]) -> Self {
        self.allowed_headers = headers.iter().map(|s| (*s).to_string()).collect();
        self
    }

    #[must_use]
    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Headers readable by browser scripts (`Access-Control-Expose-Headers`).
    #[must_use]
    pub fn expose_headers(mut self, headers: &[&str]) -> Self {
        self.expose_headers = headers.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Preflight cache duration in seconds (`Access-Control-Max-Age`).
    #[must_use]
    pub fn max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Validate the settings and build the middleware.
    ///
    /// # Errors
    ///
    /// - [`CorsConfigError::WildcardWithCredentials`] when `*` is combined
    ///   with credentials.
    /// - [`CorsConfigError::InvalidOriginFormat`] for an origin that is not
    ///   `scheme://host[:port]`.
    /// - [`CorsConfigError::InvalidMethod`] for a method that is not a valid
    ///   HTTP token.
    pub fn build(self) -> Result<CorsMiddleware, CorsConfigError> {
        let wildcard = self.allowed_origins.iter().any(|o| o == "*");
        if self.allow_credentials && wildcard {
            return Err(CorsConfigError::WildcardWithCredentials);
        }
        for origin in self.allowed_origins.iter().filter(|o| *o != "*") {
            if !is_valid_origin(origin) {
                return Err(CorsConfigError::InvalidOriginFormat {
                    origin: origin.clone(),
                });
            }
        }

        let mut methods = Vec::with_capacity(self.allowed_methods.len());
        for method in &self.allowed_methods {
            let parsed = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .map_err(|_| CorsConfigError::InvalidMethod {
                    method: method.clone(),
                })?;
            methods.push(parsed);
        }

        Ok(CorsMiddleware::new(
            self.allowed_origins,
            methods,
            self.allowed_headers,
            self.allow_credentials,
            self.expose_headers,
            self.max_age,
        ))
    }
}

impl Default for CorsMiddlewareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn is_valid_origin(origin: &str) -> bool {
    match url::Url::parse(origin) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some()
                && url.path() == "/"
                && !origin.ends_with('/')
                && url.query().is_none()
                && url.fragment().is_none()
        }
        Err(_) => false,
    }
}
