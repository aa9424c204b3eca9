//! Cross-origin resource sharing.
//!
//! For a request whose `Origin` is allowed, the middleware echoes that origin
//! back together with the allowed methods and headers. Every `OPTIONS`
//! request is answered with `204 No Content` and the chain halts there. A
//! request whose method is not in the allowed set gets `405` and also halts.
//! Everything else continues down the chain.

mod builder;
mod error;

pub use builder::CorsMiddlewareBuilder;
pub use error::CorsConfigError;

use super::{Middleware, MiddlewareContext};
use http::Method;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    allow_credentials: bool,
    expose_headers: Vec<String>,
    max_age: Option<u32>,
    methods_header: String,
    headers_header: String,
}

impl CorsMiddleware {
    pub(crate) fn new(
        allowed_origins: Vec<String>,
        allowed_methods: Vec<Method>,
        allowed_headers: Vec<String>,
        allow_credentials: bool,
        expose_headers: Vec<String>,
        max_age: Option<u32>,
    ) -> Self {
        let methods_header = allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let headers_header = allowed_headers.join(", ");
        debug!(
            origins = ?allowed_origins,
            methods = %methods_header,
            credentials = allow_credentials,
            "CORS middleware initialized"
        );
        Self {
            allowed_origins,
            allowed_methods,
            allowed_headers,
            allow_credentials,
            expose_headers,
            max_age,
            methods_header,
            headers_header,
        }
    }

    #[must_use]
    pub fn builder() -> CorsMiddlewareBuilder {
        CorsMiddlewareBuilder::new()
    }

    #[must_use]
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    /// Method names compare case-insensitively.
    #[must_use]
    pub fn is_method_allowed(&self, method: &Method) -> bool {
        self.allowed_methods
            .iter()
            .any(|m| m.as_str().eq_ignore_ascii_case(method.as_str()))
    }

    #[must_use]
    pub fn allowed_headers(&self) -> &[String] {
        &self.allowed_headers
    }

    fn apply_origin_headers(&self, ctx: &mut MiddlewareContext<'_>, origin: &str) {
        let sink = ctx.sink();
        sink.set_header("Access-Control-Allow-Origin", origin);
        sink.set_header("Vary", "Origin");
        sink.set_header("Access-Control-Allow-Methods", &self.methods_header);
        sink.set_header("Access-Control-Allow-Headers", &self.headers_header);
        if self.allow_credentials {
            sink.set_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.expose_headers.is_empty() {
            sink.set_header("Access-Control-Expose-Headers", &self.expose_headers.join(", "));
        }
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &str {
        "cors"
    }

    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> anyhow::Result<()> {
        let request = ctx.request();

        match request.header("origin") {
            Some(origin) if self.is_origin_allowed(origin) => {
                self.apply_origin_headers(ctx, origin);
                debug!(origin = %origin, "CORS origin allowed");
            }
            Some(origin) => warn!(origin = %origin, path = %request.path, "CORS origin rejected"),
            None => debug!(path = %request.path, "No Origin header present"),
        }

        if request.method == Method::OPTIONS {
            debug!(path = %request.path, "CORS preflight intercepted");
            if let Some(max_age) = self.max_age {
                ctx.sink().set_header("Access-Control-Max-Age", &max_age.to_string());
            }
            ctx.sink().write_status(204);
            return Ok(());
        }

        if !self.is_method_allowed(&request.method) {
            warn!(method = %request.method, path = %request.path, "CORS method not allowed");
            ctx.sink().write_status(405);
            return Ok(());
        }

        ctx.next()
    }
}
