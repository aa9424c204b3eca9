//! Route compilation and matching.
//!
//! Matching is a linear scan over the compiled routes in registration order;
//! the first route whose method and pattern both match wins.

use super::pattern::{compile_template, PathMatcher};
use crate::controller::{Controller, Handler};
use crate::dispatcher::assemble_chain;
use crate::error::ConfigurationError;
use crate::middleware::Middleware;
use crate::request::ParamVec;
use http::Method;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn, Level};

/// Join a controller base path and a route path with exactly one `/`.
///
/// One trailing `/` is dropped from `base` and one leading `/` from
/// `suffix`; an empty suffix yields the trimmed base unchanged.
///
/// ```
/// use routeward::router::join_path;
///
/// assert_eq!(join_path("/api/v1/users/", "/{id}"), "/api/v1/users/{id}");
/// assert_eq!(join_path("/api/v1/users", "/"), "/api/v1/users");
/// assert_eq!(join_path("", "health"), "/health");
/// assert_eq!(join_path("/", "/"), "/");
/// ```
#[must_use]
pub fn join_path(base: &str, suffix: &str) -> String {
    let base = base.strip_suffix('/').unwrap_or(base);
    let suffix = suffix.strip_prefix('/').unwrap_or(suffix);
    if suffix.is_empty() {
        return if base.is_empty() { "/".to_string() } else { base.to_string() };
    }
    let joined = format!("{base}/{suffix}");
    format!("/{}", joined.trim_start_matches('/'))
}

/// Drop a single trailing `/` unless the path is the root.
#[inline]
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// One entry of the routing table.
pub struct CompiledRoute {
    method: Method,
    template: String,
    matcher: PathMatcher,
    param_names: Vec<Arc<str>>,
    handler_id: String,
    handler: Handler,
    owner: Arc<dyn Controller>,
    chain: Arc<[Arc<dyn Middleware>]>,
}

impl CompiledRoute {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The joined path template, e.g. `/api/v1/users/{id}`.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    #[must_use]
    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    #[must_use]
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    #[must_use]
    pub fn controller(&self) -> &dyn Controller {
        self.owner.as_ref()
    }

    /// Global pre, controller pre, handler, controller post, global post.
    #[must_use]
    pub fn chain(&self) -> &Arc<[Arc<dyn Middleware>]> {
        &self.chain
    }

    /// Path variables for `path`, or `None` if the pattern does not match.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<ParamVec> {
        let values = self.matcher.captures(path)?;
        Some(
            self.param_names
                .iter()
                .map(Arc::clone)
                .zip(values)
                .collect(),
        )
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("method", &self.method)
            .field("template", &self.template)
            .field("pattern", &self.matcher.as_str())
            .field("handler", &self.handler_id)
            .field("controller", &self.owner.name())
            .finish()
    }
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub route: &'r CompiledRoute,
    pub path_vars: ParamVec,
}

/// Collects controllers and global middleware, then compiles them into an
/// immutable [`Router`].
///
/// ```
/// use routeward::controller::{ControllerBase, HandlerTable, RouteEntry};
/// use routeward::middleware::LoggingMiddleware;
/// use routeward::response::ResponseEntity;
/// use routeward::router::Router;
///
/// let router = Router::builder()
///     .use_pre(LoggingMiddleware::pre())
///     .controller(
///         ControllerBase::new("health", "/health")
///             .route(RouteEntry::get("/", "Check"))
///             .with_handlers(HandlerTable::new().handler("Check", [], |_| {
///                 Ok(ResponseEntity::ok().body("up"))
///             })),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(router.routes().len(), 1);
/// ```
pub struct RouterBuilder {
    controllers: Vec<Arc<dyn Controller>>,
    pre: Vec<Arc<dyn Middleware>>,
    post: Vec<Arc<dyn Middleware>>,
    fallback: Vec<Arc<dyn Middleware>>,
    options_passthrough: bool,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            controllers: Vec::new(),
            pre: Vec::new(),
            post: Vec::new(),
            fallback: Vec::new(),
            options_passthrough: true,
        }
    }

    #[must_use]
    pub fn controller(self, controller: impl Controller + 'static) -> Self {
        self.controller_arc(Arc::new(controller))
    }

    #[must_use]
    pub fn controller_arc(mut self, controller: Arc<dyn Controller>) -> Self {
        self.controllers.push(controller);
        self
    }

    /// Append to the global pre chain.
    #[must_use]
    pub fn use_pre(self, middleware: impl Middleware + 'static) -> Self {
        self.use_pre_arc(Arc::new(middleware))
    }

    #[must_use]
    pub fn use_pre_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.pre.push(middleware);
        self
    }

    /// Append to the global post chain.
    #[must_use]
    pub fn use_post(self, middleware: impl Middleware + 'static) -> Self {
        self.use_post_arc(Arc::new(middleware))
    }

    #[must_use]
    pub fn use_post_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.post.push(middleware);
        self
    }

    /// Append to the fallback chain, offered every request that matches no
    /// route. If no unit there writes a response the request gets the usual
    /// 404.
    #[must_use]
    pub fn use_fallback(self, middleware: impl Middleware + 'static) -> Self {
        self.use_fallback_arc(Arc::new(middleware))
    }

    #[must_use]
    pub fn use_fallback_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.fallback.push(middleware);
        self
    }

    /// Run the global pre chain for unmatched `OPTIONS` requests (default
    /// on). When off they get the usual 404.
    #[must_use]
    pub fn options_passthrough(mut self, enabled: bool) -> Self {
        self.options_passthrough = enabled;
        self
    }

    /// Compile every controller's routes.
    ///
    /// # Errors
    ///
    /// Fails on the first route with an unknown handler id, an invalid
    /// method, or a malformed template.
    pub fn build(self) -> Result<Router, ConfigurationError> {
        let routes = compile_routes(&self.controllers, &self.pre, &self.post)?;
        info!(
            routes_count = routes.len(),
            controllers = self.controllers.len(),
            global_pre = self.pre.len(),
            global_post = self.post.len(),
            fallback = self.fallback.len(),
            "Routing table compiled"
        );
        Ok(Router {
            inner: Arc::new(RouterInner {
                routes,
                pre: self.pre.into(),
                fallback: self.fallback.into(),
                options_passthrough: self.options_passthrough,
            }),
        })
    }
}

/// Turn controller declarations into compiled routes, in registration order.
///
/// # Errors
///
/// See [`RouterBuilder::build`].
pub fn compile_routes(
    controllers: &[Arc<dyn Controller>],
    global_pre: &[Arc<dyn Middleware>],
    global_post: &[Arc<dyn Middleware>],
) -> Result<Vec<CompiledRoute>, ConfigurationError> {
    let mut routes = Vec::new();
    let mut seen: HashSet<(Method, String)> = HashSet::new();

    for owner in controllers {
        let handlers = owner.handlers();
        let controller_pre = owner.pre_middleware();
        let controller_post = owner.post_middleware();

        for entry in owner.routes() {
            let template = join_path(owner.base_path(), &entry.path);
            let method = Method::from_bytes(entry.method.to_ascii_uppercase().as_bytes())
                .map_err(|_| ConfigurationError::InvalidMethod {
                    method: entry.method.clone(),
                    path: template.clone(),
                })?;
            let handler = handlers.get(&entry.handler).cloned().ok_or_else(|| {
                ConfigurationError::UnknownHandler {
                    controller: owner.name().to_string(),
                    method: entry.method.clone(),
                    path: template.clone(),
                    handler: entry.handler.clone(),
                }
            })?;
            let (matcher, names) = compile_template(&template)?;

            if !seen.insert((method.clone(), matcher.as_str().to_string())) {
                warn!(
                    method = %method,
                    path = %template,
                    handler = %entry.handler,
                    "Duplicate route; an earlier registration shadows it"
                );
            }

            let chain = assemble_chain(
                global_pre,
                &controller_pre,
                &handler,
                &entry.handler,
                &controller_post,
                global_post,
            );

            debug!(
                method = %method,
                path = %template,
                pattern = %matcher.as_str(),
                handler = %entry.handler,
                "Route registered"
            );

            routes.push(CompiledRoute {
                method,
                template,
                matcher,
                param_names: names.into_iter().map(Arc::from).collect(),
                handler_id: entry.handler,
                handler,
                owner: Arc::clone(owner),
                chain,
            });
        }
    }
    Ok(routes)
}

struct RouterInner {
    routes: Vec<CompiledRoute>,
    pre: Arc<[Arc<dyn Middleware>]>,
    fallback: Arc<[Arc<dyn Middleware>]>,
    options_passthrough: bool,
}

/// The compiled, immutable routing table plus its global middleware.
///
/// Cheap to clone; clones share the same table.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    #[must_use]
    pub fn routes(&self) -> &[CompiledRoute] {
        &self.inner.routes
    }

    /// The global pre chain on its own, as run for unmatched `OPTIONS`.
    #[must_use]
    pub fn global_pre(&self) -> &Arc<[Arc<dyn Middleware>]> {
        &self.inner.pre
    }

    /// Units offered requests that match no route.
    #[must_use]
    pub fn fallback(&self) -> &Arc<[Arc<dyn Middleware>]> {
        &self.inner.fallback
    }

    #[must_use]
    pub fn options_passthrough(&self) -> bool {
        self.inner.options_passthrough
    }

    /// First route matching `method` and `path`. The path is normalized
    /// first.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let path = normalize_path(path);

        for route in self.inner.routes.iter().filter(|r| r.method == *method) {
            if let Some(path_vars) = route.match_path(path) {
                debug!(
                    method = %method,
                    path = %path,
                    handler = %route.handler_id,
                    "Route matched"
                );
                return Some(RouteMatch { route, path_vars });
            }
        }

        if tracing::enabled!(Level::DEBUG)
            && self.inner.routes.iter().any(|r| r.matcher.is_match(path))
        {
            debug!(method = %method, path = %path, "Path matched under another method");
        }
        None
    }

    /// Log the routing table.
    pub fn dump_routes(&self) {
        for route in &self.inner.routes {
            info!(
                method = %route.method,
                path = %route.template,
                handler = %route.handler_id,
                controller = %route.owner.name(),
                "Route"
            );
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.inner.routes)
            .field("global_pre", &self.inner.pre.len())
            .field("fallback", &self.inner.fallback.len())
            .field("options_passthrough", &self.inner.options_passthrough)
            .finish()
    }
}
