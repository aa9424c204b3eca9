//! Controllers and the handler registration table.
//!
//! A controller groups routes under a base path. Its [`RouteEntry`] list
//! names handlers by id; the [`HandlerTable`] maps those ids to strongly
//! typed handler closures together with their parameter descriptors. The
//! router resolves every id at build time, so a typo fails startup instead
//! of a request.

use crate::binder::{Args, ParamDescriptor};
use crate::middleware::Middleware;
use crate::request::{param_value, ParamVec, Request};
use crate::response::ResponseEntity;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a handler receives for one call.
pub struct Invocation<'a> {
    pub request: &'a Request,
    pub path_vars: &'a ParamVec,
    pub args: Args,
}

impl Invocation<'_> {
    #[must_use]
    pub fn path_var(&self, name: &str) -> Option<&str> {
        param_value(self.path_vars, name)
    }
}

pub type HandlerFn = dyn Fn(&mut Invocation<'_>) -> anyhow::Result<ResponseEntity> + Send + Sync;

/// A handler body plus the parameters it expects to have bound.
#[derive(Clone)]
pub struct Handler {
    params: Arc<[ParamDescriptor]>,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<P, F>(params: P, func: F) -> Self
    where
        P: IntoIterator<Item = ParamDescriptor>,
        F: Fn(&mut Invocation<'_>) -> anyhow::Result<ResponseEntity> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            func: Arc::new(func),
        }
    }

    #[must_use]
    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    /// Run the handler.
    ///
    /// # Errors
    ///
    /// Whatever the handler body returns.
    pub fn call(&self, invocation: &mut Invocation<'_>) -> anyhow::Result<ResponseEntity> {
        (self.func)(invocation)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Route identifier to handler.
#[derive(Clone, Default, Debug)]
pub struct HandlerTable {
    entries: HashMap<String, Handler>,
}

impl HandlerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `id`.
    ///
    /// ```
    /// use routeward::binder::ParamDescriptor;
    /// use routeward::controller::HandlerTable;
    /// use routeward::response::ResponseEntity;
    ///
    /// let table = HandlerTable::new().handler("Get", [ParamDescriptor::int("id")], |inv| {
    ///     let id = inv.args.int(0)?;
    ///     Ok(ResponseEntity::ok().body(id))
    /// });
    /// assert!(table.get("Get").is_some());
    /// ```
    #[must_use]
    pub fn handler<P, F>(mut self, id: &str, params: P, func: F) -> Self
    where
        P: IntoIterator<Item = ParamDescriptor>,
        F: Fn(&mut Invocation<'_>) -> anyhow::Result<ResponseEntity> + Send + Sync + 'static,
    {
        self.insert(id, Handler::new(params, func));
        self
    }

    pub fn insert(&mut self, id: &str, handler: Handler) {
        self.entries.insert(id.to_string(), handler);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Handler> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One declared route: method, path relative to the controller's base path,
/// and the handler id it dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: String,
    pub path: String,
    pub handler: String,
}

impl RouteEntry {
    #[must_use]
    pub fn new(method: &str, path: &str, handler: &str) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            handler: handler.to_string(),
        }
    }

    #[must_use]
    pub fn get(path: &str, handler: &str) -> Self {
        Self::new("GET", path, handler)
    }

    #[must_use]
    pub fn post(path: &str, handler: &str) -> Self {
        Self::new("POST", path, handler)
    }

    #[must_use]
    pub fn put(path: &str, handler: &str) -> Self {
        Self::new("PUT", path, handler)
    }

    #[must_use]
    pub fn patch(path: &str, handler: &str) -> Self {
        Self::new("PATCH", path, handler)
    }

    #[must_use]
    pub fn delete(path: &str, handler: &str) -> Self {
        Self::new("DELETE", path, handler)
    }

    #[must_use]
    pub fn options(path: &str, handler: &str) -> Self {
        Self::new("OPTIONS", path, handler)
    }
}

pub trait Controller: Send + Sync {
    /// Name used in logs and configuration errors.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn base_path(&self) -> &str;

    fn routes(&self) -> Vec<RouteEntry>;

    fn handlers(&self) -> HandlerTable;

    /// Middleware run after the global pre chain for this controller's routes.
    fn pre_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }

    /// Middleware run after the handler, before the global post chain.
    fn post_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }
}

/// A controller assembled from values rather than a dedicated type.
///
/// ```
/// use routeward::controller::{ControllerBase, HandlerTable, RouteEntry};
/// use routeward::response::ResponseEntity;
///
/// let health = ControllerBase::new("health", "/health")
///     .route(RouteEntry::get("/", "Check"))
///     .with_handlers(HandlerTable::new().handler("Check", [], |_| Ok(ResponseEntity::ok().body("up"))));
/// ```
#[derive(Clone, Default)]
pub struct ControllerBase {
    name: String,
    base_path: String,
    routes: Vec<RouteEntry>,
    handlers: HandlerTable,
    pre: Vec<Arc<dyn Middleware>>,
    post: Vec<Arc<dyn Middleware>>,
}

impl ControllerBase {
    #[must_use]
    pub fn new(name: &str, base_path: &str) -> Self {
        Self {
            name: name.to_string(),
            base_path: base_path.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn route(mut self, route: RouteEntry) -> Self {
        self.routes.push(route);
        self
    }

    #[must_use]
    pub fn with_handlers(mut self, handlers: HandlerTable) -> Self {
        self.handlers = handlers;
        self
    }

    #[must_use]
    pub fn pre(mut self, middleware: impl Middleware + 'static) -> Self {
        self.pre.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn post(mut self, middleware: impl Middleware + 'static) -> Self {
        self.post.push(Arc::new(middleware));
        self
    }
}

impl Controller for ControllerBase {
    fn name(&self) -> &str {
        &self.name
    }

    fn base_path(&self) -> &str {
        &self.base_path
    }

    fn routes(&self) -> Vec<RouteEntry> {
        self.routes.clone()
    }

    fn handlers(&self) -> HandlerTable {
        self.handlers.clone()
    }

    fn pre_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        self.pre.clone()
    }

    fn post_middleware(&self) -> Vec<Arc<dyn Middleware>> {
        self.post.clone()
    }
}
