//! # Router Module
//!
//! Compiles controller route declarations into a routing table and matches
//! requests against it.
//!
//! ## Architecture
//!
//! 1. **Compilation**: at build time each controller's base path and route
//!    path are joined (`/api/v1/users` + `/{id}`), the template is compiled
//!    into an anchored pattern, the handler id is resolved against the
//!    controller's handler table, and the route's middleware chain is
//!    assembled.
//!
//! 2. **Matching**: a request's normalized path is tested against each
//!    compiled route in registration order. The first route whose method and
//!    pattern both match wins, and its captures become the path variables.
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use routeward::binder::ParamDescriptor;
//! use routeward::controller::{ControllerBase, HandlerTable, RouteEntry};
//! use routeward::response::ResponseEntity;
//! use routeward::router::Router;
//!
//! let users = ControllerBase::new("users", "/api/v1/users")
//!     .route(RouteEntry::get("/{id}", "Get"))
//!     .with_handlers(HandlerTable::new().handler("Get", [ParamDescriptor::int("id")], |inv| {
//!         Ok(ResponseEntity::ok().body(inv.args.int(0)?))
//!     }));
//!
//! let router = Router::builder().controller(users).build().unwrap();
//! let matched = router.find(&Method::GET, "/api/v1/users/42/").unwrap();
//! assert_eq!(matched.route.handler_id(), "Get");
//! assert_eq!(matched.path_vars[0].1, "42");
//! ```

mod core;
mod pattern;
#[cfg(test)]
mod tests;

pub use core::{
    compile_routes, join_path, normalize_path, CompiledRoute, RouteMatch, Router, RouterBuilder,
};
pub use pattern::{compile_template, PathMatcher};
