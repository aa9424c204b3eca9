//! # routeward
//!
//! **routeward** is a controller-driven HTTP dispatcher for the `may`
//! coroutine runtime. Controllers declare routes as path templates bound to
//! named handlers; the router compiles them once, and each request runs
//! through a continuation-style middleware chain around its handler.
//!
//! ## Architecture
//!
//! - **[`router`]** - Path template compilation and first-match route lookup
//! - **[`binder`]** - Handler arguments from path variables and the JSON body
//! - **[`controller`]** - The [`Controller`] trait and handler tables
//! - **[`middleware`]** - Chain executor plus CORS, static files and logging
//! - **[`dispatcher`]** - Ties lookup, binding and the chain together
//! - **[`server`]** - `may_minihttp` adapter
//! - **[`config`]**, **[`logging`]**, **[`cli`]** - The `routeward` binary
//!
//! ## Quick Start
//!
//! ```
//! use routeward::binder::ParamDescriptor;
//! use routeward::controller::{ControllerBase, HandlerTable, RouteEntry};
//! use routeward::request::Request;
//! use routeward::response::{RecordedResponse, ResponseEntity};
//! use routeward::router::Router;
//!
//! let greet = ControllerBase::new("greet", "/hello")
//!     .route(RouteEntry::get("/{name}", "Hello"))
//!     .with_handlers(HandlerTable::new().handler(
//!         "Hello",
//!         [ParamDescriptor::string("name")],
//!         |inv| Ok(ResponseEntity::ok().body(format!("hi {}", inv.args.str(0)?))),
//!     ));
//!
//! let router = Router::builder().controller(greet).build().unwrap();
//! let mut response = RecordedResponse::new();
//! router.dispatch(&Request::get("/hello/ana"), &mut response);
//! assert_eq!(response.status_or_default(), 200);
//! ```
//!
//! ## Runtime Considerations
//!
//! Requests are served on `may` coroutines, not tokio tasks. The coroutine
//! stack size comes from `server.stack_size` or `ROUTEWARD_STACK_SIZE`.
//! Handlers should avoid deep recursion and large stack buffers.

pub mod binder;
pub mod cli;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use controller::{Controller, ControllerBase, HandlerTable, RouteEntry};
pub use error::{ConfigurationError, DispatchError};
pub use request::Request;
pub use response::{RecordedResponse, ResponseEntity, ResponseSink};
pub use router::{Router, RouterBuilder};
