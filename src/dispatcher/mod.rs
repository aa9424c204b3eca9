//! # Dispatcher Module
//!
//! Turns a [`Request`](crate::request::Request) into a response on a
//! [`ResponseSink`](crate::response::ResponseSink).
//!
//! ## Request Flow
//!
//! 1. Normalize the path and find the first matching route
//! 2. Bind the handler's arguments from the path variables and body
//! 3. Run the route's chain: global pre, controller pre, handler,
//!    controller post, global post
//! 4. Write the handler's entity, unless a middleware already wrote a
//!    response
//!
//! ## Error Handling
//!
//! - No matching route: the fallback chain gets a chance to answer, then
//!   `404 {"error": "Route not found"}`
//! - Binding failure: `400` with the binding message
//! - Handler error or panic: `500`; post-middleware still runs
//! - Middleware error with no response produced: `500`
//!
//! An `OPTIONS` request that matches no route runs only the global pre
//! chain (see [`RouterBuilder::options_passthrough`](crate::router::RouterBuilder::options_passthrough)).

mod core;

pub use core::{assemble_chain, dispatch, HandlerUnit};
