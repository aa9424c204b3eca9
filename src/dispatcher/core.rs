use crate::binder::bind;
use crate::controller::{Handler, Invocation};
use crate::error::DispatchError;
use crate::middleware::{ChainState, Middleware, MiddlewareContext};
use crate::request::Request;
use crate::response::{ResponseEntity, ResponseSink};
use crate::router::Router;
use http::Method;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The chain unit that invokes the route's handler.
///
/// It consumes the bound arguments from the context, stores the handler's
/// entity (or a 500 entity if the handler fails or panics) as the response
/// entity, and always continues so post-middleware can observe the result.
pub struct HandlerUnit {
    handler: Handler,
    handler_id: String,
}

impl HandlerUnit {
    #[must_use]
    pub fn new(handler: Handler, handler_id: &str) -> Self {
        Self {
            handler,
            handler_id: handler_id.to_string(),
        }
    }
}

impl Middleware for HandlerUnit {
    fn name(&self) -> &str {
        &self.handler_id
    }

    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> anyhow::Result<()> {
        let args = ctx.take_args().unwrap_or_default();
        let outcome = {
            let mut invocation = Invocation {
                request: ctx.request(),
                path_vars: ctx.path_vars(),
                args,
            };
            catch_unwind(AssertUnwindSafe(|| self.handler.call(&mut invocation)))
        };

        let entity = match outcome {
            Ok(Ok(entity)) => entity,
            Ok(Err(err)) => {
                error!(handler = %self.handler_id, error = %err, "Handler failed");
                DispatchError::HandlerContract(format!("Handler '{}' failed: {err}", self.handler_id))
                    .into_response()
            }
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!(handler = %self.handler_id, panic = %reason, "Handler panicked");
                DispatchError::HandlerContract(format!("Handler '{}' panicked", self.handler_id))
                    .into_response()
            }
        };

        ctx.set_response_entity(entity);
        ctx.next()
    }
}

/// Build a route's chain: global pre, controller pre, the handler unit,
/// controller post, global post.
#[must_use]
pub fn assemble_chain(
    global_pre: &[Arc<dyn Middleware>],
    controller_pre: &[Arc<dyn Middleware>],
    handler: &Handler,
    handler_id: &str,
    controller_post: &[Arc<dyn Middleware>],
    global_post: &[Arc<dyn Middleware>],
) -> Arc<[Arc<dyn Middleware>]> {
    let unit: Arc<dyn Middleware> = Arc::new(HandlerUnit::new(handler.clone(), handler_id));
    global_pre
        .iter()
        .chain(controller_pre)
        .cloned()
        .chain(std::iter::once(unit))
        .chain(controller_post.iter().cloned())
        .chain(global_post.iter().cloned())
        .collect()
}

/// Route `request` and write the outcome to `sink`.
///
/// Never fails: routing, binding, handler and middleware failures all become
/// error responses.
pub fn dispatch(router: &Router, request: &Request, sink: &mut dyn ResponseSink) {
    let start = Instant::now();
    let Some(matched) = router.find(&request.method, &request.path) else {
        if request.method == Method::OPTIONS && router.options_passthrough() {
            run_preflight(router, request, sink);
        } else if !run_fallback(router, request, sink) {
            warn!(
                request_id = %request.id,
                method = %request.method,
                path = %request.path,
                "No route matched"
            );
            DispatchError::RouteNotFound {
                method: request.method.clone(),
                path: request.path.clone(),
            }
            .into_response()
            .send(sink);
        }
        return;
    };

    let route = matched.route;
    let args = match bind(route.handler().params(), &matched.path_vars, request) {
        Ok(args) => args,
        Err(err) => {
            warn!(
                request_id = %request.id,
                handler = %route.handler_id(),
                error = %err,
                "Argument binding failed"
            );
            DispatchError::from(err).into_response().send(sink);
            return;
        }
    };

    let mut ctx = MiddlewareContext::new(request, sink, Arc::clone(route.chain()))
        .with_path_vars(matched.path_vars)
        .with_args(args);

    if let Err(err) = ctx.next() {
        error!(
            request_id = %request.id,
            handler = %route.handler_id(),
            error = %err,
            "Middleware chain failed"
        );
        if ctx.response_entity().is_none() && !ctx.is_committed() {
            ctx.set_response_entity(DispatchError::ChainFailed(err.to_string()).into_response());
        }
    }

    let state = ctx.state();
    finish(&mut ctx);

    info!(
        request_id = %request.id,
        method = %request.method,
        path = %request.path,
        handler = %route.handler_id(),
        status = ctx.sink().status().unwrap_or(200),
        halted = state == ChainState::Halted,
        latency_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        "Request dispatched"
    );
}

/// Write the stored entity unless a unit already committed a response.
fn finish(ctx: &mut MiddlewareContext<'_>) {
    let Some(entity) = ctx.take_response_entity() else {
        return;
    };
    if ctx.is_committed() {
        warn!(
            path = %ctx.request().path,
            written_status = ctx.sink().status().unwrap_or_default(),
            entity_status = entity.status(),
            "Response already written by middleware; entity dropped"
        );
        return;
    }
    entity.send(ctx.sink());
}

/// Unmatched `OPTIONS`: run only the global pre chain so CORS-style
/// middleware can answer it. If nothing answers, reply `204`.
fn run_preflight(router: &Router, request: &Request, sink: &mut dyn ResponseSink) {
    debug!(request_id = %request.id, path = %request.path, "OPTIONS passthrough");
    let mut ctx = MiddlewareContext::new(request, sink, Arc::clone(router.global_pre()));
    if let Err(err) = ctx.next() {
        error!(request_id = %request.id, error = %err, "Preflight chain failed");
    }
    finish(&mut ctx);
    if !ctx.is_committed() {
        ResponseEntity::no_content().send(ctx.sink());
    }
}

/// Offer an unmatched request to the fallback chain. Returns whether a unit
/// wrote a response.
fn run_fallback(router: &Router, request: &Request, sink: &mut dyn ResponseSink) -> bool {
    if router.fallback().is_empty() {
        return false;
    }
    let mut ctx = MiddlewareContext::new(request, sink, Arc::clone(router.fallback()));
    if let Err(err) = ctx.next() {
        error!(request_id = %request.id, error = %err, "Fallback chain failed");
    }
    finish(&mut ctx);
    ctx.is_committed()
}

impl Router {
    /// See [`dispatch`].
    pub fn dispatch(&self, request: &Request, sink: &mut dyn ResponseSink) {
        dispatch(self, request, sink);
    }
}
