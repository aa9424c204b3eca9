#![allow(dead_code)]

use routeward::binder::ParamDescriptor;
use routeward::controller::{ControllerBase, HandlerTable, RouteEntry};
use routeward::middleware::{from_fn, FnMiddleware};
use routeward::request::Request;
use routeward::response::{RecordedResponse, ResponseEntity};
use routeward::router::Router;
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Dispatch `request` and return what was written.
pub fn send(router: &Router, request: Request) -> RecordedResponse {
    let mut response = RecordedResponse::new();
    router.dispatch(&request, &mut response);
    response
}

/// Ordered record of which units ran, shared between closures.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Records `name` on the way in, then continues.
pub fn tracer(trace: &Trace, name: &str) -> FnMiddleware {
    let trace = trace.clone();
    let label = name.to_string();
    from_fn(name, move |ctx| {
        trace.push(label.clone());
        ctx.next()
    })
}

/// Records `name` after everything downstream has run.
pub fn after_tracer(trace: &Trace, name: &str) -> FnMiddleware {
    let trace = trace.clone();
    let label = name.to_string();
    from_fn(name, move |ctx| {
        ctx.next()?;
        trace.push(label.clone());
        Ok(())
    })
}

/// `/items` controller with `GET /{id}`; the handler records `handler`.
pub fn items_controller(trace: &Trace) -> ControllerBase {
    let trace = trace.clone();
    ControllerBase::new("items", "/items")
        .route(RouteEntry::get("/{id}", "Get"))
        .with_handlers(HandlerTable::new().handler(
            "Get",
            [ParamDescriptor::int("id")],
            move |inv| {
                trace.push("handler");
                Ok(ResponseEntity::ok().body(json!({"id": inv.args.int(0)?})))
            },
        ))
}
