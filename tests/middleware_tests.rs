mod common;

use common::{after_tracer, items_controller, send, tracer, Trace};
use routeward::middleware::{
    from_fn, ChainState, ConfiguredMiddleware, Middleware, MiddlewareContext,
};
use routeward::request::Request;
use routeward::response::{RecordedResponse, ResponseSink};
use routeward::router::Router;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[test]
fn test_chain_runs_in_registration_order() {
    let trace = Trace::default();
    let controller = items_controller(&trace)
        .pre(tracer(&trace, "controller-pre"))
        .post(tracer(&trace, "controller-post"));
    let router = Router::builder()
        .controller(controller)
        .use_pre(tracer(&trace, "global-pre-1"))
        .use_pre(tracer(&trace, "global-pre-2"))
        .use_post(tracer(&trace, "global-post"))
        .build()
        .unwrap();

    let response = send(&router, Request::get("/items/3"));

    assert_eq!(response.status_or_default(), 200);
    assert_eq!(
        trace.entries(),
        [
            "global-pre-1",
            "global-pre-2",
            "controller-pre",
            "handler",
            "controller-post",
            "global-post",
        ]
    );
}

#[test]
fn test_code_after_next_runs_in_reverse_order() {
    let trace = Trace::default();
    let router = Router::builder()
        .controller(items_controller(&trace))
        .use_pre(after_tracer(&trace, "outer"))
        .use_pre(after_tracer(&trace, "inner"))
        .build()
        .unwrap();

    send(&router, Request::get("/items/1"));

    assert_eq!(trace.entries(), ["handler", "inner", "outer"]);
}

#[test]
fn test_halting_pre_middleware_prevents_handler() {
    let trace = Trace::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let gate = from_fn("gate", move |ctx| {
        counted.fetch_add(1, Ordering::SeqCst);
        ctx.sink().write_status(403);
        Ok(())
    });
    let router = Router::builder()
        .controller(items_controller(&trace))
        .use_pre(gate)
        .use_post(tracer(&trace, "post"))
        .build()
        .unwrap();

    let response = send(&router, Request::get("/items/9"));

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(response.status(), Some(403));
    assert!(response.body().is_empty());
    assert!(trace.entries().is_empty());
}

#[test]
fn test_post_middleware_observes_and_edits_entity() {
    let trace = Trace::default();
    let seen = Arc::new(Mutex::new(None));
    let recorder = Arc::clone(&seen);
    let stamp = from_fn("stamp", move |ctx| {
        if let Some(entity) = ctx.response_entity_mut() {
            *recorder.lock().unwrap() = Some(entity.status());
            entity.set_header("X-Stamped", "yes");
        }
        ctx.next()
    });
    let router = Router::builder()
        .controller(items_controller(&trace))
        .use_post(stamp)
        .build()
        .unwrap();

    let response = send(&router, Request::get("/items/5"));

    assert_eq!(*seen.lock().unwrap(), Some(200));
    assert_eq!(response.header("x-stamped"), Some("yes"));
    assert_eq!(response.body_json().unwrap()["id"], 5);
}

#[test]
fn test_error_hook_swallows_error() {
    let trace = Trace::default();
    let hooked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hooked);
    let failing = ConfiguredMiddleware::new("failing", (), |_ctx, _config: &()| {
        Err(anyhow::anyhow!("boom"))
    })
    .on_error(move |ctx: &mut MiddlewareContext<'_>, err: &anyhow::Error| {
        counter.fetch_add(1, Ordering::SeqCst);
        ctx.sink().write_status(418);
        ctx.sink().write_body(err.to_string().as_bytes());
    });
    let router = Router::builder()
        .controller(items_controller(&trace))
        .use_pre(failing)
        .build()
        .unwrap();

    let response = send(&router, Request::get("/items/1"));

    assert_eq!(hooked.load(Ordering::SeqCst), 1);
    assert_eq!(response.status(), Some(418));
    assert_eq!(response.body(), b"boom");
    assert!(trace.entries().is_empty());
}

#[test]
fn test_propagated_middleware_error_becomes_500() {
    let trace = Trace::default();
    let failing = ConfiguredMiddleware::new("failing", (), |_ctx, _config: &()| {
        Err(anyhow::anyhow!("upstream unavailable"))
    })
    .propagate_errors();
    let router = Router::builder()
        .controller(items_controller(&trace))
        .use_pre(failing)
        .build()
        .unwrap();

    let response = send(&router, Request::get("/items/1"));

    assert_eq!(response.status(), Some(500));
    let body = response.body_json().unwrap();
    assert!(body["error"].as_str().unwrap().contains("upstream unavailable"));
}

#[test]
fn test_with_init_adjusts_config_once() {
    let mw = ConfiguredMiddleware::new("limit", 10_u32, |ctx, _limit: &u32| ctx.next())
        .with_init(|limit| *limit *= 2);
    assert_eq!(*mw.config(), 20);
}

#[test]
fn test_context_tracks_state() {
    let request = Request::get("/");
    let mut sink = RecordedResponse::new();
    let states = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&states);
    let first = from_fn("first", move |ctx| {
        recorder.lock().unwrap().push(ctx.state());
        ctx.next()
    });
    let stop = from_fn("stop", |_ctx| Ok(()));
    let never = from_fn("never", |_ctx| panic!("must not run"));
    let units: Vec<Arc<dyn Middleware>> = vec![Arc::new(first), Arc::new(stop), Arc::new(never)];
    let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(units);

    let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);
    assert_eq!(ctx.state(), ChainState::BeforeFirst);
    ctx.next().unwrap();

    assert_eq!(*states.lock().unwrap(), [ChainState::Running(0)]);
    assert_eq!(ctx.state(), ChainState::Halted);
    assert!(ctx.is_halted());
    assert_eq!(ctx.position(), Some(1));
    assert_eq!(ctx.chain_len(), 3);

    // Further calls are no-ops once halted.
    ctx.next().unwrap();
    assert_eq!(ctx.position(), Some(1));
}

#[test]
fn test_chain_completes_past_last_unit() {
    let request = Request::get("/");
    let mut sink = RecordedResponse::new();
    let pass = from_fn("pass", |ctx| ctx.next());
    let units: Vec<Arc<dyn Middleware>> = vec![Arc::new(pass)];
    let chain: Arc<[Arc<dyn Middleware>]> = Arc::from(units);

    let mut ctx = MiddlewareContext::new(&request, &mut sink, chain);
    ctx.next().unwrap();

    assert_eq!(ctx.state(), ChainState::Completed);
    assert!(!ctx.is_committed());
}
