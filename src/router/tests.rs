use super::{compile_template, join_path, normalize_path, Router};
use crate::controller::{ControllerBase, HandlerTable, RouteEntry};
use crate::error::ConfigurationError;
use crate::response::ResponseEntity;
use http::Method;

fn noop_table(ids: &[&str]) -> HandlerTable {
    ids.iter().fold(HandlerTable::new(), |table, id| {
        table.handler(id, [], |_| Ok(ResponseEntity::ok()))
    })
}

#[test]
fn test_root_path() {
    let (m, params) = compile_template("/").unwrap();
    assert!(m.is_match("/"));
    assert!(params.is_empty());
}

#[test]
fn test_nested_path() {
    let (m, params) = compile_template("/a/{b}/c").unwrap();
    assert!(m.is_match("/a/1/c"));
    assert_eq!(params, vec!["b"]);
}

#[test]
fn test_join_path() {
    assert_eq!(join_path("/api/v1/users", "/{id}"), "/api/v1/users/{id}");
    assert_eq!(join_path("/api/v1/users/", "{id}"), "/api/v1/users/{id}");
    assert_eq!(join_path("/api/v1/users", ""), "/api/v1/users");
    assert_eq!(join_path("/api/v1/users", "/"), "/api/v1/users");
}

#[test]
fn test_normalize_path() {
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("/users/"), "/users");
    assert_eq!(normalize_path("/users"), "/users");
}

#[test]
fn test_method_is_uppercased() {
    let router = Router::builder()
        .controller(
            ControllerBase::new("items", "/items")
                .route(RouteEntry::new("get", "/{id}", "Get"))
                .with_handlers(noop_table(&["Get"])),
        )
        .build()
        .unwrap();
    assert_eq!(router.routes()[0].method(), &Method::GET);
    assert!(router.find(&Method::GET, "/items/1").is_some());
}

#[test]
fn test_unknown_handler_fails_build() {
    let result = Router::builder()
        .controller(
            ControllerBase::new("items", "/items")
                .route(RouteEntry::get("/{id}", "Missing"))
                .with_handlers(noop_table(&["Get"])),
        )
        .build();
    match result {
        Err(ConfigurationError::UnknownHandler { handler, path, .. }) => {
            assert_eq!(handler, "Missing");
            assert_eq!(path, "/items/{id}");
        }
        other => panic!("expected UnknownHandler, got {other:?}"),
    }
}

#[test]
fn test_invalid_method_fails_build() {
    let result = Router::builder()
        .controller(
            ControllerBase::new("items", "/items")
                .route(RouteEntry::new("GE T", "/", "Get"))
                .with_handlers(noop_table(&["Get"])),
        )
        .build();
    assert!(matches!(result, Err(ConfigurationError::InvalidMethod { .. })));
}

#[test]
fn test_first_registered_route_wins() {
    let router = Router::builder()
        .controller(
            ControllerBase::new("items", "/items")
                .route(RouteEntry::get("/{id}", "ById"))
                .route(RouteEntry::get("/latest", "Latest"))
                .with_handlers(noop_table(&["ById", "Latest"])),
        )
        .build()
        .unwrap();
    let matched = router.find(&Method::GET, "/items/latest").unwrap();
    assert_eq!(matched.route.handler_id(), "ById");
    assert_eq!(matched.path_vars[0].1, "latest");
}

#[test]
fn test_method_mismatch_is_no_match() {
    let router = Router::builder()
        .controller(
            ControllerBase::new("items", "/items")
                .route(RouteEntry::get("/{id}", "Get"))
                .with_handlers(noop_table(&["Get"])),
        )
        .build()
        .unwrap();
    assert!(router.find(&Method::DELETE, "/items/1").is_none());
}

#[test]
fn test_find_strips_a_single_trailing_slash() {
    let router = Router::builder()
        .controller(
            ControllerBase::new("users", "/users")
                .route(RouteEntry::get("/{id}", "Get"))
                .with_handlers(noop_table(&["Get"])),
        )
        .build()
        .unwrap();
    let matched = router.find(&Method::GET, "/users/42//").unwrap();
    assert_eq!(matched.path_vars[0].1, "42");
    assert!(router.find(&Method::GET, "/users/42///").is_none());
}
