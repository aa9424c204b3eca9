mod common;

use common::send;
use routeward::controllers::{User, UsersController};
use routeward::request::Request;
use routeward::response::ResponseSink;
use routeward::router::Router;
use serde_json::json;

fn seeded() -> (UsersController, Router) {
    let users = UsersController::with_users([
        User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
        },
        User {
            id: 42,
            name: "Grace".into(),
            email: "grace@example.com".into(),
        },
    ]);
    let router = Router::builder().controller(users.clone()).build().unwrap();
    (users, router)
}

#[test]
fn test_get_existing_user() {
    let (_, router) = seeded();

    let response = send(&router, Request::get("/api/v1/users/42"));

    assert_eq!(response.status(), Some(200));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(
        response.body_json().unwrap(),
        json!({"id": 42, "name": "Grace", "email": "grace@example.com"})
    );
}

#[test]
fn test_get_missing_user_is_404() {
    let (_, router) = seeded();

    let response = send(&router, Request::get("/api/v1/users/7"));

    assert_eq!(response.status(), Some(404));
    assert_eq!(response.body_json().unwrap(), json!({"error": "User not found"}));
}

#[test]
fn test_get_non_numeric_id_is_400() {
    let (_, router) = seeded();
    let response = send(&router, Request::get("/api/v1/users/abc"));
    assert_eq!(response.status(), Some(400));
}

#[test]
fn test_list_users_in_id_order() {
    let (_, router) = seeded();

    let response = send(&router, Request::get("/api/v1/users"));

    let body = response.body_json().unwrap();
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, [1, 42]);
}

#[test]
fn test_create_user() {
    let (users, router) = seeded();
    let request = Request::post("/api/v1/users")
        .with_json(&json!({"name": "Linus", "email": "linus@example.com"}))
        .unwrap();

    let response = send(&router, request);

    assert_eq!(response.status(), Some(201));
    assert_eq!(response.header("location"), Some("/api/v1/users/43"));
    assert_eq!(
        response.body_json().unwrap(),
        json!({"id": 43, "name": "Linus", "email": "linus@example.com"})
    );
    assert_eq!(users.user_count(), 3);
}

#[test]
fn test_create_user_requires_name_and_email() {
    let (users, router) = seeded();
    let request = Request::post("/api/v1/users")
        .with_json(&json!({"name": "NoEmail"}))
        .unwrap();

    let response = send(&router, request);

    assert_eq!(response.status(), Some(400));
    assert_eq!(
        response.body_json().unwrap(),
        json!({"error": "Name and Email are required"})
    );
    assert_eq!(users.user_count(), 2);
}

#[test]
fn test_create_user_with_invalid_json_is_400() {
    let (_, router) = seeded();
    let response = send(&router, Request::post("/api/v1/users").with_body("name=x"));
    assert_eq!(response.status(), Some(400));
}

#[test]
fn test_update_user() {
    let (_, router) = seeded();
    let request = Request::put("/api/v1/users/1")
        .with_json(&json!({"email": "ada@lovelace.dev"}))
        .unwrap();

    let response = send(&router, request);

    assert_eq!(response.status(), Some(200));
    assert_eq!(
        response.body_json().unwrap(),
        json!({"id": 1, "name": "Ada", "email": "ada@lovelace.dev"})
    );
    let fetched = send(&router, Request::get("/api/v1/users/1"));
    assert_eq!(fetched.body_json().unwrap()["email"], "ada@lovelace.dev");
}

#[test]
fn test_update_missing_user_is_404() {
    let (_, router) = seeded();
    let request = Request::put("/api/v1/users/99")
        .with_json(&json!({"name": "Nobody"}))
        .unwrap();
    assert_eq!(send(&router, request).status(), Some(404));
}

#[test]
fn test_delete_user_then_404() {
    let (users, router) = seeded();

    let deleted = send(&router, Request::delete("/api/v1/users/42"));
    assert_eq!(deleted.status(), Some(204));
    assert!(deleted.body().is_empty());
    assert_eq!(deleted.header("content-type"), None);
    assert_eq!(users.user_count(), 1);

    let again = send(&router, Request::delete("/api/v1/users/42"));
    assert_eq!(again.status(), Some(404));
}
