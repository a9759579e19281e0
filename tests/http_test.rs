mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use puka::auth::Authenticator;
use puka::handler::AppState;
use puka::resource::{BookmarkResource, ResourceConfig};
use puka::routes::app;
use puka::storage::DocumentStore;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const BASE_URL: &str = "http://localhost:8088";

fn router(store: DocumentStore, token: Option<&str>) -> Router {
    let resource = Arc::new(BookmarkResource::new(
        Arc::new(store),
        ResourceConfig { default_page_size: 10 },
    ));
    app(
        AppState::new(resource, BASE_URL),
        Authenticator::new(token.map(str::to_string)),
    )
}

async fn empty_app(token: Option<&str>) -> (TempDir, Router) {
    let (dir, store) = common::open_store().await;
    (dir, router(store, token))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/vnd.api+json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn new_bookmark(title: &str, tags: &[&str]) -> Value {
    json!({
        "data": {
            "type": "bookmarks",
            "attributes": {
                "title": title,
                "url": "https://example.com",
                "description": "",
                "timestamp": "2017-02-01T12:00:00.750Z",
                "tags": tags
            }
        }
    })
}

#[tokio::test]
async fn test_healthcheck() {
    let (_dir, app) = empty_app(None).await;
    let (status, body) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_crud_round_trip() {
    let (_dir, app) = empty_app(None).await;

    let (status, created) = send(&app, Method::POST, "/v0/bookmarks", Some(new_bookmark("Go", &["go"]))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 24);
    assert_eq!(created["data"]["attributes"]["timestamp"], "2017-02-01T12:00:00Z");

    let (status, fetched) = send(&app, Method::GET, &format!("/v0/bookmarks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["data"]["attributes"]["title"], "Go");

    let mut patch = new_bookmark("Go, updated", &["go", "lang"]);
    patch["data"]["id"] = json!(id);
    let (status, updated) = send(&app, Method::PATCH, &format!("/v0/bookmarks/{id}"), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["attributes"]["title"], "Go, updated");
    assert_ne!(updated["data"]["attributes"]["timestamp"], "2017-02-01T12:00:00.750Z");

    let (status, body) = send(&app, Method::DELETE, &format!("/v0/bookmarks/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, Method::GET, &format!("/v0/bookmarks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"][0]["status"], "404");

    let (status, _) = send(&app, Method::DELETE, &format!("/v0/bookmarks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_changes_only_supplied_attributes() {
    let (_dir, app) = empty_app(None).await;
    let create = json!({
        "data": {
            "type": "bookmarks",
            "attributes": { "title": "T", "url": "https://u", "description": "D", "tags": ["go"] }
        }
    });
    let (status, created) = send(&app, Method::POST, "/v0/bookmarks", Some(create)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let patch = json!({ "data": { "type": "bookmarks", "id": id, "attributes": { "title": "New" } } });
    let (status, _) = send(&app, Method::PATCH, &format!("/v0/bookmarks/{id}"), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, fetched) = send(&app, Method::GET, &format!("/v0/bookmarks/{id}"), None).await;
    let attrs = &fetched["data"]["attributes"];
    assert_eq!(attrs["title"], "New");
    assert_eq!(attrs["url"], "https://u");
    assert_eq!(attrs["description"], "D");
    assert_eq!(attrs["tags"], json!(["go"]));
}

#[tokio::test]
async fn test_list_with_tag_filter() {
    let (_dir, app) = empty_app(None).await;
    for (title, tags) in [("A", vec!["go"]), ("B", vec!["rust"]), ("C", vec!["web", "go"])] {
        let (status, _) = send(&app, Method::POST, "/v0/bookmarks", Some(new_bookmark(title, &tags))).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = send(&app, Method::GET, "/v0/bookmarks?filter%5Btag%5D=go", None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["attributes"]["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["A", "C"]);

    let (_, body) = send(&app, Method::GET, "/v0/bookmarks?filter[tag]=&filter[tag]=go", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, Method::GET, "/v0/bookmarks?filter[unknown]=x", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_paginated_list() {
    let (_dir, store) = common::seeded_store().await;
    let app = router(store, None);

    let (status, body) = send(&app, Method::GET, "/v0/bookmarks?filter[tag]=go&page[number]=2&page[size]=100", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 100);
    assert_eq!(body["meta"]["total"], 370);
    assert_eq!(
        body["links"]["next"],
        "http://localhost:8088/v0/bookmarks?page[number]=3&page[size]=100&filter[tag]=go"
    );
    assert_eq!(
        body["links"]["last"],
        "http://localhost:8088/v0/bookmarks?page[number]=4&page[size]=100&filter[tag]=go"
    );

    let (_, body) = send(&app, Method::GET, "/v0/bookmarks?page[offset]=990", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert!(body["links"].get("next").is_none());

    let (status, _) = send(&app, Method::GET, "/v0/bookmarks?page[number]=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_page_parameters_are_rejected() {
    let (_dir, app) = empty_app(None).await;
    for uri in [
        "/v0/bookmarks?page[number]=18446744073709551615&page[size]=2",
        "/v0/bookmarks?page[offset]=18446744073709551615&page[limit]=10",
        "/v0/bookmarks?page[offset]=9223372036854775808",
    ] {
        let (status, body) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["errors"][0]["status"], "400");
    }
}

#[tokio::test]
async fn test_bad_payloads() {
    let (_dir, app) = empty_app(None).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/v0/bookmarks")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/v0/bookmarks", Some(json!({"data": {"type": "people", "attributes": {}}}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_id_mismatch_conflicts() {
    let (_dir, app) = empty_app(None).await;
    let mut patch = new_bookmark("X", &[]);
    patch["data"]["id"] = json!("5891f3b8a3c5e0a1b2c3d4e5");
    let (status, _) = send(&app, Method::PATCH, "/v0/bookmarks/5891f3b8a3c5e0a1b2c3d4e6", Some(patch)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_id_is_not_found() {
    let (_dir, app) = empty_app(None).await;
    let (status, _) = send(&app, Method::GET, "/v0/bookmarks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::PATCH, "/v0/bookmarks/nope", Some(new_bookmark("X", &[]))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_required_for_writes() {
    let (_dir, app) = empty_app(Some("secret")).await;

    let (status, body) = send(&app, Method::POST, "/v0/bookmarks", Some(new_bookmark("A", &[]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["errors"][0]["detail"], "missing token");

    let (status, _) = send(&app, Method::POST, "/v0/bookmarks?token=wrong", Some(new_bookmark("A", &[]))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::POST, "/v0/bookmarks?token=secret", Some(new_bookmark("A", &[]))).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, Method::GET, "/v0/bookmarks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_json_api_content_type() {
    let (_dir, app) = empty_app(None).await;
    let request = Request::builder().uri("/v0/bookmarks").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/vnd.api+json"
    );
}
