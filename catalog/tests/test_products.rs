use assert_json_diff::{assert_json_eq, assert_json_include};
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::json;

mod common;
use common::TestApp;

#[tokio::test]
async fn test_product_lifecycle() {
    let app = TestApp::new();

    // Create
    let created = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": 9.99, "stock_quantity": 10})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let created = created.json();
    let id = created["id"].as_i64().unwrap();
    assert_json_eq!(
        created,
        json!({
            "id": id,
            "name": "Mug",
            "description": null,
            "price": 9.99,
            "category": null,
            "image_url": null,
            "stock_quantity": 10
        })
    );

    // The new product shows up in the list
    let list = app.request(Method::GET, "/products", None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_json_include!(actual: list.json(), expected: json!([{"id": id, "name": "Mug"}]));

    // Update
    let updated = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({"name": "Mug", "price": 12.5, "stock_quantity": 10})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_json_include!(actual: updated.json(), expected: json!({"id": id, "price": 12.5}));

    let fetched = app
        .request(Method::GET, &format!("/products/{id}"), None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_json_include!(actual: fetched.json(), expected: json!({"price": 12.5}));

    // Delete
    let deleted = app
        .request(Method::DELETE, &format!("/products/{id}"), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_json_include!(
        actual: deleted.json(),
        expected: json!({
            "message": "Product deleted successfully.",
            "deletedProduct": {"id": id, "name": "Mug", "price": 12.5}
        })
    );

    let gone = app
        .request(Method::GET, &format!("/products/{id}"), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_json_eq!(gone.json(), json!({"error": "Product not found."}));

    let list = app.request(Method::GET, "/products", None).await;
    assert_json_eq!(list.json(), json!([]));
}

#[tokio::test]
async fn test_list_is_ordered_by_id() {
    let app = TestApp::new();
    for name in ["First", "Second", "Third"] {
        let response = app
            .request(
                Method::POST,
                "/products",
                Some(json!({"name": name, "price": 1, "stock_quantity": 1})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let list = app.request(Method::GET, "/products", None).await.json();
    let names: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["First", "Second", "Third"]);
}

#[tokio::test]
async fn test_health_bypasses_the_catalog() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, "OK");
    assert_eq!(app.store.read_count(), 0);
}

#[tokio::test]
async fn test_liveness_and_readiness() {
    let app = TestApp::new();

    let live = app.request(Method::GET, "/_liveness", None).await;
    assert_eq!(live.status, StatusCode::OK);

    let ready = app.request(Method::GET, "/_readiness", None).await;
    assert_eq!(ready.status, StatusCode::OK);

    app.store.set_unavailable(true);
    let not_ready = app.request(Method::GET, "/_readiness", None).await;
    assert_eq!(not_ready.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(not_ready.body, "not ready");
}

#[tokio::test]
async fn test_missing_required_fields_is_a_validation_error() {
    let app = TestApp::new();

    let response = app
        .request(Method::POST, "/products", Some(json!({"name": "Mug"})))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_json_eq!(
        response.json(),
        json!({"error": "Name, price, and stock_quantity are required fields."})
    );
    assert_eq!(app.store.write_count(), 0);
}

#[tokio::test]
async fn test_negative_price_is_a_validation_error() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": -1, "stock_quantity": 1})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/products")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"name\": \"Mug\", "))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_wrong_field_type_is_a_validation_error() {
    let app = TestApp::new();

    let response = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": "cheap", "stock_quantity": 1})),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_requires_the_full_field_set() {
    let app = TestApp::new();
    let created = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": 9.99, "stock_quantity": 10, "category": "kitchen"})),
        )
        .await
        .json();
    let id = created["id"].as_i64().unwrap();

    let partial = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({"price": 12.5})),
        )
        .await;
    assert_eq!(partial.status, StatusCode::BAD_REQUEST);

    // Omitted optional fields are cleared.
    let replaced = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({"name": "Mug", "price": 12.5, "stock_quantity": 3})),
        )
        .await;
    assert_eq!(replaced.status, StatusCode::OK);
    assert_json_include!(
        actual: replaced.json(),
        expected: json!({"category": null, "stock_quantity": 3})
    );
}

#[tokio::test]
async fn test_unknown_and_non_integer_ids_are_not_found() {
    let app = TestApp::new();

    for uri in ["/products/999", "/products/abc"] {
        let get = app.request(Method::GET, uri, None).await;
        assert_eq!(get.status, StatusCode::NOT_FOUND);

        let delete = app.request(Method::DELETE, uri, None).await;
        assert_eq!(delete.status, StatusCode::NOT_FOUND);

        let put = app
            .request(
                Method::PUT,
                uri,
                Some(json!({"name": "Mug", "price": 1, "stock_quantity": 1})),
            )
            .await;
        assert_eq!(put.status, StatusCode::NOT_FOUND);
    }

    assert!(app.redis.calls_for("del").is_empty());
}

#[tokio::test]
async fn test_store_outage_is_service_unavailable() {
    let app = TestApp::new();
    app.store.set_unavailable(true);

    let response = app.request(Method::GET, "/products", None).await;

    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.json()["error"].is_string());
}

#[tokio::test]
async fn test_secure_headers_are_set() {
    let app = TestApp::new();

    let response = app.request(Method::GET, "/health", None).await;

    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(response.headers["referrer-policy"], "no-referrer");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/products")
        .header("Origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers["access-control-allow-origin"], "*");
}
