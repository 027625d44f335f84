use assert_json_diff::assert_json_include;
use axum::http::{Method, StatusCode};
use common_redis::MockRedisClient;
use serde_json::json;

use catalog::cache::{product_cache_key, PRODUCTS_LIST_CACHE_KEY};
use catalog::test_utils::{payload, MemoryProductStore};

mod common;
use common::TestApp;

#[tokio::test]
async fn test_every_operation_works_with_the_cache_down() {
    let app = TestApp::new();
    app.redis.set_unavailable(true);

    let created = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": 9.99, "stock_quantity": 10})),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.json()["id"].as_i64().unwrap();

    let list = app.request(Method::GET, "/products", None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_json_include!(actual: list.json(), expected: json!([{"id": id}]));

    let fetched = app
        .request(Method::GET, &format!("/products/{id}"), None)
        .await;
    assert_eq!(fetched.status, StatusCode::OK);

    let updated = app
        .request(
            Method::PUT,
            &format!("/products/{id}"),
            Some(json!({"name": "Mug", "price": 12.5, "stock_quantity": 10})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let deleted = app
        .request(Method::DELETE, &format!("/products/{id}"), None)
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    // Reads still try the cache, but nothing is written or invalidated.
    assert!(app.redis.calls_for("del").is_empty());
    assert!(app.redis.calls_for("setex").is_empty());
}

#[tokio::test]
async fn test_recovers_once_the_cache_is_back() {
    let store = MemoryProductStore::new();
    let product = store.seed(payload("Mug", "9.99", 10));
    let app = TestApp::with_parts(store, MockRedisClient::new());
    let uri = format!("/products/{}", product.id);

    app.redis.set_unavailable(true);
    assert_eq!(app.request(Method::GET, &uri, None).await.status, StatusCode::OK);
    assert!(app.redis.entry(&product_cache_key(product.id)).is_none());

    app.redis.set_unavailable(false);
    assert_eq!(app.request(Method::GET, &uri, None).await.status, StatusCode::OK);
    assert!(app.redis.entry(&product_cache_key(product.id)).is_some());

    // Now served from the cache.
    assert_eq!(app.request(Method::GET, &uri, None).await.status, StatusCode::OK);
    assert_eq!(app.store.read_count(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_cached() {
    let app = TestApp::new();

    for _ in 0..2 {
        let response = app.request(Method::GET, "/products/12345", None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    assert_eq!(app.store.read_count(), 2);
    assert!(app.redis.entry(&product_cache_key(12345)).is_none());
}

#[tokio::test]
async fn test_corrupt_entry_is_treated_as_a_miss() {
    let store = MemoryProductStore::new();
    let product = store.seed(payload("Mug", "9.99", 10));
    let redis =
        MockRedisClient::new().with_entry(&product_cache_key(product.id), "{\"id\": oops", 3600);
    let app = TestApp::with_parts(store, redis);

    let response = app
        .request(Method::GET, &format!("/products/{}", product.id), None)
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_json_include!(actual: response.json(), expected: json!({"name": "Mug", "price": 9.99}));

    let (stored, ttl) = app.redis.entry(&product_cache_key(product.id)).unwrap();
    assert_eq!(ttl, 3600);
    assert_json_include!(
        actual: serde_json::from_str::<serde_json::Value>(&stored).unwrap(),
        expected: json!({"id": product.id})
    );
}

#[tokio::test]
async fn test_stale_snapshots_are_never_served_after_writes() {
    let app = TestApp::new();
    let id = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": 9.99, "stock_quantity": 10})),
        )
        .await
        .json()["id"]
        .as_i64()
        .unwrap();

    // Warm both keys.
    app.request(Method::GET, "/products", None).await;
    app.request(Method::GET, &format!("/products/{id}"), None)
        .await;
    assert!(app.redis.entry(PRODUCTS_LIST_CACHE_KEY).is_some());

    app.request(
        Method::PUT,
        &format!("/products/{id}"),
        Some(json!({"name": "Mug", "price": 12.5, "stock_quantity": 10})),
    )
    .await;

    assert!(app.redis.entry(PRODUCTS_LIST_CACHE_KEY).is_none());
    assert!(app.redis.entry(&product_cache_key(id)).is_none());

    let list = app.request(Method::GET, "/products", None).await;
    assert_json_include!(actual: list.json(), expected: json!([{"price": 12.5}]));

    app.request(Method::DELETE, &format!("/products/{id}"), None)
        .await;
    let gone = app
        .request(Method::GET, &format!("/products/{id}"), None)
        .await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_invalidation_does_not_fail_the_write() {
    let mut redis = MockRedisClient::new();
    redis.del_ret(
        PRODUCTS_LIST_CACHE_KEY,
        Err(common_redis::CustomRedisError::Timeout),
    );
    let app = TestApp::with_parts(MemoryProductStore::new(), redis);

    let response = app
        .request(
            Method::POST,
            "/products",
            Some(json!({"name": "Mug", "price": 9.99, "stock_quantity": 10})),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(app.redis.calls_for("del").len(), 1);
}

#[tokio::test]
async fn test_writes_invalidate_after_the_cache_was_flagged_not_ready() {
    let store = MemoryProductStore::new();
    let product = store.seed(payload("Mug", "9.99", 10));
    let app = TestApp::with_parts(store, MockRedisClient::new());
    let uri = format!("/products/{}", product.id);

    app.request(Method::GET, &uri, None).await;
    assert!(app.redis.entry(&product_cache_key(product.id)).is_some());

    // The server still answers, only the readiness hint is stale.
    app.redis.mark_not_ready();

    let updated = app
        .request(
            Method::PUT,
            &uri,
            Some(json!({"name": "Mug", "price": 12.5, "stock_quantity": 10})),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);

    let fetched = app.request(Method::GET, &uri, None).await;
    assert_json_include!(actual: fetched.json(), expected: json!({"price": 12.5}));
}
