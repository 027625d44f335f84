#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use catalog::{
    cache::CachePolicy, config::DEFAULT_TEST_CONFIG, products::catalog_service::CatalogService,
    router::router, test_utils::MemoryProductStore,
};
use common_redis::MockRedisClient;

pub struct TestApp {
    pub router: Router,
    pub store: MemoryProductStore,
    pub redis: MockRedisClient,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_parts(MemoryProductStore::new(), MockRedisClient::new())
    }

    pub fn with_parts(store: MemoryProductStore, redis: MockRedisClient) -> Self {
        let catalog = Arc::new(CatalogService::new(
            Arc::new(store.clone()),
            Arc::new(redis.clone()),
            CachePolicy::new(DEFAULT_TEST_CONFIG.cache_ttl_seconds).unwrap(),
        ));

        Self {
            router: router(catalog, &DEFAULT_TEST_CONFIG),
            store,
            redis,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}
