use std::{future::ready, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    routing::get,
    Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{
    cors::{AllowHeaders, Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::{
    api::endpoint,
    config::Config,
    metrics::utils::{setup_metrics_recorder, track_metrics},
    products::catalog_service::CatalogService,
};

#[derive(Clone)]
pub struct State {
    pub catalog: Arc<CatalogService>,
}

pub fn router(catalog: Arc<CatalogService>, config: &Config) -> Router {
    let state = State { catalog };

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_origin(Any);

    // health, liveness and readiness checks
    let status_router = Router::new()
        .route("/health", get(health))
        .route("/_readiness", get(readiness))
        .route("/_liveness", get(liveness));

    let products_router = Router::new()
        .route(
            "/products",
            get(endpoint::list_products).post(endpoint::create_product),
        )
        .route(
            "/products/:id",
            get(endpoint::get_product)
                .put(endpoint::update_product)
                .delete(endpoint::delete_product),
        )
        .layer(DefaultBodyLimit::max(config.max_body_size))
        .layer(ConcurrencyLimitLayer::new(config.max_concurrency));

    let router = Router::new()
        .merge(status_router)
        .merge(products_router)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Global metrics recorders can play poorly with tests, so only install
    // one when asked to.
    if config.enable_metrics {
        match setup_metrics_recorder() {
            Ok(recorder_handle) => {
                router.route("/metrics", get(move || ready(recorder_handle.render())))
            }
            Err(e) => {
                tracing::error!("Failed to install metrics recorder: {}", e);
                router
            }
        }
    } else {
        router
    }
}

pub async fn health() -> &'static str {
    "OK"
}

pub async fn liveness() -> &'static str {
    "alive"
}

pub async fn readiness(
    axum::extract::State(state): axum::extract::State<State>,
) -> Result<&'static str, (StatusCode, &'static str)> {
    state.catalog.ready().await.map_err(|e| {
        tracing::warn!(error = %e, "Readiness check failed");
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    })?;

    Ok("ready")
}
