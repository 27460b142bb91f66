//! API routes.

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    delete_video, generate_video, get_hardware, get_job_status, get_performance, get_thumbnail,
    get_video, get_video_file, health, list_videos, local_model_status, model_download_progress,
    start_model_download, supported_models, trending_models, validate_hf_token,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{
    cors_layer, rate_limit_middleware, request_id, request_logging, security_headers,
    RateLimiterCache,
};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let generation_routes = Router::new()
        .route("/generate", post(generate_video))
        .route("/status/:job_id", get(get_job_status))
        .route("/hf-validate", post(validate_hf_token));

    let video_routes = Router::new()
        .route("/videos", get(list_videos))
        .route("/videos/:video_id", get(get_video).delete(delete_video))
        .route("/videos/:video_id/output.mp4", get(get_video_file))
        .route("/videos/:video_id/thumbnail.jpg", get(get_thumbnail));

    let model_routes = Router::new()
        .route("/models/supported", get(supported_models))
        .route("/models/trending", get(trending_models))
        .route("/models/local/status", get(local_model_status))
        .route("/models/local/download", post(start_model_download))
        .route(
            "/models/local/download/:download_id/progress",
            get(model_download_progress),
        );

    let system_routes = Router::new()
        .route("/hardware", get(get_hardware))
        .route("/performance", get(get_performance));

    let rate_limiter = Arc::new(RateLimiterCache::new(state.config.rate_limit_per_minute));

    let api_routes = Router::new()
        .merge(generation_routes)
        .merge(video_routes)
        .merge(model_routes)
        .merge(system_routes)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    Router::new()
        .merge(api_routes)
        .route("/health", get(health))
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors_layer(&state.config.cors_origins()))
        .with_state(state)
}
