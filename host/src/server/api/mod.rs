mod compile;
mod get_log;
mod get_product;
mod get_status;
mod metrics;
mod status;

use axum::http::{header, HeaderName, Method, StatusCode, Uri};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{self, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::{auth::extract_auth, HostState};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// The five spec-mandated operations plus the ambient-stack `/metrics`
/// route, grounded on `raiko-host::server::api::create_router`'s layer
/// stack (CORS, compression, request tracing) minus its OpenAPI-doc
/// mounting, which this crate's five-endpoint surface doesn't need, and
/// minus its forced `Content-Type: application/json` response header:
/// unlike raiko's all-JSON proof responses, `get_product`/`get_log` stream
/// non-JSON content and must set their own `Content-Type`. Request-id
/// generation is grounded on `raiko-host::server::logging`'s
/// `Uuid::new_v4`-per-request correlation id, expressed here as
/// `tower_http`'s `MakeRequestUuid` rather than bespoke middleware.
pub fn create_router(concurrency_limit: usize) -> Router<HostState> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(cors::Any);

    let middleware = ServiceBuilder::new()
        .layer(cors)
        .layer(CompressionLayer::new())
        .concurrency_limit(concurrency_limit);

    Router::new()
        .route("/", post(compile::handler))
        .route("/status", get(status::handler))
        .route("/metrics", get(metrics::handler))
        .route("/:src/:chk/:fmt", get(get_status::handler))
        .route("/:src/:chk/:fmt/product", get(get_product::handler))
        .route("/:src/:chk/:fmt/log", get(get_log::handler))
        .layer(middleware)
        .layer(middleware::from_fn(extract_auth))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
        .fallback(|uri: Uri| async move { (StatusCode::NOT_FOUND, format!("no handler for {uri}")) })
}
