use axum::body::Body;
use axum::http::header;
use axum::response::Response;
use prometheus::{Encoder, TextEncoder};

/// `GET /metrics`: Prometheus exposition format, grounded on
/// `raiko-host::server::api::metrics::handler`.
pub async fn handler() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    Response::builder()
        .header(header::CONTENT_TYPE, encoder.format_type())
        .body(Body::from(buffer))
        .unwrap()
}
