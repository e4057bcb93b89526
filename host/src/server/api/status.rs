use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::HostState;

#[derive(Serialize)]
struct ServiceStatus {
    store: bool,
    compiler: bool,
    filemanager: bool,
}

/// `GET /status`: three parallel reachability probes (object store,
/// converter runtime, upstream source service), grounded on
/// `filemanager.py::get_service_status` and `compiler.py::is_available`.
/// Responds `503` if any dependency reports down.
pub async fn handler(State(state): State<HostState>) -> Response {
    let (store, compiler, filemanager) = tokio::join!(
        state.store.is_available(),
        state.runner.is_available(),
        state.source.is_available(),
    );

    let body = ServiceStatus { store, compiler, filemanager };
    let status = if store && compiler && filemanager {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}
