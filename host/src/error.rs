use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

/// The standardized error returned by every handler. Grounded on
/// `raiko-host::interfaces::error::HostError`, adapted to the simpler
/// `{"reason": "<message>"}` error body this API uses.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("forbidden")]
    Forbidden,

    #[error("no such task")]
    NotFound,

    #[error("existing task in progress")]
    SeeOther(String),

    #[error("could not create task: {0}")]
    TaskCreationFailed(String),

    #[error("a dependency is unavailable")]
    ServiceUnavailable,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    reason: String,
}

impl IntoResponse for HostError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            HostError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HostError::Forbidden => StatusCode::FORBIDDEN,
            HostError::NotFound => StatusCode::NOT_FOUND,
            HostError::SeeOther(_) => StatusCode::SEE_OTHER,
            HostError::TaskCreationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            HostError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            HostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if let HostError::SeeOther(location) = &self {
            return axum::response::Response::builder()
                .status(StatusCode::SEE_OTHER)
                .header(axum::http::header::LOCATION, location)
                .body(axum::body::Body::empty())
                .unwrap();
        }

        (status, Json(ErrorBody { reason: self.to_string() })).into_response()
    }
}

pub type HostResult<T> = Result<T, HostError>;
