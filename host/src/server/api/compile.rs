use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use texcompile_dispatch::DispatchError;
use texcompile_lib::{validation, Format};
use tracing::warn;

use crate::auth::{is_authorized, AuthContext};
use crate::error::{HostError, HostResult};
use crate::HostState;

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub source_id: String,
    pub checksum: String,
    #[serde(default)]
    pub output_format: Option<Format>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub stamp_label: Option<String>,
    #[serde(default)]
    pub stamp_link: Option<String>,
}

/// URL-safe base64's only character requiring percent-encoding inside a
/// path segment is `=`.
fn encode_checksum_for_path(checksum: &str) -> String {
    checksum.replace('=', "%3D")
}

fn status_location(source_id: &str, checksum: &str, output_format: Format) -> String {
    format!("/{source_id}/{}/{output_format}", encode_checksum_for_path(checksum))
}

/// `POST /`: dispatch a new compilation, or redirect to an existing one.
/// Spec.md §4.6 item 3.
pub async fn handler(
    State(state): State<HostState>,
    Extension(ctx): Extension<AuthContext>,
    Json(request): Json<CompileRequest>,
) -> HostResult<Response> {
    validation::validate_source_id(&request.source_id)
        .map_err(|e| HostError::InvalidRequest(e.to_string()))?;

    let checksum = if state.checksum_verification_enabled {
        validation::validate_checksum(&request.checksum)
            .map_err(|e| HostError::InvalidRequest(e.to_string()))?;
        request.checksum.clone()
    } else {
        validation::coerce_checksum(&request.checksum)
    };
    let output_format = request.output_format.unwrap_or(Format::Pdf);

    if !request.force {
        match state.dispatch.get(&request.source_id, &checksum, output_format).await {
            Ok(task) => {
                return if is_authorized(&ctx, &task) {
                    Ok((
                        StatusCode::SEE_OTHER,
                        [(header::LOCATION, status_location(&request.source_id, &checksum, output_format))],
                    )
                        .into_response())
                } else {
                    Err(HostError::Forbidden)
                };
            }
            Err(DispatchError::NoSuchTask(_)) => {}
            Err(e) => return Err(HostError::TaskCreationFailed(e.to_string())),
        }
    }

    let owner = state
        .source
        .owner(&request.source_id, &checksum, &ctx.token)
        .await
        .unwrap_or_else(|e| {
            warn!("owner lookup failed for {}: {e}", request.source_id);
            None
        });

    let task_id = state
        .dispatch
        .start(
            &request.source_id,
            &checksum,
            request.stamp_label,
            request.stamp_link,
            output_format,
            ctx.token.clone(),
            owner,
        )
        .await
        .map_err(|e| HostError::TaskCreationFailed(e.to_string()))?;

    let _ = task_id;
    Ok((
        StatusCode::ACCEPTED,
        [(header::LOCATION, status_location(&request.source_id, &checksum, output_format))],
    )
        .into_response())
}
