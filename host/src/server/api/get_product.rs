use std::str::FromStr;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Extension;
use texcompile_lib::{validation, Format};
use texcompile_store::StoreError;

use crate::auth::{require_authorized, AuthContext};
use crate::error::{HostError, HostResult};
use crate::HostState;

/// `GET /{src}/{chk}/{fmt}/product`: the compiled artifact. Spec.md §4.6 item 4, §6.
pub async fn handler(
    State(state): State<HostState>,
    Extension(ctx): Extension<AuthContext>,
    Path((source_id, checksum, output_format)): Path<(String, String, String)>,
) -> HostResult<Response> {
    validation::validate_source_id(&source_id).map_err(|e| HostError::InvalidRequest(e.to_string()))?;
    let checksum = if state.checksum_verification_enabled {
        validation::validate_checksum(&checksum).map_err(|e| HostError::InvalidRequest(e.to_string()))?;
        checksum
    } else {
        validation::coerce_checksum(&checksum)
    };
    let output_format = Format::from_str(&output_format).map_err(|e| HostError::InvalidRequest(e.to_string()))?;

    let task = match state.store.get_status(&source_id, &checksum, output_format).await {
        Ok(task) => task,
        Err(StoreError::DoesNotExist(_)) => return Err(HostError::NotFound),
        Err(e) => return Err(HostError::Internal(e.into())),
    };
    require_authorized(&ctx, &task)?;

    let product = match state.store.retrieve(&source_id, &checksum, output_format).await {
        Ok(product) => product,
        Err(StoreError::DoesNotExist(_)) => return Err(HostError::NotFound),
        Err(e) => return Err(HostError::Internal(e.into())),
    };

    let filename = format!("{source_id}.{}", output_format.ext());
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, output_format.content_type())
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\""));
    if let Some(etag) = &product.etag {
        builder = builder.header(header::ETAG, etag);
    }
    Ok(builder.body(Body::from(product.stream)).unwrap())
}
