use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Query, State},
};
use tracing::info;

use crate::AppState;
use crate::api::error::AppError;
use crate::api::middleware::request_id::RequestId;
use crate::models::{ArchiveRequest, ConvertParams, ConvertResponse};

#[utoipa::path(
    get,
    path = "/api/convert",
    params(ConvertParams),
    responses(
        (status = 200, description = "RAR converted and ZIP uploaded", body = ConvertResponse),
        (status = 400, description = "Missing or invalid file_url"),
        (status = 500, description = "Download, conversion or upload failed")
    ),
    tag = "convert"
)]
pub async fn convert_from_query(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<ConvertParams>,
) -> Result<Json<ConvertResponse>, AppError> {
    run(&state, &request_id, params.file_url).await
}

/// The query string wins over the JSON body when both carry `file_url`.
#[utoipa::path(
    post,
    path = "/api/convert",
    params(ConvertParams),
    request_body(content = ConvertParams, description = "Optional when file_url is in the query"),
    responses(
        (status = 200, description = "RAR converted and ZIP uploaded", body = ConvertResponse),
        (status = 400, description = "Missing or invalid file_url"),
        (status = 500, description = "Download, conversion or upload failed")
    ),
    tag = "convert"
)]
pub async fn convert_from_body(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<ConvertParams>,
    body: Bytes,
) -> Result<Json<ConvertResponse>, AppError> {
    let from_query = params.file_url.filter(|v| !v.trim().is_empty());

    let file_url = match from_query {
        Some(url) => Some(url),
        None if body.is_empty() => None,
        None => {
            serde_json::from_slice::<ConvertParams>(&body)
                .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))?
                .file_url
        }
    };

    run(&state, &request_id, file_url).await
}

async fn run(
    state: &AppState,
    request_id: &RequestId,
    file_url: Option<String>,
) -> Result<Json<ConvertResponse>, AppError> {
    let request = ArchiveRequest::parse(file_url.as_deref())?;

    info!(
        request_id = %request_id.0,
        file_url = %request.remote_file_identifier(),
        "🔄 Converting '{}' -> '{}'",
        request.rar_name(),
        request.zip_name()
    );

    let outcome = state.conversion_service.process(&request).await?;

    Ok(Json(ConvertResponse {
        message: format!(
            "RAR converted to ZIP successfully! File: {}",
            outcome.file_name
        ),
        file_name: outcome.file_name,
        files: outcome.summary.files,
        bytes: outcome.summary.bytes,
        downloaded_bytes: outcome.downloaded_bytes,
    }))
}
