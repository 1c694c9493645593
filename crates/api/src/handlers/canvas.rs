//! Handlers for canvas duplication, export and import.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use refly_services::canvas::{
    self, CanvasExport, DuplicateCanvasRequest, ImportCanvasRequest,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportQuery {
    pub canvas_id: String,
}

/// POST /v1/canvas/duplicate
///
/// Copy a canvas owned by the caller, optionally with private copies of
/// every entity it references.
pub async fn duplicate_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DuplicateCanvasRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let entity = canvas::duplicate_canvas(&state.services, &auth.uid, &body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}

/// GET /v1/canvas/export?canvasId=
pub async fn export_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ExportQuery>,
) -> AppResult<Json<DataResponse<CanvasExport>>> {
    if query.canvas_id.trim().is_empty() {
        return Err(AppError::BadRequest("canvasId is required".into()));
    }
    let export = canvas::export_canvas(&state.services, &auth.uid, &query.canvas_id).await?;
    Ok(Json(DataResponse { data: export }))
}

/// POST /v1/canvas/import
pub async fn import_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ImportCanvasRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let entity = canvas::import_canvas(&state.services, &auth.uid, &body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}
