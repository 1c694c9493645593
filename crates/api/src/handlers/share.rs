//! Handlers for share creation, lookup, deletion and duplication.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use refly_db::models::share_record::ShareRecord;
use refly_services::share::{
    self, CreateShareRequest, DuplicateShareRequest, ShareView, WorkflowAppShares,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShareWorkflowAppRequest {
    #[validate(length(min = 1))]
    pub app_id: String,
    #[serde(default)]
    pub publish_to_community: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeleteShareRequest {
    #[validate(length(min = 1))]
    pub share_id: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteShareResponse {
    /// Records removed, including child shares.
    pub deleted: u64,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /v1/share/create
///
/// Idempotent: sharing the same entity again returns the existing record
/// with refreshed content.
pub async fn create_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateShareRequest>,
) -> AppResult<Json<DataResponse<ShareRecord>>> {
    body.validate()?;
    let record = share::create_share(&state.services, &auth.uid, &body).await?;
    Ok(Json(DataResponse { data: record }))
}

/// POST /v1/share/workflow-app
pub async fn share_workflow_app(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ShareWorkflowAppRequest>,
) -> AppResult<Json<DataResponse<WorkflowAppShares>>> {
    body.validate()?;
    let shares = share::create_share_for_workflow_app(
        &state.services,
        &auth.uid,
        &body.app_id,
        body.publish_to_community,
    )
    .await?;
    Ok(Json(DataResponse { data: shares }))
}

/// POST /v1/share/delete
pub async fn delete_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DeleteShareRequest>,
) -> AppResult<Json<DataResponse<DeleteShareResponse>>> {
    body.validate()?;
    let deleted = share::delete_share(&state.services, &auth.uid, &body.share_id).await?;
    Ok(Json(DataResponse {
        data: DeleteShareResponse { deleted },
    }))
}

/// POST /v1/share/duplicate
pub async fn duplicate_share(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<DuplicateShareRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;
    let entity = share::duplicate_share(&state.services, &auth.uid, &body).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: entity })))
}

/// GET /v1/share/{share_id}
///
/// Public: anyone holding the share ID can read the content.
pub async fn get_share(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
) -> AppResult<Json<DataResponse<ShareView>>> {
    let view = share::get_share(&state.services, &share_id).await?;
    Ok(Json(DataResponse { data: view }))
}
