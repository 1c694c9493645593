use axum::routing::{get, post};
use axum::Router;

use crate::handlers::share;
use crate::state::AppState;

/// Share routes, nested at `/share`. Only `GET /{share_id}` is public.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(share::create_share))
        .route("/workflow-app", post(share::share_workflow_app))
        .route("/delete", post(share::delete_share))
        .route("/duplicate", post(share::duplicate_share))
        .route("/{share_id}", get(share::get_share))
}
