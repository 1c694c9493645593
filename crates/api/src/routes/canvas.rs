use axum::routing::{get, post};
use axum::Router;

use crate::handlers::canvas;
use crate::state::AppState;

/// Canvas routes, nested at `/canvas`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/duplicate", post(canvas::duplicate_canvas))
        .route("/export", get(canvas::export_canvas))
        .route("/import", post(canvas::import_canvas))
}
