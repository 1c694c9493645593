pub mod canvas;
pub mod health;
pub mod share;

use axum::Router;

use crate::state::AppState;

/// Build the `/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /canvas
///     /duplicate                 duplicate a canvas (POST)
///     /export?canvasId=          export a canvas (GET)
///     /import                    import an export (POST)
///
/// /share
///     /create                    create or refresh a share (POST)
///     /workflow-app              share a workflow app (POST)
///     /delete                    delete a share and its children (POST)
///     /duplicate                 duplicate a share (POST)
///     /{share_id}                public share content (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/canvas", canvas::router())
        .nest("/share", share::router())
}
