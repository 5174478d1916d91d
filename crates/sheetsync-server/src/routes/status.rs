use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sheetsync_core::status::StatusSnapshot;

use crate::state::AppState;

/// GET /status: startup phase plus per-collection watch state and counters.
///
/// `503` once startup has failed, `200` otherwise.
pub async fn get_status(State(app): State<AppState>) -> (StatusCode, Json<StatusSnapshot>) {
    let snapshot = app.status.snapshot();
    let code = if app.status.is_failed() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(snapshot))
}
