// routes/logout.rs
// POST /logout -> clears the session cookie and removes the session entry.

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::routes::login::session_cookie;
use crate::session::SessionUser;
use crate::state::{AppState, delete_session};

pub async fn logout(State(st): State<Arc<AppState>>, session: SessionUser) -> Response {
    let mut response = match delete_session(&st, session.token()).await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "session delete failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "session error" })),
            )
                .into_response()
        }
    };
    // The cookie is cleared either way.
    if let Ok(value) = HeaderValue::from_str(&session_cookie("", 0)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}
