// routes/login.rs
// POST /login { "email": "...", "code": "123456" } -> { "ok": true|false }

use axum::{
    extract::{Json, State},
    http::{HeaderValue, StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use crate::session::SESSION_COOKIE_NAME;
use crate::state::{AppState, SESSION_TTL_SECONDS, create_session, find_user};
use crate::totp::verify_code;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub code: String,
}

pub async fn login(State(st): State<Arc<AppState>>, Json(body): Json<LoginRequest>) -> Response {
    let user = match find_user(&st, &body.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "ok": false })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "user lookup failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "db error" })),
            )
                .into_response();
        }
    };

    match verify_code(&user.email, &user.secret, &body.code) {
        Ok(true) => {}
        Ok(false) => {
            tracing::warn!(email = %user.email, "invalid login code");
            return (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "ok": false })),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!(email = %user.email, error = %e, "cannot build TOTP");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    }

    match create_session(&st, &user.email).await {
        Ok(token) => {
            tracing::info!(email = %user.email, role = user.role.as_str(), "login");
            let mut response = (
                StatusCode::OK,
                Json(serde_json::json!({ "ok": true, "role": user.role.as_str() })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&session_cookie(&token, SESSION_TTL_SECONDS)) {
                response.headers_mut().append(SET_COOKIE, value);
            }
            response
        }
        Err(e) => {
            tracing::error!(error = %e, "session create failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "session error" })),
            )
                .into_response()
        }
    }
}

/// `Set-Cookie` value for the session token; `max_age = 0` clears it.
pub(crate) fn session_cookie(token: &str, max_age: u64) -> String {
    format!("{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}")
}
