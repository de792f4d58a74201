// session.rs
// Session middleware guarding authenticated routes and the extractor exposing the caller.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::COOKIE, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;

use crate::error::ApiError;
use crate::models::{Identity, UserRole};
use crate::state::{AppState, find_user_by_session};

pub const SESSION_COOKIE_NAME: &str = "session";

#[derive(Clone)]
pub struct SessionData {
    pub identity: Identity,
    pub token: String,
}

pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let tokens = extract_cookies(request.headers(), SESSION_COOKIE_NAME);
    if tokens.is_empty() {
        return Err(ApiError::Unauthorized.into_response());
    }

    // Several cookies may carry the name; the first live one wins.
    for token in tokens {
        match find_user_by_session(&state, &token).await {
            Ok(Some(user)) => {
                let identity = user.identity();
                tracing::debug!(email = %identity.email, role = identity.role.as_str(), "session resolved");
                request
                    .extensions_mut()
                    .insert(SessionData { identity, token });
                return Ok(next.run(request).await);
            }
            Ok(None) => continue,
            Err(err) => return Err(ApiError::Persistence(err).into_response()),
        }
    }
    Err(ApiError::Unauthorized.into_response())
}

pub struct SessionUser(pub SessionData);

impl SessionUser {
    pub fn identity(&self) -> &Identity {
        &self.0.identity
    }

    pub fn token(&self) -> &str {
        &self.0.token
    }

    pub fn role(&self) -> UserRole {
        self.0.identity.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.identity.role.is_admin()
    }
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for SessionUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let data = parts.extensions.get::<SessionData>().cloned();

        Box::pin(async move {
            data.map(SessionUser)
                .ok_or_else(|| ApiError::Unauthorized.into_response())
        })
    }
}

pub(crate) fn extract_cookies(headers: &HeaderMap, name: &str) -> Vec<String> {
    headers
        .get_all(COOKIE)
        .into_iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn collects_every_matching_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; session=abc"));
        headers.append(COOKIE, HeaderValue::from_static("session=def"));
        assert_eq!(extract_cookies(&headers, "session"), vec!["abc", "def"]);
        assert!(extract_cookies(&headers, "missing").is_empty());
    }
}
