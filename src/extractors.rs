use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::model::Principal;
use crate::state::AppState;

/// The signed-in session bound to this request's cookie.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub token: String,
    pub principal: Principal,
}

/// Extractor that requires a live session.
/// Returns 401 if the cookie is missing, unknown or expired.
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let sessions = state.sessions.lock().await;
        let session = sessions.get(&token).ok_or(AppError::Unauthorized)?;
        let principal = session.principal().clone();

        Ok(CurrentSession { token, principal })
    }
}

/// Optional session extractor; returns None instead of 401 for anonymous viewers.
pub struct MaybeSession(pub Option<CurrentSession>);

impl FromRequestParts<AppState> for MaybeSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentSession::from_request_parts(parts, state).await {
            Ok(session) => Ok(MaybeSession(Some(session))),
            Err(_) => Ok(MaybeSession(None)),
        }
    }
}

pub fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}
