use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, AppResult};
use crate::extractors::MaybeSession;
use crate::session::Session;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginQuery {
    /// Passed to the identity provider as a login hint.
    #[serde(rename = "as")]
    pub login_as: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub credential: Option<String>,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

/// GET /auth/login: hand the browser to the identity provider
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    let callback = Url::parse(&format!("{}/auth/callback", state.config.public_url()))
        .map_err(|e| AppError::Internal(format!("bad public URL: {}", e)))?;
    let target = state
        .identity
        .login_url(&callback, query.login_as.as_deref())?;

    Ok(Redirect::to(target.as_str()).into_response())
}

/// GET /auth/callback: resolve the credential and start a session
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> AppResult<Response> {
    let credential = query
        .credential
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing credential".into()))?;

    let identity = state.identity.resolve(&credential).await?;
    let session = Session::establish(
        identity,
        state.connector.as_ref(),
        state.config.session_ttl(),
    )
    .await;

    let token = state.sessions.lock().await.insert(session);
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response())
}

/// POST /auth/logout: tear down the session and reload
pub async fn logout(State(state): State<AppState>, maybe_session: MaybeSession) -> Response {
    if let Some(current) = maybe_session.0 {
        state.sessions.lock().await.remove(&current.token);
        tracing::info!("Session ended for {}", current.principal);
    }

    (
        AppendHeaders([(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )]),
        Redirect::to("/"),
    )
        .into_response()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/logout", post(logout))
}
