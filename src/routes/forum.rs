use askama::Template;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentSession, MaybeSession};
use crate::model::{Post, PostId, Principal, UserProfile};
use crate::remote::RemoteService;
use crate::routes::Html;
use crate::session::Session;
use crate::state::AppState;
use crate::view::derive::{can_edit, responses_label, time_ago};
use crate::view::{self, Command, Timestamp, ViewModelStore};

// -- Templates --

#[derive(Template)]
#[template(path = "pages/forum.html")]
pub struct ForumTemplate {
    pub signed_in: bool,
    pub user_name: String,
    pub user_role: String,
    pub specializations: Vec<String>,
    pub total: usize,
    pub answered: usize,
    pub pending: usize,
    pub profile: Option<ProfilePanel>,
    pub search_term: String,
    pub compose: Option<ComposeForm>,
    pub posts: Vec<PostCard>,
}

pub struct ProfilePanel {
    pub principal: String,
    pub username: String,
    pub role: String,
    pub joined: String,
    pub specializations: Vec<SpecializationLine>,
}

pub struct SpecializationLine {
    pub area: String,
    pub license_number: String,
}

pub struct ComposeForm {
    pub title: String,
    pub description: String,
}

pub struct PostCard {
    pub id: PostId,
    pub title: String,
    pub description: String,
    pub unanswered: bool,
    pub time_ago: String,
    pub responses_label: String,
    pub can_edit: bool,
    pub editing: bool,
    pub responses: Vec<ResponseLine>,
    pub response_draft: String,
}

pub struct ResponseLine {
    pub responder: String,
    pub content: String,
    pub time_ago: String,
}

impl ForumTemplate {
    /// Render state for one page view. `session` is `None` for anonymous viewers.
    pub fn build(session: Option<&Session>, view: &ViewModelStore, now_millis: i64) -> Self {
        let viewer = session.map(|s| s.principal());
        let profile = session.map(|s| &s.profile);

        let posts = view
            .filtered_posts()
            .into_iter()
            .map(|post| PostCard::build(post, view, session.is_some(), viewer, now_millis))
            .collect();

        let (draft_title, draft_description) = view.draft();
        let compose = (session.is_some() && view.is_compose_open()).then(|| ComposeForm {
            title: draft_title.to_string(),
            description: draft_description.to_string(),
        });

        Self {
            signed_in: session.is_some(),
            user_name: profile
                .map(|p| p.username.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "User".to_string()),
            user_role: profile
                .map(|p| p.role.to_string())
                .unwrap_or_else(|| "User".to_string()),
            specializations: profile
                .map(|p| p.specialization.iter().map(|s| s.area.clone()).collect())
                .unwrap_or_default(),
            total: view.posts().len(),
            answered: view.answered_count(),
            pending: view.unanswered_count(),
            profile: session
                .and(view.profile_lookup.as_ref())
                .map(|p| ProfilePanel::build(p, now_millis)),
            search_term: view.search_term.clone(),
            compose,
            posts,
        }
    }
}

impl ProfilePanel {
    fn build(profile: &UserProfile, now_millis: i64) -> Self {
        Self {
            principal: profile.id.to_string(),
            username: profile.username.clone(),
            role: profile.role.to_string(),
            joined: time_ago(Timestamp::Nanos(profile.joined_at), now_millis),
            specializations: profile
                .specialization
                .iter()
                .map(|s| SpecializationLine {
                    area: s.area.clone(),
                    license_number: s.license_number.clone(),
                })
                .collect(),
        }
    }
}

impl PostCard {
    fn build(
        post: &Post,
        view: &ViewModelStore,
        signed_in: bool,
        viewer: Option<&Principal>,
        now_millis: i64,
    ) -> Self {
        let can_edit = signed_in && can_edit(viewer, post);
        Self {
            id: post.id,
            title: post.title.clone(),
            description: post.description.clone(),
            unanswered: !post.is_answered(),
            time_ago: time_ago(Timestamp::Nanos(post.created_at), now_millis),
            responses_label: responses_label(post.responses.len()),
            can_edit,
            editing: can_edit && view.is_editing(post.id),
            responses: post
                .responses
                .iter()
                .map(|r| ResponseLine {
                    responder: r.responder.to_string(),
                    content: r.content.clone(),
                    time_ago: time_ago(Timestamp::Nanos(r.created_at), now_millis),
                })
                .collect(),
            response_draft: view.response_draft_for(post.id).to_string(),
        }
    }
}

// -- Request types --

#[derive(Deserialize)]
pub struct ForumQuery {
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct ResponseForm {
    #[serde(default)]
    pub content: String,
}

// -- Session helpers --

/// Run `f` against the live session for `token`. The lock is released on return,
/// so callers never hold it across a backend call.
async fn with_session<R>(
    state: &AppState,
    token: &str,
    f: impl FnOnce(&mut Session) -> R,
) -> AppResult<R> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions.get_mut(token).ok_or(AppError::Unauthorized)?;
    Ok(f(session))
}

async fn session_proxy(state: &AppState, token: &str) -> AppResult<Arc<dyn RemoteService>> {
    with_session(state, token, |s| s.proxy.clone()).await
}

/// Issue `command`, then replace the session's post list with a fresh fetch.
/// Returns whether the command went through; failures are logged only.
async fn run_command(state: &AppState, token: &str, command: Command) -> AppResult<bool> {
    let proxy = session_proxy(state, token).await?;
    match view::execute(proxy.as_ref(), &command).await {
        Ok(posts) => {
            with_session(state, token, |s| s.view.replace_posts(posts)).await?;
            Ok(true)
        }
        Err(e) => {
            tracing::warn!("{} failed: {}", command.name(), e);
            Ok(false)
        }
    }
}

fn back_to_forum() -> Response {
    Redirect::to("/").into_response()
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// -- Handlers --

/// GET /: the forum page; re-fetches the post list on every load
pub async fn index(
    State(state): State<AppState>,
    maybe_session: MaybeSession,
    Query(query): Query<ForumQuery>,
) -> AppResult<Response> {
    let page = match maybe_session.0 {
        Some(current) => {
            let proxy = with_session(&state, &current.token, |s| {
                if let Some(q) = query.q {
                    s.view.search_term = q;
                }
                s.proxy.clone()
            })
            .await?;

            let fetched = proxy.fetch_all_posts().await;

            let mut sessions = state.sessions.lock().await;
            let session = sessions
                .get_mut(&current.token)
                .ok_or(AppError::Unauthorized)?;
            match fetched {
                Ok(posts) => session.view.replace_posts(posts),
                Err(e) => tracing::warn!("getAllPosts failed: {}", e),
            }
            let session: &Session = session;
            ForumTemplate::build(Some(session), &session.view, now_millis())
        }
        None => {
            let proxy = state.connector.connect(None);
            let mut view = ViewModelStore::new();
            view.search_term = query.q.unwrap_or_default();
            match proxy.fetch_all_posts().await {
                Ok(posts) => view.replace_posts(posts),
                Err(e) => tracing::warn!("getAllPosts failed: {}", e),
            }
            ForumTemplate::build(None, &view, now_millis())
        }
    };

    Ok(Html(page).into_response())
}

/// POST /compose/open
pub async fn open_compose(
    State(state): State<AppState>,
    current: CurrentSession,
) -> AppResult<Response> {
    with_session(&state, &current.token, |s| s.view.open_compose()).await?;
    Ok(back_to_forum())
}

/// POST /compose/cancel
pub async fn cancel_compose(
    State(state): State<AppState>,
    current: CurrentSession,
) -> AppResult<Response> {
    with_session(&state, &current.token, |s| s.view.close_compose()).await?;
    Ok(back_to_forum())
}

/// POST /posts: create a question
pub async fn create_post(
    State(state): State<AppState>,
    current: CurrentSession,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    let ready = with_session(&state, &current.token, |s| {
        s.view.set_draft(&form.title, &form.description);
        s.view.can_create()
    })
    .await?;
    if !ready {
        return Ok(back_to_forum());
    }

    let command = Command::Create {
        title: form.title,
        description: form.description,
        creator: current.principal.clone(),
    };
    if run_command(&state, &current.token, command).await? {
        with_session(&state, &current.token, |s| s.view.reset_compose()).await?;
    }
    Ok(back_to_forum())
}

/// POST /posts/{id}/edit: show the edit form
pub async fn begin_edit(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    with_session(&state, &current.token, |s| s.view.begin_edit(id)).await?;
    Ok(back_to_forum())
}

/// POST /posts/{id}/edit/cancel
pub async fn cancel_edit(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    with_session(&state, &current.token, |s| s.view.end_edit(id)).await?;
    Ok(back_to_forum())
}

/// POST /posts/{id}/update: save an edit; the form closes whatever the outcome
pub async fn update_post(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<PostId>,
    Form(form): Form<PostForm>,
) -> AppResult<Response> {
    with_session(&state, &current.token, |s| s.view.end_edit(id)).await?;
    run_command(
        &state,
        &current.token,
        Command::update(id, &form.title, &form.description),
    )
    .await?;
    Ok(back_to_forum())
}

/// POST /posts/{id}/delete
pub async fn delete_post(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<PostId>,
) -> AppResult<Response> {
    run_command(&state, &current.token, Command::Delete { id }).await?;
    Ok(back_to_forum())
}

/// POST /posts/{id}/responses: answer a question
pub async fn add_response(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<PostId>,
    Form(form): Form<ResponseForm>,
) -> AppResult<Response> {
    let ready = with_session(&state, &current.token, |s| {
        s.view.select_for_response(id, &form.content);
        s.view.can_submit_response(id)
    })
    .await?;
    if !ready {
        return Ok(back_to_forum());
    }

    let command = Command::Respond {
        post_id: id,
        responder: current.principal.clone(),
        content: form.content,
    };
    if run_command(&state, &current.token, command).await? {
        with_session(&state, &current.token, |s| s.view.clear_response()).await?;
    }
    Ok(back_to_forum())
}

/// POST /profile: look up the viewer's stored profile
pub async fn show_profile(
    State(state): State<AppState>,
    current: CurrentSession,
) -> AppResult<Response> {
    let proxy = session_proxy(&state, &current.token).await?;
    match proxy.fetch_user(&current.principal).await {
        Ok(profile) => {
            with_session(&state, &current.token, |s| s.view.profile_lookup = profile).await?;
        }
        Err(e) => tracing::warn!("getUser failed: {}", e),
    }
    Ok(back_to_forum())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/compose/open", post(open_compose))
        .route("/compose/cancel", post(cancel_compose))
        .route("/posts", post(create_post))
        .route("/posts/{id}/edit", post(begin_edit))
        .route("/posts/{id}/edit/cancel", post(cancel_edit))
        .route("/posts/{id}/update", post(update_post))
        .route("/posts/{id}/delete", post(delete_post))
        .route("/posts/{id}/responses", post(add_response))
        .route("/profile", post(show_profile))
}
