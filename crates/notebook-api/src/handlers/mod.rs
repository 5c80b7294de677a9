//! HTTP handlers.
//!
//! Every route is a JSON `POST` answering with a `{status, data}` envelope.
//! Failures are reported through `status` with HTTP 200; only a wrong method
//! changes the transport status (405).

use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, MethodRouter},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, warn};
use uuid::Uuid;

use notebook_core::defaults::TOKEN_COOKIE;
use notebook_core::{Error, Note, NoteList, PublishNote, Result, Status, Tag, UpdateNote};

use crate::services::ContentService;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: ContentService,
    /// Lifetime of the session cookie.
    pub token_ttl: Duration,
}

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/note/publish", post_only(publish_note))
        .route("/api/notes", post_only(list_notes))
        .route("/api/note", post_only(get_note))
        .route("/api/note/update", post_only(update_note))
        .route("/api/note/delete", post_only(delete_note))
        .route("/api/tags", post_only(list_tags))
        .route("/api/auth", post_only(authenticate))
        .route("/api/is_auth", post_only(is_authenticated))
        .route("/api/logout", post_only(logout))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .with_state(state)
}

fn post_only<H, T>(handler: H) -> MethodRouter<AppState>
where
    H: axum::handler::Handler<T, AppState>,
    T: 'static,
{
    post(handler).fallback(method_not_allowed)
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(Envelope::<()>::failure(Status::MethodNotAllowed)),
    )
        .into_response()
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Response body shared by every route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: Status,
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: Status::Ok,
            data: Some(data),
        }
    }

    pub fn failure(status: Status) -> Self {
        Self { status, data: None }
    }
}

fn failure_response(status: Status) -> Response {
    Json(Envelope::<()>::failure(status)).into_response()
}

/// Render a service result. `operation` is the status reported when the
/// operation itself fails.
fn respond<T: Serialize>(result: Result<T>, operation: Status) -> Response {
    match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(value) => Json(Envelope::ok(value)).into_response(),
            Err(e) => {
                error!(subsystem = "api", error = %e, "Failed to encode response");
                failure_response(Status::EncodeFailed)
            }
        },
        Err(err) => {
            let status = Status::for_error(&err, operation);
            match &err {
                Error::Database(_) | Error::Cache(_) | Error::Internal(_) | Error::Config(_) => {
                    error!(subsystem = "api", status = status.code(), error = %err, "Request failed")
                }
                _ => warn!(subsystem = "api", status = status.code(), error = %err, "Request rejected"),
            }
            failure_response(status)
        }
    }
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> std::result::Result<T, Response> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(subsystem = "api", error = %e, "Failed to decode request body");
        failure_response(Status::DecodeFailed)
    })
}

// =============================================================================
// SESSION COOKIE
// =============================================================================

/// The `token` cookie, or an empty string.
pub fn session_token(jar: &CookieJar) -> String {
    jar.get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .unwrap_or_default()
}

/// Session cookie carrying `token` for `ttl`.
pub fn session_cookie(token: String, ttl: Duration) -> Cookie<'static> {
    let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(cookie::time::Duration::seconds(max_age))
        .build()
}

/// Cookie that makes the client drop its session token.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    cookie.make_removal();
    cookie
}

/// Reject callers whose cookie does not hold the active session token.
async fn require_auth(state: &AppState, jar: &CookieJar) -> std::result::Result<(), Response> {
    let token = session_token(jar);
    if state.content.is_authenticated(&token).await {
        Ok(())
    } else {
        warn!(subsystem = "api", "Rejected unauthenticated request");
        Err(failure_response(Status::NotAuthenticated))
    }
}

// =============================================================================
// REQUESTS AND RESPONSES
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NotesRequest {
    pub page_no: i64,
    pub tag: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NoteIdRequest {
    pub note_id: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    #[serde(default)]
    pub note_id: i64,
    #[serde(flatten)]
    pub note: UpdateNote,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteIdResponse {
    pub note_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NoteResponse {
    pub note: Note,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagsResponse {
    pub tags: Vec<Tag>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IsAuthResponse {
    pub is_auth: bool,
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn publish_note(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    if let Err(rejection) = require_auth(&state, &jar).await {
        return rejection;
    }
    let req: PublishNote = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let result = state
        .content
        .publish(req)
        .await
        .map(|note_id| NoteIdResponse { note_id });
    respond(result, Status::PublishNoteFailed)
}

async fn list_notes(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    let req: NotesRequest = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let token = session_token(&jar);
    let result: Result<NoteList> = state.content.list(req.page_no, req.tag, &token).await;
    respond(result, Status::ListNotesFailed)
}

async fn get_note(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    let req: NoteIdRequest = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let token = session_token(&jar);
    let result = state
        .content
        .get(req.note_id, &token)
        .await
        .map(|note| NoteResponse { note });
    respond(result, Status::GetNoteFailed)
}

async fn update_note(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    if let Err(rejection) = require_auth(&state, &jar).await {
        return rejection;
    }
    let req: UpdateNoteRequest = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let note_id = req.note_id;
    let result = state
        .content
        .update(note_id, req.note)
        .await
        .map(|()| NoteIdResponse { note_id });
    respond(result, Status::UpdateNoteFailed)
}

async fn delete_note(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    if let Err(rejection) = require_auth(&state, &jar).await {
        return rejection;
    }
    let req: NoteIdRequest = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    let note_id = req.note_id;
    let result = state
        .content
        .delete(note_id)
        .await
        .map(|()| NoteIdResponse { note_id });
    respond(result, Status::DeleteNoteFailed)
}

async fn list_tags(State(state): State<AppState>) -> Response {
    let result = state.content.tags().await.map(|tags| TagsResponse { tags });
    respond(result, Status::ListTagsFailed)
}

async fn authenticate(State(state): State<AppState>, jar: CookieJar, body: Bytes) -> Response {
    let req: AuthRequest = match decode(&body) {
        Ok(req) => req,
        Err(rejection) => return rejection,
    };
    match state.content.authenticate(&req.password).await {
        Ok(token) => {
            let jar = jar.add(session_cookie(token.clone(), state.token_ttl));
            (jar, respond(Ok(AuthResponse { token }), Status::AuthFailed)).into_response()
        }
        Err(err) => respond::<AuthResponse>(Err(err), Status::AuthFailed),
    }
}

async fn is_authenticated(State(state): State<AppState>, jar: CookieJar) -> Response {
    let token = session_token(&jar);
    let is_auth = state.content.is_authenticated(&token).await;
    respond(Ok(IsAuthResponse { is_auth }), Status::Default)
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    if let Err(rejection) = require_auth(&state, &jar).await {
        return rejection;
    }
    match state.content.logout().await {
        Ok(()) => (jar.add(removal_cookie()), respond(Ok(()), Status::LogoutFailed)).into_response(),
        Err(err) => respond::<()>(Err(err), Status::LogoutFailed),
    }
}
