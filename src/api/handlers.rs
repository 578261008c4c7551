//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    CompanionListResponse, CompanionResponse, ErrorResponse, IntentRequest, LimitQuery,
    QueuedResponse, SessionResponse, SuccessResponse,
};
use super::AppState;
use crate::auth::CurrentUser;
use crate::db::{CompanionFilter, DbError, NewCompanion};
use crate::runtime::{SessionError, SessionHandle, SseEvent};
use crate::state_machine::{SdkWireEvent, SessionContext};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};

/// Where users land when a companion cannot be found
const LIBRARY_PATH: &str = "/companions";

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Companion library
        .route("/api/companions", get(list_companions).post(create_companion))
        .route("/api/companions/:id", get(get_companion))
        .route("/api/companions/:id/session", post(mount_session))
        // History
        .route("/api/sessions/recent", get(recent_sessions))
        .route("/api/me/sessions", get(my_sessions))
        .route("/api/me/companions", get(my_companions))
        // Live sessions
        .route("/api/sessions/:id", get(get_session).delete(unmount_session))
        .route("/api/sessions/:id/stream", get(stream_session))
        .route("/api/sessions/:id/intents", post(post_intent))
        .route("/api/sessions/:id/events", post(post_sdk_event))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Companions
// ============================================================

async fn list_companions(
    State(state): State<AppState>,
    Query(filter): Query<CompanionFilter>,
) -> Result<Json<CompanionListResponse>, AppError> {
    let companions = state.sessions.db().list_companions(&filter)?;
    Ok(Json(CompanionListResponse { companions }))
}

async fn create_companion(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewCompanion>,
) -> Result<(StatusCode, Json<CompanionResponse>), AppError> {
    let user = require_user(&state, &headers)?;
    req.validate().map_err(AppError::BadRequest)?;

    let companion = state.sessions.db().create_companion(&user.id, &req)?;
    tracing::info!(companion_id = %companion.id, author = %user.id, "Created companion");

    Ok((StatusCode::CREATED, Json(CompanionResponse { companion })))
}

async fn get_companion(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CompanionResponse>, AppError> {
    let companion = state.sessions.db().get_companion(&id)?;
    Ok(Json(CompanionResponse { companion }))
}

// ============================================================
// History
// ============================================================

async fn recent_sessions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CompanionListResponse>, AppError> {
    let companions = state.sessions.db().recent_sessions(query.limit)?;
    Ok(Json(CompanionListResponse { companions }))
}

async fn my_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LimitQuery>,
) -> Result<Json<CompanionListResponse>, AppError> {
    let user = require_user(&state, &headers)?;
    let companions = state.sessions.db().user_sessions(&user.id, query.limit)?;
    Ok(Json(CompanionListResponse { companions }))
}

async fn my_companions(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CompanionListResponse>, AppError> {
    let user = require_user(&state, &headers)?;
    let companions = state.sessions.db().user_companions(&user.id)?;
    Ok(Json(CompanionListResponse { companions }))
}

// ============================================================
// Live Sessions
// ============================================================

/// Mount the session view for a companion
async fn mount_session(
    State(state): State<AppState>,
    Path(companion_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let user = require_user(&state, &headers)?;

    let companion = match state.sessions.db().get_companion(&companion_id) {
        Ok(c) => c,
        Err(DbError::CompanionNotFound(_)) => {
            tracing::info!(companion_id = %companion_id, "Companion not found, back to library");
            return Err(AppError::Redirect(LIBRARY_PATH.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let context = SessionContext {
        session_id: uuid::Uuid::new_v4().to_string(),
        companion_id: companion.id,
        companion_name: companion.name,
        subject: companion.subject,
        topic: companion.topic,
        style: companion.style,
        voice: companion.voice,
        duration: companion.duration,
        user_id: user.id,
        user_name: user.first_name,
        user_image: user.image_url,
    };

    let handle = state.sessions.open(context).await;
    Ok(Json(session_response(&handle)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SessionResponse>, AppError> {
    let handle = user_session(&state, &headers, &id).await?;
    Ok(Json(session_response(&handle)))
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let handle = user_session(&state, &headers, &id).await?;

    // Subscribe before rendering so no update falls between the two
    let broadcast_rx = handle.subscribe();
    let init_event = SseEvent::Init {
        view: Box::new(handle.view()),
    };

    Ok(sse_stream(init_event, broadcast_rx))
}

async fn post_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<IntentRequest>,
) -> Result<Json<QueuedResponse>, AppError> {
    let handle = user_session(&state, &headers, &id).await?;
    tracing::debug!(session_id = %id, intent = ?req.intent, "Dispatching intent");
    handle.dispatch_intent(req.intent).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

/// Events reported by the vendor SDK running in the browser
async fn post_sdk_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(event): Json<SdkWireEvent>,
) -> Result<Json<QueuedResponse>, AppError> {
    let handle = user_session(&state, &headers, &id).await?;
    handle.handle_event(event).await?;
    Ok(Json(QueuedResponse { queued: true }))
}

async fn unmount_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, AppError> {
    user_session(&state, &headers, &id).await?;
    let success = state.sessions.close(&id).await;
    Ok(Json(SuccessResponse { success }))
}

fn session_response(handle: &SessionHandle) -> SessionResponse {
    SessionResponse {
        session_id: handle.context().session_id.clone(),
        context: handle.context().clone(),
        view: handle.view(),
    }
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("companion-tutor ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Identity
// ============================================================

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    state
        .identity
        .current_user(headers)
        .ok_or_else(|| AppError::Redirect(state.config.sign_in_path.clone()))
}

/// A session visible only to the user who mounted it
async fn user_session(
    state: &AppState,
    headers: &HeaderMap,
    session_id: &str,
) -> Result<SessionHandle, AppError> {
    let user = require_user(state, headers)?;
    let handle = state.sessions.get(session_id).await?;
    if handle.context().user_id != user.id {
        return Err(SessionError::NotFound(session_id.to_string()).into());
    }
    Ok(handle)
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
    /// Send the browser elsewhere (sign-in, library)
    Redirect(String),
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::CompanionNotFound(_) => AppError::NotFound(e.to_string()),
            other => {
                tracing::error!(error = %other, "Database error");
                AppError::Internal(other.to_string())
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        AppError::NotFound(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Redirect(location) => return Redirect::to(&location).into_response(),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
