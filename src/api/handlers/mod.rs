use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    response::IntoResponse,
    Extension, Json,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::error::JohariError;
use crate::identity::Identity;
use crate::manager::SessionManager;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

/// Map a domain error onto a status code and client-visible message.
/// Validation and not-found errors are returned verbatim; store failures
/// are logged server-side and the client only sees a generic message.
fn error_response(err: JohariError) -> (StatusCode, String) {
    match &err {
        JohariError::InvalidSelection(_) | JohariError::SelectionLimitExceeded { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        JohariError::SessionNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        JohariError::StoreUnavailable(source) => {
            tracing::error!("Store error: {source}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unavailable".to_string(),
            )
        }
    }
}

fn forbidden() -> (StatusCode, String) {
    (
        StatusCode::FORBIDDEN,
        "Only the session creator may do this".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Vocabulary
// ============================================================

pub async fn get_vocabulary(State(manager): State<Arc<SessionManager>>) -> Json<Vocabulary> {
    Json(manager.vocabulary().clone())
}

// ============================================================
// Sessions
// ============================================================

pub async fn create_session(
    State(manager): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<CreateSessionInput>,
) -> Result<(StatusCode, Json<Session>), (StatusCode, String)> {
    manager
        .create_session(identity, input)
        .map(|s| (StatusCode::CREATED, Json(s)))
        .map_err(error_response)
}

pub async fn get_session(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<SessionId>,
) -> Result<Json<Session>, (StatusCode, String)> {
    manager.session(&id).map(Json).map_err(error_response)
}

pub async fn submit_self_assessment(
    State(manager): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<SessionId>,
    Json(input): Json<SubmitSelectionsInput>,
) -> Result<Json<Session>, (StatusCode, String)> {
    let session = manager.session(&id).map_err(error_response)?;
    if session.creator_id != identity {
        return Err(forbidden());
    }

    manager
        .submit_self_assessment(&id, input)
        .map(Json)
        .map_err(error_response)
}

pub async fn rename_session(
    State(manager): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<SessionId>,
    Json(input): Json<RenameSessionInput>,
) -> Result<Json<Session>, (StatusCode, String)> {
    let session = manager.session(&id).map_err(error_response)?;
    if session.creator_id != identity {
        return Err(forbidden());
    }

    manager
        .rename_session(&id, input)
        .map(Json)
        .map_err(error_response)
}

// ============================================================
// Feedback
// ============================================================

pub async fn submit_feedback(
    State(manager): State<Arc<SessionManager>>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<SessionId>,
    Json(input): Json<SubmitSelectionsInput>,
) -> Result<Json<FeedbackRecord>, (StatusCode, String)> {
    manager
        .submit_peer_feedback(&id, identity, input)
        .map(Json)
        .map_err(error_response)
}

pub async fn list_feedback(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<SessionId>,
) -> Result<Json<Vec<FeedbackRecord>>, (StatusCode, String)> {
    manager
        .feedback_records(&id)
        .map(Json)
        .map_err(error_response)
}

// ============================================================
// Window
// ============================================================

pub async fn get_window(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<SessionId>,
) -> Result<Json<WindowSnapshot>, (StatusCode, String)> {
    manager.window(&id).map(Json).map_err(error_response)
}

/// Stream the session's window over SSE. The first event carries the
/// current window; every later event carries a full recomputation after a
/// change. Dropping the connection tears down the underlying subscription.
pub async fn window_events(
    State(manager): State<Arc<SessionManager>>,
    Path(id): Path<SessionId>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let (tx, rx) = mpsc::unbounded_channel::<Result<Event, Infallible>>();

    let subscription = manager
        .subscribe(&id, move |window| {
            let event = match serde_json::to_string(&window) {
                Ok(json) => Event::default().event("window").data(json),
                Err(err) => {
                    tracing::error!("Could not serialize window event: {err}");
                    return;
                }
            };
            let _ = tx.send(Ok(event));
        })
        .map_err(error_response)?;

    // Moving the subscription into the stream ties its lifetime to the
    // client connection.
    let stream = UnboundedReceiverStream::new(rx).map(move |event| {
        let _keep = &subscription;
        event
    });

    Ok(Sse::new(stream))
}
