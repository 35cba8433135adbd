//! HTTP surface: JSON endpoints plus a Server-Sent Events stream per viewer.

use crate::broadcast::{ChannelSink, ConnectionToken, SinkEvent};
use crate::games::cathedral::{MoveSummary, PieceShape, Placement, PlayerId, catalog};
use crate::service::{GameService, ServerStatus, ServiceError};
use crate::session::{SessionId, SessionSnapshot, SessionSummary};
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceBuilder;
use tracing::{debug, info, instrument, warn};

const ANONYMOUS: &str = "Anonymous";

type AppState = Arc<GameService>;

/// Builds the application router.
pub fn router(service: Arc<GameService>) -> Router {
    Router::new()
        .route("/id", get(new_id))
        .route("/pieces", get(pieces))
        .route("/status", get(status))
        .route("/games", get(list_games).post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/place", post(place_piece))
        .route("/games/{id}/stream", get(stream_game))
        .with_state(service)
        .layer(ServiceBuilder::new().map_request(log_request))
}

fn log_request(req: Request<Body>) -> Request<Body> {
    info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
    req
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidMove(_) => StatusCode::BAD_REQUEST,
            ServiceError::Lifecycle(_) => StatusCode::CONFLICT,
            ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        warn!(%status, error = %self, "Request failed");
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Query string naming the acting player.
#[derive(Debug, Deserialize)]
pub struct PlayerQuery {
    /// Player id.
    pub uid: PlayerId,
}

/// Query string for session creation.
#[derive(Debug, Default, Deserialize)]
pub struct CreateQuery {
    /// Creator's player id.
    pub uid: Option<PlayerId>,
}

/// Query string for opening a stream.
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Viewer id; a fresh spectator id is issued when absent.
    pub uid: Option<PlayerId>,
    /// Display name.
    pub usr: Option<String>,
}

async fn new_id(State(service): State<AppState>) -> String {
    service.new_player_id()
}

async fn pieces() -> Json<&'static [PieceShape]> {
    Json(catalog())
}

async fn status(State(service): State<AppState>) -> Json<ServerStatus> {
    Json(service.status(Utc::now()))
}

async fn list_games(State(service): State<AppState>) -> Json<Vec<SessionSummary>> {
    Json(service.list_sessions().await)
}

async fn create_game(
    State(service): State<AppState>,
    Query(query): Query<CreateQuery>,
) -> Result<String, ServiceError> {
    service.create_session(query.uid, Utc::now())
}

async fn get_game(
    State(service): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<Json<SessionSnapshot>, ServiceError> {
    Ok(Json(service.snapshot(&id).await?))
}

async fn start_game(
    State(service): State<AppState>,
    Path(id): Path<SessionId>,
) -> Result<StatusCode, ServiceError> {
    service.start_game(&id, Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn place_piece(
    State(service): State<AppState>,
    Path(id): Path<SessionId>,
    Query(query): Query<PlayerQuery>,
    Json(placement): Json<Placement>,
) -> Result<Json<MoveSummary>, ServiceError> {
    let summary = service
        .place_piece(&id, &query.uid, placement, Utc::now())
        .await?;
    Ok(Json(summary))
}

#[instrument(skip_all, fields(session_id = %id))]
async fn stream_game(
    State(service): State<AppState>,
    Path(id): Path<SessionId>,
    Query(query): Query<StreamQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServiceError> {
    let viewer_id = query.uid.unwrap_or_else(|| service.new_player_id());
    let display_name = query.usr.unwrap_or_else(|| ANONYMOUS.to_string());

    let (sink, rx) = ChannelSink::channel();
    let connection = service
        .connect(&id, &viewer_id, &display_name, Arc::new(sink), Utc::now())
        .await?;
    info!(role = ?connection.role, "Viewer stream opened");

    let guard = StreamGuard {
        service,
        session_id: id,
        viewer_id,
        token: connection.token,
    };
    Ok(Sse::new(snapshot_events(rx, guard)).keep_alive(KeepAlive::default()))
}

fn snapshot_events(
    rx: UnboundedReceiver<SinkEvent>,
    guard: StreamGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold((rx, guard), |(mut rx, guard)| async move {
        match rx.recv().await {
            Some(SinkEvent::Frame(frame)) => {
                let event = Event::default()
                    .id(frame.version().to_string())
                    .data(frame.payload());
                Some((Ok(event), (rx, guard)))
            }
            Some(SinkEvent::Close) | None => {
                debug!(session_id = %guard.session_id, "Viewer stream closed by server");
                None
            }
        }
    })
}

/// Detaches the viewer when its stream is dropped, whichever side closed it.
struct StreamGuard {
    service: Arc<GameService>,
    session_id: SessionId,
    viewer_id: PlayerId,
    token: ConnectionToken,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let service = Arc::clone(&self.service);
        let session_id = std::mem::take(&mut self.session_id);
        let viewer_id = std::mem::take(&mut self.viewer_id);
        let token = self.token;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    service.disconnect(&session_id, &viewer_id, token).await;
                });
            }
            Err(_) => warn!(%session_id, %viewer_id, "No runtime to record disconnect"),
        }
    }
}
