use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::GameError;
use crate::models::{
    action::{ActionKind, Location},
    calendar::Calendar,
    chat::ChatMessage,
    game::{GameSpeed, GameState, Window},
    notice::Reply,
    player::PlayerId,
};
use crate::state::AppState;
use crate::utils::websocket;

#[derive(Debug, Deserialize)]
pub struct PlayerRequest {
    pub player_id: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub player_id: PlayerId,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub speed: GameSpeed,
}

fn default_language() -> String {
    "en".to_string()
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub player_id: PlayerId,
    pub target: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct NightActionRequest {
    pub player_id: PlayerId,
    pub kind: ActionKind,
    pub target: PlayerId,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub player_id: PlayerId,
    pub location: Location,
}

#[derive(Debug, Deserialize)]
pub struct NominationRequest {
    pub player_id: PlayerId,
    #[serde(default)]
    pub targets: Vec<PlayerId>,
}

#[derive(Debug, Deserialize)]
pub struct LogQuery {
    pub player_id: Option<PlayerId>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Public view of a session. Roles stay hidden until the game is over.
#[derive(Debug, Serialize)]
pub struct GameView {
    pub state: GameState,
    pub window: Window,
    pub speed: GameSpeed,
    pub party: Vec<PlayerId>,
    pub living: Vec<PlayerId>,
    pub calendar: Calendar,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .nest(
            "/:channel",
            Router::new()
                // lobby
                .route("/create", post(create_game))
                .route("/join", post(join))
                .route("/leave", post(leave))
                .route("/party", get(show_party))
                .route("/continue", post(continue_wait))
                .route("/promote", post(promote))
                .route("/remove", post(remove))
                .route("/roles", get(show_role_catalog))
                .route("/roles/:fragment", get(describe_role))
                // in game
                .nest(
                    "/actions",
                    Router::new()
                        .route("/night", post(submit_action))
                        .route("/location", post(submit_location))
                        .route("/nominate", post(submit_nominations))
                        .route("/skip", post(skip_nominations))
                        .route("/vote-yes", post(vote_yes))
                        .route("/vote-no", post(vote_no)),
                )
                .route("/state", get(get_game_state))
                .route("/log", get(get_log))
                .route("/ws", get(websocket::handler)),
        )
        .with_state(state)
}

fn status_for(error: &GameError) -> StatusCode {
    match error {
        GameError::NotLeader | GameError::NotInParty(_) | GameError::NotAlive | GameError::WrongRole => {
            StatusCode::FORBIDDEN
        }
        GameError::WrongState { .. } | GameError::WrongPhase | GameError::NoActiveWait => StatusCode::CONFLICT,
        GameError::UnknownRole(_) => StatusCode::NOT_FOUND,
        GameError::AlreadyInParty(_) | GameError::InvalidTarget(_) | GameError::LegacyVote => {
            StatusCode::BAD_REQUEST
        }
        GameError::BalancingFailed { .. } | GameError::NotEnoughPlayers { .. } | GameError::Delivery(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn respond(channel: &str, result: Result<Reply, GameError>) -> Response {
    match result {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) if e.is_guard_failure() => {
            tracing::debug!(channel, "command refused: {}", e);
            (status_for(&e), Json(ErrorBody { error: e.to_string() })).into_response()
        }
        Err(e) => {
            tracing::warn!(channel, "command failed: {}", e);
            (
                status_for(&e),
                Json(ErrorBody {
                    error: "something went wrong, please try again".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// A player can only be partied in one channel at a time.
async fn ensure_free(state: &AppState, channel: &str, player: &PlayerId) -> Option<Response> {
    match state.membership(player).await {
        Some(other) if other != channel => Some(
            (
                StatusCode::CONFLICT,
                Json(ErrorBody {
                    error: format!("{} is already playing in another channel", player),
                }),
            )
                .into_response(),
        ),
        _ => None,
    }
}

async fn create_game(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<CreateRequest>,
) -> Response {
    if let Some(conflict) = ensure_free(&state, &channel, &req.player_id).await {
        return conflict;
    }
    let session = state.session_for(&channel).await;
    let result = session.create_game(&req.player_id, &req.language, req.speed).await;
    respond(&channel, result)
}

async fn join(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    if let Some(conflict) = ensure_free(&state, &channel, &req.player_id).await {
        return conflict;
    }
    let session = state.session_for(&channel).await;
    respond(&channel, session.join(&req.player_id).await)
}

async fn leave(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.leave(&req.player_id).await)
}

async fn show_party(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, Ok(session.show_party().await))
}

async fn continue_wait(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.continue_wait(&req.player_id).await)
}

async fn promote(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<TargetRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.promote(&req.player_id, &req.target).await)
}

async fn remove(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<TargetRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.remove(&req.player_id, &req.target).await)
}

async fn show_role_catalog(State(state): State<AppState>, Path(channel): Path<String>) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, Ok(session.show_role_catalog()))
}

async fn describe_role(
    State(state): State<AppState>,
    Path((channel, fragment)): Path<(String, String)>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.describe_role(&fragment))
}

async fn submit_action(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<NightActionRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    let result = session.submit_action(&req.player_id, req.kind, &req.target).await;
    respond(&channel, result)
}

async fn submit_location(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<LocationRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.submit_location(&req.player_id, req.location).await)
}

async fn submit_nominations(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<NominationRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.submit_nominations(&req.player_id, &req.targets).await)
}

async fn skip_nominations(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.skip_nominations(&req.player_id).await)
}

async fn vote_yes(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.vote_yes(&req.player_id).await)
}

async fn vote_no(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(req): Json<PlayerRequest>,
) -> Response {
    let session = state.session_for(&channel).await;
    respond(&channel, session.vote_no(&req.player_id).await)
}

async fn get_game_state(State(state): State<AppState>, Path(channel): Path<String>) -> impl IntoResponse {
    let game = state.session_for(&channel).await.snapshot().await;
    Json(GameView {
        state: game.state,
        window: game.window,
        speed: game.speed,
        living: game.living_ids(),
        party: game.party,
        calendar: game.calendar,
    })
}

async fn get_log(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    let log = state.messenger_for(&channel).await.log().await;
    let messages: Vec<ChatMessage> = log
        .visible_to(query.player_id.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(messages)
}
