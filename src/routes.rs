//! HTTP surface. Handlers stay thin: parse, stamp the request with the
//! server clock, delegate to the lifecycle or pipeline, serialize.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;
use crate::game::lifecycle::JoinedRoom;
use crate::game::pipeline::SubmitResponse;
use crate::game::room::RoomView;
use crate::game::session::{GameView, Role};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    player_type: Role,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    user_id: String,
    player_type: Role,
}

/// Anonymous identity issuance; the id is the only credential there is.
async fn login(Json(req): Json<LoginRequest>) -> Json<LoginResponse> {
    Json(LoginResponse {
        user_id: Uuid::new_v4().to_string(),
        player_type: req.player_type,
    })
}

#[derive(Debug, Deserialize)]
struct CreateRoomRequest {
    user_id: String,
    player_type: Role,
    room_name: String,
    password: Option<String>,
}

async fn create_room(
    State(state): State<AppState>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Json<RoomView>, ApiError> {
    let view = state.lifecycle.create_room(
        &req.user_id,
        req.player_type,
        &req.room_name,
        req.password.as_deref(),
        now_ms(),
    )?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct ListRoomsQuery {
    player_type: Option<Role>,
}

async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<ListRoomsQuery>,
) -> Json<Vec<RoomView>> {
    Json(state.lifecycle.list_rooms(query.player_type, now_ms()))
}

#[derive(Debug, Deserialize)]
struct JoinRoomRequest {
    user_id: String,
    player_type: Role,
    password: Option<String>,
}

async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<JoinRoomRequest>,
) -> Result<Json<JoinedRoom>, ApiError> {
    let joined = state.lifecycle.join_room(
        &room_id,
        &req.user_id,
        req.player_type,
        req.password.as_deref(),
        now_ms(),
    )?;
    Ok(Json(joined))
}

#[derive(Debug, Deserialize)]
struct UserRequest {
    user_id: String,
}

async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<Json<Value>, ApiError> {
    state.lifecycle.leave_room(&room_id, &req.user_id)?;
    Ok(Json(json!({})))
}

async fn heartbeat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<UserRequest>,
) -> Result<Json<RoomView>, ApiError> {
    let view = state.lifecycle.heartbeat(&room_id, &req.user_id, now_ms())?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    user_id: String,
    word: String,
}

async fn submit_word(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let response = state
        .pipeline
        .submit(&game_id, &req.user_id, &req.word, now_ms())
        .await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ObserveQuery {
    user_id: Option<String>,
}

async fn observe_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
    Query(query): Query<ObserveQuery>,
) -> Result<Json<GameView>, ApiError> {
    let view = state
        .pipeline
        .observe(&game_id, query.user_id.as_deref(), now_ms())
        .await?;
    Ok(Json(view))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/users/login", post(login))
        .route("/api/rooms", post(create_room).get(list_rooms))
        .route("/api/rooms/:room_id/join", post(join_room))
        .route("/api/rooms/:room_id/leave", post(leave_room))
        .route("/api/rooms/:room_id/heartbeat", post(heartbeat))
        .route("/api/games/:game_id/submit", post(submit_word))
        .route("/api/games/:game_id", get(observe_game))
}
