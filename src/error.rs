//! Request-level failures. These are the rejected-no-penalty outcomes:
//! nothing in the store changes when one of them is returned.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("room not found")]
    RoomNotFound,
    #[error("game not found")]
    GameNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("room is not joinable")]
    NotJoinable,
    #[error("cannot join your own room")]
    OwnRoom,
    #[error("you are not part of this game")]
    NotInGame,
    #[error("the game has not started yet")]
    NotStarted,
    #[error("not your turn")]
    NotYourTurn,
    #[error("the game is already finished")]
    GameFinished,
    #[error("{0}")]
    BadRequest(String),
    #[error("the game state changed concurrently, retry")]
    Conflict,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::RoomNotFound => (StatusCode::NOT_FOUND, "room_not_found"),
            ApiError::GameNotFound => (StatusCode::NOT_FOUND, "game_not_found"),
            ApiError::WrongPassword => (StatusCode::UNAUTHORIZED, "wrong_password"),
            ApiError::NotJoinable => (StatusCode::BAD_REQUEST, "not_joinable"),
            ApiError::OwnRoom => (StatusCode::BAD_REQUEST, "own_room"),
            ApiError::NotInGame => (StatusCode::FORBIDDEN, "not_in_game"),
            ApiError::NotStarted => (StatusCode::BAD_REQUEST, "not_started"),
            ApiError::NotYourTurn => (StatusCode::CONFLICT, "not_your_turn"),
            ApiError::GameFinished => (StatusCode::CONFLICT, "game_finished"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Conflict => (StatusCode::CONFLICT, "conflict"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}
