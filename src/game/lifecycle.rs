//! Room orchestration over the shared store: create, list, join, leave and
//! heartbeat, plus the poll-driven cleanup sweep. Joining a room is the
//! moment a game session comes to life; a room going away is the moment a
//! linked game is forfeited.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::error::ApiError;
use crate::game::room::{JoinRefusal, RoomSession, RoomView, Seat, valid_password};
use crate::game::session::{EndReason, GameSession, Role};
use crate::lookup::SeedSource;
use crate::store::{CasError, Store};

const MAX_CAS_RETRIES: usize = 3;

#[derive(Debug, Serialize)]
pub struct JoinedRoom {
    pub game_id: String,
    pub room: RoomView,
}

pub struct RoomLifecycle {
    rooms: Arc<dyn Store<RoomSession>>,
    games: Arc<dyn Store<GameSession>>,
    seeds: Arc<dyn SeedSource>,
    cfg: GameConfig,
}

impl RoomLifecycle {
    pub fn new(
        rooms: Arc<dyn Store<RoomSession>>,
        games: Arc<dyn Store<GameSession>>,
        seeds: Arc<dyn SeedSource>,
        cfg: GameConfig,
    ) -> Self {
        Self {
            rooms,
            games,
            seeds,
            cfg,
        }
    }

    pub fn create_room(
        &self,
        user_id: &str,
        role: Role,
        room_name: &str,
        password: Option<&str>,
        now_ms: u64,
    ) -> Result<RoomView, ApiError> {
        let room_name = room_name.trim();
        if room_name.is_empty() {
            return Err(ApiError::BadRequest("room name must not be empty".into()));
        }
        if let Some(p) = password
            && !valid_password(p)
        {
            return Err(ApiError::BadRequest(
                "password must be exactly three digits".into(),
            ));
        }

        let room_id = Uuid::new_v4().to_string();
        let room = RoomSession::new(
            room_id.clone(),
            room_name.to_string(),
            password.map(String::from),
            user_id.to_string(),
            role,
            now_ms,
        );
        let view = room.view();
        self.rooms.insert(&room_id, room);
        info!(room_id, room_name, ?role, "room created");
        Ok(view)
    }

    /// Waiting rooms a player of `role` could join, i.e. rooms hosted by the
    /// opposite role. Runs the cleanup sweep first so stale rooms never show.
    pub fn list_rooms(&self, role: Option<Role>, now_ms: u64) -> Vec<RoomView> {
        self.sweep(now_ms);

        let mut rooms: Vec<_> = self
            .rooms
            .entries()
            .into_iter()
            .map(|(_, record)| record.value)
            .filter(|room| match role {
                Some(role) => room.joinable_by(role),
                None => room.guest_id.is_none(),
            })
            .collect();
        rooms.sort_by_key(|room| room.created_at);
        rooms.iter().map(RoomSession::view).collect()
    }

    /// Join a waiting room. On success the room flips to playing and a fresh
    /// game session is seeded atomically with the room update.
    pub fn join_room(
        &self,
        room_id: &str,
        user_id: &str,
        role: Role,
        password: Option<&str>,
        now_ms: u64,
    ) -> Result<JoinedRoom, ApiError> {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return Err(ApiError::RoomNotFound);
            };
            let mut room = record.value;

            room.check_join(user_id, role, password)
                .map_err(|refusal| match refusal {
                    JoinRefusal::AlreadyPlaying => ApiError::NotJoinable,
                    JoinRefusal::WrongPassword => ApiError::WrongPassword,
                    JoinRefusal::OwnRoom => ApiError::OwnRoom,
                    JoinRefusal::RoleMismatch => ApiError::NotJoinable,
                })?;

            let game_id = Uuid::new_v4().to_string();
            let (korean_id, japanese_id) = match room.creator_role {
                Role::Korean => (room.creator_id.clone(), user_id.to_string()),
                Role::Japanese => (user_id.to_string(), room.creator_id.clone()),
            };
            let game = GameSession::new(
                game_id.clone(),
                room_id.to_string(),
                korean_id,
                japanese_id,
                self.seeds.pick(),
                &self.cfg,
                now_ms,
            );
            self.games.insert(&game_id, game);

            room.admit_guest(user_id.to_string(), game_id.clone(), now_ms);
            match self.rooms.cas(room_id, record.version, room.clone()) {
                Ok(_) => {
                    info!(room_id, game_id, guest = user_id, "room joined, game created");
                    return Ok(JoinedRoom {
                        game_id,
                        room: room.view(),
                    });
                }
                Err(CasError::Missing) => {
                    self.games.remove(&game_id);
                    return Err(ApiError::RoomNotFound);
                }
                Err(CasError::Conflict) => {
                    // someone else got there first; discard our game and re-read
                    self.games.remove(&game_id);
                    continue;
                }
            }
        }
        Err(ApiError::Conflict)
    }

    /// Leave a room. The host leaving deletes the room; the guest leaving
    /// returns it to waiting. Either way a game still in progress is
    /// forfeited to the player who stayed.
    pub fn leave_room(&self, room_id: &str, user_id: &str) -> Result<(), ApiError> {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return Err(ApiError::RoomNotFound);
            };
            let mut room = record.value;
            let Some(seat) = room.seat_of(user_id) else {
                return Err(ApiError::NotInGame);
            };
            let game_id = room.game_id.clone();

            match seat {
                Seat::Host => {
                    self.rooms.remove(room_id);
                    info!(room_id, "host left, room deleted");
                }
                Seat::Guest => {
                    room.drop_guest();
                    match self.rooms.cas(room_id, record.version, room) {
                        Err(CasError::Conflict) => continue,
                        _ => info!(room_id, "guest left, room back to waiting"),
                    }
                }
            }

            if let Some(game_id) = game_id {
                self.forfeit_game(&game_id, user_id, EndReason::OpponentLeft);
            }
            return Ok(());
        }
        Err(ApiError::Conflict)
    }

    /// Refresh the caller's heartbeat, then sweep this room so a stale
    /// counterpart is dealt with on the same poll.
    pub fn heartbeat(
        &self,
        room_id: &str,
        user_id: &str,
        now_ms: u64,
    ) -> Result<RoomView, ApiError> {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return Err(ApiError::RoomNotFound);
            };
            let mut room = record.value;
            let Some(seat) = room.seat_of(user_id) else {
                return Err(ApiError::NotInGame);
            };
            room.heartbeat(seat, now_ms);
            match self.rooms.cas(room_id, record.version, room) {
                Ok(_) => break,
                Err(CasError::Missing) => return Err(ApiError::RoomNotFound),
                Err(CasError::Conflict) => continue,
            }
        }

        self.sweep_room(room_id, now_ms);
        match self.rooms.get(room_id) {
            Some(record) => Ok(record.value.view()),
            None => Err(ApiError::RoomNotFound),
        }
    }

    /// Heartbeat-timeout cleanup across all rooms. A silent host loses the
    /// room outright; a silent guest is dropped and the room kept.
    pub fn sweep(&self, now_ms: u64) {
        for (room_id, _) in self.rooms.entries() {
            self.sweep_room(&room_id, now_ms);
        }
    }

    fn sweep_room(&self, room_id: &str, now_ms: u64) {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return;
            };
            let mut room = record.value;
            let Some(seat) = room.idle_seat(now_ms, &self.cfg) else {
                return;
            };
            let game_id = room.game_id.clone();

            match seat {
                Seat::Host => {
                    debug!(room_id, "host heartbeat expired, deleting room");
                    self.rooms.remove(room_id);
                    if let Some(game_id) = game_id {
                        self.forfeit_game(&game_id, &room.creator_id, EndReason::Abandoned);
                    }
                    return;
                }
                Seat::Guest => {
                    let guest_id = room.guest_id.clone();
                    room.drop_guest();
                    match self.rooms.cas(room_id, record.version, room) {
                        Err(CasError::Conflict) => continue,
                        _ => {
                            debug!(room_id, "guest heartbeat expired, seat cleared");
                            if let (Some(game_id), Some(guest_id)) = (game_id, guest_id) {
                                self.forfeit_game(&game_id, &guest_id, EndReason::Abandoned);
                            }
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Finish a game on behalf of a departed player; their opponent wins.
    /// No-op if the game already ended.
    fn forfeit_game(&self, game_id: &str, leaver_id: &str, reason: EndReason) {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.games.get(game_id) else {
                return;
            };
            let mut game = record.value;
            if !game.is_playing() {
                return;
            }
            let Some(role) = game.role_of(leaver_id) else {
                return;
            };
            game.finish(role.opponent(), reason);
            match self.games.cas(game_id, record.version, game) {
                Err(CasError::Conflict) => continue,
                _ => {
                    info!(game_id, ?role, ?reason, "game forfeited");
                    return;
                }
            }
        }
    }
}
