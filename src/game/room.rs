//! Room records: matchmaking lobby entries with heartbeat bookkeeping.
//!
//! A room is created by a host, listed to players of the opposite role,
//! joined by exactly one guest, and either released back to waiting or
//! deleted. The pure state machine lives here; the store orchestration is
//! in [`crate::game::lifecycle`].

use serde::{Deserialize, Serialize};

use super::session::Role;
use crate::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
}

/// Which seat a player occupies in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seat {
    Host,
    Guest,
}

/// Why a join attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRefusal {
    AlreadyPlaying,
    WrongPassword,
    OwnRoom,
    RoleMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSession {
    pub room_id: String,
    pub room_name: String,
    /// Optional three-digit numeric password. Never exposed in listings.
    pub password: Option<String>,
    pub creator_id: String,
    pub creator_role: Role,
    pub guest_id: Option<String>,
    pub status: RoomStatus,
    pub game_id: Option<String>,
    pub created_at: u64,
    pub host_active_at: u64,
    pub guest_active_at: u64,
}

impl RoomSession {
    pub fn new(
        room_id: String,
        room_name: String,
        password: Option<String>,
        creator_id: String,
        creator_role: Role,
        now_ms: u64,
    ) -> Self {
        Self {
            room_id,
            room_name,
            password,
            creator_id,
            creator_role,
            guest_id: None,
            status: RoomStatus::Waiting,
            game_id: None,
            created_at: now_ms,
            host_active_at: now_ms,
            guest_active_at: now_ms,
        }
    }

    /// Cross-role matching: a waiting, guestless room is only offered to the
    /// role opposite its creator.
    pub fn joinable_by(&self, role: Role) -> bool {
        self.status == RoomStatus::Waiting
            && self.guest_id.is_none()
            && self.creator_role == role.opponent()
    }

    pub fn check_join(&self, user_id: &str, role: Role, password: Option<&str>) -> Result<(), JoinRefusal> {
        if self.status != RoomStatus::Waiting || self.guest_id.is_some() {
            return Err(JoinRefusal::AlreadyPlaying);
        }
        if self.creator_id == user_id {
            return Err(JoinRefusal::OwnRoom);
        }
        if self.creator_role != role.opponent() {
            return Err(JoinRefusal::RoleMismatch);
        }
        if let Some(expected) = &self.password
            && password != Some(expected.as_str())
        {
            return Err(JoinRefusal::WrongPassword);
        }
        Ok(())
    }

    pub fn admit_guest(&mut self, user_id: String, game_id: String, now_ms: u64) {
        self.guest_id = Some(user_id);
        self.game_id = Some(game_id);
        self.status = RoomStatus::Playing;
        self.guest_active_at = now_ms;
    }

    /// Guest departure or guest heartbeat timeout: back to a joinable room.
    pub fn drop_guest(&mut self) {
        self.guest_id = None;
        self.game_id = None;
        self.status = RoomStatus::Waiting;
    }

    /// Normal game finish: keep both occupants seated so they can view the
    /// result, but unlink the finished game.
    pub fn release_game(&mut self) {
        self.game_id = None;
        self.status = RoomStatus::Waiting;
    }

    pub fn seat_of(&self, user_id: &str) -> Option<Seat> {
        if self.creator_id == user_id {
            Some(Seat::Host)
        } else if self.guest_id.as_deref() == Some(user_id) {
            Some(Seat::Guest)
        } else {
            None
        }
    }

    pub fn heartbeat(&mut self, seat: Seat, now_ms: u64) {
        match seat {
            Seat::Host => self.host_active_at = now_ms,
            Seat::Guest => self.guest_active_at = now_ms,
        }
    }

    /// Seat whose heartbeat has gone stale, host checked first. The guest
    /// timestamp only matters while a guest is seated.
    pub fn idle_seat(&self, now_ms: u64, cfg: &GameConfig) -> Option<Seat> {
        let host_window = (cfg.host_idle_secs * 1000.0) as u64;
        if now_ms.saturating_sub(self.host_active_at) > host_window {
            return Some(Seat::Host);
        }
        let guest_window = (cfg.guest_idle_secs * 1000.0) as u64;
        if self.guest_id.is_some() && now_ms.saturating_sub(self.guest_active_at) > guest_window {
            return Some(Seat::Guest);
        }
        None
    }

    pub fn view(&self) -> RoomView {
        RoomView {
            room_id: self.room_id.clone(),
            room_name: self.room_name.clone(),
            creator_role: self.creator_role,
            has_password: self.password.is_some(),
            status: self.status,
            guest_present: self.guest_id.is_some(),
            game_id: self.game_id.clone(),
            created_at: self.created_at,
        }
    }
}

/// Room projection for listings and mutating responses; the password never
/// leaves the server, only whether one is set.
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub room_id: String,
    pub room_name: String,
    pub creator_role: Role,
    pub has_password: bool,
    pub status: RoomStatus,
    pub guest_present: bool,
    pub game_id: Option<String>,
    pub created_at: u64,
}

/// Room passwords are exactly three ASCII digits.
pub fn valid_password(password: &str) -> bool {
    password.len() == 3 && password.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(creator_role: Role, password: Option<&str>) -> RoomSession {
        RoomSession::new(
            "r1".into(),
            "한일 대전".into(),
            password.map(String::from),
            "host".into(),
            creator_role,
            1_000,
        )
    }

    #[test]
    fn only_the_opposite_role_may_join() {
        let r = room(Role::Korean, None);
        assert!(r.joinable_by(Role::Japanese));
        assert!(!r.joinable_by(Role::Korean));
        assert_eq!(
            r.check_join("guest", Role::Korean, None),
            Err(JoinRefusal::RoleMismatch)
        );
        assert_eq!(r.check_join("guest", Role::Japanese, None), Ok(()));
    }

    #[test]
    fn creator_cannot_join_own_room() {
        let r = room(Role::Korean, None);
        assert_eq!(
            r.check_join("host", Role::Japanese, None),
            Err(JoinRefusal::OwnRoom)
        );
    }

    #[test]
    fn password_is_checked_on_join_and_hidden_in_views() {
        let r = room(Role::Japanese, Some("123"));
        assert_eq!(
            r.check_join("guest", Role::Korean, None),
            Err(JoinRefusal::WrongPassword)
        );
        assert_eq!(
            r.check_join("guest", Role::Korean, Some("999")),
            Err(JoinRefusal::WrongPassword)
        );
        assert_eq!(r.check_join("guest", Role::Korean, Some("123")), Ok(()));
        assert!(r.view().has_password);
    }

    #[test]
    fn admitted_room_refuses_further_joins() {
        let mut r = room(Role::Korean, None);
        r.admit_guest("guest".into(), "g1".into(), 2_000);
        assert_eq!(r.status, RoomStatus::Playing);
        assert_eq!(
            r.check_join("other", Role::Japanese, None),
            Err(JoinRefusal::AlreadyPlaying)
        );
        assert!(!r.joinable_by(Role::Japanese));
    }

    #[test]
    fn drop_guest_makes_room_joinable_again() {
        let mut r = room(Role::Korean, None);
        r.admit_guest("guest".into(), "g1".into(), 2_000);
        r.drop_guest();
        assert_eq!(r.status, RoomStatus::Waiting);
        assert!(r.game_id.is_none());
        assert!(r.joinable_by(Role::Japanese));
    }

    #[test]
    fn release_game_keeps_occupants() {
        let mut r = room(Role::Korean, None);
        r.admit_guest("guest".into(), "g1".into(), 2_000);
        r.release_game();
        assert_eq!(r.status, RoomStatus::Waiting);
        assert!(r.game_id.is_none());
        assert_eq!(r.guest_id.as_deref(), Some("guest"));
        // still occupied, so not offered in listings
        assert!(!r.joinable_by(Role::Japanese));
    }

    #[test]
    fn idle_seat_prefers_host_and_ignores_absent_guest() {
        let cfg = GameConfig {
            host_idle_secs: 10.0,
            guest_idle_secs: 10.0,
            ..GameConfig::default()
        };
        let mut r = room(Role::Korean, None);
        assert_eq!(r.idle_seat(5_000, &cfg), None);
        // no guest yet: a stale guest timestamp means nothing
        assert_eq!(r.idle_seat(12_000, &cfg), Some(Seat::Host));

        r.heartbeat(Seat::Host, 12_000);
        assert_eq!(r.idle_seat(12_000, &cfg), None);

        r.admit_guest("guest".into(), "g1".into(), 12_000);
        r.heartbeat(Seat::Host, 30_000);
        assert_eq!(r.idle_seat(30_000, &cfg), Some(Seat::Guest));
    }

    #[test]
    fn password_shape() {
        assert!(valid_password("000"));
        assert!(valid_password("123"));
        assert!(!valid_password("12"));
        assert!(!valid_password("1234"));
        assert!(!valid_password("12a"));
    }
}
