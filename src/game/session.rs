//! Game session record and server-authoritative time accounting.
//!
//! The session is pure data plus pure transitions; every operation takes the
//! observation time (`now_ms`) explicitly so the pipeline and the tests own
//! the clock. The one invariant that matters most here: any path that calls
//! [`GameSession::charge_elapsed`] must, before the record is written back,
//! either finish the session or move the turn checkpoint. Charging the same
//! wall-clock interval twice is how timers go wrong.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;

/// A player's side of the match. The role doubles as the player's language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Korean,
    Japanese,
}

impl Role {
    pub fn opponent(self) -> Role {
        match self {
            Role::Korean => Role::Japanese,
            Role::Japanese => Role::Korean,
        }
    }

    /// ISO 639-1 code used by the dictionary and translation collaborators.
    pub fn lang_code(self) -> &'static str {
        match self {
            Role::Korean => "ko",
            Role::Japanese => "ja",
        }
    }
}

/// A pair of values keyed by role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleMap<T> {
    pub korean: T,
    pub japanese: T,
}

impl<T> RoleMap<T> {
    pub fn new(korean: T, japanese: T) -> Self {
        Self { korean, japanese }
    }

    pub fn get(&self, role: Role) -> &T {
        match role {
            Role::Korean => &self.korean,
            Role::Japanese => &self.japanese,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Korean => &mut self.korean,
            Role::Japanese => &mut self.japanese,
        }
    }
}

impl<T: Clone> RoleMap<T> {
    pub fn splat(value: T) -> Self {
        Self {
            korean: value.clone(),
            japanese: value,
        }
    }
}

/// The last accepted word in both languages. Japanese forms may carry an
/// embedded reading annotation, e.g. `学校(がっこう)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub korean: String,
    pub japanese: String,
}

impl WordPair {
    pub fn form_for(&self, role: Role) -> &str {
        match role {
            Role::Korean => &self.korean,
            Role::Japanese => &self.japanese,
        }
    }

    pub fn set_form(&mut self, role: Role, form: String) {
        match role {
            Role::Korean => self.korean = form,
            Role::Japanese => self.japanese = form,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Playing,
    Finished,
}

/// Why a finished game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    TimeExceeded,
    EndedInMoraicNasal,
    TranslationEndedInMoraicNasal,
    Abandoned,
    OpponentLeft,
}

impl EndReason {
    pub fn message(self) -> &'static str {
        match self {
            EndReason::TimeExceeded => "time exceeded",
            EndReason::EndedInMoraicNasal => "word ended in ん",
            EndReason::TranslationEndedInMoraicNasal => "translated word ended in ん",
            EndReason::Abandoned => "opponent disconnected",
            EndReason::OpponentLeft => "opponent left the game",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub word: String,
    pub translated: String,
    pub role: Role,
    pub at_ms: u64,
}

/// One two-player match. Stored versioned; mutated only through the
/// validation pipeline and the poll-side termination checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub game_id: String,
    pub room_id: String,
    pub players: RoleMap<String>,
    pub current_turn: Role,
    pub status: GameStatus,
    pub winner: Option<Role>,
    pub winner_reason: Option<EndReason>,
    pub current_word: WordPair,
    /// Remaining budget in seconds per role, clamped at zero.
    pub timers: RoleMap<f64>,
    /// Checkpoint the active player's elapsed time is measured from.
    pub turn_started_at: u64,
    /// Pre-game countdown deadline; submissions before this are rejected.
    pub start_at: u64,
    /// Last observation per role, for abandonment detection.
    pub last_active: RoleMap<u64>,
    pub history: Vec<HistoryEntry>,
}

impl GameSession {
    pub fn new(
        game_id: String,
        room_id: String,
        korean_id: String,
        japanese_id: String,
        start_word: WordPair,
        cfg: &GameConfig,
        now_ms: u64,
    ) -> Self {
        let start_at = now_ms + (cfg.countdown_secs * 1000.0) as u64;
        Self {
            game_id,
            room_id,
            players: RoleMap::new(korean_id, japanese_id),
            current_turn: Role::Korean,
            status: GameStatus::Playing,
            winner: None,
            winner_reason: None,
            current_word: start_word,
            timers: RoleMap::splat(cfg.turn_secs),
            // the countdown must not be charged to anyone
            turn_started_at: start_at,
            start_at,
            last_active: RoleMap::splat(now_ms),
            history: Vec::new(),
        }
    }

    pub fn role_of(&self, player_id: &str) -> Option<Role> {
        if self.players.korean == player_id {
            Some(Role::Korean)
        } else if self.players.japanese == player_id {
            Some(Role::Japanese)
        } else {
            None
        }
    }

    pub fn is_playing(&self) -> bool {
        self.status == GameStatus::Playing
    }

    pub fn started(&self, now_ms: u64) -> bool {
        now_ms >= self.start_at
    }

    // ---- time accounting ----

    /// Debit the elapsed turn time from a role's budget, clamped at zero.
    /// Does not move the checkpoint; the caller settles the observation by
    /// finishing the session or calling [`reset_checkpoint`] exactly once.
    ///
    /// [`reset_checkpoint`]: GameSession::reset_checkpoint
    pub fn charge_elapsed(&mut self, role: Role, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.turn_started_at) as f64 / 1000.0;
        let timer = self.timers.get_mut(role);
        *timer = (*timer - elapsed).max(0.0);
    }

    /// Fixed deduction for an invalid submission. Moves the checkpoint, so
    /// the elapsed charge must have been taken already.
    pub fn apply_penalty(&mut self, role: Role, penalty_secs: f64, now_ms: u64) {
        let timer = self.timers.get_mut(role);
        *timer = (*timer - penalty_secs).max(0.0);
        self.turn_started_at = now_ms;
    }

    pub fn reset_checkpoint(&mut self, now_ms: u64) {
        self.turn_started_at = now_ms;
    }

    pub fn out_of_time(&self, role: Role) -> bool {
        *self.timers.get(role) <= 0.0
    }

    /// Remaining seconds as a client should render them: the active player's
    /// budget minus time elapsed since the checkpoint, never persisted.
    pub fn live_timers(&self, now_ms: u64) -> RoleMap<f64> {
        let mut timers = self.timers;
        if self.is_playing() && self.started(now_ms) {
            let elapsed = now_ms.saturating_sub(self.turn_started_at) as f64 / 1000.0;
            let active = timers.get_mut(self.current_turn);
            *active = (*active - elapsed).max(0.0);
        }
        timers
    }

    // ---- transitions ----

    /// Terminal transition; a finished game never reopens.
    pub fn finish(&mut self, winner: Role, reason: EndReason) {
        if self.status == GameStatus::Finished {
            return;
        }
        self.status = GameStatus::Finished;
        self.winner = Some(winner);
        self.winner_reason = Some(reason);
    }

    /// Commit an accepted submission: append history, replace the current
    /// word, flip the turn and move the checkpoint.
    pub fn accept(&mut self, entry: HistoryEntry, new_word: WordPair, now_ms: u64) {
        self.current_word = new_word;
        self.current_turn = entry.role.opponent();
        self.history.push(entry);
        self.turn_started_at = now_ms;
    }

    pub fn touch(&mut self, role: Role, now_ms: u64) {
        *self.last_active.get_mut(role) = now_ms;
    }

    /// Role that has not been observed within the abandonment window, if any.
    /// Only meaningful once the game has started.
    pub fn idle_role(&self, now_ms: u64, abandon_secs: f64) -> Option<Role> {
        if !self.started(now_ms) {
            return None;
        }
        let window = (abandon_secs * 1000.0) as u64;
        for role in [Role::Korean, Role::Japanese] {
            if now_ms.saturating_sub(*self.last_active.get(role)) > window {
                return Some(role);
            }
        }
        None
    }

    pub fn view(&self, now_ms: u64) -> GameView {
        GameView {
            game_id: self.game_id.clone(),
            room_id: self.room_id.clone(),
            status: self.status,
            current_turn: self.current_turn,
            winner: self.winner,
            winner_reason: self.winner_reason,
            winner_message: self.winner_reason.map(|r| r.message().to_string()),
            current_word: self.current_word.clone(),
            timers: self.live_timers(now_ms),
            start_at: self.start_at,
            started: self.started(now_ms),
            history: self.history.clone(),
        }
    }
}

/// Snapshot returned to the transport layer; timers are recomputed live so
/// the client can render without a second round trip.
#[derive(Debug, Clone, Serialize)]
pub struct GameView {
    pub game_id: String,
    pub room_id: String,
    pub status: GameStatus,
    pub current_turn: Role,
    pub winner: Option<Role>,
    pub winner_reason: Option<EndReason>,
    pub winner_message: Option<String>,
    pub current_word: WordPair,
    pub timers: RoleMap<f64>,
    pub start_at: u64,
    pub started: bool,
    pub history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> GameConfig {
        GameConfig {
            turn_secs: 90.0,
            penalty_secs: 5.0,
            countdown_secs: 5.0,
            ..GameConfig::default()
        }
    }

    fn session(now: u64) -> GameSession {
        GameSession::new(
            "g1".into(),
            "r1".into(),
            "kim".into(),
            "sato".into(),
            WordPair {
                korean: "사과".into(),
                japanese: "りんご".into(),
            },
            &cfg(),
            now,
        )
    }

    #[test]
    fn countdown_is_not_charged() {
        let s = session(1_000);
        assert_eq!(s.start_at, 6_000);
        assert_eq!(s.turn_started_at, 6_000);
        assert!(!s.started(5_999));
        assert!(s.started(6_000));
        // polling during the countdown shows full budgets
        assert_eq!(s.live_timers(3_000).korean, 90.0);
    }

    #[test]
    fn charge_elapsed_debits_and_clamps() {
        let mut s = session(0);
        s.charge_elapsed(Role::Korean, 15_000); // 10s after the 5s countdown
        assert!((s.timers.korean - 80.0).abs() < 1e-9);

        s.reset_checkpoint(15_000);
        s.charge_elapsed(Role::Korean, 500_000);
        assert_eq!(s.timers.korean, 0.0);
        assert!(s.out_of_time(Role::Korean));
    }

    #[test]
    fn penalty_moves_checkpoint() {
        let mut s = session(0);
        s.charge_elapsed(Role::Korean, 10_000);
        s.apply_penalty(Role::Korean, 5.0, 10_000);
        assert!((s.timers.korean - 80.0).abs() < 1e-9); // 90 - 5 elapsed - 5 penalty
        assert_eq!(s.turn_started_at, 10_000);
    }

    #[test]
    fn timers_never_go_negative() {
        let mut s = session(0);
        s.apply_penalty(Role::Japanese, 1_000.0, 7_000);
        assert_eq!(s.timers.japanese, 0.0);
    }

    #[test]
    fn accept_flips_turn_and_appends_history() {
        let mut s = session(0);
        assert_eq!(s.current_turn, Role::Korean);

        s.accept(
            HistoryEntry {
                word: "과자".into(),
                translated: "おかし".into(),
                role: Role::Korean,
                at_ms: 8_000,
            },
            WordPair {
                korean: "과자".into(),
                japanese: "おかし".into(),
            },
            8_000,
        );

        assert_eq!(s.current_turn, Role::Japanese);
        assert_eq!(s.history.len(), 1);
        assert_eq!(s.current_word.japanese, "おかし");
        assert_eq!(s.turn_started_at, 8_000);
    }

    #[test]
    fn finish_is_terminal() {
        let mut s = session(0);
        s.finish(Role::Japanese, EndReason::TimeExceeded);
        s.finish(Role::Korean, EndReason::Abandoned);
        assert_eq!(s.winner, Some(Role::Japanese));
        assert_eq!(s.winner_reason, Some(EndReason::TimeExceeded));
    }

    #[test]
    fn idle_role_respects_window_and_countdown() {
        let mut s = session(0);
        assert_eq!(s.idle_role(4_000, 120.0), None); // still counting down

        s.touch(Role::Korean, 200_000);
        assert_eq!(s.idle_role(200_000, 120.0), Some(Role::Japanese));
        s.touch(Role::Japanese, 200_000);
        assert_eq!(s.idle_role(200_000, 120.0), None);
    }

    #[test]
    fn live_timers_do_not_mutate_state() {
        let s = session(0);
        let shown = s.live_timers(36_000);
        assert!((shown.korean - 59.0).abs() < 1e-9);
        assert_eq!(s.timers.korean, 90.0); // persisted value untouched
    }
}
