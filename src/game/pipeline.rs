//! The submission pipeline and the poll-side termination checks.
//!
//! A submission runs through an ordered sequence of checks; the first
//! failure wins. Failures fall into three buckets: rejected with no state
//! change (wrong turn, not started; surfaced as [`ApiError`]), penalized
//! (invalid word; fixed time deduction, turn retained) and terminal
//! (timeout or moraic nasal, which finish the session).
//!
//! Every mutation is committed with a compare-and-swap against the version
//! the record was read at, and retried from the read on conflict. Two racing
//! submissions for the same turn can therefore never both land: the second
//! one re-reads, sees the flipped turn and is rejected with no side effects.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::GameConfig;
use crate::error::ApiError;
use crate::game::chain::{ChainVerdict, verify_chain};
use crate::game::phonetics::{ends_in_moraic_nasal, strip_annotation};
use crate::game::room::RoomSession;
use crate::game::session::{EndReason, GameSession, GameView, HistoryEntry, Role, WordPair};
use crate::lookup::{Dictionary, Translator};
use crate::store::{CasError, Store};

const MAX_CAS_RETRIES: usize = 3;

/// Why a submission was rejected without ending the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadyUsed,
    NotInDictionary,
    ChainMismatch,
    TranslationNotInDictionary,
    DictionaryUnavailable,
}

impl RejectReason {
    fn message(self) -> &'static str {
        match self {
            RejectReason::AlreadyUsed => "that word has already been used",
            RejectReason::NotInDictionary => "not found in the dictionary",
            RejectReason::ChainMismatch => "the word does not continue the chain",
            RejectReason::TranslationNotInDictionary => {
                "the translated form is not in the dictionary"
            }
            RejectReason::DictionaryUnavailable => "the dictionary is unreachable, try again",
        }
    }
}

/// Result of one submission, alongside the fresh session projection.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Accepted {
        word: String,
        translated: String,
    },
    Rejected {
        reason: RejectReason,
        message: String,
        /// False only for collaborator outages: the player is not charged
        /// the fixed penalty for an outage that is not their fault.
        penalized: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        required_sound: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        supplied_sound: Option<String>,
    },
    Finished {
        winner: Role,
        reason: EndReason,
    },
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
    pub game: GameView,
}

enum Commit {
    Done,
    Retry,
}

/// The turn-resolution engine: orchestrates validation, time accounting and
/// the terminal transitions over the shared store.
pub struct Pipeline {
    games: Arc<dyn Store<GameSession>>,
    rooms: Arc<dyn Store<RoomSession>>,
    dictionary: Arc<dyn Dictionary>,
    translator: Arc<dyn Translator>,
    cfg: GameConfig,
}

impl Pipeline {
    pub fn new(
        games: Arc<dyn Store<GameSession>>,
        rooms: Arc<dyn Store<RoomSession>>,
        dictionary: Arc<dyn Dictionary>,
        translator: Arc<dyn Translator>,
        cfg: GameConfig,
    ) -> Self {
        Self {
            games,
            rooms,
            dictionary,
            translator,
            cfg,
        }
    }

    /// Run one word submission through the full validation pipeline.
    pub async fn submit(
        &self,
        game_id: &str,
        user_id: &str,
        word: &str,
        now_ms: u64,
    ) -> Result<SubmitResponse, ApiError> {
        let word = word.trim();
        if word.is_empty() {
            return Err(ApiError::BadRequest("word must not be empty".into()));
        }

        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.games.get(game_id) else {
                return Err(ApiError::GameNotFound);
            };
            let version = record.version;
            let mut game = record.value;

            if !game.is_playing() {
                return Err(ApiError::GameFinished);
            }
            let Some(role) = game.role_of(user_id) else {
                return Err(ApiError::NotInGame);
            };
            self.touch_room_seat(&game.room_id, user_id, now_ms);
            if !game.started(now_ms) {
                return Err(ApiError::NotStarted);
            }
            if game.current_turn != role {
                return Err(ApiError::NotYourTurn);
            }

            game.touch(role, now_ms);

            // Stage 1: charge elapsed turn time; running out here ends the game.
            game.charge_elapsed(role, now_ms);
            if game.out_of_time(role) {
                game.finish(role.opponent(), EndReason::TimeExceeded);
                match self.commit(game_id, version, &game)? {
                    Commit::Done => {
                        info!(game_id, ?role, "player ran out of time on submit");
                        self.release_room(&game.room_id);
                        return Ok(finished_response(game, now_ms));
                    }
                    Commit::Retry => continue,
                }
            }

            // Stage 2: the word (or its translation) must not have been
            // played. The current word is checked too; the seeded start has
            // no history entry.
            let stripped = strip_annotation(word);
            let duplicate = strip_annotation(&game.current_word.korean) == stripped
                || strip_annotation(&game.current_word.japanese) == stripped
                || game.history.iter().any(|entry| {
                    strip_annotation(&entry.word) == stripped
                        || strip_annotation(&entry.translated) == stripped
                });
            if duplicate {
                match self.penalize(game, version, role, RejectReason::AlreadyUsed, None, now_ms)? {
                    Some(response) => return Ok(response),
                    None => continue,
                }
            }

            // Stage 3: the word must be a real headword in its own language.
            let entry = match self.dictionary.lookup(word, role).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(word, %err, "dictionary lookup failed");
                    match self.reject_unverifiable(game, version, now_ms)? {
                        Some(response) => return Ok(response),
                        None => continue,
                    }
                }
            };
            if !entry.valid {
                match self.penalize(
                    game,
                    version,
                    role,
                    RejectReason::NotInDictionary,
                    None,
                    now_ms,
                )? {
                    Some(response) => return Ok(response),
                    None => continue,
                }
            }
            let reading = match role {
                Role::Korean => word.to_string(),
                Role::Japanese if entry.reading.is_empty() => word.to_string(),
                Role::Japanese => entry.reading,
            };

            // Stage 4: the chain rule against the previous word as seen in the
            // submitter's own language.
            let previous = game.current_word.form_for(role).to_string();
            let verdict = verify_chain(&previous, &reading);
            if !verdict.is_valid {
                debug!(word, previous, required = verdict.required, "chain mismatch");
                match self.penalize(
                    game,
                    version,
                    role,
                    RejectReason::ChainMismatch,
                    Some(&verdict),
                    now_ms,
                )? {
                    Some(response) => return Ok(response),
                    None => continue,
                }
            }

            // Stage 5: a Japanese word ending in ん is an instant loss.
            if role == Role::Japanese && ends_in_moraic_nasal(&reading) {
                game.finish(role.opponent(), EndReason::EndedInMoraicNasal);
                match self.commit(game_id, version, &game)? {
                    Commit::Done => {
                        info!(game_id, word, "word ended in the moraic nasal");
                        self.release_room(&game.room_id);
                        return Ok(finished_response(game, now_ms));
                    }
                    Commit::Retry => continue,
                }
            }

            // Stage 6: translate for the opponent. Best-effort; falls back to
            // the original word inside the collaborator.
            let opponent = role.opponent();
            let translated = self.translator.translate(word, role, opponent).await;

            // Stage 7: the translated form must exist in the opposite
            // dictionary, and must not itself end in ん.
            let cross = match self.dictionary.lookup(&translated, opponent).await {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(translated, %err, "cross-language dictionary lookup failed");
                    match self.reject_unverifiable(game, version, now_ms)? {
                        Some(response) => return Ok(response),
                        None => continue,
                    }
                }
            };
            if !cross.valid {
                match self.penalize(
                    game,
                    version,
                    role,
                    RejectReason::TranslationNotInDictionary,
                    None,
                    now_ms,
                )? {
                    Some(response) => return Ok(response),
                    None => continue,
                }
            }
            let cross_reading = match opponent {
                Role::Korean => translated.clone(),
                Role::Japanese if cross.reading.is_empty() => translated.clone(),
                Role::Japanese => cross.reading,
            };
            if opponent == Role::Japanese && ends_in_moraic_nasal(&cross_reading) {
                game.finish(opponent, EndReason::TranslationEndedInMoraicNasal);
                match self.commit(game_id, version, &game)? {
                    Commit::Done => {
                        info!(game_id, translated, "translation ended in the moraic nasal");
                        self.release_room(&game.room_id);
                        return Ok(finished_response(game, now_ms));
                    }
                    Commit::Retry => continue,
                }
            }

            // Stage 8: build display forms and commit the turn.
            let word_display = annotate(word, &reading, role);
            let translated_display = annotate(&translated, &cross_reading, opponent);

            let mut new_word = WordPair {
                korean: String::new(),
                japanese: String::new(),
            };
            new_word.set_form(role, word_display.clone());
            new_word.set_form(opponent, translated_display.clone());

            game.accept(
                HistoryEntry {
                    word: word_display.clone(),
                    translated: translated_display.clone(),
                    role,
                    at_ms: now_ms,
                },
                new_word,
                now_ms,
            );

            match self.commit(game_id, version, &game)? {
                Commit::Done => {
                    info!(game_id, word = word_display, translated = translated_display, "turn accepted");
                    return Ok(SubmitResponse {
                        outcome: SubmitOutcome::Accepted {
                            word: word_display,
                            translated: translated_display,
                        },
                        game: game.view(now_ms),
                    });
                }
                Commit::Retry => continue,
            }
        }

        Err(ApiError::Conflict)
    }

    /// Poll the session. Safe to call arbitrarily often: timers are only
    /// recomputed for display, and a write happens only when the viewer's
    /// heartbeat moves or a termination condition is newly crossed.
    pub async fn observe(
        &self,
        game_id: &str,
        user_id: Option<&str>,
        now_ms: u64,
    ) -> Result<GameView, ApiError> {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.games.get(game_id) else {
                return Err(ApiError::GameNotFound);
            };
            let version = record.version;
            let mut game = record.value;

            if !game.is_playing() {
                return Ok(game.view(now_ms));
            }

            let viewer = user_id.and_then(|u| game.role_of(u));
            if let (Some(uid), Some(role)) = (user_id, viewer) {
                game.touch(role, now_ms);
                self.touch_room_seat(&game.room_id, uid, now_ms);
            }

            let terminal = if game.started(now_ms) {
                let active = game.current_turn;
                if *game.live_timers(now_ms).get(active) <= 0.0 {
                    game.charge_elapsed(active, now_ms);
                    game.finish(active.opponent(), EndReason::TimeExceeded);
                    info!(game_id, ?active, "player ran out of time");
                    true
                } else if let Some(idle) = game.idle_role(now_ms, self.cfg.abandon_secs) {
                    game.finish(idle.opponent(), EndReason::Abandoned);
                    info!(game_id, ?idle, "player abandoned the game");
                    true
                } else {
                    false
                }
            } else {
                false
            };

            if !terminal && viewer.is_none() {
                // spectator poll, nothing to persist
                return Ok(game.view(now_ms));
            }

            match self.commit(game_id, version, &game)? {
                Commit::Done => {
                    if terminal {
                        self.release_room(&game.room_id);
                    }
                    return Ok(game.view(now_ms));
                }
                Commit::Retry => continue,
            }
        }

        Err(ApiError::Conflict)
    }

    fn commit(&self, game_id: &str, version: u64, game: &GameSession) -> Result<Commit, ApiError> {
        match self.games.cas(game_id, version, game.clone()) {
            Ok(_) => Ok(Commit::Done),
            Err(CasError::Conflict) => Ok(Commit::Retry),
            Err(CasError::Missing) => Err(ApiError::GameNotFound),
        }
    }

    fn penalize(
        &self,
        mut game: GameSession,
        version: u64,
        role: Role,
        reason: RejectReason,
        verdict: Option<&ChainVerdict>,
        now_ms: u64,
    ) -> Result<Option<SubmitResponse>, ApiError> {
        game.apply_penalty(role, self.cfg.penalty_secs, now_ms);
        let game_id = game.game_id.clone();
        match self.commit(&game_id, version, &game)? {
            Commit::Done => {
                debug!(game_id, ?role, ?reason, "submission penalized");
                Ok(Some(SubmitResponse {
                    outcome: SubmitOutcome::Rejected {
                        reason,
                        message: reason.message().to_string(),
                        penalized: true,
                        required_sound: verdict.map(|v| v.required.clone()),
                        supplied_sound: verdict.map(|v| v.supplied.clone()),
                    },
                    game: game.view(now_ms),
                }))
            }
            Commit::Retry => Ok(None),
        }
    }

    /// Fail-closed without a penalty: the word cannot be verified because
    /// the dictionary is unreachable. The elapsed charge stays, so the
    /// checkpoint must move with it.
    fn reject_unverifiable(
        &self,
        mut game: GameSession,
        version: u64,
        now_ms: u64,
    ) -> Result<Option<SubmitResponse>, ApiError> {
        game.reset_checkpoint(now_ms);
        let game_id = game.game_id.clone();
        match self.commit(&game_id, version, &game)? {
            Commit::Done => Ok(Some(SubmitResponse {
                outcome: SubmitOutcome::Rejected {
                    reason: RejectReason::DictionaryUnavailable,
                    message: RejectReason::DictionaryUnavailable.message().to_string(),
                    penalized: false,
                    required_sound: None,
                    supplied_sound: None,
                },
                game: game.view(now_ms),
            })),
            Commit::Retry => Ok(None),
        }
    }

    /// Playing counts as presence: a submit or poll refreshes the player's
    /// room heartbeat the same way the explicit heartbeat route does.
    fn touch_room_seat(&self, room_id: &str, user_id: &str, now_ms: u64) {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return;
            };
            let mut room = record.value;
            let Some(seat) = room.seat_of(user_id) else {
                return;
            };
            room.heartbeat(seat, now_ms);
            match self.rooms.cas(room_id, record.version, room) {
                Err(CasError::Conflict) => continue,
                _ => return,
            }
        }
    }

    /// After any finish, unlink the game from its room so the occupants can
    /// view the result and later rematch or leave.
    fn release_room(&self, room_id: &str) {
        for _ in 0..MAX_CAS_RETRIES {
            let Some(record) = self.rooms.get(room_id) else {
                return;
            };
            let mut room = record.value;
            room.release_game();
            match self.rooms.cas(room_id, record.version, room) {
                Err(CasError::Conflict) => continue,
                _ => return,
            }
        }
    }
}

fn finished_response(game: GameSession, now_ms: u64) -> SubmitResponse {
    // finish() always sets both fields
    let winner = game.winner.unwrap_or(game.current_turn);
    let reason = game.winner_reason.unwrap_or(EndReason::TimeExceeded);
    SubmitResponse {
        outcome: SubmitOutcome::Finished { winner, reason },
        game: game.view(now_ms),
    }
}

/// Japanese display forms carry their reading when it differs from the
/// written word: `学校(がっこう)`. Korean forms are shown as written.
fn annotate(word: &str, reading: &str, lang: Role) -> String {
    if lang == Role::Japanese && word != reading {
        format!("{word}({reading})")
    } else {
        word.to_string()
    }
}
