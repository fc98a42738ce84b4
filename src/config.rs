use std::env;

/// Tunable game constants. The heartbeat and abandonment windows never
/// settled on fixed values in practice, so they are configuration.
#[derive(Debug, Clone, Copy)]
pub struct GameConfig {
    /// Per-player turn-time budget in seconds.
    pub turn_secs: f64,
    /// Fixed deduction for an invalid submission.
    pub penalty_secs: f64,
    /// Pre-game countdown before the first turn may be played.
    pub countdown_secs: f64,
    /// Host heartbeat window; a silent host gets the room deleted.
    pub host_idle_secs: f64,
    /// Guest heartbeat window; a silent guest is dropped from the room.
    pub guest_idle_secs: f64,
    /// Per-game observation window; a player unseen for this long forfeits.
    pub abandon_secs: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_secs: 90.0,
            penalty_secs: 5.0,
            countdown_secs: 5.0,
            host_idle_secs: 60.0,
            guest_idle_secs: 60.0,
            abandon_secs: 120.0,
        }
    }
}

pub struct Config {
    pub port: u16,
    pub game: GameConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = GameConfig::default();
        Self {
            port: env_or("PORT", 3000),
            game: GameConfig {
                turn_secs: env_or("KOTOBASHI_TURN_SECS", defaults.turn_secs),
                penalty_secs: env_or("KOTOBASHI_PENALTY_SECS", defaults.penalty_secs),
                countdown_secs: env_or("KOTOBASHI_COUNTDOWN_SECS", defaults.countdown_secs),
                host_idle_secs: env_or("KOTOBASHI_HOST_IDLE_SECS", defaults.host_idle_secs),
                guest_idle_secs: env_or("KOTOBASHI_GUEST_IDLE_SECS", defaults.guest_idle_secs),
                abandon_secs: env_or("KOTOBASHI_ABANDON_SECS", defaults.abandon_secs),
            },
        }
    }

    pub fn addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
