//! External collaborators: dictionary lookup, translation and the starting
//! word source. The core only sees the traits here; live HTTP clients and
//! the test fakes both implement them.

mod dictionary;
mod seed;
mod translate;

pub use dictionary::{DictEntry, WebDictionary};
pub use seed::BuiltinSeeds;
pub use translate::MyMemoryTranslator;

use async_trait::async_trait;
use thiserror::Error;

use crate::game::session::{Role, WordPair};

#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("dictionary request failed: {0}")]
    Unavailable(String),
}

/// Headword existence plus canonical phonetic reading. Korean readings equal
/// the word itself; Japanese readings come back in kana.
#[async_trait]
pub trait Dictionary: Send + Sync {
    async fn lookup(&self, word: &str, lang: Role) -> Result<DictEntry, LookupError>;
}

/// Best-effort translation. Implementations must fall back to returning the
/// input rather than failing; a translation outage never blocks the game.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, word: &str, from: Role, to: Role) -> String;
}

/// Source of the seeded starting word for a fresh game.
pub trait SeedSource: Send + Sync {
    fn pick(&self) -> WordPair;
}
