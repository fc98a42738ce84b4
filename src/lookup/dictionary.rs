//! Live dictionary clients: Jisho for Japanese, the Korean Wiktionary for
//! Korean. Both are keyless public APIs.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{Dictionary, LookupError};
use crate::game::phonetics::to_hiragana;
use crate::game::session::Role;

const JISHO_URL: &str = "https://jisho.org/api/v1/search/words";
const KO_WIKTIONARY_URL: &str = "https://ko.wiktionary.org/w/api.php";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of a dictionary lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    pub valid: bool,
    /// Canonical phonetic form used for chain comparison. Equals the word
    /// for Korean; hiragana for Japanese.
    pub reading: String,
}

impl DictEntry {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            reading: String::new(),
        }
    }
}

pub struct WebDictionary {
    client: reqwest::Client,
}

impl WebDictionary {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn lookup_japanese(&self, word: &str) -> Result<DictEntry, LookupError> {
        let response = self
            .client
            .get(JISHO_URL)
            .query(&[("keyword", word)])
            .send()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let Some(results) = body["data"].as_array().filter(|r| !r.is_empty()) else {
            debug!(word, "no Jisho results");
            return Ok(DictEntry::invalid());
        };

        Ok(DictEntry {
            valid: true,
            reading: extract_japanese_reading(word, results),
        })
    }

    async fn lookup_korean(&self, word: &str) -> Result<DictEntry, LookupError> {
        let response = self
            .client
            .get(KO_WIKTIONARY_URL)
            .query(&[
                ("action", "opensearch"),
                ("search", word),
                ("limit", "1"),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        // Response shape: [query, [titles...], ...]
        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Unavailable(e.to_string()))?;

        let found = body[1]
            .as_array()
            .and_then(|titles| titles.first())
            .and_then(|t| t.as_str())
            .is_some_and(|title| squash(title) == squash(word));

        if !found {
            debug!(word, "no Wiktionary headword");
            return Ok(DictEntry::invalid());
        }

        // Korean chain comparison works on the written form directly.
        Ok(DictEntry {
            valid: true,
            reading: word.to_string(),
        })
    }
}

#[async_trait]
impl Dictionary for WebDictionary {
    async fn lookup(&self, word: &str, lang: Role) -> Result<DictEntry, LookupError> {
        match lang {
            Role::Japanese => self.lookup_japanese(word).await,
            Role::Korean => self.lookup_korean(word).await,
        }
    }
}

impl Default for WebDictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick the reading for the searched word. Prefer a sense whose written or
/// read form matches the query exactly; otherwise take the first reading on
/// offer; a kana-only query is its own reading.
fn extract_japanese_reading(word: &str, results: &[Value]) -> String {
    let mut first = None;
    for result in results {
        let Some(senses) = result["japanese"].as_array() else {
            continue;
        };
        for sense in senses {
            let written = sense["word"].as_str();
            let reading = sense["reading"].as_str();
            let candidate = reading.or(written);
            if first.is_none() {
                first = candidate;
            }
            if written == Some(word) || reading == Some(word) {
                if let Some(r) = candidate {
                    return scrub_reading(r);
                }
            }
        }
    }
    scrub_reading(first.unwrap_or(word))
}

/// Provider responses can carry decorations (numbering, grouping marks);
/// keep only kana and the long-vowel mark, folded to hiragana.
fn scrub_reading(raw: &str) -> String {
    to_hiragana(raw)
        .chars()
        .filter(|c| matches!(c, '\u{3041}'..='\u{3096}' | 'ー'))
        .collect()
}

fn squash(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reading_prefers_exact_match() {
        let results = json!([
            {"japanese": [{"word": "辛い", "reading": "からい"}]},
            {"japanese": [{"word": "学校", "reading": "がっこう"}]}
        ]);
        assert_eq!(
            extract_japanese_reading("学校", results.as_array().unwrap()),
            "がっこう"
        );
    }

    #[test]
    fn reading_falls_back_to_first_result() {
        let results = json!([
            {"japanese": [{"word": "水", "reading": "みず"}]}
        ]);
        assert_eq!(
            extract_japanese_reading("みづ", results.as_array().unwrap()),
            "みず"
        );
    }

    #[test]
    fn reading_is_scrubbed_of_decorations() {
        assert_eq!(scrub_reading("1. がっこう"), "がっこう");
        assert_eq!(scrub_reading("サーバー"), "さーばー");
    }

    #[test]
    fn kana_only_entry_uses_word_field() {
        let results = json!([
            {"japanese": [{"word": "りんご"}]}
        ]);
        assert_eq!(
            extract_japanese_reading("りんご", results.as_array().unwrap()),
            "りんご"
        );
    }
}
