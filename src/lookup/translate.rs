//! MyMemory translation client. Strictly best-effort: any failure, timeout
//! or provider-side error falls back to the untranslated input so a flaky
//! provider can never stall a running game.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use super::Translator;
use crate::game::session::Role;

const MYMEMORY_URL: &str = "https://api.mymemory.translated.net/get";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
// A contact address lifts the provider's daily word quota.
const CONTACT: &str = "dev@example.com";

pub struct MyMemoryTranslator {
    client: reqwest::Client,
}

impl MyMemoryTranslator {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }

    async fn request(&self, word: &str, from: Role, to: Role) -> Option<String> {
        let langpair = format!("{}|{}", from.lang_code(), to.lang_code());
        let response = self
            .client
            .get(MYMEMORY_URL)
            .query(&[("q", word), ("langpair", &langpair), ("de", CONTACT)])
            .send()
            .await
            .ok()?;

        let body: Value = response.json().await.ok()?;

        // HTTP 200 does not mean success; the provider reports its own status.
        if body["responseStatus"].as_i64() != Some(200) {
            warn!(word, detail = ?body["responseDetails"], "translation provider error");
            return None;
        }

        body["responseData"]["translatedText"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .map(String::from)
    }
}

#[async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, word: &str, from: Role, to: Role) -> String {
        match self.request(word, from, to).await {
            Some(translated) => translated,
            None => {
                warn!(word, "translation failed, keeping original");
                word.to_string()
            }
        }
    }
}

impl Default for MyMemoryTranslator {
    fn default() -> Self {
        Self::new()
    }
}
