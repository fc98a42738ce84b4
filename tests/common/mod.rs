use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use kotobashi::config::GameConfig;
use kotobashi::game::session::{Role, WordPair};
use kotobashi::lookup::{DictEntry, Dictionary, LookupError, SeedSource, Translator};
use kotobashi::{Deps, app};

pub struct TestServer {
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    /// Mint a user id and return it.
    pub async fn login(&self, player_type: &str) -> String {
        let (status, body) = self
            .post("/api/users/login", json!({"player_type": player_type}))
            .await;
        assert_eq!(status, 200);
        body["user_id"].as_str().unwrap().to_string()
    }
}

struct FakeDictionary {
    readings: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Dictionary for FakeDictionary {
    async fn lookup(&self, word: &str, lang: Role) -> Result<DictEntry, LookupError> {
        match self.readings.get(word) {
            Some(reading) => Ok(DictEntry {
                valid: true,
                reading: match lang {
                    Role::Korean => word.to_string(),
                    Role::Japanese => reading.to_string(),
                },
            }),
            None => Ok(DictEntry::invalid()),
        }
    }
}

struct FakeTranslator {
    map: HashMap<&'static str, &'static str>,
}

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, word: &str, _from: Role, _to: Role) -> String {
        self.map
            .get(word)
            .map_or_else(|| word.to_string(), |t| t.to_string())
    }
}

struct FixedSeed;

impl SeedSource for FixedSeed {
    fn pick(&self) -> WordPair {
        WordPair {
            korean: "사과".into(),
            japanese: "りんご".into(),
        }
    }
}

/// Server over in-memory state with a deterministic starting word (사과 /
/// りんご) and a closed fake vocabulary: 과자↔おかし, しか↔사슴, plus
/// しんかんせん for the moraic-nasal ending.
pub async fn spawn_test_server(game: GameConfig) -> TestServer {
    let readings = HashMap::from([
        ("과자", "과자"),
        ("사슴", "사슴"),
        ("おかし", "おかし"),
        ("しか", "しか"),
        ("しんかんせん", "しんかんせん"),
    ]);
    let translations = HashMap::from([
        ("과자", "おかし"),
        ("しか", "사슴"),
        ("しんかんせん", "신칸센"),
    ]);

    let deps = Deps {
        dictionary: Arc::new(FakeDictionary { readings }),
        translator: Arc::new(FakeTranslator { map: translations }),
        seeds: Arc::new(FixedSeed),
        game,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app(deps)).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
    }
}

/// Game constants with no countdown and comfortable windows; individual
/// tests shrink the window they exercise.
pub fn test_config() -> GameConfig {
    GameConfig {
        countdown_secs: 0.0,
        ..GameConfig::default()
    }
}

/// Create a room as `host` and join it as `guest`, returning
/// (room_id, game_id).
pub async fn start_game(
    server: &TestServer,
    host: &str,
    host_role: &str,
    guest: &str,
) -> (String, String) {
    let guest_role = match host_role {
        "korean" => "japanese",
        _ => "korean",
    };
    let (status, room) = server
        .post(
            "/api/rooms",
            json!({
                "user_id": host,
                "player_type": host_role,
                "room_name": "대전",
            }),
        )
        .await;
    assert_eq!(status, 200);
    let room_id = room["room_id"].as_str().unwrap().to_string();

    let (status, joined) = server
        .post(
            &format!("/api/rooms/{room_id}/join"),
            json!({"user_id": guest, "player_type": guest_role}),
        )
        .await;
    assert_eq!(status, 200);
    let game_id = joined["game_id"].as_str().unwrap().to_string();

    (room_id, game_id)
}
