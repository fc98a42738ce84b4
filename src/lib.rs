pub mod config;
pub mod error;
pub mod game;
pub mod lookup;
mod routes;
pub mod store;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;

use config::GameConfig;
use game::room::RoomSession;
use game::session::GameSession;
use game::{Pipeline, RoomLifecycle};
use lookup::{BuiltinSeeds, Dictionary, MyMemoryTranslator, SeedSource, Translator, WebDictionary};
use store::{MemoryStore, Store};

/// Swappable collaborators plus the game constants. Tests inject fakes here;
/// production uses [`Deps::live`].
pub struct Deps {
    pub dictionary: Arc<dyn Dictionary>,
    pub translator: Arc<dyn Translator>,
    pub seeds: Arc<dyn SeedSource>,
    pub game: GameConfig,
}

impl Deps {
    pub fn live(game: GameConfig) -> Self {
        Self {
            dictionary: Arc::new(WebDictionary::new()),
            translator: Arc::new(MyMemoryTranslator::new()),
            seeds: Arc::new(BuiltinSeeds),
            game,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<RoomLifecycle>,
    pub pipeline: Arc<Pipeline>,
}

pub fn app(deps: Deps) -> Router {
    let rooms: Arc<dyn Store<RoomSession>> = Arc::new(MemoryStore::new());
    let games: Arc<dyn Store<GameSession>> = Arc::new(MemoryStore::new());

    let lifecycle = RoomLifecycle::new(
        rooms.clone(),
        games.clone(),
        deps.seeds,
        deps.game,
    );
    let pipeline = Pipeline::new(
        games,
        rooms,
        deps.dictionary,
        deps.translator,
        deps.game,
    );
    let state = AppState {
        lifecycle: Arc::new(lifecycle),
        pipeline: Arc::new(pipeline),
    };

    routes::router()
        .layer(CorsLayer::permissive())
        .with_state(state)
}
