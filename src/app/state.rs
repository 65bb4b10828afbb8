//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::{GameSession, SessionHandle};
use crate::map::MapLayers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionHandle,
    /// Encoded `map` message, identical for every connection
    pub map_payload: Arc<String>,
}

impl AppState {
    /// Build the state and the session it talks to. The caller is
    /// responsible for spawning `GameSession::run`.
    pub fn new(config: Config, layers: &MapLayers) -> Result<(Self, GameSession), serde_json::Error> {
        let config = Arc::new(config);

        // Encode the map once instead of per connection
        let map_payload = Arc::new(layers.message().to_json()?);

        let seed = config.rng_seed.unwrap_or_else(rand::random);
        let (session, handle) = GameSession::new(layers.collision_map(), seed);

        let state = Self {
            config,
            session: handle,
            map_payload,
        };

        Ok((state, session))
    }
}
