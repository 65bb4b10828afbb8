//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Tiled JSON export holding the ground, trees and collision layers
    pub map_path: PathBuf,
    /// Directory served for every path that is not an API route
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS (any origin when empty)
    pub client_origins: Vec<String>,

    /// Seed for character assignment; random when unset
    pub rng_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
        };

        let rng_seed = match env::var("RNG_SEED") {
            Ok(raw) => Some(raw.trim().parse().map_err(|_| ConfigError::InvalidSeed(raw))?),
            Err(_) => None,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            map_path: env::var("MAP_PATH")
                .unwrap_or_else(|_| "assets/map.json".to_string())
                .into(),
            static_dir: env::var("STATIC_DIR")
                .unwrap_or_else(|_| "public".to_string())
                .into(),
            client_origins: env::var("CLIENT_ORIGIN")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),

            rng_seed,
        })
    }

    /// Loopback config with a fixed seed and no static assets
    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            log_level: "info".to_string(),
            map_path: "assets/map.json".into(),
            static_dir: "/nonexistent-static-dir".into(),
            client_origins: Vec::new(),
            rng_seed: Some(1),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("RNG_SEED must be an unsigned integer, got {0:?}")]
    InvalidSeed(String),
}
