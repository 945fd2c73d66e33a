//! Server configuration from environment variables.

use anyhow::Context;
use carcassonne_core::{TileCatalog, MAX_PLAYERS, MIN_PLAYERS};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::info;

/// Settings shared by every room on the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub addr: SocketAddr,
    /// Maximum players per room.
    pub max_players: usize,
    /// Tiles every new room plays with.
    pub catalog: TileCatalog,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_players: MAX_PLAYERS,
            catalog: TileCatalog::standard(),
        }
    }
}

impl ServerConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `SERVER_ADDR` - Listen address (default: 0.0.0.0:8080)
    /// - `MAX_PLAYERS` - Players per room, clamped to 2..=4 (default: 4)
    /// - `TILE_CATALOG` - Path to a JSON tile catalog (default: the standard set)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(addr) = read_env("SERVER_ADDR")? {
            config.addr = addr;
        }

        if let Some(max_players) = read_env::<usize>("MAX_PLAYERS")? {
            config.max_players = max_players.clamp(MIN_PLAYERS, MAX_PLAYERS);
        }

        if let Ok(path) = env::var("TILE_CATALOG") {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read tile catalog {}", path))?;
            config.catalog = TileCatalog::from_json(&json)
                .with_context(|| format!("failed to load tile catalog {}", path))?;
            info!(
                "Loaded tile catalog {} ({} tiles)",
                path,
                config.catalog.total_tiles()
            );
        }

        Ok(config)
    }
}

/// Parse an environment variable; unset is `None`, unparsable is an error.
fn read_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map(Some)
            .with_context(|| format!("invalid {} {:?}", key, value)),
        Err(_) => Ok(None),
    }
}
