//! Game simulation modules

pub mod collision;
pub mod combat;
pub mod movement;
pub mod session;
pub mod snapshot;
pub mod world;

pub use collision::TileCollisionMap;
pub use session::{GameSession, SessionHandle};
pub use snapshot::TickSnapshot;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Edge length of one map tile in world units
pub const TILE_SIZE: f64 = 16.0;
/// Edge length of the square player footprint used for map collision
pub const PLAYER_SIZE: f64 = 16.0;
/// Player displacement per tick on each active axis
pub const SPEED: f64 = 2.5;

/// Snowball displacement per tick along its angle
pub const SNOWBALL_SPEED: f64 = 3.0;
/// Snowball time-to-live at creation, in milliseconds
pub const SNOWBALL_LIFETIME_MS: f64 = 1000.0;
/// Launch point relative to the thrower's top-left corner
pub const SNOWBALL_OFFSET_X: f64 = 7.5;
pub const SNOWBALL_OFFSET_Y: f64 = 58.5;

/// Hit target point relative to the player's top-left corner
pub const HIT_OFFSET_X: f64 = 65.0;
pub const HIT_OFFSET_Y: f64 = 0.0;
/// Maximum distance between snowball and hit target point for a hit
pub const HIT_RADIUS: f64 = 65.0;

/// Snowballs left of or above these coordinates never register hits
pub const SAFE_ZONE_X: f64 = 300.0;
pub const SAFE_ZONE_Y: f64 = 300.0;

/// Where new players appear
pub const SPAWN_X: f64 = 1000.0;
pub const SPAWN_Y: f64 = 1000.0;
/// Where melted players are sent back to
pub const RESPAWN_X: f64 = 250.0;
pub const RESPAWN_Y: f64 = 250.0;

/// Latest directional input for one connection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

/// Discrete mutation sent from a connection to the session task
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Connection opened; starts tracking its input
    Connect { conn_id: Uuid },
    /// Nickname submitted; spawns the player
    Nickname {
        conn_id: Uuid,
        nickname: Option<String>,
    },
    /// Input flags replaced wholesale
    Input { conn_id: Uuid, input: Input },
    /// Throw a snowball at `angle` radians
    Fire { conn_id: Uuid, angle: f64 },
    /// Connection closed
    Disconnect { conn_id: Uuid },
}
