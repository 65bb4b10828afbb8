//! Snowball flight, expiry and hit detection

use serde::Serialize;
use uuid::Uuid;

use super::world::Player;
use super::{
    HIT_OFFSET_X, HIT_OFFSET_Y, HIT_RADIUS, RESPAWN_X, RESPAWN_Y, SAFE_ZONE_X, SAFE_ZONE_Y,
    SNOWBALL_LIFETIME_MS, SNOWBALL_OFFSET_X, SNOWBALL_OFFSET_Y, SNOWBALL_SPEED,
};

/// Active snowball in the arena
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snowball {
    /// Thrower; may no longer be connected
    #[serde(rename = "playerId")]
    pub owner_id: Uuid,
    pub x: f64,
    pub y: f64,
    /// Travel direction in radians, fixed at creation
    pub angle: f64,
    /// Remaining lifetime in milliseconds
    pub time_left: f64,
}

impl Snowball {
    pub fn new(owner_id: Uuid, x: f64, y: f64, angle: f64) -> Self {
        Self {
            owner_id,
            x,
            y,
            angle,
            time_left: SNOWBALL_LIFETIME_MS,
        }
    }

    /// Create a snowball leaving the thrower's hand
    pub fn thrown_by(player: &Player, angle: f64) -> Self {
        Self::new(
            player.id,
            player.x + SNOWBALL_OFFSET_X,
            player.y + SNOWBALL_OFFSET_Y,
            angle,
        )
    }

    /// Move one tick along the angle and age by `elapsed_ms`.
    /// Position steps are per tick; only the lifetime is time-scaled.
    pub fn update(&mut self, elapsed_ms: f64) {
        self.x += self.angle.cos() * SNOWBALL_SPEED;
        self.y += self.angle.sin() * SNOWBALL_SPEED;
        self.time_left -= elapsed_ms;
    }

    /// Check contact with a player's hit target point
    pub fn check_hit(&self, player: &Player) -> bool {
        let dx = (player.x + HIT_OFFSET_X) - self.x;
        let dy = (player.y + HIT_OFFSET_Y) - self.y;
        dx * dx + dy * dy <= HIT_RADIUS * HIT_RADIUS
    }

    /// Whether the snowball is still near the map origin, where hits are suppressed
    pub fn in_safe_zone(&self) -> bool {
        self.x < SAFE_ZONE_X || self.y < SAFE_ZONE_Y
    }

    pub fn expired(&self) -> bool {
        self.time_left <= 0.0
    }
}

/// Projectile simulation over the whole snowball collection
pub struct ProjectileSimulator;

impl ProjectileSimulator {
    /// Advance every snowball one tick, resolve hits and drop dead snowballs.
    /// Returns the ids of players melted this tick, in hit order.
    pub fn advance(
        snowballs: &mut Vec<Snowball>,
        players: &mut [Player],
        elapsed_ms: f64,
    ) -> Vec<Uuid> {
        let mut melted = Vec::new();

        for snowball in snowballs.iter_mut() {
            snowball.update(elapsed_ms);

            for player in players.iter_mut() {
                if player.id == snowball.owner_id {
                    continue;
                }
                if !snowball.check_hit(player) {
                    continue;
                }
                // First player in range decides; inside the safe zone that means no hit
                if !snowball.in_safe_zone() {
                    player.x = RESPAWN_X;
                    player.y = RESPAWN_Y;
                    snowball.time_left = 0.0;
                    melted.push(player.id);
                }
                break;
            }
        }

        snowballs.retain(|s| !s.expired());
        melted
    }
}
