//! Player movement against the tile collision map

use super::collision::TileCollisionMap;
use super::world::{Direction, Player};
use super::{Input, SPEED};

/// Resolves one tick of player displacement
pub struct MovementResolver;

impl MovementResolver {
    /// Move `player` one tick according to `input`.
    ///
    /// The vertical axis is applied and checked first, then the horizontal
    /// axis, each rolled back independently on collision so players slide
    /// along walls. When opposite keys are held, up wins over down and left
    /// wins over right.
    pub fn resolve(player: &mut Player, input: &Input, map: &TileCollisionMap) {
        let sign = if player.character.inverted_controls() { -1.0 } else { 1.0 };

        let previous_y = player.y;
        if let Some(step) = Self::vertical_step(input) {
            player.y += step * sign;
        }
        if map.overlaps_solid(&player.bounds()) {
            player.y = previous_y;
        }

        let previous_x = player.x;
        if let Some((step, facing)) = Self::horizontal_step(input) {
            player.x += step * sign;
            // Facing follows the key, not the (possibly inverted) motion
            player.direction = facing;
        }
        if map.overlaps_solid(&player.bounds()) {
            player.x = previous_x;
        }
    }

    fn vertical_step(input: &Input) -> Option<f64> {
        if input.up {
            Some(-SPEED)
        } else if input.down {
            Some(SPEED)
        } else {
            None
        }
    }

    fn horizontal_step(input: &Input) -> Option<(f64, Direction)> {
        if input.left {
            Some((-SPEED, Direction::Left))
        } else if input.right {
            Some((SPEED, Direction::Right))
        } else {
            None
        }
    }
}
