//! Entity store: players, snowballs and per-connection input

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::collision::{Rect, TileCollisionMap};
use super::combat::{ProjectileSimulator, Snowball};
use super::movement::MovementResolver;
use super::snapshot::TickSnapshot;
use super::{Input, PLAYER_SIZE, SPAWN_X, SPAWN_Y};

/// Character skins a player can be assigned at join
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    /// The regular snowman
    #[serde(rename = "character")]
    Classic,
    NutshotAlien,
    /// Moves with inverted controls and cannot throw
    Target,
}

impl Character {
    pub const ALL: [Character; 3] = [Character::Classic, Character::NutshotAlien, Character::Target];

    /// Pick uniformly from all characters
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::ALL.choose(rng).unwrap_or(&Character::Classic)
    }

    /// Whether up/down and left/right are swapped for this character
    pub fn inverted_controls(self) -> bool {
        self == Character::Target
    }

    pub fn can_fire(self) -> bool {
        self != Character::Target
    }
}

/// Horizontal facing, driven by the last horizontal key pressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    #[default]
    Right,
}

/// A player in the arena (authoritative)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: Uuid,
    pub x: f64,
    pub y: f64,
    pub username: String,
    pub direction: Direction,
    pub character: Character,
}

impl Player {
    /// Create a player at the spawn point
    pub fn new(id: Uuid, nickname: Option<&str>, character: Character) -> Self {
        Self {
            id,
            x: SPAWN_X,
            y: SPAWN_Y,
            username: display_name(id, nickname),
            direction: Direction::default(),
            character,
        }
    }

    /// Map-collision footprint at the current position
    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.x,
            y: self.y,
            w: PLAYER_SIZE,
            h: PLAYER_SIZE,
        }
    }
}

/// Prefix the nickname with a snowflake, falling back to an id-derived name
fn display_name(id: Uuid, nickname: Option<&str>) -> String {
    match nickname.map(str::trim).filter(|n| !n.is_empty()) {
        Some(nickname) => format!("❄️{}", nickname),
        None => format!("❄️Player_{}", &id.simple().to_string()[..8]),
    }
}

/// All mutable simulation state, owned by the session task
#[derive(Debug, Default)]
pub struct World {
    players: Vec<Player>,
    snowballs: Vec<Snowball>,
    inputs: HashMap<Uuid, Input>,
    melted: Vec<Uuid>,
    tick: u64,
    #[cfg(test)]
    fail_next_step: bool,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a connection with all input flags released
    pub fn connect(&mut self, conn_id: Uuid) {
        self.inputs.insert(conn_id, Input::default());
        debug!(conn_id = %conn_id, "Connection tracked");
    }

    /// Spawn the connection's player. Returns `None` if it already has one.
    pub fn spawn_player(
        &mut self,
        conn_id: Uuid,
        nickname: Option<&str>,
        character: Character,
    ) -> Option<&Player> {
        if self.player(conn_id).is_some() {
            warn!(conn_id = %conn_id, "Player already spawned, ignoring nickname");
            return None;
        }

        let player = Player::new(conn_id, nickname, character);
        info!(
            conn_id = %conn_id,
            username = %player.username,
            character = ?player.character,
            "Player joined"
        );
        self.players.push(player);
        self.players.last()
    }

    /// Replace the connection's input. Unknown connections are ignored so a
    /// late frame cannot resurrect an entry after disconnect.
    pub fn set_input(&mut self, conn_id: Uuid, input: Input) -> bool {
        match self.inputs.get_mut(&conn_id) {
            Some(slot) => {
                *slot = input;
                true
            }
            None => false,
        }
    }

    /// Throw a snowball from the connection's player, if it has one that may throw
    pub fn fire(&mut self, conn_id: Uuid, angle: f64) -> bool {
        let Some(player) = self.player(conn_id) else {
            return false;
        };
        if !player.character.can_fire() {
            return false;
        }

        let snowball = Snowball::thrown_by(player, angle);
        self.snowballs.push(snowball);
        true
    }

    /// Forget the connection's player and input
    pub fn disconnect(&mut self, conn_id: Uuid) {
        let before = self.players.len();
        self.players.retain(|p| p.id != conn_id);
        self.inputs.remove(&conn_id);

        if self.players.len() != before {
            info!(conn_id = %conn_id, "Player left");
        }
    }

    /// Advance the simulation by one tick and capture the resulting snapshot.
    ///
    /// Movement runs for every player in join order, then all snowballs are
    /// advanced once. The melted list is drained into the snapshot.
    pub fn step(&mut self, map: &TileCollisionMap, elapsed_ms: f64) -> TickSnapshot {
        #[cfg(test)]
        if std::mem::take(&mut self.fail_next_step) {
            panic!("injected tick fault");
        }

        self.tick += 1;

        for player in self.players.iter_mut() {
            // No input yet means no movement this tick
            let Some(input) = self.inputs.get(&player.id) else {
                continue;
            };
            MovementResolver::resolve(player, input, map);
        }

        let melted = ProjectileSimulator::advance(&mut self.snowballs, &mut self.players, elapsed_ms);
        if !melted.is_empty() {
            debug!(tick = self.tick, count = melted.len(), "Players melted");
        }
        self.melted.extend(melted);

        TickSnapshot::capture(
            self.tick,
            &self.players,
            &self.snowballs,
            std::mem::take(&mut self.melted),
        )
    }

    pub fn player(&self, conn_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.id == conn_id)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    #[cfg(test)]
    pub(crate) fn snowballs(&self) -> &[Snowball] {
        &self.snowballs
    }

    #[cfg(test)]
    pub(crate) fn input(&self, conn_id: Uuid) -> Option<&Input> {
        self.inputs.get(&conn_id)
    }

    pub fn connection_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self, conn_id: Uuid) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == conn_id)
    }

    /// Make the next `step` panic once
    #[cfg(test)]
    pub(crate) fn fail_next_step(&mut self) {
        self.fail_next_step = true;
    }

    #[cfg(test)]
    pub(crate) fn push_snowball(&mut self, snowball: Snowball) {
        self.snowballs.push(snowball);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn joined(world: &mut World, character: Character) -> Uuid {
        let id = Uuid::new_v4();
        world.connect(id);
        world.spawn_player(id, Some("bob"), character);
        id
    }

    #[test]
    fn nickname_gets_snowflake_prefix() {
        let id = Uuid::new_v4();
        let player = Player::new(id, Some("  frosty "), Character::Classic);
        assert_eq!(player.username, "❄️frosty");
        assert_eq!((player.x, player.y), (SPAWN_X, SPAWN_Y));
        assert_eq!(player.direction, Direction::Right);
    }

    #[test]
    fn blank_nickname_falls_back_to_id() {
        let id = Uuid::new_v4();
        let expected = format!("❄️Player_{}", &id.simple().to_string()[..8]);
        assert_eq!(Player::new(id, None, Character::Classic).username, expected);
        assert_eq!(Player::new(id, Some("   "), Character::Classic).username, expected);
    }

    #[test]
    fn second_nickname_does_not_duplicate_player() {
        let mut world = World::new();
        let id = joined(&mut world, Character::Classic);
        assert!(world.spawn_player(id, Some("again"), Character::Target).is_none());
        assert_eq!(world.players().len(), 1);
        assert_eq!(world.players()[0].character, Character::Classic);
    }

    #[test]
    fn input_for_unknown_connection_is_dropped() {
        let mut world = World::new();
        let id = Uuid::new_v4();
        assert!(!world.set_input(id, Input { up: true, ..Input::default() }));
        assert!(world.input(id).is_none());
    }

    #[test]
    fn target_cannot_fire() {
        let mut world = World::new();
        let target = joined(&mut world, Character::Target);
        let alien = joined(&mut world, Character::NutshotAlien);

        assert!(!world.fire(target, 0.0));
        assert!(world.fire(alien, 0.0));
        assert!(!world.fire(Uuid::new_v4(), 0.0));
        assert_eq!(world.snowballs().len(), 1);
        assert_eq!(world.snowballs()[0].owner_id, alien);
    }

    #[test]
    fn fired_snowball_starts_at_launch_offset() {
        let mut world = World::new();
        let id = joined(&mut world, Character::Classic);
        world.fire(id, 0.0);

        let snowball = &world.snowballs()[0];
        assert_approx_eq!(snowball.x, 1007.5);
        assert_approx_eq!(snowball.y, 1058.5);
        assert_approx_eq!(snowball.time_left, 1000.0);
    }

    #[test]
    fn disconnect_removes_player_and_input() {
        let mut world = World::new();
        let id = joined(&mut world, Character::Classic);
        let other = joined(&mut world, Character::Classic);

        world.disconnect(id);
        assert!(world.player(id).is_none());
        assert!(world.input(id).is_none());
        assert_eq!(world.connection_count(), 1);

        let snapshot = world.step(&TileCollisionMap::default(), 15.6);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].id, other);
    }

    #[test]
    fn reconnect_with_reused_id_moves_again() {
        let mut world = World::new();
        let map = TileCollisionMap::default();
        let id = joined(&mut world, Character::Classic);
        world.disconnect(id);

        world.connect(id);
        world.spawn_player(id, Some("back"), Character::Classic);
        world.set_input(id, Input { right: true, ..Input::default() });
        let snapshot = world.step(&map, 15.6);

        assert_eq!(snapshot.players.len(), 1);
        assert_approx_eq!(snapshot.players[0].x, 1002.5);
    }

    #[test]
    fn player_without_input_is_skipped() {
        let mut world = World::new();
        let id = Uuid::new_v4();
        // Spawned without a tracked connection
        world.spawn_player(id, Some("ghost"), Character::Classic);
        let snapshot = world.step(&TileCollisionMap::default(), 15.6);
        assert_eq!((snapshot.players[0].x, snapshot.players[0].y), (SPAWN_X, SPAWN_Y));
    }

    #[test]
    fn empty_world_ticks_are_stable() {
        let mut world = World::new();
        let map = TileCollisionMap::default();
        for tick in 1..=100 {
            let snapshot = world.step(&map, 15.625);
            assert_eq!(snapshot.tick, tick);
            assert!(snapshot.players.is_empty());
            assert!(snapshot.snowballs.is_empty());
            assert!(snapshot.melted.is_empty());
            assert_eq!(snapshot.player_count, 0);
        }
        assert!(world.players().is_empty());
        assert_eq!(world.connection_count(), 0);
    }

    #[test]
    fn melted_ids_are_visible_for_one_tick() {
        let mut world = World::new();
        let map = TileCollisionMap::default();
        let thrower = joined(&mut world, Character::Classic);
        let victim = joined(&mut world, Character::Classic);
        if let Some(p) = world.player_mut(victim) {
            p.x = 1000.0;
            p.y = 1000.0;
        }
        world.push_snowball(Snowball::new(thrower, 1062.0, 1000.0, 0.0));

        let first = world.step(&map, 15.6);
        assert_eq!(first.melted, vec![victim]);
        assert!(first.snowballs.is_empty());

        let second = world.step(&map, 15.6);
        assert!(second.melted.is_empty());
    }

    #[test]
    fn seeded_character_choice_is_reproducible() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        let picks_a: Vec<_> = (0..16).map(|_| Character::random(&mut a)).collect();
        let picks_b: Vec<_> = (0..16).map(|_| Character::random(&mut b)).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn character_serializes_with_client_names() {
        assert_eq!(serde_json::to_value(Character::Classic).unwrap(), "character");
        assert_eq!(serde_json::to_value(Character::NutshotAlien).unwrap(), "nutshot_alien");
        assert_eq!(serde_json::to_value(Character::Target).unwrap(), "target");
    }
}
