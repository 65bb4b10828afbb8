//! Per-tick snapshot handed to the broadcast channel

use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

use super::combat::Snowball;
use super::world::Player;

/// Immutable copy of the world after one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    pub tick: u64,
    pub players: Vec<Player>,
    pub snowballs: Vec<Snowball>,
    pub player_count: usize,
    /// Players melted during this tick only
    pub melted: Vec<Uuid>,
}

impl TickSnapshot {
    pub fn capture(tick: u64, players: &[Player], snowballs: &[Snowball], melted: Vec<Uuid>) -> Self {
        Self {
            tick,
            players: players.to_vec(),
            snowballs: snowballs.to_vec(),
            player_count: players.len(),
            melted,
        }
    }

    /// The named messages a client receives for this tick, in send order
    pub fn messages(&self) -> [ServerMsg<'_>; 4] {
        [
            ServerMsg::Players(&self.players),
            ServerMsg::Snowballs(&self.snowballs),
            ServerMsg::UserJoined(self.player_count),
            ServerMsg::PlayersMelted(&self.melted),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::Character;

    #[test]
    fn messages_follow_broadcast_order() {
        let player = Player::new(Uuid::new_v4(), Some("a"), Character::Classic);
        let snapshot = TickSnapshot::capture(3, &[player.clone()], &[], vec![player.id]);

        let names: Vec<String> = snapshot
            .messages()
            .iter()
            .map(|m| serde_json::to_value(m).unwrap()["type"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["players", "snowballs", "user-joined", "players-melted"]);
        assert_eq!(snapshot.player_count, 1);
    }
}
