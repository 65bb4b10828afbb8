//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"type": <event name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::combat::Snowball;
use crate::game::world::Player;
use crate::game::Input;
use crate::map::TileLayer;

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMsg {
    /// Nickname chosen in the join dialog; `null` picks a default name
    #[serde(rename = "send-nickname")]
    SendNickname(Option<String>),

    /// Full replacement of the directional key state
    #[serde(rename = "inputs")]
    Inputs(Input),

    /// Throw a snowball at the given angle in radians
    #[serde(rename = "snowballs")]
    Snowballs(f64),
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg<'a> {
    /// Map layers, sent once per connection
    #[serde(rename = "map")]
    Map {
        ground: &'a TileLayer,
        trees: &'a TileLayer,
        /// Collision layer, also drawn by the client
        trees2: &'a TileLayer,
    },

    /// All players after this tick
    #[serde(rename = "players")]
    Players(&'a [Player]),

    /// All live snowballs after this tick
    #[serde(rename = "snowballs")]
    Snowballs(&'a [Snowball]),

    /// Number of players in the arena
    #[serde(rename = "user-joined")]
    UserJoined(usize),

    /// Players melted during this tick
    #[serde(rename = "players-melted")]
    PlayersMelted(&'a [Uuid]),
}

impl ServerMsg<'_> {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
