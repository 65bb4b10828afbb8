//! Map layers shared by the collision grid and the client renderer

pub mod loader;

pub use loader::load_map;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::game::TileCollisionMap;
use crate::ws::protocol::ServerMsg;

/// Layer names looked up in the map file
pub const GROUND_LAYER: &str = "ground";
pub const TREES_LAYER: &str = "trees";
pub const COLLISION_LAYER: &str = "collision";

/// One placed tile; `id` indexes the tileset image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub id: u32,
}

/// Rows of columns; `None` is an empty cell
pub type TileLayer = Vec<Vec<Option<Tile>>>;

/// The three equally sized layers of a loaded map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapLayers {
    pub ground: TileLayer,
    pub trees: TileLayer,
    pub collision: TileLayer,
}

impl MapLayers {
    /// Map with no tiles at all. Used when loading fails so the server can
    /// still run without collisions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Check that every layer is non-empty and all share one rectangular shape
    pub fn validate(&self) -> Result<(), MapError> {
        let rows = self.ground.len();
        let cols = self.ground.first().map(Vec::len).unwrap_or(0);

        for (name, layer) in self.named_layers() {
            if layer.is_empty() || layer.iter().all(Vec::is_empty) {
                return Err(MapError::EmptyLayer(name));
            }
            if layer.len() != rows || layer.iter().any(|row| row.len() != cols) {
                return Err(MapError::DimensionMismatch {
                    layer: name,
                    expected_rows: rows,
                    expected_cols: cols,
                });
            }
        }
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.ground.len()
    }

    pub fn cols(&self) -> usize {
        self.ground.first().map(Vec::len).unwrap_or(0)
    }

    /// Solid grid derived from the collision layer
    pub fn collision_map(&self) -> TileCollisionMap {
        TileCollisionMap::from_layer(&self.collision)
    }

    /// The one-time `map` message for a new connection
    pub fn message(&self) -> ServerMsg<'_> {
        ServerMsg::Map {
            ground: &self.ground,
            trees: &self.trees,
            trees2: &self.collision,
        }
    }

    fn named_layers(&self) -> [(&'static str, &TileLayer); 3] {
        [
            (GROUND_LAYER, &self.ground),
            (TREES_LAYER, &self.trees),
            (COLLISION_LAYER, &self.collision),
        ]
    }
}

/// Map loading errors
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Failed to read map file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid map JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Map has no tile layer named {0:?}")]
    MissingLayer(&'static str),

    #[error("Layer {layer:?} uses unsupported encoding {encoding:?}")]
    UnsupportedEncoding { layer: String, encoding: String },

    #[error("Layer {layer:?} has {actual} cells, expected {expected}")]
    LayerSize {
        layer: String,
        expected: usize,
        actual: usize,
    },

    #[error("Map tiles are {0}px, expected 16px")]
    TileSize(u32),

    #[error("Layer {0:?} is empty")]
    EmptyLayer(&'static str),

    #[error("Layer {layer:?} does not match the {expected_rows}x{expected_cols} ground layer")]
    DimensionMismatch {
        layer: &'static str,
        expected_rows: usize,
        expected_cols: usize,
    },
}
