//! Tiled JSON map loading

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::{MapError, MapLayers, Tile, TileLayer, COLLISION_LAYER, GROUND_LAYER, TREES_LAYER};
use crate::game::TILE_SIZE;

/// Tiled stores flip/rotation flags in the top bits of each gid
const GID_FLAG_MASK: u32 = 0xE000_0000;

#[derive(Debug, Deserialize)]
struct TiledMap {
    #[serde(default)]
    tilewidth: Option<u32>,
    #[serde(default)]
    layers: Vec<TiledLayer>,
    #[serde(default)]
    tilesets: Vec<TiledTileset>,
}

#[derive(Debug, Deserialize)]
struct TiledLayer {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    width: usize,
    #[serde(default)]
    height: usize,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    data: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct TiledTileset {
    firstgid: u32,
}

/// Read and parse the map file at `path`
pub async fn load_map(path: &Path) -> Result<MapLayers, MapError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let layers = parse_tiled_json(&raw)?;
    info!(
        path = %path.display(),
        rows = layers.rows(),
        cols = layers.cols(),
        "Map loaded"
    );
    Ok(layers)
}

/// Parse a Tiled JSON export into validated layers
pub fn parse_tiled_json(raw: &str) -> Result<MapLayers, MapError> {
    let map: TiledMap = serde_json::from_str(raw)?;

    if let Some(tile_width) = map.tilewidth {
        if tile_width as f64 != TILE_SIZE {
            return Err(MapError::TileSize(tile_width));
        }
    }

    let mut first_gids: Vec<u32> = map.tilesets.iter().map(|t| t.firstgid).collect();
    first_gids.sort_unstable();

    let layers = MapLayers {
        ground: grid_for(&map, GROUND_LAYER, &first_gids)?,
        trees: grid_for(&map, TREES_LAYER, &first_gids)?,
        collision: grid_for(&map, COLLISION_LAYER, &first_gids)?,
    };
    layers.validate()?;
    Ok(layers)
}

/// Turn the flat gid array of one named tile layer into rows of tiles
fn grid_for(map: &TiledMap, name: &'static str, first_gids: &[u32]) -> Result<TileLayer, MapError> {
    let layer = map
        .layers
        .iter()
        .find(|l| l.kind == "tilelayer" && l.name == name)
        .ok_or(MapError::MissingLayer(name))?;

    if let Some(encoding) = layer.encoding.as_deref() {
        if encoding != "csv" {
            return Err(MapError::UnsupportedEncoding {
                layer: layer.name.clone(),
                encoding: encoding.to_string(),
            });
        }
    }

    let expected = layer.width * layer.height;
    if layer.data.len() != expected {
        return Err(MapError::LayerSize {
            layer: layer.name.clone(),
            expected,
            actual: layer.data.len(),
        });
    }
    if layer.width == 0 {
        return Ok(Vec::new());
    }

    Ok(layer
        .data
        .chunks(layer.width)
        .map(|row| row.iter().map(|&gid| tile_for_gid(gid, first_gids)).collect())
        .collect())
}

/// Resolve a gid to a tileset-local id; gid 0 is an empty cell
fn tile_for_gid(gid: u32, first_gids: &[u32]) -> Option<Tile> {
    let gid = gid & !GID_FLAG_MASK;
    if gid == 0 {
        return None;
    }
    let first_gid = first_gids
        .iter()
        .rev()
        .find(|&&first| first <= gid)
        .copied()
        .unwrap_or(1);
    Some(Tile { id: gid - first_gid })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tiled(layers: serde_json::Value) -> String {
        json!({
            "width": 3,
            "height": 2,
            "tilewidth": 16,
            "tileheight": 16,
            "tilesets": [{"firstgid": 1}, {"firstgid": 257}],
            "layers": layers,
        })
        .to_string()
    }

    fn tile_layer(name: &str, data: &[u32]) -> serde_json::Value {
        json!({"name": name, "type": "tilelayer", "width": 3, "height": 2, "data": data})
    }

    #[test]
    fn parses_three_layers() {
        let raw = tiled(json!([
            tile_layer("ground", &[1, 2, 3, 4, 5, 6]),
            {"name": "objects", "type": "objectgroup", "objects": []},
            tile_layer("trees", &[0, 0, 0, 0, 258, 0]),
            tile_layer("collision", &[0, 7, 0, 0, 0, 0]),
        ]));

        let layers = parse_tiled_json(&raw).unwrap();
        assert_eq!((layers.rows(), layers.cols()), (2, 3));
        assert_eq!(layers.ground[0][0], Some(Tile { id: 0 }));
        assert_eq!(layers.ground[1][2], Some(Tile { id: 5 }));
        // Second tileset starts at gid 257
        assert_eq!(layers.trees[1][1], Some(Tile { id: 1 }));
        assert_eq!(layers.trees[0][0], None);

        let collision = layers.collision_map();
        assert!(collision.solid_at(0, 1));
        assert!(!collision.solid_at(0, 0));
    }

    #[test]
    fn flip_flags_are_ignored() {
        assert_eq!(tile_for_gid(0x8000_0005, &[1]), Some(Tile { id: 4 }));
        assert_eq!(tile_for_gid(0x8000_0000, &[1]), None);
    }

    #[test]
    fn missing_layer_is_reported() {
        let raw = tiled(json!([
            tile_layer("ground", &[1; 6]),
            tile_layer("trees", &[0; 6]),
        ]));
        assert!(matches!(
            parse_tiled_json(&raw),
            Err(MapError::MissingLayer(COLLISION_LAYER))
        ));
    }

    #[test]
    fn truncated_layer_is_reported() {
        let raw = tiled(json!([
            tile_layer("ground", &[1; 6]),
            tile_layer("trees", &[0; 5]),
            tile_layer("collision", &[0; 6]),
        ]));
        assert!(matches!(
            parse_tiled_json(&raw),
            Err(MapError::LayerSize { expected: 6, actual: 5, .. })
        ));
    }

    #[test]
    fn unequal_layers_are_rejected() {
        let data = vec![0u32; 6];
        let raw = tiled(json!([
            tile_layer("ground", &[1; 6]),
            tile_layer("trees", &[0; 6]),
            {"name": "collision", "type": "tilelayer", "width": 2, "height": 3, "data": data},
        ]));
        assert!(matches!(
            parse_tiled_json(&raw),
            Err(MapError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn base64_layers_are_unsupported() {
        let raw = tiled(json!([
            {"name": "ground", "type": "tilelayer", "width": 3, "height": 2,
             "encoding": "base64", "data": []},
        ]));
        assert!(matches!(
            parse_tiled_json(&raw),
            Err(MapError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn wrong_tile_size_is_rejected() {
        let raw = json!({"tilewidth": 32, "layers": [], "tilesets": []}).to_string();
        assert!(matches!(parse_tiled_json(&raw), Err(MapError::TileSize(32))));
    }

    #[test]
    fn bundled_map_is_valid_and_spawn_points_are_clear() {
        use crate::game::collision::Rect;
        use crate::game::{PLAYER_SIZE, RESPAWN_X, RESPAWN_Y, SPAWN_X, SPAWN_Y};

        let layers = parse_tiled_json(include_str!("../../assets/map.json")).unwrap();
        let map = layers.collision_map();
        for (x, y) in [(SPAWN_X, SPAWN_Y), (RESPAWN_X, RESPAWN_Y)] {
            let footprint = Rect { x, y, w: PLAYER_SIZE, h: PLAYER_SIZE };
            assert!(!map.overlaps_solid(&footprint), "({}, {}) is inside a wall", x, y);
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = load_map(Path::new("/definitely/not/here/map.json")).await;
        assert!(matches!(result, Err(MapError::Io { .. })));
    }
}
