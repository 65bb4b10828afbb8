//! Tile collision grid built from the map's collision layer

use crate::map::TileLayer;

use super::TILE_SIZE;

/// Axis-aligned rectangle in world units, `(x, y)` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    /// Strict overlap test; rectangles that only share an edge do not overlap
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }
}

/// Immutable grid of solid cells.
///
/// Cells outside the grid are open ground, so players may walk off the
/// edges of the loaded map.
#[derive(Debug, Clone, Default)]
pub struct TileCollisionMap {
    rows: usize,
    cols: usize,
    solid: Vec<bool>,
}

impl TileCollisionMap {
    /// Build from a collision layer; any defined tile marks its cell solid
    pub fn from_layer(layer: &TileLayer) -> Self {
        let rows = layer.len();
        let cols = layer.first().map(Vec::len).unwrap_or(0);
        let mut solid = vec![false; rows * cols];

        for (row, cells) in layer.iter().enumerate() {
            for (col, cell) in cells.iter().take(cols).enumerate() {
                solid[row * cols + col] = cell.is_some();
            }
        }

        Self { rows, cols, solid }
    }

    /// Build directly from a boolean grid (rows of columns)
    #[cfg(test)]
    pub fn from_solid_rows(grid: &[Vec<bool>]) -> Self {
        let rows = grid.len();
        let cols = grid.first().map(Vec::len).unwrap_or(0);
        let mut solid = vec![false; rows * cols];
        for (row, cells) in grid.iter().enumerate() {
            for (col, &cell) in cells.iter().take(cols).enumerate() {
                solid[row * cols + col] = cell;
            }
        }
        Self { rows, cols, solid }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Whether the cell is solid; out-of-range cells are never solid
    pub fn solid_at(&self, row: i64, col: i64) -> bool {
        if row < 0 || col < 0 {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.solid[row * self.cols + col]
    }

    /// Whether `rect` overlaps any solid tile.
    ///
    /// Only the tiles in the window `floor(x / T) ..= ceil((x + w) / T)` (and
    /// the same for rows) are inspected, clamped to the grid.
    pub fn overlaps_solid(&self, rect: &Rect) -> bool {
        if self.rows == 0 || self.cols == 0 {
            return false;
        }

        let max_row_idx = self.rows as i64 - 1;
        let max_col_idx = self.cols as i64 - 1;
        let min_col = ((rect.x / TILE_SIZE).floor() as i64).max(0);
        let max_col = (((rect.x + rect.w) / TILE_SIZE).ceil() as i64).min(max_col_idx);
        let min_row = ((rect.y / TILE_SIZE).floor() as i64).max(0);
        let max_row = (((rect.y + rect.h) / TILE_SIZE).ceil() as i64).min(max_row_idx);

        for row in min_row..=max_row {
            for col in min_col..=max_col {
                if !self.solid_at(row, col) {
                    continue;
                }
                let tile = Rect {
                    x: col as f64 * TILE_SIZE,
                    y: row as f64 * TILE_SIZE,
                    w: TILE_SIZE,
                    h: TILE_SIZE,
                };
                if rect.overlaps(&tile) {
                    return true;
                }
            }
        }
        false
    }
}
