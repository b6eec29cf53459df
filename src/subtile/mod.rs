//! High-resolution terrain patches
//!
//! A sub-tile refines exactly one coarse cell into a
//! `(high_cells_x + 1) x (high_cells_y + 1)` sample grid. Tiles are owned by
//! the [`SubTilePool`]; the buffer slot a tile renders through is a fixed
//! numeric range handed to the next occupant on eviction.

mod pool;

pub use pool::SubTilePool;

use crate::geometry::GridLayout;

#[derive(Debug, Clone)]
pub struct SubTile {
    /// Owning coarse cell.
    pub cell_x: usize,
    pub cell_y: usize,
    /// World origin of the tile (the cell's min corner).
    pub x_pos: f64,
    pub y_pos: f64,
    /// Key into the pool's cell map: `cell_y * cells_x + cell_x`.
    pub map_index: usize,
    heights: Vec<f64>,
    stride: usize,
}

impl SubTile {
    pub fn new(cell_x: usize, cell_y: usize, layout: &GridLayout) -> Self {
        Self {
            cell_x,
            cell_y,
            x_pos: cell_x as f64 * layout.step_x,
            y_pos: cell_y as f64 * layout.step_y,
            map_index: layout.map_index(cell_x, cell_y),
            heights: vec![0.0; layout.high_verts_x() * layout.high_verts_y()],
            stride: layout.high_verts_x(),
        }
    }

    #[inline]
    pub fn height(&self, x: usize, y: usize) -> f64 {
        self.heights[y * self.stride + x]
    }

    #[inline]
    pub fn set_height(&mut self, x: usize, y: usize, value: f64) {
        self.heights[y * self.stride + x] = value;
    }

    /// Row-major sample view, stride `high_verts_x`.
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }
}
