//! Derived buffer sizing and slot arithmetic
//!
//! All sizing is fixed at construction: the coarse mesh occupies the leading
//! region of the vertex/index buffers and every sub-tile slot after it has
//! the same size, so slot offsets are pure arithmetic and the buffers are
//! never reallocated or compacted.

use crate::error::{TerrainError, TerrainResult};
use crate::TerrainConfig;

/// Sub-tile refinement target relative to the nominal deformation radius.
const DESIRED_STEP_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, Copy)]
pub struct GridLayout {
    /// Coarse sample counts.
    pub width: usize,
    pub height: usize,
    /// World units per coarse cell.
    pub step_x: f64,
    pub step_y: f64,
    /// World units per sub-tile cell.
    pub high_step_x: f64,
    pub high_step_y: f64,
    /// Sub-tile cells per coarse cell, per axis. Shared pool-wide so every
    /// slot has an identical size.
    pub high_cells_x: usize,
    pub high_cells_y: usize,
    pub max_sub_tiles: usize,
}

impl GridLayout {
    pub fn new(config: &TerrainConfig) -> TerrainResult<Self> {
        let (width, height) = (config.grid_width, config.grid_height);
        if width < 2 || height < 2 {
            return Err(TerrainError::InvalidGridSize { width, height });
        }
        if !(config.target_width > 0.0) || !(config.target_height > 0.0) {
            return Err(TerrainError::InvalidWorldExtent {
                width: config.target_width,
                height: config.target_height,
            });
        }

        let step_x = config.target_width / (width - 1) as f64;
        let step_y = config.target_height / (height - 1) as f64;

        // Halve the sub-step until it reaches the desired resolution for the
        // nominal contact radius. Keeping powers of two of the coarse step
        // makes sample positions at coarse corners exact.
        let desired = config.nominal_radius * DESIRED_STEP_FACTOR;
        let mut high_step_x = step_x;
        let mut high_step_y = step_y;
        if desired > 0.0 {
            while high_step_x > desired {
                high_step_x *= 0.5;
            }
            while high_step_y > desired {
                high_step_y *= 0.5;
            }
        }
        let high_cells_x = (step_x / high_step_x).round() as usize;
        let high_cells_y = (step_y / high_step_y).round() as usize;

        Ok(Self {
            width,
            height,
            step_x,
            step_y,
            high_step_x,
            high_step_y,
            high_cells_x,
            high_cells_y,
            max_sub_tiles: config.max_sub_tiles,
        })
    }

    pub fn cells_x(&self) -> usize {
        self.width - 1
    }

    pub fn cells_y(&self) -> usize {
        self.height - 1
    }

    pub fn cell_count(&self) -> usize {
        self.cells_x() * self.cells_y()
    }

    pub fn target_width(&self) -> f64 {
        self.step_x * self.cells_x() as f64
    }

    pub fn target_height(&self) -> f64 {
        self.step_y * self.cells_y() as f64
    }

    /// Key into the cell -> slot map.
    pub fn map_index(&self, cell_x: usize, cell_y: usize) -> usize {
        cell_y * self.cells_x() + cell_x
    }

    pub fn high_verts_x(&self) -> usize {
        self.high_cells_x + 1
    }

    pub fn high_verts_y(&self) -> usize {
        self.high_cells_y + 1
    }

    pub fn coarse_vertices(&self) -> usize {
        self.width * self.height
    }

    pub fn coarse_indices(&self) -> usize {
        self.cell_count() * 6
    }

    /// Vertices per sub-tile slot.
    pub fn slot_vertices(&self) -> usize {
        self.high_verts_x() * self.high_verts_y()
    }

    /// Indices per sub-tile slot.
    pub fn slot_indices(&self) -> usize {
        self.high_cells_x * self.high_cells_y * 6
    }

    pub fn total_vertices(&self) -> usize {
        self.coarse_vertices() + self.max_sub_tiles * self.slot_vertices()
    }

    pub fn total_indices(&self) -> usize {
        self.coarse_indices() + self.max_sub_tiles * self.slot_indices()
    }

    pub fn slot_vertex_offset(&self, slot: usize) -> usize {
        self.coarse_vertices() + slot * self.slot_vertices()
    }

    pub fn slot_index_offset(&self, slot: usize) -> usize {
        self.coarse_indices() + slot * self.slot_indices()
    }

    /// Offset of a coarse cell's six indices.
    pub fn coarse_index_offset(&self, cell_x: usize, cell_y: usize) -> usize {
        (cell_y * self.cells_x() + cell_x) * 6
    }
}

/// Canonical two-triangle split of the quad at `(x, y)` in a vertex grid of
/// row stride `stride`, offset by `base`. Shared by the coarse mesh and the
/// sub-tile slots so restored cells compare bit-equal.
pub fn quad_indices(base: u32, stride: u32, x: u32, y: u32) -> [u32; 6] {
    [
        base + (y + 1) * stride + x,
        base + y * stride + x,
        base + (y + 1) * stride + x + 1,
        base + (y + 1) * stride + x + 1,
        base + y * stride + x,
        base + y * stride + x + 1,
    ]
}
