//! Base heightfield storage
//!
//! The coarse terrain grid: fixed `width x height` elevation samples,
//! mutable content, never resized. Heights here are authoritative for the
//! coarse mesh and for seeding fresh sub-tiles.

use crate::error::{TerrainError, TerrainResult};

/// Row-major elevation grid with world-space cell steps.
#[derive(Debug, Clone)]
pub struct HeightGrid {
    samples: Vec<f64>,
    width: usize,
    height: usize,
    step_x: f64,
    step_y: f64,
    min_z: f64,
    max_z: f64,
    dirty: bool,
}

impl HeightGrid {
    /// Creates a flat grid. `width`/`height` are sample counts, so a grid
    /// needs at least 2x2 samples to form a cell.
    pub fn new(width: usize, height: usize, step_x: f64, step_y: f64) -> TerrainResult<Self> {
        if width < 2 || height < 2 {
            return Err(TerrainError::InvalidGridSize { width, height });
        }
        Ok(Self {
            samples: vec![0.0; width * height],
            width,
            height,
            step_x,
            step_y,
            min_z: 0.0,
            max_z: 0.0,
            dirty: false,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Cell counts are one less than the sample counts.
    pub fn cells_x(&self) -> usize {
        self.width - 1
    }

    pub fn cells_y(&self) -> usize {
        self.height - 1
    }

    pub fn step_x(&self) -> f64 {
        self.step_x
    }

    pub fn step_y(&self) -> f64 {
        self.step_y
    }

    /// O(1) read. Callers pre-clamp; indices must be in range.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.samples[y * self.width + x]
    }

    /// O(1) write. Tracks the running elevation range and marks the coarse
    /// mesh dirty so its vertices are refreshed before the next draw.
    pub fn set_height(&mut self, x: usize, y: usize, value: f64) {
        if value < self.min_z {
            self.min_z = value;
        }
        if value > self.max_z {
            self.max_z = value;
        }
        self.samples[y * self.width + x] = value;
        self.dirty = true;
    }

    pub fn min_height(&self) -> f64 {
        self.min_z
    }

    pub fn max_height(&self) -> f64 {
        self.max_z
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Flat row-major sample view, stride [`Self::width`].
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Bilinear height at a world position. The enclosing cell is clamped to
    /// the grid, so queries at or beyond the edges resolve against the
    /// nearest valid cell.
    pub fn bilinear(&self, world_x: f64, world_y: f64) -> f64 {
        let cell_x = ((world_x / self.step_x).floor() as isize)
            .clamp(0, self.cells_x() as isize - 1) as usize;
        let cell_y = ((world_y / self.step_y).floor() as isize)
            .clamp(0, self.cells_y() as isize - 1) as usize;
        self.interpolate_cell(cell_x, cell_y, world_x, world_y)
    }

    /// Bilinear interpolation of the four corner samples of one cell.
    /// Fractional weights are clamped so positions on the far cell border
    /// resolve exactly to the border samples.
    pub fn interpolate_cell(&self, cell_x: usize, cell_y: usize, world_x: f64, world_y: f64) -> f64 {
        let dx = ((world_x - cell_x as f64 * self.step_x) / self.step_x).clamp(0.0, 1.0);
        let dy = ((world_y - cell_y as f64 * self.step_y) / self.step_y).clamp(0.0, 1.0);
        let h00 = self.get(cell_x, cell_y);
        let h01 = self.get(cell_x, cell_y + 1);
        let h10 = self.get(cell_x + 1, cell_y);
        let h11 = self.get(cell_x + 1, cell_y + 1);
        h00 * (1.0 - dx) * (1.0 - dy)
            + h01 * (1.0 - dx) * dy
            + h10 * dx * (1.0 - dy)
            + h11 * dx * dy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_3x3() -> HeightGrid {
        let mut grid = HeightGrid::new(3, 3, 1.0, 1.0).unwrap();
        for y in 0..3 {
            for x in 0..3 {
                grid.set_height(x, y, x as f64 + 10.0 * y as f64);
            }
        }
        grid
    }

    #[test]
    fn test_rejects_degenerate_dimensions() {
        assert!(HeightGrid::new(1, 3, 1.0, 1.0).is_err());
        assert!(HeightGrid::new(3, 0, 1.0, 1.0).is_err());
        assert!(HeightGrid::new(2, 2, 1.0, 1.0).is_ok());
    }

    #[test]
    fn test_bilinear_reproduces_corner_samples() {
        let grid = grid_3x3();
        assert_eq!(grid.bilinear(0.0, 0.0), 0.0);
        assert_eq!(grid.bilinear(2.0, 0.0), 2.0);
        assert_eq!(grid.bilinear(1.0, 2.0), 21.0);
    }

    #[test]
    fn test_bilinear_cell_center() {
        let grid = grid_3x3();
        // average of corners 0, 1, 10, 11
        assert!((grid.bilinear(0.5, 0.5) - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_bilinear_clamps_outside_grid() {
        let grid = grid_3x3();
        assert_eq!(grid.bilinear(-1.0, -1.0), 0.0);
        assert_eq!(grid.bilinear(5.0, 5.0), 22.0);
    }

    #[test]
    fn test_tracks_height_range_and_dirty_flag() {
        let mut grid = HeightGrid::new(2, 2, 1.0, 1.0).unwrap();
        assert!(!grid.is_dirty());
        grid.set_height(0, 0, -3.0);
        grid.set_height(1, 1, 7.0);
        assert_eq!(grid.min_height(), -3.0);
        assert_eq!(grid.max_height(), 7.0);
        assert!(grid.is_dirty());
        grid.mark_clean();
        assert!(!grid.is_dirty());
    }
}
