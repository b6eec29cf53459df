//! Deformation engine orchestration
//!
//! Owns the coarse grid, the sub-tile pool, and the geometry buffers.
//! `render()` drains pending footprints, resolves the coarse cells each
//! sphere touches, allocates or reuses sub-tile slots, applies the dent,
//! and keeps the coarse and refined meshes stitched together.

mod footprint;

pub use footprint::{FootPrint, FootprintSender};

use footprint::FootprintQueue;
use log::{debug, trace};

use crate::error::{TerrainError, TerrainResult};
use crate::geometry::{
    check_capacity, normal_tangent, quad_indices, GeometryBufferHandle, GridLayout, MemoryBuffers,
};
use crate::heightfield::HeightGrid;
use crate::subtile::{SubTile, SubTilePool};
use crate::TerrainConfig;

/// Expansion of the sphere's cell bounding box, to catch samples the padded
/// local box needs from neighboring cells.
const SPHERE_BOUND_SAFETY: f64 = 1.2;
/// Extra samples around the sphere's local bounding box, against seams.
const ADAPT_SAMPLE_PAD: isize = 2;
/// A dent must lower a sample by at least this much to count.
const DENT_EPSILON: f64 = 1e-3;

pub struct TerrainEngine<B: GeometryBufferHandle = MemoryBuffers> {
    grid: HeightGrid,
    layout: GridLayout,
    pool: SubTilePool,
    queue: FootprintQueue,
    buffers: B,
    scale: [f64; 3],
    tex_scale: [f64; 2],
    indices_to_draw: usize,
}

impl TerrainEngine<MemoryBuffers> {
    /// Engine backed by plain in-memory buffers.
    pub fn in_memory(config: &TerrainConfig) -> TerrainResult<Self> {
        Self::new(config, |layout| Ok(MemoryBuffers::for_layout(layout)))
    }
}

impl<B: GeometryBufferHandle> TerrainEngine<B> {
    /// Builds the engine and fills the coarse mesh. `make_buffers` receives
    /// the computed layout and must return a handle sized to it.
    pub fn new<F>(config: &TerrainConfig, make_buffers: F) -> TerrainResult<Self>
    where
        F: FnOnce(&GridLayout) -> TerrainResult<B>,
    {
        let layout = GridLayout::new(config)?;
        let grid = HeightGrid::new(layout.width, layout.height, layout.step_x, layout.step_y)?;
        let buffers = make_buffers(&layout)?;
        check_capacity(&buffers, &layout)?;

        let mut engine = Self {
            grid,
            layout,
            pool: SubTilePool::new(layout.max_sub_tiles),
            queue: FootprintQueue::new(),
            buffers,
            scale: [config.scale_x, config.scale_y, config.scale_z],
            tex_scale: [config.tex_scale_x, config.tex_scale_y],
            indices_to_draw: layout.coarse_indices(),
        };
        engine.init_plane()?;
        Ok(engine)
    }

    /// Cloneable handle for the physics side.
    pub fn footprint_sender(&self) -> FootprintSender {
        self.queue.sender()
    }

    /// Queues a sphere contact; applied on the next [`render`](Self::render).
    pub fn collide_sphere(&self, x: f64, y: f64, z: f64, radius: f64) {
        self.queue.push(FootPrint { x, y, z, radius });
    }

    /// Load-time elevation write on the coarse grid.
    pub fn set_height(&mut self, x: usize, y: usize, value: f64) {
        self.grid.set_height(x, y, value);
    }

    /// Brings the buffers up to date: refreshes the coarse mesh if grid
    /// heights changed, then applies all pending footprints in arrival
    /// order. The caller issues its draw afterwards; it never observes a
    /// partially drained state.
    pub fn render(&mut self) -> TerrainResult<()> {
        if self.grid.is_dirty() {
            self.refresh_coarse()?;
            self.grid.mark_clean();
        }
        let pending = self.queue.len();
        if pending > 0 {
            trace!("draining {} footprint(s)", pending);
        }
        while let Some(footprint) = self.queue.try_pop() {
            self.apply_footprint(footprint)?;
        }
        Ok(())
    }

    pub fn grid(&self) -> &HeightGrid {
        &self.grid
    }

    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    pub fn buffers(&self) -> &B {
        &self.buffers
    }

    pub fn buffers_mut(&mut self) -> &mut B {
        &mut self.buffers
    }

    /// Number of leading indices currently worth drawing:
    /// coarse mesh plus one slot's worth per active sub-tile.
    pub fn indices_to_draw(&self) -> usize {
        self.indices_to_draw
    }

    pub fn active_sub_tiles(&self) -> usize {
        self.pool.len()
    }

    /// Whether a coarse cell currently renders through a sub-tile.
    pub fn is_refined(&self, cell_x: usize, cell_y: usize) -> bool {
        self.pool
            .get_slot(self.layout.map_index(cell_x, cell_y))
            .is_some()
    }

    /// Refined height sample `(sx, sy)` of the sub-tile covering a cell.
    pub fn sub_tile_height(&self, cell_x: usize, cell_y: usize, sx: usize, sy: usize) -> Option<f64> {
        self.pool
            .get_slot(self.layout.map_index(cell_x, cell_y))
            .map(|slot| self.pool.tile(slot).height(sx, sy))
    }

    /// Writes the full coarse mesh: vertex grid, then the canonical
    /// triangulation. Slot regions stay untouched.
    fn init_plane(&mut self) -> TerrainResult<()> {
        self.refresh_coarse()?;
        let layout = self.layout;
        let mut indices = self.buffers.map_indices()?;
        for cy in 0..layout.cells_y() {
            for cx in 0..layout.cells_x() {
                let offset = layout.coarse_index_offset(cx, cy);
                let quad = quad_indices(0, layout.width as u32, cx as u32, cy as u32);
                indices[offset..offset + 6].copy_from_slice(&quad);
            }
        }
        Ok(())
    }

    /// Rewrites coarse vertex positions, texcoords, and normals from the
    /// grid. Normals use the border-skip estimator so the outermost samples
    /// do not bleed into cells that sub-tiles replace.
    fn refresh_coarse(&mut self) -> TerrainResult<()> {
        let layout = self.layout;
        let Self {
            grid,
            buffers,
            scale,
            tex_scale,
            ..
        } = self;
        let mut vertices = buffers.map_vertices()?;
        let samples = grid.samples();
        for y in 0..layout.height {
            for x in 0..layout.width {
                let index = y * layout.width + x;
                let wx = x as f64 * layout.step_x * scale[0];
                let wy = y as f64 * layout.step_y * scale[1];
                let vertex = &mut vertices[index];
                vertex.position = [
                    wx as f32,
                    wy as f32,
                    (grid.get(x, y) * scale[2]) as f32,
                ];
                vertex.tex_coord = [(wx * tex_scale[0]) as f32, (wy * tex_scale[1]) as f32];
                let (normal, tangent) = normal_tangent(
                    x,
                    y,
                    layout.width,
                    layout.height,
                    layout.step_x,
                    layout.step_y,
                    *scale,
                    samples,
                    true,
                );
                vertex.normal = normal;
                vertex.tangent = tangent;
            }
        }
        Ok(())
    }

    fn apply_footprint(&mut self, footprint: FootPrint) -> TerrainResult<()> {
        if footprint.radius <= 0.0 {
            debug!(
                "dropping footprint with non-positive radius {}",
                footprint.radius
            );
            return Ok(());
        }
        if footprint.x < 0.0
            || footprint.y < 0.0
            || footprint.x > self.layout.target_width()
            || footprint.y > self.layout.target_height()
        {
            debug!(
                "dropping footprint outside the field at ({}, {})",
                footprint.x, footprint.y
            );
            return Ok(());
        }
        if self.pool.capacity() == 0 {
            // no refinement possible; the coarse mesh stays as-is
            return Ok(());
        }

        let bound = footprint.radius * SPHERE_BOUND_SAFETY;
        let x1 = (((footprint.x - bound) / self.layout.step_x).floor().max(0.0)) as usize;
        let y1 = (((footprint.y - bound) / self.layout.step_y).floor().max(0.0)) as usize;
        let x2 = ((((footprint.x + bound) / self.layout.step_x).ceil()) as usize)
            .min(self.layout.cells_x());
        let y2 = ((((footprint.y + bound) / self.layout.step_y).ceil()) as usize)
            .min(self.layout.cells_y());

        let mut touched: Vec<(usize, usize)> = Vec::new();
        for cy in y1..y2 {
            for cx in x1..x2 {
                let slot = self.resolve(cx, cy)?;
                touched.push((slot, self.layout.map_index(cx, cy)));
            }
        }

        // A tile resolved early in the box can have been evicted by a later
        // allocation in the same box; only tiles still active get the dent.
        for (slot, map_index) in touched {
            if self.pool.get_slot(map_index) == Some(slot) {
                self.adapt_sub_tile(slot, footprint)?;
            }
        }
        Ok(())
    }

    /// Returns the slot of an Active sub-tile for the cell, allocating (and
    /// evicting, if the pool is saturated) when the cell is not refined yet.
    /// Either way the tile ends up most-recently-used.
    fn resolve(&mut self, cell_x: usize, cell_y: usize) -> TerrainResult<usize> {
        if cell_x >= self.layout.cells_x() || cell_y >= self.layout.cells_y() {
            return Err(TerrainError::CellOutOfRange {
                index: cell_y * self.layout.cells_x() + cell_x,
                cells: self.layout.cell_count(),
            });
        }
        let map_index = self.layout.map_index(cell_x, cell_y);
        if let Some(slot) = self.pool.get_slot(map_index) {
            self.pool.touch(slot);
            return Ok(slot);
        }

        if self.pool.is_full() {
            if let Some((slot, evicted)) = self.pool.evict_lru() {
                self.indices_to_draw -= self.layout.slot_indices();
                self.restore_cell(&evicted)?;
                debug!(
                    "evicted sub-tile at cell ({}, {}) from slot {}",
                    evicted.cell_x, evicted.cell_y, slot
                );
            }
        }

        self.cut_hole(cell_x, cell_y)?;
        let tile = self.seed_tile(cell_x, cell_y);
        let slot = self.pool.insert(tile);
        self.fill_cell(slot)?;
        self.indices_to_draw += self.layout.slot_indices();
        trace!(
            "allocated sub-tile for cell ({}, {}) in slot {}",
            cell_x,
            cell_y,
            slot
        );
        Ok(slot)
    }

    /// Zeroes the coarse cell's six indices so the coarse triangles do not
    /// z-fight with the sub-tile rendered in their place.
    fn cut_hole(&mut self, cell_x: usize, cell_y: usize) -> TerrainResult<()> {
        let offset = self.layout.coarse_index_offset(cell_x, cell_y);
        let mut indices = self.buffers.map_indices()?;
        indices[offset..offset + 6].fill(0);
        Ok(())
    }

    /// Puts a vacated cell back on screen: restores its coarse triangles and
    /// re-seeds the borders of the up-to-eight neighboring sub-tiles from
    /// the coarse grid, so the shared edges stay continuous once the evicted
    /// tile's refined data is gone.
    fn restore_cell(&mut self, evicted: &SubTile) -> TerrainResult<()> {
        let layout = self.layout;
        {
            let offset = layout.coarse_index_offset(evicted.cell_x, evicted.cell_y);
            let quad = quad_indices(
                0,
                layout.width as u32,
                evicted.cell_x as u32,
                evicted.cell_y as u32,
            );
            let mut indices = self.buffers.map_indices()?;
            indices[offset..offset + 6].copy_from_slice(&quad);
        }

        let hc_x = layout.high_cells_x;
        let hc_y = layout.high_cells_y;
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = evicted.cell_x as i64 + dx;
                let ny = evicted.cell_y as i64 + dy;
                if nx < 0 || ny < 0 || nx >= layout.cells_x() as i64 || ny >= layout.cells_y() as i64
                {
                    continue;
                }
                let map_index = layout.map_index(nx as usize, ny as usize);
                let Some(slot) = self.pool.get_slot(map_index) else {
                    continue;
                };
                // the neighbor edge facing the vacated cell
                let xs = match dx {
                    -1 => hc_x..=hc_x,
                    1 => 0..=0,
                    _ => 0..=hc_x,
                };
                let ys = match dy {
                    -1 => hc_y..=hc_y,
                    1 => 0..=0,
                    _ => 0..=hc_y,
                };
                {
                    let Self { grid, pool, .. } = self;
                    let tile = pool.tile_mut(slot);
                    for sy in ys {
                        for sx in xs.clone() {
                            let wx = tile.x_pos + sx as f64 * layout.high_step_x;
                            let wy = tile.y_pos + sy as f64 * layout.high_step_y;
                            tile.set_height(sx, sy, grid.bilinear(wx, wy));
                        }
                    }
                }
                self.draw_sub_tile(slot)?;
            }
        }
        Ok(())
    }

    /// Fresh tile with heights bilinearly sampled from the coarse grid, so
    /// an undeformed tile reproduces the coarse surface exactly at the cell
    /// corners.
    fn seed_tile(&self, cell_x: usize, cell_y: usize) -> SubTile {
        let layout = self.layout;
        let mut tile = SubTile::new(cell_x, cell_y, &layout);
        for sy in 0..layout.high_verts_y() {
            for sx in 0..layout.high_verts_x() {
                let wx = tile.x_pos + sx as f64 * layout.high_step_x;
                let wy = tile.y_pos + sy as f64 * layout.high_step_y;
                tile.set_height(sx, sy, self.grid.interpolate_cell(cell_x, cell_y, wx, wy));
            }
        }
        tile
    }

    /// Emits a tile's full vertex grid and triangulation into its slot.
    fn fill_cell(&mut self, slot: usize) -> TerrainResult<()> {
        let layout = self.layout;
        let Self {
            pool,
            buffers,
            scale,
            tex_scale,
            ..
        } = self;
        let tile = pool.tile(slot);
        let base = layout.slot_vertex_offset(slot);
        let hv_x = layout.high_verts_x();

        {
            let mut vertices = buffers.map_vertices()?;
            for sy in 0..layout.high_verts_y() {
                for sx in 0..hv_x {
                    let index = base + sy * hv_x + sx;
                    let wx = (tile.x_pos + sx as f64 * layout.high_step_x) * scale[0];
                    let wy = (tile.y_pos + sy as f64 * layout.high_step_y) * scale[1];
                    let vertex = &mut vertices[index];
                    vertex.position = [
                        wx as f32,
                        wy as f32,
                        (tile.height(sx, sy) * scale[2]) as f32,
                    ];
                    vertex.tex_coord = [(wx * tex_scale[0]) as f32, (wy * tex_scale[1]) as f32];
                }
            }
            // normals in a second pass; they read the seeded neighbors
            for sy in 0..layout.high_verts_y() {
                for sx in 0..hv_x {
                    let index = base + sy * hv_x + sx;
                    let (normal, tangent) = normal_tangent(
                        sx,
                        sy,
                        hv_x,
                        layout.high_verts_y(),
                        layout.high_step_x,
                        layout.high_step_y,
                        *scale,
                        tile.heights(),
                        true,
                    );
                    vertices[index].normal = normal;
                    vertices[index].tangent = tangent;
                }
            }
        }

        let mut indices = buffers.map_indices()?;
        let index_base = layout.slot_index_offset(slot);
        for cy in 0..layout.high_cells_y {
            for cx in 0..layout.high_cells_x {
                let offset = index_base + (cy * layout.high_cells_x + cx) * 6;
                let quad = quad_indices(base as u32, hv_x as u32, cx as u32, cy as u32);
                indices[offset..offset + 6].copy_from_slice(&quad);
            }
        }
        Ok(())
    }

    /// Rewrites a tile's vertex heights and normals from its height data.
    /// Positions in x/y and the triangulation are untouched.
    fn draw_sub_tile(&mut self, slot: usize) -> TerrainResult<()> {
        let layout = self.layout;
        let Self {
            pool,
            buffers,
            scale,
            ..
        } = self;
        let tile = pool.tile(slot);
        let base = layout.slot_vertex_offset(slot);
        let hv_x = layout.high_verts_x();
        let mut vertices = buffers.map_vertices()?;
        for sy in 0..layout.high_verts_y() {
            for sx in 0..hv_x {
                let index = base + sy * hv_x + sx;
                vertices[index].position[2] = (tile.height(sx, sy) * scale[2]) as f32;
                let (normal, tangent) = normal_tangent(
                    sx,
                    sy,
                    hv_x,
                    layout.high_verts_y(),
                    layout.high_step_x,
                    layout.high_step_y,
                    *scale,
                    tile.heights(),
                    true,
                );
                vertices[index].normal = normal;
                vertices[index].tangent = tangent;
            }
        }
        Ok(())
    }

    /// Presses the sphere into one tile: every sample inside the sphere's
    /// vertical cylinder is lowered to the lower hemisphere surface, never
    /// raised. Touched vertex slots are rewritten if anything changed.
    fn adapt_sub_tile(&mut self, slot: usize, footprint: FootPrint) -> TerrainResult<()> {
        let layout = self.layout;
        let hv_x = layout.high_verts_x() as isize;
        let hv_y = layout.high_verts_y() as isize;

        let (x1, y1, x2, y2);
        let r2 = footprint.radius * footprint.radius;
        let mut adapted = false;
        {
            let Self { pool, .. } = self;
            let tile = pool.tile_mut(slot);
            let local_x = footprint.x - tile.x_pos;
            let local_y = footprint.y - tile.y_pos;
            x1 = (((local_x - footprint.radius) / layout.high_step_x).floor() as isize
                - ADAPT_SAMPLE_PAD)
                .clamp(0, hv_x) as usize;
            y1 = (((local_y - footprint.radius) / layout.high_step_y).floor() as isize
                - ADAPT_SAMPLE_PAD)
                .clamp(0, hv_y) as usize;
            x2 = (((local_x + footprint.radius) / layout.high_step_x).ceil() as isize
                + ADAPT_SAMPLE_PAD)
                .clamp(0, hv_x) as usize;
            y2 = (((local_y + footprint.radius) / layout.high_step_y).ceil() as isize
                + ADAPT_SAMPLE_PAD)
                .clamp(0, hv_y) as usize;

            for sy in y1..y2 {
                for sx in x1..x2 {
                    let vx = tile.x_pos + sx as f64 * layout.high_step_x;
                    let vy = tile.y_pos + sy as f64 * layout.high_step_y;
                    let dx = vx - footprint.x;
                    let dy = vy - footprint.y;
                    if dx * dx + dy * dy > r2 {
                        continue;
                    }
                    let dent = sphere_surface_height(&footprint, vx, vy);
                    if dent < tile.height(sx, sy) - DENT_EPSILON {
                        tile.set_height(sx, sy, dent);
                        adapted = true;
                    }
                }
            }
        }
        if !adapted {
            return Ok(());
        }

        let Self {
            pool,
            buffers,
            scale,
            ..
        } = self;
        let tile = pool.tile(slot);
        let base = layout.slot_vertex_offset(slot);
        let mut vertices = buffers.map_vertices()?;
        for sy in y1..y2 {
            for sx in x1..x2 {
                let index = base + sy * layout.high_verts_x() + sx;
                vertices[index].position[2] = (tile.height(sx, sy) * scale[2]) as f32;
                let (normal, tangent) = normal_tangent(
                    sx,
                    sy,
                    layout.high_verts_x(),
                    layout.high_verts_y(),
                    layout.high_step_x,
                    layout.high_step_y,
                    *scale,
                    tile.heights(),
                    true,
                );
                vertices[index].normal = normal;
                vertices[index].tangent = tangent;
            }
        }
        Ok(())
    }
}

/// Height of the sphere's lower hemisphere above `(vx, vy)`. The radicand
/// is clamped so samples on the cylinder boundary cannot produce NaN.
fn sphere_surface_height(footprint: &FootPrint, vx: f64, vy: f64) -> f64 {
    let dx = footprint.x - vx;
    let dy = footprint.y - vy;
    let radicand = (footprint.radius * footprint.radius - dx * dx - dy * dy).max(0.0);
    footprint.z - radicand.sqrt()
}
