//! Adaptive multi-resolution terrain deformation engine.
//!
//! A coarse heightfield mesh is overlaid with a bounded pool of small,
//! high-resolution, independently deformable patches ("sub-tiles") wherever
//! a sphere contact needs more detail than the coarse grid can show. The
//! pool evicts least-recently-touched tiles, reusing fixed vertex/index
//! buffer slots without ever reallocating or relocating them, and keeps
//! coarse and refined meshes stitched across LOD boundaries.
//!
//! ```no_run
//! use terra_engine::{TerrainConfig, TerrainEngine};
//!
//! let mut engine = TerrainEngine::in_memory(&TerrainConfig::default())?;
//! // physics side (any thread):
//! let contacts = engine.footprint_sender();
//! contacts.collide_sphere(12.0, 7.5, -0.2, 0.5);
//! // render side, once per tick:
//! engine.render()?;
//! let vertices = engine.buffers().vertex_bytes();
//! let indices = engine.buffers().index_bytes();
//! let draw_count = engine.indices_to_draw();
//! # Ok::<(), terra_engine::TerrainError>(())
//! ```

pub mod engine;
pub mod error;
pub mod geometry;
pub mod heightfield;
pub mod subtile;

pub use engine::{FootPrint, FootprintSender, TerrainEngine};
pub use error::{TerrainError, TerrainResult};
pub use geometry::{GeometryBufferHandle, GridLayout, MemoryBuffers, TerrainVertex};
pub use heightfield::HeightGrid;
pub use subtile::{SubTile, SubTilePool};

/// Engine construction parameters.
///
/// `grid_width`/`grid_height` are coarse sample counts; `target_width`/
/// `target_height` are the world extents they span. `nominal_radius` is the
/// contact radius the sub-tile resolution is derived for (the sub-sample
/// step targets a tenth of it), fixed at construction for the whole pool.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub grid_width: usize,
    pub grid_height: usize,
    pub target_width: f64,
    pub target_height: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub scale_z: f64,
    pub tex_scale_x: f64,
    pub tex_scale_y: f64,
    /// Hard bound on concurrently refined cells. Zero disables refinement
    /// entirely; the engine degenerates to the static coarse mesh.
    pub max_sub_tiles: usize,
    pub nominal_radius: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            grid_width: 64,
            grid_height: 64,
            target_width: 63.0,
            target_height: 63.0,
            scale_x: 1.0,
            scale_y: 1.0,
            scale_z: 1.0,
            tex_scale_x: 1.0,
            tex_scale_y: 1.0,
            max_sub_tiles: 100,
            nominal_radius: 0.05,
        }
    }
}
