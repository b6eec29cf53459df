//! Terrain engine error handling
//!
//! Construction-time failures and pool bookkeeping violations are the only
//! fatal errors; geometry/math edge cases are clamped locally and never
//! surface here.

use thiserror::Error;

/// Type alias for terrain operation results
pub type TerrainResult<T> = Result<T, TerrainError>;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("invalid grid size {width}x{height}: need at least 2x2 samples")]
    InvalidGridSize { width: usize, height: usize },

    #[error("invalid world extent {width}x{height}: extents must be positive")]
    InvalidWorldExtent { width: f64, height: f64 },

    #[error("buffer size mismatch: handle holds {got} {kind}, layout needs {expected}")]
    BufferSizeMismatch {
        kind: &'static str,
        got: usize,
        expected: usize,
    },

    #[error("failed to map {buffer} buffer for writing")]
    BufferMapFailed { buffer: &'static str },

    #[error("cell index {index} out of range: grid has {cells} cells")]
    CellOutOfRange { index: usize, cells: usize },
}
