//! Mesh geometry: vertex format, buffer sizing, buffer access, and
//! normal/tangent estimation.

mod buffers;
mod layout;
mod normals;
mod vertex;

pub use buffers::{check_capacity, GeometryBufferHandle, MemoryBuffers, MemoryMap};
pub use layout::{quad_indices, GridLayout};
pub use normals::normal_tangent;
pub use vertex::TerrainVertex;
