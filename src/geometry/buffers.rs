//! Geometry buffer access
//!
//! The engine never owns GPU handles directly; it talks to an abstract
//! buffer pair through [`GeometryBufferHandle`]. Every logical operation
//! maps a buffer for writing, mutates it, and unmaps on drop of the guard,
//! so a GPU-backed implementation can mirror the map/unmap discipline
//! one-to-one while tests run against [`MemoryBuffers`].

use std::ops::{Deref, DerefMut};

use super::layout::GridLayout;
use super::vertex::TerrainVertex;
use crate::error::{TerrainError, TerrainResult};

/// Capability interface over a fixed-capacity vertex/index buffer pair.
///
/// Capacities are fixed for the lifetime of the handle; the engine checks
/// them against its layout at construction and never writes past them.
pub trait GeometryBufferHandle {
    type VertexMap<'a>: DerefMut<Target = [TerrainVertex]>
    where
        Self: 'a;
    type IndexMap<'a>: DerefMut<Target = [u32]>
    where
        Self: 'a;

    /// Maps the vertex buffer for writing. The mapping is released when the
    /// guard drops, on every exit path.
    fn map_vertices(&mut self) -> TerrainResult<Self::VertexMap<'_>>;

    /// Maps the index buffer for writing.
    fn map_indices(&mut self) -> TerrainResult<Self::IndexMap<'_>>;

    fn vertex_capacity(&self) -> usize;

    fn index_capacity(&self) -> usize;
}

/// Verifies a handle's capacities against the engine layout.
pub fn check_capacity<B: GeometryBufferHandle>(buffers: &B, layout: &GridLayout) -> TerrainResult<()> {
    if buffers.vertex_capacity() != layout.total_vertices() {
        return Err(TerrainError::BufferSizeMismatch {
            kind: "vertices",
            got: buffers.vertex_capacity(),
            expected: layout.total_vertices(),
        });
    }
    if buffers.index_capacity() != layout.total_indices() {
        return Err(TerrainError::BufferSizeMismatch {
            kind: "indices",
            got: buffers.index_capacity(),
            expected: layout.total_indices(),
        });
    }
    Ok(())
}

/// Plain in-memory buffer pair. Doubles as the test binding and as staging
/// storage for renderers that upload whole buffers.
pub struct MemoryBuffers {
    vertices: Vec<TerrainVertex>,
    indices: Vec<u32>,
}

impl MemoryBuffers {
    pub fn new(num_vertices: usize, num_indices: usize) -> Self {
        Self {
            vertices: vec![TerrainVertex::FLAT; num_vertices],
            indices: vec![0; num_indices],
        }
    }

    pub fn for_layout(layout: &GridLayout) -> Self {
        Self::new(layout.total_vertices(), layout.total_indices())
    }

    pub fn vertices(&self) -> &[TerrainVertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Raw vertex bytes, ready for a GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

/// Write guard over an in-memory buffer. Dropping it is the unmap.
pub struct MemoryMap<'a, T>(&'a mut [T]);

impl<T> Deref for MemoryMap<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.0
    }
}

impl<T> DerefMut for MemoryMap<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.0
    }
}

impl GeometryBufferHandle for MemoryBuffers {
    type VertexMap<'a> = MemoryMap<'a, TerrainVertex>;
    type IndexMap<'a> = MemoryMap<'a, u32>;

    fn map_vertices(&mut self) -> TerrainResult<Self::VertexMap<'_>> {
        Ok(MemoryMap(&mut self.vertices))
    }

    fn map_indices(&mut self) -> TerrainResult<Self::IndexMap<'_>> {
        Ok(MemoryMap(&mut self.indices))
    }

    fn vertex_capacity(&self) -> usize {
        self.vertices.len()
    }

    fn index_capacity(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_writes_through() {
        let mut buffers = MemoryBuffers::new(4, 6);
        {
            let mut verts = buffers.map_vertices().unwrap();
            verts[1].position = [1.0, 2.0, 3.0];
        }
        {
            let mut inds = buffers.map_indices().unwrap();
            inds[5] = 42;
        }
        assert_eq!(buffers.vertices()[1].position, [1.0, 2.0, 3.0]);
        assert_eq!(buffers.indices()[5], 42);
        assert_eq!(buffers.vertex_capacity(), 4);
        assert_eq!(buffers.index_capacity(), 6);
    }

    #[test]
    fn test_vertex_bytes_cover_whole_buffer() {
        let buffers = MemoryBuffers::new(3, 0);
        assert_eq!(buffers.vertex_bytes().len(), 3 * std::mem::size_of::<TerrainVertex>());
    }
}
