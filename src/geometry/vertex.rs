use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 4], // w unused, kept for shader-side alignment
    pub tex_coord: [f32; 2],
}

// 12 floats; layout offsets below depend on this
const_assert_eq!(std::mem::size_of::<TerrainVertex>(), 48);

impl TerrainVertex {
    /// An upward-facing vertex at the origin, the state of every slot vertex
    /// before its sub-tile is filled.
    pub const FLAT: Self = Self {
        position: [0.0; 3],
        normal: [0.0, 0.0, 1.0],
        tangent: [1.0, 0.0, 0.0, 0.0],
        tex_coord: [0.0; 2],
    };

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Normal
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Tangent
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // Texture coordinates
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 10]>() as wgpu::BufferAddress,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}
