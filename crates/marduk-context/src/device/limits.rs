/// Device capacities, probed once when a context is created.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DeviceLimits {
    pub max_color_attachments: u32,
    pub max_draw_buffers: u32,
    pub max_vertex_texture_units: u32,
    pub max_fragment_texture_units: u32,
    /// Length of the context's per-unit texture slot table.
    pub max_combined_texture_units: u32,
    pub max_texture_size: u32,
    pub max_texture_3d_size: u32,
    pub max_texture_cube_size: u32,
    pub max_texture_rectangle_size: u32,
    pub max_texture_coords: u32,
    pub max_texture_anisotropy: f32,
    pub max_vertex_attributes: u32,
}

impl Default for DeviceLimits {
    /// Conservative floor every desktop driver meets.
    fn default() -> Self {
        Self {
            max_color_attachments: 4,
            max_draw_buffers: 4,
            max_vertex_texture_units: 16,
            max_fragment_texture_units: 16,
            max_combined_texture_units: 32,
            max_texture_size: 4096,
            max_texture_3d_size: 256,
            max_texture_cube_size: 4096,
            max_texture_rectangle_size: 4096,
            max_texture_coords: 8,
            max_texture_anisotropy: 16.0,
            max_vertex_attributes: 16,
        }
    }
}

impl DeviceLimits {
    /// Maps the limits a wgpu device was created with.
    ///
    /// wgpu has no separate rectangle or cube size limit; both follow the 2D
    /// limit. Fixed-function texture coordinates do not exist there and are
    /// reported as 8. Anisotropic filtering is clamped to 16 by wgpu itself.
    pub fn from_wgpu(limits: &wgpu::Limits) -> Self {
        let per_stage = limits.max_sampled_textures_per_shader_stage;
        Self {
            max_color_attachments: limits.max_color_attachments,
            max_draw_buffers: limits.max_color_attachments,
            max_vertex_texture_units: per_stage,
            max_fragment_texture_units: per_stage,
            max_combined_texture_units: per_stage.saturating_mul(2),
            max_texture_size: limits.max_texture_dimension_2d,
            max_texture_3d_size: limits.max_texture_dimension_3d,
            max_texture_cube_size: limits.max_texture_dimension_2d,
            max_texture_rectangle_size: limits.max_texture_dimension_2d,
            max_texture_coords: 8,
            max_texture_anisotropy: 16.0,
            max_vertex_attributes: limits.max_vertex_attributes,
        }
    }

    /// Size limit that applies to textures of `kind`.
    pub fn max_size_for(&self, kind: crate::resource::TextureKind) -> u32 {
        use crate::resource::TextureKind;

        match kind {
            TextureKind::D1 | TextureKind::D2 => self.max_texture_size,
            TextureKind::D3 => self.max_texture_3d_size,
            TextureKind::Rect => self.max_texture_rectangle_size,
            TextureKind::Cube => self.max_texture_cube_size,
        }
    }
}
