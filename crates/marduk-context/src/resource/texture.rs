use super::{GpuResource, ResourceHeader};

text_enum! {
    /// Texture target. Determines which limit bounds its size.
    pub enum TextureKind : "texture kind" {
        D1 => "1d",
        D2 => "2d",
        D3 => "3d",
        Rect => "rect",
        Cube => "cube",
    }
}

/// Texture storage to allocate. Contents are uploaded by the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub kind: TextureKind,
    pub width: u32,
    pub height: u32,
    /// Layers for 3D textures, 1 otherwise.
    pub depth: u32,
    pub bytes_per_texel: u32,
}

impl TextureDesc {
    /// RGBA8 2D texture.
    pub const fn rgba8(width: u32, height: u32) -> Self {
        Self {
            kind: TextureKind::D2,
            width,
            height,
            depth: 1,
            bytes_per_texel: 4,
        }
    }

    pub const fn with_kind(mut self, kind: TextureKind) -> Self {
        self.kind = kind;
        self
    }

    pub const fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Largest edge, the value checked against the device limit for this kind.
    pub fn max_extent(&self) -> u32 {
        match self.kind {
            TextureKind::D1 => self.width,
            TextureKind::D3 => self.width.max(self.height).max(self.depth),
            _ => self.width.max(self.height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    pub fn byte_size(&self) -> usize {
        let faces = if self.kind == TextureKind::Cube { 6 } else { 1 };
        self.width as usize
            * self.height as usize
            * self.depth as usize
            * self.bytes_per_texel as usize
            * faces
    }
}

#[derive(Debug)]
pub struct Texture {
    header: ResourceHeader,
    desc: TextureDesc,
}

impl Texture {
    pub(crate) fn new(header: ResourceHeader, desc: TextureDesc) -> Self {
        Self { header, desc }
    }

    #[inline]
    pub fn kind(&self) -> TextureKind {
        self.desc.kind
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.desc.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.desc.height
    }

    #[inline]
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }
}

impl GpuResource for Texture {
    fn header(&self) -> &ResourceHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_maps_count_six_faces() {
        let desc = TextureDesc::rgba8(16, 16).with_kind(TextureKind::Cube);
        assert_eq!(desc.byte_size(), 16 * 16 * 4 * 6);
    }

    #[test]
    fn max_extent_uses_depth_only_for_3d() {
        let flat = TextureDesc::rgba8(64, 32).with_depth(512);
        assert_eq!(flat.max_extent(), 64);
        assert_eq!(flat.with_kind(TextureKind::D3).max_extent(), 512);
    }
}
