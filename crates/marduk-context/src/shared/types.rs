use core::fmt;

text_enum! {
    /// Non-sampler uniform types. Text names are the GLSL spellings.
    pub enum UniformType : "uniform type" {
        Float => "float",
        Vec2 => "vec2",
        Vec3 => "vec3",
        Vec4 => "vec4",
        Mat2 => "mat2",
        Mat3 => "mat3",
        Mat4 => "mat4",
    }
}

text_enum! {
    /// Sampler uniform types. Text names are the GLSL spellings.
    pub enum SamplerType : "sampler type" {
        Sampler1D => "sampler1D",
        Sampler2D => "sampler2D",
        Sampler3D => "sampler3D",
        SamplerRect => "sampler2DRect",
        SamplerCube => "samplerCube",
    }
}

/// Namespace a shared signature lives in. Ids are allocated per kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SharedKind {
    Uniform,
    Sampler,
}

impl fmt::Display for SharedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SharedKind::Uniform => "uniform",
            SharedKind::Sampler => "sampler",
        })
    }
}

/// Dense id of a shared signature within its kind.
///
/// [`SharedId::INVALID`] (`-1`) is returned by lookups that find nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SharedId(i32);

impl SharedId {
    pub const INVALID: SharedId = SharedId(-1);

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as i32)
    }

    #[inline]
    pub const fn get(self) -> i32 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// Position in the per-kind table, if valid.
    #[inline]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for SharedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value for a non-sampler uniform. Matrices are column-major.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat2([f32; 4]),
    Mat3([f32; 9]),
    Mat4([f32; 16]),
}

impl UniformValue {
    pub const fn ty(&self) -> UniformType {
        match self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Mat2(_) => UniformType::Mat2,
            UniformValue::Mat3(_) => UniformType::Mat3,
            UniformValue::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Raw bytes in native endianness, tightly packed.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            UniformValue::Float(v) => bytemuck::bytes_of(v),
            UniformValue::Vec2(v) => bytemuck::cast_slice(&v[..]),
            UniformValue::Vec3(v) => bytemuck::cast_slice(&v[..]),
            UniformValue::Vec4(v) => bytemuck::cast_slice(&v[..]),
            UniformValue::Mat2(v) => bytemuck::cast_slice(&v[..]),
            UniformValue::Mat3(v) => bytemuck::cast_slice(&v[..]),
            UniformValue::Mat4(v) => bytemuck::cast_slice(&v[..]),
        }
    }

    pub const fn identity_mat4() -> Self {
        UniformValue::Mat4([
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ])
    }
}
