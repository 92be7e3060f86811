text_enum! {
    /// Which faces are discarded before rasterization.
    pub enum CullMode : "cull mode" {
        /// Keep everything.
        None => "none",
        /// Discard front faces.
        Front => "front",
        /// Discard back faces.
        Back => "back",
        /// Discard every cullable face.
        Both => "both",
    }
}

impl CullMode {
    /// Swaps front and back; used when rendering mirrored views.
    #[inline]
    pub const fn inverted(self) -> Self {
        match self {
            CullMode::Front => CullMode::Back,
            CullMode::Back => CullMode::Front,
            other => other,
        }
    }
}

text_enum! {
    pub enum BlendFactor : "blend factor" {
        Zero => "zero",
        One => "one",
        SrcColor => "src-color",
        DstColor => "dst-color",
        SrcAlpha => "src-alpha",
        DstAlpha => "dst-alpha",
        OneMinusSrcColor => "one-minus-src-color",
        OneMinusDstColor => "one-minus-dst-color",
        OneMinusSrcAlpha => "one-minus-src-alpha",
        OneMinusDstAlpha => "one-minus-dst-alpha",
    }
}

text_enum! {
    /// Comparison used by depth and stencil tests.
    pub enum CompareFunction : "comparison function" {
        Never => "never",
        Always => "always",
        Equal => "equal",
        NotEqual => "not-equal",
        Less => "less",
        LessEqual => "less-equal",
        Greater => "greater",
        GreaterEqual => "greater-equal",
    }
}

text_enum! {
    pub enum StencilOp : "stencil operation" {
        Keep => "keep",
        Zero => "zero",
        Replace => "replace",
        Increment => "increment",
        Decrement => "decrement",
        Invert => "invert",
        IncrementWrap => "increment-wrap",
        DecrementWrap => "decrement-wrap",
    }
}

text_enum! {
    pub enum PrimitiveType : "primitive type" {
        PointList => "point-list",
        LineList => "line-list",
        LineStrip => "line-strip",
        LineLoop => "line-loop",
        TriangleList => "triangle-list",
        TriangleStrip => "triangle-strip",
        TriangleFan => "triangle-fan",
    }
}

text_enum! {
    pub enum IndexType : "index type" {
        U8 => "u8",
        U16 => "u16",
        U32 => "u32",
    }
}

impl IndexType {
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}
