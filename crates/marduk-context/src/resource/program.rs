use crate::shared::{SamplerType, UniformType};

use super::{GpuResource, ResourceHeader};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerDecl {
    pub name: String,
    pub ty: SamplerType,
}

/// Interface of a program to create.
///
/// The position of a declaration is its location: uniform `i` is written at
/// location `i`, sampler `i` reads texture unit `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramDesc {
    pub label: String,
    pub uniforms: Vec<UniformDecl>,
    pub samplers: Vec<SamplerDecl>,
}

impl ProgramDesc {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    pub fn uniform(mut self, name: impl Into<String>, ty: UniformType) -> Self {
        self.uniforms.push(UniformDecl { name: name.into(), ty });
        self
    }

    pub fn sampler(mut self, name: impl Into<String>, ty: SamplerType) -> Self {
        self.samplers.push(SamplerDecl { name: name.into(), ty });
        self
    }
}

#[derive(Debug)]
pub struct Program {
    header: ResourceHeader,
    desc: ProgramDesc,
}

impl Program {
    pub(crate) fn new(header: ResourceHeader, desc: ProgramDesc) -> Self {
        Self { header, desc }
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.desc.label
    }

    #[inline]
    pub fn uniforms(&self) -> &[UniformDecl] {
        &self.desc.uniforms
    }

    #[inline]
    pub fn samplers(&self) -> &[SamplerDecl] {
        &self.desc.samplers
    }

    pub fn uniform_location(&self, name: &str) -> Option<u32> {
        self.desc
            .uniforms
            .iter()
            .position(|u| u.name == name)
            .map(|i| i as u32)
    }

    /// Texture unit the named sampler reads from.
    pub fn sampler_unit(&self, name: &str) -> Option<u32> {
        self.desc
            .samplers
            .iter()
            .position(|s| s.name == name)
            .map(|i| i as u32)
    }
}

impl GpuResource for Program {
    fn header(&self) -> &ResourceHeader {
        &self.header
    }
}
