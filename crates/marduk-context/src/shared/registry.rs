use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

use crate::error::ConfigError;

use super::{SamplerType, SharedId, SharedKind, UniformType};

/// Type side of a shared signature.
pub trait SignatureType: Copy + Eq + fmt::Debug + fmt::Display {
    const KIND: SharedKind;

    /// Type name as it appears in shader declarations.
    fn glsl_name(self) -> &'static str;
}

impl SignatureType for UniformType {
    const KIND: SharedKind = SharedKind::Uniform;

    fn glsl_name(self) -> &'static str {
        self.as_str()
    }
}

impl SignatureType for SamplerType {
    const KIND: SharedKind = SharedKind::Sampler;

    fn glsl_name(self) -> &'static str {
        self.as_str()
    }
}

/// A registered shared uniform or sampler. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedSignature<T> {
    name: String,
    ty: T,
    id: SharedId,
}

impl<T: SignatureType> SharedSignature<T> {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> T {
        self.ty
    }

    #[inline]
    pub fn id(&self) -> SharedId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> SharedKind {
        T::KIND
    }
}

/// Per-kind table: dense ids in registration order, names unique.
#[derive(Debug)]
struct SignatureTable<T> {
    entries: Vec<SharedSignature<T>>,
    by_name: HashMap<String, usize>,
}

impl<T> Default for SignatureTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<T: SignatureType> SignatureTable<T> {
    /// Returns the id and whether the signature was newly added.
    fn reserve(&mut self, name: &str, ty: T) -> Result<(SharedId, bool), ConfigError> {
        if let Some(&index) = self.by_name.get(name) {
            let existing = &self.entries[index];
            if existing.ty != ty {
                return Err(ConfigError::SharedTypeMismatch {
                    kind: T::KIND,
                    name: name.to_owned(),
                    registered: existing.ty.glsl_name(),
                    requested: ty.glsl_name(),
                });
            }
            return Ok((existing.id, false));
        }

        let index = self.entries.len();
        let id = SharedId::from_index(index);
        self.entries.push(SharedSignature {
            name: name.to_owned(),
            ty,
            id,
        });
        self.by_name.insert(name.to_owned(), index);

        Ok((id, true))
    }

    fn lookup(&self, name: &str, ty: T) -> Option<&SharedSignature<T>> {
        let index = *self.by_name.get(name)?;
        let entry = &self.entries[index];
        (entry.ty == ty).then_some(entry)
    }

    fn by_id(&self, id: SharedId) -> Option<&SharedSignature<T>> {
        self.entries.get(id.index()?)
    }
}

/// Append-only table of shared uniform and sampler signatures.
///
/// Uniforms and samplers are separate namespaces: each allocates ids from 0.
/// Registration order across both kinds is kept for [`declaration`](Self::declaration).
#[derive(Debug, Default)]
pub struct SharedRegistry {
    uniforms: SignatureTable<UniformType>,
    samplers: SignatureTable<SamplerType>,
    order: Vec<(SharedKind, usize)>,
    declaration: OnceCell<String>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` as a shared uniform of type `ty`, or returns the id it already has.
    ///
    /// Fails if `name` is already registered with another type; the existing
    /// signature is left untouched.
    pub fn reserve_uniform(&mut self, name: &str, ty: UniformType) -> Result<SharedId, ConfigError> {
        let (id, added) = self.uniforms.reserve(name, ty)?;
        if added {
            self.record_added(SharedKind::Uniform, id, name, ty.glsl_name());
        }
        Ok(id)
    }

    /// Registers `name` as a shared sampler of type `ty`, or returns the id it already has.
    pub fn reserve_sampler(&mut self, name: &str, ty: SamplerType) -> Result<SharedId, ConfigError> {
        let (id, added) = self.samplers.reserve(name, ty)?;
        if added {
            self.record_added(SharedKind::Sampler, id, name, ty.glsl_name());
        }
        Ok(id)
    }

    fn record_added(&mut self, kind: SharedKind, id: SharedId, name: &str, ty: &str) {
        if let Some(index) = id.index() {
            self.order.push((kind, index));
        }
        self.declaration.take();
        log::debug!("reserved shared {kind} `{name}` ({ty}) as id {id}");
    }

    /// Id of the shared uniform with this exact name and type, or [`SharedId::INVALID`].
    pub fn lookup_uniform_id(&self, name: &str, ty: UniformType) -> SharedId {
        self.uniforms.lookup(name, ty).map_or(SharedId::INVALID, |s| s.id)
    }

    /// Id of the shared sampler with this exact name and type, or [`SharedId::INVALID`].
    pub fn lookup_sampler_id(&self, name: &str, ty: SamplerType) -> SharedId {
        self.samplers.lookup(name, ty).map_or(SharedId::INVALID, |s| s.id)
    }

    #[inline]
    pub fn uniform(&self, name: &str, ty: UniformType) -> Option<&SharedSignature<UniformType>> {
        self.uniforms.lookup(name, ty)
    }

    #[inline]
    pub fn sampler(&self, name: &str, ty: SamplerType) -> Option<&SharedSignature<SamplerType>> {
        self.samplers.lookup(name, ty)
    }

    #[inline]
    pub fn uniform_by_id(&self, id: SharedId) -> Option<&SharedSignature<UniformType>> {
        self.uniforms.by_id(id)
    }

    #[inline]
    pub fn sampler_by_id(&self, id: SharedId) -> Option<&SharedSignature<SamplerType>> {
        self.samplers.by_id(id)
    }

    pub fn uniforms(&self) -> &[SharedSignature<UniformType>] {
        &self.uniforms.entries
    }

    pub fn samplers(&self) -> &[SharedSignature<SamplerType>] {
        &self.samplers.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Shader declarations of every shared signature, one per line, in registration order.
    ///
    /// Built lazily and rebuilt after the next registration.
    pub fn declaration(&self) -> &str {
        self.declaration.get_or_init(|| {
            let mut text = String::new();
            for &(kind, index) in &self.order {
                let (ty, name) = match kind {
                    SharedKind::Uniform => {
                        let s = &self.uniforms.entries[index];
                        (s.ty.glsl_name(), s.name.as_str())
                    }
                    SharedKind::Sampler => {
                        let s = &self.samplers.entries[index];
                        (s.ty.glsl_name(), s.name.as_str())
                    }
                };
                let _ = writeln!(text, "uniform {ty} {name};");
            }
            text
        })
    }
}
