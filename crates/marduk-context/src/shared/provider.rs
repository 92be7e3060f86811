use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::resource::Texture;

use super::{SamplerType, SharedId, SharedSignature, UniformType, UniformValue};

/// Supplies current values for shared signatures (camera matrices, time, ...).
///
/// The context asks the active provider for every shared input the bound
/// program declares each time that program is used to draw. Returning `None`
/// leaves the program's current value in place.
pub trait SharedProgramState {
    fn uniform_value(&self, signature: &SharedSignature<UniformType>) -> Option<UniformValue>;

    fn sampler_texture(&self, signature: &SharedSignature<SamplerType>) -> Option<Rc<Texture>>;
}

/// Table-backed provider keyed by shared id.
///
/// Values are set through `&self` so the same `Rc` can be installed on the
/// context and updated by the caller between draws.
#[derive(Debug, Default)]
pub struct SharedValues {
    uniforms: RefCell<HashMap<SharedId, UniformValue>>,
    samplers: RefCell<HashMap<SharedId, Rc<Texture>>>,
}

impl SharedValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_uniform(&self, id: SharedId, value: UniformValue) {
        self.uniforms.borrow_mut().insert(id, value);
    }

    pub fn set_sampler(&self, id: SharedId, texture: Rc<Texture>) {
        self.samplers.borrow_mut().insert(id, texture);
    }

    pub fn clear(&self) {
        self.uniforms.borrow_mut().clear();
        self.samplers.borrow_mut().clear();
    }
}

impl SharedProgramState for SharedValues {
    fn uniform_value(&self, signature: &SharedSignature<UniformType>) -> Option<UniformValue> {
        self.uniforms.borrow().get(&signature.id()).copied()
    }

    fn sampler_texture(&self, signature: &SharedSignature<SamplerType>) -> Option<Rc<Texture>> {
        self.samplers.borrow().get(&signature.id()).cloned()
    }
}
