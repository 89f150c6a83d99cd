//! Per-step adapter that hands descriptors to a consumer callback.

use std::error::Error;
use std::fmt;

use dlext_core::{FixMask, ParticleEngine, Property, TimeStep};
use dlext_tensor::ManagedTensor;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::config::{ConfigError, SamplerConfig};
use crate::registry::{standard_registry, PropertyRegistry};
use crate::view::SystemView;

/// Error raised by a consumer callback, passed through untouched.
pub type CallbackError = Box<dyn Error + Send + Sync>;

/// Consumer callback: the step's descriptors and the step counter.
pub type DLExtCallback = Box<dyn FnMut(StepTensors, TimeStep) -> Result<(), CallbackError>>;

/// Descriptors built for one step, in [`Property::CALLBACK_ORDER`].
///
/// Each descriptor is owned; dropping it runs its deleter. Call
/// [`ManagedTensor::into_raw`] to pass one on to a foreign consumer.
#[derive(Debug, Default)]
pub struct StepTensors {
    tensors: IndexMap<Property, ManagedTensor>,
}

impl StepTensors {
    fn insert(&mut self, property: Property, tensor: ManagedTensor) {
        self.tensors.insert(property, tensor);
    }

    /// Descriptor for `property`, if it was configured.
    pub fn get(&self, property: Property) -> Option<&ManagedTensor> {
        self.tensors.get(&property)
    }

    /// Take ownership of one descriptor.
    pub fn take(&mut self, property: Property) -> Option<ManagedTensor> {
        self.tensors.shift_remove(&property)
    }

    /// Properties present, in order.
    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.tensors.keys().copied()
    }

    /// Descriptors in order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, &ManagedTensor)> + '_ {
        self.tensors.iter().map(|(p, t)| (*p, t))
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Whether no descriptors were built.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

impl IntoIterator for StepTensors {
    type Item = (Property, ManagedTensor);
    type IntoIter = indexmap::map::IntoIter<Property, ManagedTensor>;

    fn into_iter(self) -> Self::IntoIter {
        self.tensors.into_iter()
    }
}

/// Hook an engine calls after each force evaluation.
pub trait PostForceHook {
    /// Engine phases this hook wants to run in.
    fn setmask(&self) -> FixMask;

    /// Run for `step`. Errors are fatal to the engine.
    fn post_force(
        &mut self,
        engine: &mut dyn ParticleEngine,
        step: TimeStep,
    ) -> Result<(), CallbackError>;
}

/// Where a [`Sampler`] is within one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SamplerState {
    /// Between steps.
    #[default]
    Idle,
    /// Wrapping configured properties.
    BuildingDescriptors,
    /// Consumer callback running.
    InvokingCallback,
}

/// Exposes configured properties to a callback once per step.
///
/// The sampler keeps no scheduling state of its own: the engine drives it
/// through [`PostForceHook::post_force`]. Descriptors are rebuilt every
/// step since pointers may move between steps.
pub struct Sampler {
    config: SamplerConfig,
    ordered: SmallVec<[Property; 8]>,
    registry: PropertyRegistry,
    callback: DLExtCallback,
    state: SamplerState,
}

impl Sampler {
    /// Validate `config` against `engine` using the standard registry.
    pub fn new(engine: &dyn ParticleEngine, config: SamplerConfig) -> Result<Self, ConfigError> {
        Self::with_registry(engine, config, standard_registry().clone())
    }

    /// Validate `config` against `engine` using `registry`.
    pub fn with_registry(
        engine: &dyn ParticleEngine,
        config: SamplerConfig,
        registry: PropertyRegistry,
    ) -> Result<Self, ConfigError> {
        config.validate(engine, &registry)?;
        let ordered = config.ordered();
        log::debug!(
            "sampler configured on {} with {} properties",
            config.space,
            ordered.len()
        );
        Ok(Self {
            config,
            ordered,
            registry,
            callback: Box::new(|_, _| Ok(())),
            state: SamplerState::Idle,
        })
    }

    /// Replace the callback.
    pub fn set_callback<F>(&mut self, callback: F)
    where
        F: FnMut(StepTensors, TimeStep) -> Result<(), CallbackError> + 'static,
    {
        self.callback = Box::new(callback);
    }

    /// Restore the no-op callback.
    pub fn clear_callback(&mut self) {
        self.callback = Box::new(|_, _| Ok(()));
    }

    /// The validated configuration.
    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Configured properties in callback order.
    pub fn properties(&self) -> &[Property] {
        &self.ordered
    }

    /// Current state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    fn build(&self, engine: &mut dyn ParticleEngine) -> Result<StepTensors, CallbackError> {
        let mut view = SystemView::with_registry(engine, &self.registry);
        let mut tensors = StepTensors::default();
        for &property in &self.ordered {
            tensors.insert(property, view.wrap(property, self.config.space)?);
        }
        Ok(tensors)
    }

    /// First half of [`post_force`](PostForceHook::post_force): sync and
    /// wrap the configured properties.
    ///
    /// The engine is not needed again until the next step, so a caller can
    /// release it before handing the result to [`deliver`](Self::deliver).
    /// On success the sampler stays in
    /// [`BuildingDescriptors`](SamplerState::BuildingDescriptors) until
    /// then.
    pub fn prepare(
        &mut self,
        engine: &mut dyn ParticleEngine,
    ) -> Result<StepTensors, CallbackError> {
        self.state = SamplerState::BuildingDescriptors;
        self.build(engine).inspect_err(|_| self.state = SamplerState::Idle)
    }

    /// Second half of [`post_force`](PostForceHook::post_force): run the
    /// callback on descriptors from [`prepare`](Self::prepare).
    pub fn deliver(&mut self, tensors: StepTensors, step: TimeStep) -> Result<(), CallbackError> {
        log::debug!("step {step}: invoking callback with {} tensors", tensors.len());
        self.state = SamplerState::InvokingCallback;
        let result = (self.callback)(tensors, step);
        self.state = SamplerState::Idle;
        result
    }
}

impl PostForceHook for Sampler {
    fn setmask(&self) -> FixMask {
        FixMask::POST_FORCE
    }

    fn post_force(
        &mut self,
        engine: &mut dyn ParticleEngine,
        step: TimeStep,
    ) -> Result<(), CallbackError> {
        let tensors = self.prepare(engine)?;
        self.deliver(tensors, step)
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler")
            .field("config", &self.config)
            .field("ordered", &self.ordered)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
