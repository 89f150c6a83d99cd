//! Borrowed view of an engine that builds descriptors on demand.

use dlext_core::{
    DataMask, DeviceType, ExecutionSpace, ParticleEngine, Property, PropertyError, TimeStep,
};
use dlext_tensor::{wrap, DLDataType, DLDevice, ManagedTensor, TensorKey, TensorPool, TensorSpec};

use crate::registry::{standard_registry, PropertyRegistry, PropertySpec};

/// Device ordinal reported for every descriptor.
///
/// Multi-device runs would need the engine's own device selection.
pub const DEFAULT_DEVICE_ID: i32 = 0;

/// A property-to-descriptor front end over one engine.
///
/// The view holds the engine mutably for its lifetime because building a
/// descriptor may sync arrays between residencies.
pub struct SystemView<'a> {
    engine: &'a mut dyn ParticleEngine,
    registry: &'a PropertyRegistry,
}

impl<'a> SystemView<'a> {
    /// View using the standard property table.
    pub fn new(engine: &'a mut dyn ParticleEngine) -> Self {
        Self::with_registry(engine, standard_registry())
    }

    /// View using a caller-supplied property table.
    pub fn with_registry(engine: &'a mut dyn ParticleEngine, registry: &'a PropertyRegistry) -> Self {
        Self { engine, registry }
    }

    /// The property table in use.
    pub fn registry(&self) -> &PropertyRegistry {
        self.registry
    }

    /// The underlying engine.
    pub fn engine(&mut self) -> &mut dyn ParticleEngine {
        &mut *self.engine
    }

    /// Whether the engine was built with an accelerator backend.
    pub fn has_accelerator_backend(&self) -> bool {
        self.engine.accelerator().is_some()
    }

    /// Whether an accelerator backend is built in and engaged for this run.
    pub fn has_accelerator_enabled(&self) -> bool {
        self.engine.accelerator().is_some_and(|a| a.active)
    }

    /// Residency that will actually be used for `requested`.
    pub fn try_pick(&self, requested: ExecutionSpace) -> ExecutionSpace {
        match requested {
            ExecutionSpace::Device if !self.has_accelerator_enabled() => {
                log::debug!("no active accelerator; exposing host arrays instead of device");
                ExecutionSpace::Host
            }
            space => space,
        }
    }

    /// DLPack device kind for `requested` after resolution.
    pub fn device_type(&self, requested: ExecutionSpace) -> DeviceType {
        match (self.try_pick(requested), self.engine.accelerator()) {
            (ExecutionSpace::Device, Some(accelerator)) => accelerator.device_type,
            _ => DeviceType::Cpu,
        }
    }

    /// Device ordinal; see [`DEFAULT_DEVICE_ID`].
    pub fn device_id(&self) -> i32 {
        DEFAULT_DEVICE_ID
    }

    /// Full DLPack device for `requested` after resolution.
    pub fn device(&self, requested: ExecutionSpace) -> DLDevice {
        DLDevice::new(self.device_type(requested), self.device_id())
    }

    /// Particles owned by this partition.
    pub fn local_particle_number(&self) -> usize {
        self.engine.local_particle_number()
    }

    /// Particles across all partitions.
    pub fn global_particle_number(&self) -> u64 {
        self.engine.global_particle_number()
    }

    /// Current integration step.
    pub fn step(&self) -> TimeStep {
        self.engine.current_step()
    }

    /// Make every exposable array current on the resolved residency.
    ///
    /// No-op without an engaged accelerator.
    pub fn synchronize(&mut self, requested: ExecutionSpace) {
        if self.has_accelerator_enabled() {
            let space = self.try_pick(requested);
            self.engine.sync(space, DataMask::DLEXT);
        }
    }

    /// Registry row for `property`, after its precondition passes.
    pub fn check(&self, property: Property) -> Result<&'a PropertySpec, PropertyError> {
        let spec = self
            .registry
            .spec(property)
            .ok_or(PropertyError::Unregistered { property })?;
        if let Some(precondition) = spec.precondition {
            precondition(&*self.engine)
                .map_err(|requirement| PropertyError::MissingPrecondition { property, requirement })?;
        }
        Ok(spec)
    }

    /// Resolve, sync and describe `property` without allocating.
    ///
    /// Writable properties are also marked modified on the resolved
    /// residency, since the consumer may write through the pointer.
    pub fn tensor_spec(
        &mut self,
        property: Property,
        requested: ExecutionSpace,
    ) -> Result<TensorSpec, PropertyError> {
        let row = self.check(property)?;
        let space = self.try_pick(requested);
        if self.has_accelerator_enabled() {
            self.engine.sync(space, row.mask);
            if row.writable {
                self.engine.modified(space, row.mask);
            }
        }
        let layout = self.engine.layout();
        let data = (row.accessor)(&mut *self.engine, space);
        Ok(TensorSpec {
            data,
            device: self.device(space),
            dtype: DLDataType::new(row.code, (row.bits)(layout, space)),
            size: (row.size)(&*self.engine) as i64,
            second_dim: (row.second_dim)(&*self.engine) as i64,
            byte_offset: 0,
        })
    }

    /// Owned descriptor for `property`.
    pub fn wrap(
        &mut self,
        property: Property,
        requested: ExecutionSpace,
    ) -> Result<ManagedTensor, PropertyError> {
        let spec = self.tensor_spec(property, requested)?;
        Ok(wrap(&spec))
    }

    /// Descriptor for `property` owned by `pool` instead of the consumer.
    pub fn wrap_pooled(
        &mut self,
        pool: &mut TensorPool,
        property: Property,
        requested: ExecutionSpace,
    ) -> Result<TensorKey, PropertyError> {
        let spec = self.tensor_spec(property, requested)?;
        Ok(pool.wrap_pooled(&spec))
    }

    /// Positions, `[N, 3]` floats.
    pub fn positions(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Positions, space)
    }

    /// Velocities, `[N, 3]` floats.
    pub fn velocities(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Velocities, space)
    }

    /// Per-type masses, `[T + 1]` floats.
    pub fn masses(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Masses, space)
    }

    /// Forces, `[N, 3]` floats, writable.
    pub fn forces(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Forces, space)
    }

    /// Packed image counters, `[N]`.
    pub fn images(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Images, space)
    }

    /// Global particle IDs, `[N]`.
    pub fn tags(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Tags, space)
    }

    /// Global ID to local index table, `[map size]` int32.
    pub fn tags_map(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::TagsMap, space)
    }

    /// Particle types, `[N]` int32.
    pub fn types(&mut self, space: ExecutionSpace) -> Result<ManagedTensor, PropertyError> {
        self.wrap(Property::Types, space)
    }
}

impl std::fmt::Debug for SystemView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemView")
            .field("local", &self.local_particle_number())
            .field("accelerator", &self.engine.accelerator())
            .field("properties", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlext_test_utils::MockEngine;

    #[test]
    fn device_request_falls_back_without_accelerator() {
        let mut engine = MockEngine::new(4, 1);
        let view = SystemView::new(&mut engine);
        assert!(!view.has_accelerator_backend());
        assert_eq!(view.try_pick(ExecutionSpace::Device), ExecutionSpace::Host);
        assert_eq!(view.device_type(ExecutionSpace::Device), DeviceType::Cpu);
    }

    #[test]
    fn inactive_backend_resolves_to_host() {
        let mut engine = MockEngine::new(4, 1).with_accelerator(DeviceType::Cuda, false);
        let view = SystemView::new(&mut engine);
        assert!(view.has_accelerator_backend());
        assert!(!view.has_accelerator_enabled());
        assert_eq!(view.try_pick(ExecutionSpace::Device), ExecutionSpace::Host);
    }

    #[test]
    fn active_backend_reports_its_device() {
        let mut engine = MockEngine::new(4, 1).with_accelerator(DeviceType::Rocm, true);
        let view = SystemView::new(&mut engine);
        assert_eq!(view.try_pick(ExecutionSpace::Device), ExecutionSpace::Device);
        assert_eq!(view.device(ExecutionSpace::Device), DLDevice::new(DeviceType::Rocm, 0));
        assert_eq!(view.device(ExecutionSpace::Host), DLDevice::cpu());
    }

    #[test]
    fn host_only_engine_is_never_synced() {
        let mut engine = MockEngine::new(4, 1);
        {
            let mut view = SystemView::new(&mut engine);
            view.synchronize(ExecutionSpace::Host);
            view.forces(ExecutionSpace::Host).unwrap();
        }
        assert!(engine.sync_log.is_empty());
        assert!(engine.modified_log.is_empty());
    }

    #[test]
    fn synchronize_uses_full_mask() {
        let mut engine = MockEngine::new(4, 1).with_accelerator(DeviceType::Cuda, true);
        SystemView::new(&mut engine).synchronize(ExecutionSpace::Device);
        assert_eq!(engine.sync_log.len(), 1);
        assert_eq!(engine.sync_log[0].mask, DataMask::DLEXT);
        assert_eq!(engine.sync_log[0].space, ExecutionSpace::Device);
    }

    #[test]
    fn forces_are_marked_modified_but_positions_are_not() {
        let mut engine = MockEngine::new(4, 1).with_accelerator(DeviceType::Cuda, true);
        {
            let mut view = SystemView::new(&mut engine);
            view.positions(ExecutionSpace::Device).unwrap();
            view.forces(ExecutionSpace::Device).unwrap();
        }
        assert_eq!(engine.sync_log.len(), 2);
        assert_eq!(engine.modified_log.len(), 1);
        assert_eq!(engine.modified_log[0].mask, DataMask::F);
        assert_eq!(engine.modified_log[0].space, ExecutionSpace::Device);
    }

    #[test]
    fn missing_atom_map_is_rejected() {
        let mut engine = MockEngine::new(4, 1).without_atom_map();
        let mut view = SystemView::new(&mut engine);
        let err = view.tags_map(ExecutionSpace::Host).unwrap_err();
        assert!(matches!(
            err,
            PropertyError::MissingPrecondition {
                property: Property::TagsMap,
                ..
            }
        ));
        assert!(view.tags(ExecutionSpace::Host).is_ok());
    }

    #[test]
    fn unregistered_property_is_rejected() {
        let registry = PropertyRegistry::empty();
        let mut engine = MockEngine::new(4, 1);
        let mut view = SystemView::with_registry(&mut engine, &registry);
        assert_eq!(
            view.types(ExecutionSpace::Host).unwrap_err(),
            PropertyError::Unregistered {
                property: Property::Types
            }
        );
    }

    #[test]
    fn counts_and_step_pass_through() {
        let mut engine = MockEngine::new(7, 2).with_global(21);
        engine.set_step(300);
        let view = SystemView::new(&mut engine);
        assert_eq!(view.local_particle_number(), 7);
        assert_eq!(view.global_particle_number(), 21);
        assert_eq!(view.step(), 300);
        assert_eq!(view.device_id(), 0);
    }
}
