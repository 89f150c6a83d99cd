//! The boundary between dlext and a molecular-dynamics engine.

use std::ffi::c_void;

use crate::dtype::{DeviceType, EngineLayout};
use crate::mask::DataMask;
use crate::property::Property;
use crate::space::ExecutionSpace;

/// The engine's monotonically increasing integration step counter.
pub type TimeStep = i64;

/// Accelerator backend the engine was built with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Accelerator {
    /// DLPack device kind of accelerator-resident arrays.
    pub device_type: DeviceType,
    /// Whether the backend is engaged for this run. A backend can be
    /// compiled in yet disabled at runtime.
    pub active: bool,
}

/// What dlext needs from an engine.
///
/// All pointers returned by [`array_ptr`](Self::array_ptr) are owned by the
/// engine. They stay valid until the next sync point or the next
/// reallocation, whichever comes first; dlext never frees them.
///
/// # Object safety
///
/// The trait is object-safe; views hold `&mut dyn ParticleEngine`.
pub trait ParticleEngine {
    /// Number of particles owned by this partition.
    fn local_particle_number(&self) -> usize;

    /// Number of particles across all partitions.
    fn global_particle_number(&self) -> u64;

    /// Number of particle types. The mass table has `ntypes + 1` slots.
    fn ntypes(&self) -> usize;

    /// Length of the global ID to local index lookup table.
    fn map_size(&self) -> usize;

    /// Whether particles carry global IDs.
    fn has_tags(&self) -> bool {
        true
    }

    /// Whether the engine maintains an array-style atom map.
    fn has_atom_map(&self) -> bool;

    /// Numeric layout of this build.
    fn layout(&self) -> EngineLayout {
        EngineLayout::default()
    }

    /// Accelerator backend, or `None` if the engine was built without one.
    fn accelerator(&self) -> Option<Accelerator> {
        None
    }

    /// Raw pointer to the first element of `property` on `space`.
    ///
    /// Only called with [`ExecutionSpace::Device`] when
    /// [`accelerator`](Self::accelerator) reports an active backend.
    fn array_ptr(&mut self, property: Property, space: ExecutionSpace) -> *mut c_void;

    /// Make the arrays in `mask` current on `space`.
    ///
    /// Blocking. Engines without an accelerator ignore it.
    fn sync(&mut self, _space: ExecutionSpace, _mask: DataMask) {}

    /// Record that the arrays in `mask` may be modified on `space`.
    fn modified(&mut self, _space: ExecutionSpace, _mask: DataMask) {}

    /// Current integration step.
    fn current_step(&self) -> TimeStep;
}
