//! Engine description supplied by C callers.

use std::ffi::c_void;

use dlext_core::{
    Accelerator, DataMask, DeviceType, EngineLayout, ExecutionSpace, FloatWidth, IntWidth,
    ParticleEngine, Property, TimeStep,
};

/// Returns a count from the engine.
pub type DLExtCountFn = unsafe extern "C" fn(user_data: *mut c_void) -> u64;

/// Returns the engine's current step.
pub type DLExtStepFn = unsafe extern "C" fn(user_data: *mut c_void) -> i64;

/// Returns the array for `(property, space)` codes.
pub type DLExtArrayFn =
    unsafe extern "C" fn(user_data: *mut c_void, property: i32, space: i32) -> *mut c_void;

/// Syncs or marks modified the arrays in `mask` on `space`.
pub type DLExtMaskFn = unsafe extern "C" fn(user_data: *mut c_void, space: i32, mask: u32);

/// Callback table describing one engine instance.
///
/// Required callbacks: `local_particle_number`, `global_particle_number`,
/// `ntypes`, `map_size`, `array_ptr`, `current_step`. `sync` and
/// `modified` may be null on engines without an accelerator.
///
/// `accelerator_device_type` is a DLPack device code, or 0 when the engine
/// has no accelerator backend. Bit widths must be 32 or 64.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DLExtEngine {
    /// Passed back to every callback.
    pub user_data: *mut c_void,
    /// Particles in this partition.
    pub local_particle_number: Option<DLExtCountFn>,
    /// Particles across all partitions.
    pub global_particle_number: Option<DLExtCountFn>,
    /// Number of particle types.
    pub ntypes: Option<DLExtCountFn>,
    /// Length of the global ID to local index table.
    pub map_size: Option<DLExtCountFn>,
    /// Raw array lookup.
    pub array_ptr: Option<DLExtArrayFn>,
    /// Blocking residency sync.
    pub sync: Option<DLExtMaskFn>,
    /// Modification marker.
    pub modified: Option<DLExtMaskFn>,
    /// Current integration step.
    pub current_step: Option<DLExtStepFn>,
    /// Nonzero when particles carry global IDs.
    pub has_tags: u8,
    /// Nonzero when the engine keeps an array-style atom map.
    pub has_atom_map: u8,
    /// Width of the engine's float type.
    pub float_bits: u32,
    /// Width of the engine's tag integer.
    pub tagint_bits: u32,
    /// Width of the engine's image integer.
    pub imageint_bits: u32,
    /// DLPack device code of the accelerator, or 0 for none.
    pub accelerator_device_type: i32,
    /// Nonzero when the accelerator is engaged for this run.
    pub accelerator_active: u8,
}

/// A validated [`DLExtEngine`] usable as a [`ParticleEngine`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct ForeignEngine {
    user_data: *mut c_void,
    local_particle_number: DLExtCountFn,
    global_particle_number: DLExtCountFn,
    ntypes: DLExtCountFn,
    map_size: DLExtCountFn,
    array_ptr: DLExtArrayFn,
    sync: Option<DLExtMaskFn>,
    modified: Option<DLExtMaskFn>,
    current_step: DLExtStepFn,
    has_tags: bool,
    has_atom_map: bool,
    layout: EngineLayout,
    accelerator: Option<Accelerator>,
}

// SAFETY: The FFI contract requires user_data and the callbacks to be usable
// from whichever thread calls into dlext. Each ForeignEngine sits behind a
// Mutex, so callbacks are never invoked concurrently.
#[allow(unsafe_code)]
unsafe impl Send for ForeignEngine {}

impl ForeignEngine {
    /// Check required callbacks and widths.
    pub(crate) fn from_table(table: &DLExtEngine) -> Option<Self> {
        let float = match table.float_bits {
            32 => FloatWidth::Single,
            64 => FloatWidth::Double,
            _ => return None,
        };
        let accelerator = match table.accelerator_device_type {
            0 => None,
            code => Some(Accelerator {
                device_type: DeviceType::from_code(code)?,
                active: table.accelerator_active != 0,
            }),
        };
        Some(Self {
            user_data: table.user_data,
            local_particle_number: table.local_particle_number?,
            global_particle_number: table.global_particle_number?,
            ntypes: table.ntypes?,
            map_size: table.map_size?,
            array_ptr: table.array_ptr?,
            sync: table.sync,
            modified: table.modified,
            current_step: table.current_step?,
            has_tags: table.has_tags != 0,
            has_atom_map: table.has_atom_map != 0,
            layout: EngineLayout {
                float,
                tagint: IntWidth::from_bits(table.tagint_bits)?,
                imageint: IntWidth::from_bits(table.imageint_bits)?,
            },
            accelerator,
        })
    }
}

#[allow(unsafe_code)]
impl ParticleEngine for ForeignEngine {
    fn local_particle_number(&self) -> usize {
        // SAFETY: callback validity is the caller's contract.
        unsafe { (self.local_particle_number)(self.user_data) as usize }
    }

    fn global_particle_number(&self) -> u64 {
        // SAFETY: from_table checked the pointer is set; user_data is the
        // caller's to keep alive.
        unsafe { (self.global_particle_number)(self.user_data) }
    }

    fn ntypes(&self) -> usize {
        // SAFETY: required callback, checked by from_table.
        unsafe { (self.ntypes)(self.user_data) as usize }
    }

    fn map_size(&self) -> usize {
        // SAFETY: required callback, checked by from_table.
        unsafe { (self.map_size)(self.user_data) as usize }
    }

    fn has_tags(&self) -> bool {
        self.has_tags
    }

    fn has_atom_map(&self) -> bool {
        self.has_atom_map
    }

    fn layout(&self) -> EngineLayout {
        self.layout
    }

    fn accelerator(&self) -> Option<Accelerator> {
        self.accelerator
    }

    fn array_ptr(&mut self, property: Property, space: ExecutionSpace) -> *mut c_void {
        // SAFETY: required callback; the codes come from valid enums. The
        // returned pointer is only read by the descriptor builder.
        unsafe { (self.array_ptr)(self.user_data, property.code(), space.code()) }
    }

    fn sync(&mut self, space: ExecutionSpace, mask: DataMask) {
        if let Some(sync) = self.sync {
            // SAFETY: optional callback, present on this table.
            unsafe { sync(self.user_data, space.code(), mask.bits()) }
        }
    }

    fn modified(&mut self, space: ExecutionSpace, mask: DataMask) {
        if let Some(modified) = self.modified {
            // SAFETY: optional callback, present on this table.
            unsafe { modified(self.user_data, space.code(), mask.bits()) }
        }
    }

    fn current_step(&self) -> TimeStep {
        // SAFETY: required callback, checked by from_table.
        unsafe { (self.current_step)(self.user_data) }
    }
}
