//! In-memory particle engine with an optional device mirror.

use std::ffi::c_void;

use dlext_core::{
    Accelerator, DataMask, DeviceType, EngineLayout, ExecutionSpace, ImageFlags, ParticleEngine,
    Property, TimeStep,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::buffers::{FloatBuf, IntBuf};

/// One recorded `sync` or `modified` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncCall {
    pub space: ExecutionSpace,
    pub mask: DataMask,
}

/// Second copy of every array, standing in for accelerator memory.
#[derive(Clone, Debug)]
struct DeviceMirror {
    x: FloatBuf,
    v: FloatBuf,
    f: FloatBuf,
    mass: FloatBuf,
    tags: IntBuf,
    images: IntBuf,
    types: Vec<i32>,
    map: Vec<i32>,
}

fn mask_of(property: Property) -> DataMask {
    match property {
        Property::Positions => DataMask::X,
        Property::Velocities => DataMask::V,
        Property::Masses => DataMask::MASS,
        Property::Forces => DataMask::F,
        Property::Images => DataMask::IMAGE,
        Property::Tags => DataMask::TAG,
        Property::TagsMap => DataMask::MAP,
        Property::Types => DataMask::TYPE,
    }
}

/// A deterministic [`ParticleEngine`] for tests and benchmarks.
///
/// Host floats are always `f64`. The device mirror, when present, stores
/// floats at the layout's precision and integers at the layout's widths.
/// Writes through one residency mark the other stale; `sync` copies stale
/// arrays across, like a Kokkos dual view.
#[derive(Clone, Debug)]
pub struct MockEngine {
    nlocal: usize,
    nglobal: u64,
    ntypes: usize,
    layout: EngineLayout,
    accelerator: Option<Accelerator>,
    has_tags: bool,
    has_atom_map: bool,
    step: TimeStep,

    x: Vec<f64>,
    v: Vec<f64>,
    f: Vec<f64>,
    mass: Vec<f64>,
    tags: IntBuf,
    images: IntBuf,
    types: Vec<i32>,
    map: Vec<i32>,

    device: Option<DeviceMirror>,
    host_stale: DataMask,
    device_stale: DataMask,

    pub sync_log: Vec<SyncCall>,
    pub modified_log: Vec<SyncCall>,
}

impl MockEngine {
    /// `nlocal` particles of `ntypes` types, zeroed floats, tags `1..=nlocal`.
    pub fn new(nlocal: usize, ntypes: usize) -> Self {
        let layout = EngineLayout::default();
        let mut engine = Self {
            nlocal,
            nglobal: nlocal as u64,
            ntypes,
            layout,
            accelerator: None,
            has_tags: true,
            has_atom_map: true,
            step: 0,
            x: vec![0.0; nlocal * 3],
            v: vec![0.0; nlocal * 3],
            f: vec![0.0; nlocal * 3],
            mass: (0..=ntypes).map(|t| t as f64).collect(),
            tags: IntBuf::I32(Vec::new()),
            images: IntBuf::I32(Vec::new()),
            types: (0..nlocal).map(|i| (i % ntypes.max(1)) as i32 + 1).collect(),
            map: Vec::new(),
            device: None,
            host_stale: DataMask::EMPTY,
            device_stale: DataMask::EMPTY,
            sync_log: Vec::new(),
            modified_log: Vec::new(),
        };
        engine.rebuild_int_arrays();
        engine
    }

    /// Switch numeric layout; integer arrays are rebuilt at the new widths.
    pub fn with_layout(mut self, layout: EngineLayout) -> Self {
        self.layout = layout;
        self.rebuild_int_arrays();
        if self.device.is_some() {
            self.device = Some(self.mirror());
        }
        self
    }

    /// Attach an accelerator backend and allocate the device mirror.
    pub fn with_accelerator(mut self, device_type: DeviceType, active: bool) -> Self {
        self.accelerator = Some(Accelerator {
            device_type,
            active,
        });
        self.device = Some(self.mirror());
        self.host_stale = DataMask::EMPTY;
        self.device_stale = DataMask::EMPTY;
        self
    }

    /// Fill positions, velocities and forces from a seeded ChaCha8 stream.
    pub fn with_seed(mut self, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for value in self.x.iter_mut() {
            *value = rng.random_range(0.0..10.0);
        }
        for value in self.v.iter_mut().chain(self.f.iter_mut()) {
            *value = rng.random::<f64>() - 0.5;
        }
        if self.device.is_some() {
            self.device = Some(self.mirror());
        }
        self
    }

    /// Report a larger global particle count, as in a partitioned run.
    pub fn with_global(mut self, nglobal: u64) -> Self {
        self.nglobal = nglobal;
        self
    }

    /// Behave like an engine run with atom IDs disabled.
    pub fn without_tags(mut self) -> Self {
        self.has_tags = false;
        self
    }

    /// Behave like an engine run with no atom map.
    pub fn without_atom_map(mut self) -> Self {
        self.has_atom_map = false;
        self
    }

    pub fn set_step(&mut self, step: TimeStep) {
        self.step = step;
    }

    pub fn advance(&mut self) -> TimeStep {
        self.step += 1;
        self.step
    }

    pub fn host_positions(&self) -> &[f64] {
        &self.x
    }

    pub fn host_velocities(&self) -> &[f64] {
        &self.v
    }

    pub fn host_forces(&self) -> &[f64] {
        &self.f
    }

    pub fn host_masses(&self) -> &[f64] {
        &self.mass
    }

    pub fn host_tags(&self) -> Vec<i64> {
        self.tags.to_i64()
    }

    pub fn host_images(&self) -> Vec<i64> {
        self.images.to_i64()
    }

    pub fn host_types(&self) -> &[i32] {
        &self.types
    }

    pub fn host_map(&self) -> &[i32] {
        &self.map
    }

    /// Device-side forces widened to `f64`, if a mirror exists.
    pub fn device_forces(&self) -> Option<Vec<f64>> {
        self.device.as_ref().map(|d| d.f.to_f64())
    }

    /// Device-side positions widened to `f64`, if a mirror exists.
    pub fn device_positions(&self) -> Option<Vec<f64>> {
        self.device.as_ref().map(|d| d.x.to_f64())
    }

    /// Overwrite host positions as the engine's integrator would.
    pub fn write_host_positions(&mut self, values: &[f64]) {
        self.x.copy_from_slice(values);
        self.device_stale |= DataMask::X;
    }

    /// Overwrite device forces as an accelerated pair style would.
    pub fn write_device_forces(&mut self, values: &[f64]) {
        if let Some(device) = self.device.as_mut() {
            device.f.assign(values);
            self.host_stale |= DataMask::F;
        }
    }

    pub fn set_image(&mut self, index: usize, image: [i32; 3]) {
        let packed = ImageFlags::for_width(self.layout.imageint).pack(image);
        let mut images = self.images.to_i64();
        images[index] = packed;
        self.images.assign(&images);
        self.device_stale |= DataMask::IMAGE;
    }

    pub fn stale_on(&self, space: ExecutionSpace) -> DataMask {
        match space {
            ExecutionSpace::Host => self.host_stale,
            ExecutionSpace::Device => self.device_stale,
        }
    }

    fn rebuild_int_arrays(&mut self) {
        let tags: Vec<i64> = (1..=self.nlocal as i64).collect();
        self.tags = IntBuf::from_i64(self.layout.tagint, &tags);
        let zero = ImageFlags::for_width(self.layout.imageint).zero();
        self.images = IntBuf::from_i64(self.layout.imageint, &vec![zero; self.nlocal]);
        self.map = vec![-1; self.nlocal + 1];
        for (index, tag) in tags.iter().enumerate() {
            self.map[*tag as usize] = index as i32;
        }
    }

    fn mirror(&self) -> DeviceMirror {
        let float = self.layout.float;
        DeviceMirror {
            x: FloatBuf::from_f64(float, &self.x),
            v: FloatBuf::from_f64(float, &self.v),
            f: FloatBuf::from_f64(float, &self.f),
            mass: FloatBuf::from_f64(float, &self.mass),
            tags: self.tags.clone(),
            images: self.images.clone(),
            types: self.types.clone(),
            map: self.map.clone(),
        }
    }

    fn copy_to_device(&mut self, property: Property) {
        let Some(device) = self.device.as_mut() else {
            return;
        };
        match property {
            Property::Positions => device.x.assign(&self.x),
            Property::Velocities => device.v.assign(&self.v),
            Property::Forces => device.f.assign(&self.f),
            Property::Masses => device.mass.assign(&self.mass),
            Property::Tags => device.tags = self.tags.clone(),
            Property::Images => device.images = self.images.clone(),
            Property::Types => device.types.clone_from(&self.types),
            Property::TagsMap => device.map.clone_from(&self.map),
        }
    }

    fn copy_to_host(&mut self, property: Property) {
        let Some(device) = self.device.as_ref() else {
            return;
        };
        match property {
            Property::Positions => self.x = device.x.to_f64(),
            Property::Velocities => self.v = device.v.to_f64(),
            Property::Forces => self.f = device.f.to_f64(),
            Property::Masses => self.mass = device.mass.to_f64(),
            Property::Tags => self.tags = device.tags.clone(),
            Property::Images => self.images = device.images.clone(),
            Property::Types => self.types.clone_from(&device.types),
            Property::TagsMap => self.map.clone_from(&device.map),
        }
    }
}

impl ParticleEngine for MockEngine {
    fn local_particle_number(&self) -> usize {
        self.nlocal
    }

    fn global_particle_number(&self) -> u64 {
        self.nglobal
    }

    fn ntypes(&self) -> usize {
        self.ntypes
    }

    fn map_size(&self) -> usize {
        self.map.len()
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
        if let (ExecutionSpace::Device, Some(device)) = (space, self.device.as_mut()) {
            return match property {
                Property::Positions => device.x.as_mut_ptr(),
                Property::Velocities => device.v.as_mut_ptr(),
                Property::Masses => device.mass.as_mut_ptr(),
                Property::Forces => device.f.as_mut_ptr(),
                Property::Images => device.images.as_mut_ptr(),
                Property::Tags => device.tags.as_mut_ptr(),
                Property::TagsMap => device.map.as_mut_ptr().cast(),
                Property::Types => device.types.as_mut_ptr().cast(),
            };
        }
        match property {
            Property::Positions => self.x.as_mut_ptr().cast(),
            Property::Velocities => self.v.as_mut_ptr().cast(),
            Property::Masses => self.mass.as_mut_ptr().cast(),
            Property::Forces => self.f.as_mut_ptr().cast(),
            Property::Images => self.images.as_mut_ptr(),
            Property::Tags => self.tags.as_mut_ptr(),
            Property::TagsMap => self.map.as_mut_ptr().cast(),
            Property::Types => self.types.as_mut_ptr().cast(),
        }
    }

    fn sync(&mut self, space: ExecutionSpace, mask: DataMask) {
        self.sync_log.push(SyncCall { space, mask });
        if self.device.is_none() {
            return;
        }
        for property in Property::ALL {
            let bit = mask_of(property);
            if !mask.contains(bit) || !self.stale_on(space).contains(bit) {
                continue;
            }
            match space {
                ExecutionSpace::Host => self.copy_to_host(property),
                ExecutionSpace::Device => self.copy_to_device(property),
            }
        }
        let keep = DataMask::from_bits(self.stale_on(space).bits() & !mask.bits());
        match space {
            ExecutionSpace::Host => self.host_stale = keep,
            ExecutionSpace::Device => self.device_stale = keep,
        }
    }

    fn modified(&mut self, space: ExecutionSpace, mask: DataMask) {
        self.modified_log.push(SyncCall { space, mask });
        if self.device.is_none() {
            return;
        }
        match space {
            ExecutionSpace::Host => self.device_stale |= mask,
            ExecutionSpace::Device => self.host_stale |= mask,
        }
    }

    fn current_step(&self) -> TimeStep {
        self.step
    }
}
