//! Per-property dispatch table.
//!
//! Each [`Property`] maps to one [`PropertySpec`] row describing where its
//! array lives and how it is shaped. The descriptor builder only reads
//! rows, so a new property needs a new enum variant and a new row, nothing
//! else.

use std::ffi::c_void;
use std::sync::OnceLock;

use dlext_core::{
    DataMask, DataTypeCode, EngineLayout, ExecutionSpace, ParticleEngine, Property,
};
use indexmap::IndexMap;

/// Fetches the raw array pointer for a property on a residency.
pub type Accessor = fn(&mut dyn ParticleEngine, ExecutionSpace) -> *mut c_void;

/// Computes an extent (primary count or secondary dimension).
pub type ExtentRule = fn(&dyn ParticleEngine) -> usize;

/// Computes the element bit width on the effective residency.
pub type WidthRule = fn(EngineLayout, ExecutionSpace) -> u8;

/// Checks that the engine can expose the property at all.
pub type Precondition = fn(&dyn ParticleEngine) -> Result<(), &'static str>;

/// How one property is located, typed and shaped.
#[derive(Clone, Copy, Debug)]
pub struct PropertySpec {
    /// Array pointer lookup.
    pub accessor: Accessor,
    /// DLPack element kind.
    pub code: DataTypeCode,
    /// Element width rule.
    pub bits: WidthRule,
    /// Number of records.
    pub size: ExtentRule,
    /// Elements per record.
    pub second_dim: ExtentRule,
    /// Sync mask covering the array.
    pub mask: DataMask,
    /// Whether consumers may write through the descriptor.
    pub writable: bool,
    /// Availability check run before any pointer is taken.
    pub precondition: Option<Precondition>,
}

fn positions(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Positions, space)
}

fn velocities(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Velocities, space)
}

fn masses(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Masses, space)
}

fn forces(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Forces, space)
}

fn images(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Images, space)
}

fn tags(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Tags, space)
}

fn tags_map(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::TagsMap, space)
}

fn types(engine: &mut dyn ParticleEngine, space: ExecutionSpace) -> *mut c_void {
    engine.array_ptr(Property::Types, space)
}

/// Host arrays are always double; device arrays follow the build.
fn float_bits(layout: EngineLayout, space: ExecutionSpace) -> u8 {
    match space {
        ExecutionSpace::Host => 64,
        ExecutionSpace::Device => layout.float.bits(),
    }
}

fn tagint_bits(layout: EngineLayout, _space: ExecutionSpace) -> u8 {
    layout.tagint.bits()
}

fn imageint_bits(layout: EngineLayout, _space: ExecutionSpace) -> u8 {
    layout.imageint.bits()
}

fn int32_bits(_layout: EngineLayout, _space: ExecutionSpace) -> u8 {
    32
}

fn local_count(engine: &dyn ParticleEngine) -> usize {
    engine.local_particle_number()
}

fn type_table_len(engine: &dyn ParticleEngine) -> usize {
    engine.ntypes() + 1
}

fn map_len(engine: &dyn ParticleEngine) -> usize {
    engine.map_size()
}

fn three(_engine: &dyn ParticleEngine) -> usize {
    3
}

fn one(_engine: &dyn ParticleEngine) -> usize {
    1
}

fn needs_tags(engine: &dyn ParticleEngine) -> Result<(), &'static str> {
    if engine.has_tags() {
        Ok(())
    } else {
        Err("atom IDs are not enabled")
    }
}

fn needs_atom_map(engine: &dyn ParticleEngine) -> Result<(), &'static str> {
    needs_tags(engine)?;
    if engine.has_atom_map() {
        Ok(())
    } else {
        Err("atom map is not enabled")
    }
}

const fn vector(accessor: Accessor, mask: DataMask, writable: bool) -> PropertySpec {
    PropertySpec {
        accessor,
        code: DataTypeCode::Float,
        bits: float_bits,
        size: local_count,
        second_dim: three,
        mask,
        writable,
        precondition: None,
    }
}

const fn per_particle_int(accessor: Accessor, bits: WidthRule, mask: DataMask) -> PropertySpec {
    PropertySpec {
        accessor,
        code: DataTypeCode::Int,
        bits,
        size: local_count,
        second_dim: one,
        mask,
        writable: false,
        precondition: None,
    }
}

/// Ordered table of property rows.
#[derive(Clone, Debug)]
pub struct PropertyRegistry {
    rows: IndexMap<Property, PropertySpec>,
}

impl PropertyRegistry {
    /// Empty registry.
    pub fn empty() -> Self {
        Self {
            rows: IndexMap::new(),
        }
    }

    /// The built-in rows for every [`Property`].
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(
            Property::Positions,
            vector(positions, DataMask::X, false),
        );
        registry.register(
            Property::Velocities,
            vector(velocities, DataMask::V, false),
        );
        registry.register(
            Property::Masses,
            PropertySpec {
                accessor: masses,
                code: DataTypeCode::Float,
                bits: float_bits,
                size: type_table_len,
                second_dim: one,
                mask: DataMask::MASS,
                writable: false,
                precondition: None,
            },
        );
        registry.register(Property::Forces, vector(forces, DataMask::F, true));
        registry.register(
            Property::Images,
            per_particle_int(images, imageint_bits, DataMask::IMAGE),
        );
        registry.register(
            Property::Tags,
            PropertySpec {
                precondition: Some(needs_tags),
                ..per_particle_int(tags, tagint_bits, DataMask::TAG)
            },
        );
        registry.register(
            Property::TagsMap,
            PropertySpec {
                accessor: tags_map,
                code: DataTypeCode::Int,
                bits: int32_bits,
                size: map_len,
                second_dim: one,
                mask: DataMask::MAP,
                writable: false,
                precondition: Some(needs_atom_map),
            },
        );
        registry.register(
            Property::Types,
            per_particle_int(types, int32_bits, DataMask::TYPE),
        );
        registry
    }

    /// Add or replace a row, returning the one it displaced.
    pub fn register(&mut self, property: Property, spec: PropertySpec) -> Option<PropertySpec> {
        self.rows.insert(property, spec)
    }

    /// Row for `property`, if registered.
    pub fn spec(&self, property: Property) -> Option<&PropertySpec> {
        self.rows.get(&property)
    }

    /// Rows in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Property, &PropertySpec)> + '_ {
        self.rows.iter().map(|(p, s)| (*p, s))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no rows are registered.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// Process-wide standard registry, built on first use.
pub fn standard_registry() -> &'static PropertyRegistry {
    static STANDARD: OnceLock<PropertyRegistry> = OnceLock::new();
    STANDARD.get_or_init(PropertyRegistry::standard)
}
