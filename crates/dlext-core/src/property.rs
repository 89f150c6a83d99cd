//! The [`Property`] tag naming one engine-managed particle array.

use std::fmt;
use std::str::FromStr;

/// A physical quantity stored in engine-managed arrays.
///
/// Every variant maps to exactly one engine array. The per-property shape,
/// dtype and sync rules live in the view crate's property registry; this
/// enum only names the array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    /// Particle positions, `[nlocal, 3]` floats.
    Positions,
    /// Particle velocities, `[nlocal, 3]` floats.
    Velocities,
    /// Per-type masses, `[ntypes + 1]` floats. Slot 0 is unused.
    Masses,
    /// Net forces, `[nlocal, 3]` floats. Always writable.
    Forces,
    /// Packed periodic image counters, `[nlocal]` integers.
    Images,
    /// Global particle IDs, `[nlocal]` integers.
    Tags,
    /// Global ID to local index lookup table, `[map_size]` int32.
    TagsMap,
    /// Particle types, `[nlocal]` int32.
    Types,
}

impl Property {
    /// All properties in declaration order.
    pub const ALL: [Property; 8] = [
        Property::Positions,
        Property::Velocities,
        Property::Masses,
        Property::Forces,
        Property::Images,
        Property::Tags,
        Property::TagsMap,
        Property::Types,
    ];

    /// The order in which descriptors are handed to a step callback.
    pub const CALLBACK_ORDER: [Property; 8] = [
        Property::Positions,
        Property::Velocities,
        Property::Types,
        Property::Tags,
        Property::Forces,
        Property::Images,
        Property::Masses,
        Property::TagsMap,
    ];

    /// Lowercase name used in argument strings and log output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Positions => "positions",
            Self::Velocities => "velocities",
            Self::Masses => "masses",
            Self::Forces => "forces",
            Self::Images => "images",
            Self::Tags => "tags",
            Self::TagsMap => "tags_map",
            Self::Types => "types",
        }
    }

    /// Stable integer code used across the C ABI.
    pub fn code(self) -> i32 {
        match self {
            Self::Positions => 0,
            Self::Velocities => 1,
            Self::Masses => 2,
            Self::Forces => 3,
            Self::Images => 4,
            Self::Tags => 5,
            Self::TagsMap => 6,
            Self::Types => 7,
        }
    }

    /// Inverse of [`code`](Self::code). Returns `None` for unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.code() == code)
    }

    /// Position of this property in [`CALLBACK_ORDER`](Self::CALLBACK_ORDER).
    pub fn callback_rank(self) -> usize {
        Self::CALLBACK_ORDER
            .iter()
            .position(|&p| p == self)
            .unwrap_or(Self::CALLBACK_ORDER.len())
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a string names no known property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownProperty(pub String);

impl fmt::Display for UnknownProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown property '{}'", self.0)
    }
}

impl std::error::Error for UnknownProperty {}

impl FromStr for Property {
    type Err = UnknownProperty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownProperty(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for p in Property::ALL {
            assert_eq!(Property::from_code(p.code()), Some(p));
        }
        assert_eq!(Property::from_code(8), None);
        assert_eq!(Property::from_code(-1), None);
    }

    #[test]
    fn names_parse_back() {
        for p in Property::ALL {
            assert_eq!(p.name().parse::<Property>(), Ok(p));
        }
        assert!("charges".parse::<Property>().is_err());
    }

    #[test]
    fn callback_order_is_a_permutation() {
        let mut sorted = Property::CALLBACK_ORDER;
        sorted.sort();
        let mut all = Property::ALL;
        all.sort();
        assert_eq!(sorted, all);
    }

    #[test]
    fn callback_rank_places_forces_after_tags() {
        assert_eq!(Property::Positions.callback_rank(), 0);
        assert_eq!(Property::Velocities.callback_rank(), 1);
        assert!(Property::Tags.callback_rank() < Property::Forces.callback_rank());
    }
}
