//! Bitmasks naming engine arrays ([`DataMask`]) and hook points ([`FixMask`]).

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// A set of per-atom arrays, passed to the engine's sync primitives.
///
/// The first seven bits follow the common engine convention
/// (`X`, `V`, `F`, `TAG`, `TYPE`, `MASK`, `IMAGE`). `MASS` and `MAP` have no
/// engine-side counterpart in that convention; engines map them onto
/// whatever call refreshes the per-type mass table and the atom map.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DataMask(u32);

impl DataMask {
    /// No arrays.
    pub const EMPTY: Self = Self(0);
    /// Positions.
    pub const X: Self = Self(1 << 0);
    /// Velocities.
    pub const V: Self = Self(1 << 1);
    /// Forces.
    pub const F: Self = Self(1 << 2);
    /// Global IDs.
    pub const TAG: Self = Self(1 << 3);
    /// Types.
    pub const TYPE: Self = Self(1 << 4);
    /// Group membership bits.
    pub const MASK: Self = Self(1 << 5);
    /// Packed image counters.
    pub const IMAGE: Self = Self(1 << 6);
    /// Per-type mass table.
    pub const MASS: Self = Self(1 << 16);
    /// Global ID to local index map.
    pub const MAP: Self = Self(1 << 17);

    /// Every array the view can expose, synced together by
    /// `SystemView::synchronize`.
    pub const DLEXT: Self = Self(
        Self::X.0
            | Self::V.0
            | Self::F.0
            | Self::TAG.0
            | Self::TYPE.0
            | Self::MASK.0
            | Self::IMAGE.0
            | Self::MASS.0
            | Self::MAP.0,
    );

    /// Build from raw bits. Unknown bits are kept.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `self | other`.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for DataMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for DataMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for DataMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(DataMask, &str); 9] = [
            (DataMask::X, "X"),
            (DataMask::V, "V"),
            (DataMask::F, "F"),
            (DataMask::TAG, "TAG"),
            (DataMask::TYPE, "TYPE"),
            (DataMask::MASK, "MASK"),
            (DataMask::IMAGE, "IMAGE"),
            (DataMask::MASS, "MASS"),
            (DataMask::MAP, "MAP"),
        ];
        if self.is_empty() {
            return f.write_str("DataMask(EMPTY)");
        }
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(m, _)| self.contains(*m))
            .map(|(_, n)| *n)
            .collect();
        write!(f, "DataMask({})", names.join(" | "))
    }
}

/// Hook points an engine extension can subscribe to.
///
/// Values follow the engine's fix-constant convention.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FixMask(u32);

impl FixMask {
    /// Before the first half of the integration step.
    pub const INITIAL_INTEGRATE: Self = Self(1 << 0);
    /// After the first half of the integration step.
    pub const POST_INTEGRATE: Self = Self(1 << 1);
    /// Before atoms migrate between domains.
    pub const PRE_EXCHANGE: Self = Self(1 << 2);
    /// Before neighbor lists are rebuilt.
    pub const PRE_NEIGHBOR: Self = Self(1 << 3);
    /// Before forces are computed.
    pub const PRE_FORCE: Self = Self(1 << 5);
    /// After forces are computed.
    pub const POST_FORCE: Self = Self(1 << 7);
    /// After the second half of the integration step.
    pub const FINAL_INTEGRATE: Self = Self(1 << 8);

    /// Raw bit representation.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for FixMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
