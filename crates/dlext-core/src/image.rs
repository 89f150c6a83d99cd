//! Packing of three periodic image counters into one image integer.

use crate::dtype::IntWidth;

/// Bit layout of a packed image integer.
///
/// Each of x, y and z is stored biased by [`max`](Self::max) in
/// [`bits`](Self::bits) bits: x in the low field, y above it, z above that.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageFlags {
    /// Bits per dimension.
    pub bits: u32,
    /// `2 * bits`, the shift of the z field.
    pub bits2: u32,
    /// Mask of one field, `(1 << bits) - 1`.
    pub mask: i64,
    /// Bias added to each counter, `1 << (bits - 1)`.
    pub max: i64,
    /// Width of the image integer in bits.
    pub bit_size: u32,
}

impl ImageFlags {
    /// Layout for an image integer of the given width.
    pub const fn for_width(width: IntWidth) -> Self {
        let (bits, bit_size) = match width {
            IntWidth::I32 => (10, 32),
            IntWidth::I64 => (21, 64),
        };
        Self {
            bits,
            bits2: 2 * bits,
            mask: (1 << bits) - 1,
            max: 1 << (bits - 1),
            bit_size,
        }
    }

    /// Pack per-dimension image counters.
    ///
    /// Counters outside `[-max, max)` wrap within their field.
    pub fn pack(&self, image: [i32; 3]) -> i64 {
        let field = |v: i32| (v as i64 + self.max) & self.mask;
        (field(image[2]) << self.bits2) | (field(image[1]) << self.bits) | field(image[0])
    }

    /// Unpack a packed image integer into `[x, y, z]` counters.
    pub fn unpack(&self, packed: i64) -> [i32; 3] {
        let x = (packed & self.mask) - self.max;
        let y = ((packed >> self.bits) & self.mask) - self.max;
        let z = ((packed >> self.bits2) & self.mask) - self.max;
        [x as i32, y as i32, z as i32]
    }

    /// Packed value for a particle that has not crossed any boundary.
    pub fn zero(&self) -> i64 {
        self.pack([0, 0, 0])
    }
}
