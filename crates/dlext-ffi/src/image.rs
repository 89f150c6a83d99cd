//! Image-integer layout FFI.

use dlext_core::{ImageFlags, IntWidth};

use crate::status::DLExtStatus;

/// Bit layout of a packed image integer, for consumers that decode the
/// images tensor themselves.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DLExtImageFlags {
    /// Bits per dimension.
    pub bits: u32,
    /// Shift of the z field.
    pub bits2: u32,
    /// Mask of one field.
    pub mask: i64,
    /// Bias added to each counter.
    pub max: i64,
    /// Width of the image integer.
    pub bit_size: u32,
}

impl From<ImageFlags> for DLExtImageFlags {
    fn from(f: ImageFlags) -> Self {
        Self {
            bits: f.bits,
            bits2: f.bits2,
            mask: f.mask,
            max: f.max,
            bit_size: f.bit_size,
        }
    }
}

/// Write the layout for a `imageint_bits`-wide image integer (32 or 64).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_image_flags(imageint_bits: u32, flags_out: *mut DLExtImageFlags) -> i32 {
    ffi_guard!({
        if flags_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(width) = IntWidth::from_bits(imageint_bits) else {
            return DLExtStatus::InvalidArgument as i32;
        };
        // SAFETY: flags_out is non-null and valid per caller contract.
        unsafe { *flags_out = ImageFlags::for_width(width).into() };
        DLExtStatus::Ok as i32
    })
}
