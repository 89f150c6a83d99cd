//! DLPack ABI definitions.
//!
//! These structs match `dlpack.h` field for field. See
//! <https://github.com/dmlc/dlpack/blob/main/include/dlpack/dlpack.h>.

use std::ffi::c_void;
use std::os::raw::c_int;

use dlext_core::{DataTypeCode, DeviceType};

/// Where a tensor's data lives.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DLDevice {
    /// `DLDeviceType` value. Stored as raw `i32` so foreign values never
    /// produce an invalid Rust enum.
    pub device_type: i32,
    /// Device ordinal.
    pub device_id: i32,
}

impl DLDevice {
    /// Device of the given kind and ordinal.
    pub const fn new(device_type: DeviceType, device_id: i32) -> Self {
        Self {
            device_type: device_type as i32,
            device_id,
        }
    }

    /// Host CPU, ordinal 0.
    pub const fn cpu() -> Self {
        Self::new(DeviceType::Cpu, 0)
    }

    /// Decoded device kind, `None` for values outside the header.
    pub fn kind(&self) -> Option<DeviceType> {
        DeviceType::from_code(self.device_type)
    }

    /// True for [`DeviceType::Cpu`].
    pub fn is_cpu(&self) -> bool {
        self.device_type == DeviceType::Cpu as i32
    }
}

impl Default for DLDevice {
    fn default() -> Self {
        Self::cpu()
    }
}

/// Element type of a tensor.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DLDataType {
    /// `DLDataTypeCode` value.
    pub code: u8,
    /// Bits per element.
    pub bits: u8,
    /// Vector lanes per element. Always 1 here.
    pub lanes: u16,
}

impl DLDataType {
    /// Scalar (single-lane) type of the given category and width.
    pub const fn new(code: DataTypeCode, bits: u8) -> Self {
        Self {
            code: code as u8,
            bits,
            lanes: 1,
        }
    }

    /// 64-bit float.
    pub const F64: Self = Self::new(DataTypeCode::Float, 64);
    /// 32-bit float.
    pub const F32: Self = Self::new(DataTypeCode::Float, 32);
    /// 64-bit signed integer.
    pub const I64: Self = Self::new(DataTypeCode::Int, 64);
    /// 32-bit signed integer.
    pub const I32: Self = Self::new(DataTypeCode::Int, 32);

    /// Width of one element in bytes.
    pub fn size_in_bytes(&self) -> usize {
        (self.bits as usize * self.lanes as usize).div_ceil(8)
    }
}

/// Tensor metadata without ownership.
#[repr(C)]
#[derive(Debug)]
pub struct DLTensor {
    /// Pointer to the first element. A device pointer for device tensors.
    pub data: *mut c_void,
    /// Where `data` lives.
    pub device: DLDevice,
    /// Number of dimensions.
    pub ndim: c_int,
    /// Element type.
    pub dtype: DLDataType,
    /// `ndim` extents, in elements.
    pub shape: *mut i64,
    /// `ndim` strides, in elements. May be null for compact row-major data.
    pub strides: *mut i64,
    /// Offset in bytes from `data` to the first element.
    pub byte_offset: u64,
}

impl Default for DLTensor {
    fn default() -> Self {
        Self {
            data: std::ptr::null_mut(),
            device: DLDevice::default(),
            ndim: 0,
            dtype: DLDataType::default(),
            shape: std::ptr::null_mut(),
            strides: std::ptr::null_mut(),
            byte_offset: 0,
        }
    }
}

/// Deleter called by the consumer exactly once when it is done.
pub type DLManagedTensorDeleter = unsafe extern "C" fn(*mut DLManagedTensor);

/// A tensor plus the context and deleter that manage its lifetime.
#[repr(C)]
#[derive(Debug)]
pub struct DLManagedTensor {
    /// Tensor metadata.
    pub dl_tensor: DLTensor,
    /// Producer-private context, passed back through `deleter`.
    pub manager_ctx: *mut c_void,
    /// Release hook. `None` means nothing to release.
    pub deleter: Option<DLManagedTensorDeleter>,
}

impl Default for DLManagedTensor {
    fn default() -> Self {
        Self {
            dl_tensor: DLTensor::default(),
            manager_ctx: std::ptr::null_mut(),
            deleter: None,
        }
    }
}

// Layout must match the C header on every target.
const _: () = assert!(std::mem::size_of::<DLDevice>() == 8);
const _: () = assert!(std::mem::size_of::<DLDataType>() == 4);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<DLTensor>() == 48);
#[cfg(target_pointer_width = "64")]
const _: () = assert!(std::mem::size_of::<DLManagedTensor>() == 64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_constructors() {
        let cpu = DLDevice::cpu();
        assert!(cpu.is_cpu());
        assert_eq!(cpu.device_id, 0);
        assert_eq!(cpu.kind(), Some(DeviceType::Cpu));

        let gpu = DLDevice::new(DeviceType::Cuda, 0);
        assert!(!gpu.is_cpu());
        assert_eq!(gpu.device_type, 2);
    }

    #[test]
    fn unknown_device_type_decodes_to_none() {
        let d = DLDevice {
            device_type: 99,
            device_id: 0,
        };
        assert_eq!(d.kind(), None);
    }

    #[test]
    fn dtype_constants() {
        assert_eq!(DLDataType::F64.code, 2);
        assert_eq!(DLDataType::F64.bits, 64);
        assert_eq!(DLDataType::I32.code, 0);
        assert_eq!(DLDataType::I32.lanes, 1);
        assert_eq!(DLDataType::F32.size_in_bytes(), 4);
        assert_eq!(DLDataType::I64.size_in_bytes(), 8);
    }

    #[test]
    fn default_tensor_is_empty() {
        let t = DLManagedTensor::default();
        assert!(t.dl_tensor.data.is_null());
        assert!(t.manager_ctx.is_null());
        assert!(t.deleter.is_none());
        assert_eq!(t.dl_tensor.ndim, 0);
    }
}
