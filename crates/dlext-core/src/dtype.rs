//! DLPack type codes, device kinds, and the engine's build precision.

/// DLPack element type category (`DLDataTypeCode`).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataTypeCode {
    /// Signed integer.
    Int = 0,
    /// Unsigned integer.
    UInt = 1,
    /// IEEE floating point.
    Float = 2,
    /// Opaque handle.
    OpaqueHandle = 3,
    /// bfloat16.
    Bfloat = 4,
    /// Complex.
    Complex = 5,
    /// Boolean.
    Bool = 6,
}

/// DLPack device kind (`DLDeviceType`).
///
/// Discriminants match the DLPack header so `as i32` is the ABI value.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Host CPU.
    Cpu = 1,
    /// CUDA GPU.
    Cuda = 2,
    /// Pinned CUDA host memory.
    CudaHost = 3,
    /// OpenCL device.
    OpenCl = 4,
    /// Vulkan buffer.
    Vulkan = 7,
    /// Metal buffer.
    Metal = 8,
    /// Verilog simulator buffer.
    Vpi = 9,
    /// ROCm GPU.
    Rocm = 10,
    /// Pinned ROCm host memory.
    RocmHost = 11,
    /// Reserved extension device.
    ExtDev = 12,
    /// CUDA managed memory.
    CudaManaged = 13,
    /// Unified shared memory (oneAPI).
    OneApi = 14,
    /// WebGPU buffer.
    WebGpu = 15,
    /// Qualcomm Hexagon DSP.
    Hexagon = 16,
}

impl DeviceType {
    /// Inverse of `as i32`. Returns `None` for values not in the header.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Cpu,
            2 => Self::Cuda,
            3 => Self::CudaHost,
            4 => Self::OpenCl,
            7 => Self::Vulkan,
            8 => Self::Metal,
            9 => Self::Vpi,
            10 => Self::Rocm,
            11 => Self::RocmHost,
            12 => Self::ExtDev,
            13 => Self::CudaManaged,
            14 => Self::OneApi,
            15 => Self::WebGpu,
            16 => Self::Hexagon,
            _ => return None,
        })
    }

    /// True for memory directly addressable from the host.
    pub fn is_host_accessible(self) -> bool {
        matches!(
            self,
            Self::Cpu | Self::CudaHost | Self::RocmHost | Self::CudaManaged
        )
    }
}

/// Width of the engine's floating-point type on the accelerator side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// 32-bit floats.
    Single,
    /// 64-bit floats.
    #[default]
    Double,
}

impl FloatWidth {
    /// Width in bits.
    pub fn bits(self) -> u8 {
        match self {
            Self::Single => 32,
            Self::Double => 64,
        }
    }
}

/// Width of an engine integer typedef (tag or image integers).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 32-bit integers.
    #[default]
    I32,
    /// 64-bit integers.
    I64,
}

impl IntWidth {
    /// Width in bits.
    pub fn bits(self) -> u8 {
        match self {
            Self::I32 => 32,
            Self::I64 => 64,
        }
    }

    /// Parse a bit count. Only 32 and 64 are valid.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Self::I32),
            64 => Some(Self::I64),
            _ => None,
        }
    }
}

/// Build-time numeric layout of the engine.
///
/// The default is the common engine build: double-precision floats and
/// 32-bit tag and image integers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EngineLayout {
    /// Float type of accelerator-resident arrays. Host arrays are always double.
    pub float: FloatWidth,
    /// Width of the global particle ID type.
    pub tagint: IntWidth,
    /// Width of the packed image type.
    pub imageint: IntWidth,
}

impl EngineLayout {
    /// Layout of a build with 64-bit tags and images.
    pub fn bigbig() -> Self {
        Self {
            float: FloatWidth::Double,
            tagint: IntWidth::I64,
            imageint: IntWidth::I64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_codes_match_dlpack_header() {
        assert_eq!(DeviceType::Cpu as i32, 1);
        assert_eq!(DeviceType::Cuda as i32, 2);
        assert_eq!(DeviceType::Rocm as i32, 10);
        assert_eq!(DeviceType::OneApi as i32, 14);
        for code in 0..20 {
            if let Some(d) = DeviceType::from_code(code) {
                assert_eq!(d as i32, code);
            }
        }
        assert_eq!(DeviceType::from_code(5), None);
    }

    #[test]
    fn dtype_codes_match_dlpack_header() {
        assert_eq!(DataTypeCode::Int as u8, 0);
        assert_eq!(DataTypeCode::UInt as u8, 1);
        assert_eq!(DataTypeCode::Float as u8, 2);
        assert_eq!(DataTypeCode::Bool as u8, 6);
    }

    #[test]
    fn default_layout_is_double_with_small_ints() {
        let layout = EngineLayout::default();
        assert_eq!(layout.float.bits(), 64);
        assert_eq!(layout.tagint.bits(), 32);
        assert_eq!(layout.imageint.bits(), 32);
        assert_eq!(EngineLayout::bigbig().tagint, IntWidth::I64);
    }

    #[test]
    fn host_accessible_devices() {
        assert!(DeviceType::Cpu.is_host_accessible());
        assert!(DeviceType::CudaManaged.is_host_accessible());
        assert!(!DeviceType::Cuda.is_host_accessible());
    }
}
