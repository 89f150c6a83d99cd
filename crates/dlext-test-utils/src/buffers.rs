//! Width-polymorphic storage for engine arrays.

use std::ffi::c_void;

use dlext_core::{FloatWidth, IntWidth};

/// Float array stored at the engine's build precision.
#[derive(Clone, Debug, PartialEq)]
pub enum FloatBuf {
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl FloatBuf {
    pub fn from_f64(width: FloatWidth, values: &[f64]) -> Self {
        match width {
            FloatWidth::Single => Self::F32(values.iter().map(|&v| v as f32).collect()),
            FloatWidth::Double => Self::F64(values.to_vec()),
        }
    }

    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::F32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::F64(v) => v.clone(),
        }
    }

    pub fn assign(&mut self, values: &[f64]) {
        match self {
            Self::F32(v) => {
                for (dst, &src) in v.iter_mut().zip(values) {
                    *dst = src as f32;
                }
            }
            Self::F64(v) => v.copy_from_slice(values),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            Self::F32(v) => v.as_mut_ptr().cast(),
            Self::F64(v) => v.as_mut_ptr().cast(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Integer array stored at the width of an engine integer typedef.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntBuf {
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl IntBuf {
    pub fn from_i64(width: IntWidth, values: &[i64]) -> Self {
        match width {
            IntWidth::I32 => Self::I32(values.iter().map(|&v| v as i32).collect()),
            IntWidth::I64 => Self::I64(values.to_vec()),
        }
    }

    pub fn to_i64(&self) -> Vec<i64> {
        match self {
            Self::I32(v) => v.iter().map(|&x| i64::from(x)).collect(),
            Self::I64(v) => v.clone(),
        }
    }

    pub fn assign(&mut self, values: &[i64]) {
        match self {
            Self::I32(v) => {
                for (dst, &src) in v.iter_mut().zip(values) {
                    *dst = src as i32;
                }
            }
            Self::I64(v) => v.copy_from_slice(values),
        }
    }

    pub fn as_mut_ptr(&mut self) -> *mut c_void {
        match self {
            Self::I32(v) => v.as_mut_ptr().cast(),
            Self::I64(v) => v.as_mut_ptr().cast(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::I32(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_buf_round_trips_through_f64() {
        let values = [1.5, -2.25, 3.0];
        let single = FloatBuf::from_f64(FloatWidth::Single, &values);
        assert!(matches!(single, FloatBuf::F32(_)));
        assert_eq!(single.to_f64(), values);
        let double = FloatBuf::from_f64(FloatWidth::Double, &values);
        assert_eq!(double.to_f64(), values);
    }

    #[test]
    fn int_buf_assign_keeps_width() {
        let mut buf = IntBuf::from_i64(IntWidth::I32, &[0, 0]);
        buf.assign(&[5, -7]);
        assert_eq!(buf, IntBuf::I32(vec![5, -7]));
        assert_eq!(buf.len(), 2);
    }
}
