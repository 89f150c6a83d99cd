//! [`ManagedTensor`]: Rust-side owner of one DLPack descriptor.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::fmt;
use std::ptr::NonNull;

use crate::bridge::DataBridge;
use crate::ffi::{DLDataType, DLDevice, DLManagedTensor, DLTensor};

/// Borrowed, read-only view of a descriptor's metadata.
#[derive(Clone, Copy)]
pub struct TensorRef<'a> {
    tensor: &'a DLTensor,
}

impl<'a> TensorRef<'a> {
    /// View a descriptor.
    ///
    /// # Safety
    ///
    /// `shape` and `strides` (when non-null) must point to `ndim` valid
    /// elements for as long as `'a`.
    pub unsafe fn new(tensor: &'a DLManagedTensor) -> Self {
        Self {
            tensor: &tensor.dl_tensor,
        }
    }

    /// Data pointer. Engine memory; may be a device pointer.
    pub fn data_ptr(&self) -> *mut c_void {
        self.tensor.data
    }

    /// Device the data lives on.
    pub fn device(&self) -> DLDevice {
        self.tensor.device
    }

    /// Element type.
    pub fn dtype(&self) -> DLDataType {
        self.tensor.dtype
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.tensor.ndim.max(0) as usize
    }

    /// Extents in elements.
    pub fn shape(&self) -> &'a [i64] {
        // SAFETY: construction contract of `TensorRef`.
        unsafe { slice_or_empty(self.tensor.shape, self.ndim()) }
    }

    /// Strides in elements. Empty when the producer left them null.
    pub fn strides(&self) -> &'a [i64] {
        // SAFETY: construction contract of `TensorRef`.
        unsafe { slice_or_empty(self.tensor.strides, self.ndim()) }
    }

    /// Byte offset of the first element.
    pub fn byte_offset(&self) -> u64 {
        self.tensor.byte_offset
    }

    /// Total number of elements.
    pub fn numel(&self) -> i64 {
        self.shape().iter().product()
    }
}

impl fmt::Debug for TensorRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorRef")
            .field("data", &self.data_ptr())
            .field("device", &self.device())
            .field("dtype", &self.dtype())
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("byte_offset", &self.byte_offset())
            .finish()
    }
}

unsafe fn slice_or_empty<'a>(ptr: *const i64, len: usize) -> &'a [i64] {
    if ptr.is_null() || len == 0 {
        &[]
    } else {
        // SAFETY: caller guarantees `ptr` covers `len` elements.
        unsafe { std::slice::from_raw_parts(ptr, len) }
    }
}

/// Owner of one descriptor.
///
/// Dropping a `ManagedTensor` calls the descriptor's deleter exactly once.
/// [`into_raw`](Self::into_raw) hands that duty to a foreign consumer
/// instead. Holds raw pointers, so it is neither `Send` nor `Sync`.
pub struct ManagedTensor {
    ptr: NonNull<DLManagedTensor>,
}

impl ManagedTensor {
    /// Adopt a bridge produced by [`DataBridge::allocate`].
    ///
    /// # Safety
    ///
    /// `bridge` must be live and not owned by anything else.
    pub(crate) unsafe fn from_bridge(bridge: *mut DataBridge) -> Self {
        // SAFETY: caller guarantees `bridge` is live, so the address of its
        // descriptor field is non-null.
        let ptr = unsafe { NonNull::new_unchecked(DataBridge::tensor_ptr(bridge)) };
        Self { ptr }
    }

    /// Adopt a descriptor released earlier with [`into_raw`](Self::into_raw)
    /// or received from another producer. Returns `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live descriptor whose deleter has not run, and the
    /// caller must give up the right to call that deleter.
    pub unsafe fn from_raw(ptr: *mut DLManagedTensor) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Release ownership to a foreign consumer, who must call the deleter.
    pub fn into_raw(self) -> *mut DLManagedTensor {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }

    /// Raw descriptor pointer. Ownership is kept.
    pub fn as_ptr(&self) -> *const DLManagedTensor {
        self.ptr.as_ptr()
    }

    /// Borrowed metadata view.
    pub fn view(&self) -> TensorRef<'_> {
        // SAFETY: a live `ManagedTensor` always wraps a well-formed descriptor.
        unsafe { TensorRef::new(self.ptr.as_ref()) }
    }

    /// Data pointer. Engine memory; may be a device pointer.
    pub fn data_ptr(&self) -> *mut c_void {
        self.view().data_ptr()
    }

    /// Device the data lives on.
    pub fn device(&self) -> DLDevice {
        self.view().device()
    }

    /// Element type.
    pub fn dtype(&self) -> DLDataType {
        self.view().dtype()
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.view().ndim()
    }

    /// Extents in elements.
    pub fn shape(&self) -> &[i64] {
        self.view().shape()
    }

    /// Strides in elements.
    pub fn strides(&self) -> &[i64] {
        self.view().strides()
    }

    /// Byte offset of the first element.
    pub fn byte_offset(&self) -> u64 {
        self.view().byte_offset()
    }
}

impl Drop for ManagedTensor {
    fn drop(&mut self) {
        // SAFETY: we own the descriptor and its deleter has not run.
        unsafe {
            if let Some(deleter) = self.ptr.as_ref().deleter {
                deleter(self.ptr.as_ptr());
            }
        }
    }
}

impl fmt::Debug for ManagedTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ManagedTensor").field(&self.view()).finish()
    }
}
