//! The heap bridge behind every descriptor, its deleters, and [`wrap`].
//!
//! A descriptor holds only raw pointers to its shape and strides. The
//! bridge owns that storage together with the `DLManagedTensor` record
//! itself, and `manager_ctx` points back at the bridge. Releasing the
//! bridge releases everything this layer allocated; the data pointer is
//! engine memory and is never touched.

#![allow(unsafe_code)]

use std::ffi::c_void;
use std::ptr;

use smallvec::SmallVec;

use crate::ffi::{DLDataType, DLDevice, DLManagedTensor, DLManagedTensorDeleter, DLTensor};
use crate::managed::ManagedTensor;

/// Everything needed to describe one engine array.
///
/// `size` is the primary extent (one record per particle or per type).
/// `second_dim` is the per-record width; when it is 1 the descriptor is
/// one-dimensional.
#[derive(Clone, Copy, Debug)]
pub struct TensorSpec {
    /// First element of the array. Engine-owned.
    pub data: *mut c_void,
    /// Where `data` lives.
    pub device: DLDevice,
    /// Element type.
    pub dtype: DLDataType,
    /// Primary extent.
    pub size: i64,
    /// Secondary extent. Values below 2 produce a 1-D descriptor.
    pub second_dim: i64,
    /// Byte offset of the first element.
    pub byte_offset: u64,
}

impl TensorSpec {
    /// Shape implied by this spec: `[size]` or `[size, second_dim]`.
    pub fn shape(&self) -> SmallVec<[i64; 2]> {
        let mut shape = SmallVec::new();
        shape.push(self.size);
        if self.second_dim > 1 {
            shape.push(self.second_dim);
        }
        shape
    }

    /// Row-major strides in elements: `[1]` or `[second_dim, 1]`.
    pub fn strides(&self) -> SmallVec<[i64; 2]> {
        let mut strides = SmallVec::new();
        if self.second_dim > 1 {
            strides.push(self.second_dim);
            strides.push(1);
        } else {
            strides.push(1);
        }
        strides
    }
}

/// Backing storage for one descriptor.
pub(crate) struct DataBridge {
    shape: SmallVec<[i64; 2]>,
    strides: SmallVec<[i64; 2]>,
    tensor: DLManagedTensor,
}

impl DataBridge {
    /// Allocate a bridge for `spec` and wire the descriptor into it.
    ///
    /// The returned pointer owns the allocation. It must be released through
    /// [`free`](Self::free) exactly once, either directly or via
    /// [`delete_bridge`].
    pub(crate) fn allocate(spec: &TensorSpec, deleter: DLManagedTensorDeleter) -> *mut DataBridge {
        let raw = Box::into_raw(Box::new(DataBridge {
            shape: spec.shape(),
            strides: spec.strides(),
            tensor: DLManagedTensor::default(),
        }));

        // SAFETY: `raw` comes from `Box::into_raw` above and is not aliased.
        // The shape and stride buffers are inline in the boxed bridge, so the
        // pointers taken here stay valid until the box is freed.
        unsafe {
            let bridge = &mut *raw;
            bridge.tensor.dl_tensor = DLTensor {
                data: spec.data,
                device: spec.device,
                ndim: bridge.shape.len() as i32,
                dtype: spec.dtype,
                shape: bridge.shape.as_mut_ptr(),
                strides: bridge.strides.as_mut_ptr(),
                byte_offset: spec.byte_offset,
            };
            bridge.tensor.manager_ctx = raw.cast();
            bridge.tensor.deleter = Some(deleter);
        }
        raw
    }

    /// Pointer to the descriptor stored inside `bridge`.
    ///
    /// # Safety
    ///
    /// `bridge` must come from [`allocate`](Self::allocate) and not yet be freed.
    pub(crate) unsafe fn tensor_ptr(bridge: *mut DataBridge) -> *mut DLManagedTensor {
        // SAFETY: caller guarantees `bridge` is live.
        unsafe { ptr::addr_of_mut!((*bridge).tensor) }
    }

    /// Release a bridge and everything it owns.
    ///
    /// # Safety
    ///
    /// `bridge` must come from [`allocate`](Self::allocate) and must not be
    /// used afterwards.
    pub(crate) unsafe fn free(bridge: *mut DataBridge) {
        // SAFETY: caller guarantees `bridge` is a live `Box` allocation.
        drop(unsafe { Box::from_raw(bridge) });
    }
}

/// Deleter installed on every owning descriptor.
///
/// Frees the bridge referenced by `manager_ctx`. A null `tensor` or a null
/// `manager_ctx` is a no-op. Engine data is never freed.
///
/// # Safety
///
/// `tensor` must be null or a descriptor produced by [`wrap`] that has not
/// been released yet. Calling it twice on the same descriptor is undefined.
pub unsafe extern "C" fn delete_bridge(tensor: *mut DLManagedTensor) {
    if tensor.is_null() {
        return;
    }
    // SAFETY: non-null per the check above and live per the caller contract.
    let ctx = unsafe { (*tensor).manager_ctx };
    if ctx.is_null() {
        return;
    }
    log::trace!("releasing tensor bridge {ctx:p}");
    // SAFETY: `manager_ctx` of an owning descriptor is the `DataBridge`
    // allocation that contains `tensor`.
    unsafe { DataBridge::free(ctx.cast()) };
}

/// "Do not delete" deleter for pooled descriptors.
///
/// The consumer may call it as usual; the descriptor stays valid until its
/// pool invalidates it.
pub unsafe extern "C" fn noop_deleter(_tensor: *mut DLManagedTensor) {}

/// Build an owning descriptor over `spec.data`.
///
/// The descriptor aliases the engine array; nothing is copied. Dropping
/// the returned [`ManagedTensor`] releases the bridge, as does calling the
/// deleter after [`ManagedTensor::into_raw`].
pub fn wrap(spec: &TensorSpec) -> ManagedTensor {
    let bridge = DataBridge::allocate(spec, delete_bridge);
    // SAFETY: freshly allocated, owned by the descriptor from here on.
    unsafe { ManagedTensor::from_bridge(bridge) }
}
