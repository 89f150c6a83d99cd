//! Consumer-side pool of descriptors whose release is deferred.
//!
//! Pooled descriptors carry [`noop_deleter`], so a consumer calling the
//! deleter does not free anything. The pool owns the bridges and frees them
//! on [`invalidate`](TensorPool::invalidate), [`evict_all`](TensorPool::evict_all)
//! or drop. The pool is an ordinary value owned by whoever tracks the
//! descriptors; there is no global instance.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use indexmap::IndexMap;

use crate::bridge::{noop_deleter, DataBridge, TensorSpec};
use crate::ffi::DLManagedTensor;
use crate::managed::TensorRef;

/// Identity of a descriptor: the address of its `DLManagedTensor`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorKey(usize);

impl TensorKey {
    /// Key of the descriptor at `tensor`.
    pub fn of(tensor: *const DLManagedTensor) -> Self {
        Self(tensor as usize)
    }
}

/// A bridge owned by the pool. Frees itself on drop.
struct PooledBridge(NonNull<DataBridge>);

impl PooledBridge {
    fn tensor_ptr(&self) -> *mut DLManagedTensor {
        // SAFETY: the pool keeps the bridge alive while this value exists.
        unsafe { DataBridge::tensor_ptr(self.0.as_ptr()) }
    }
}

impl Drop for PooledBridge {
    fn drop(&mut self) {
        // SAFETY: sole owner; allocated by `DataBridge::allocate`.
        unsafe { DataBridge::free(self.0.as_ptr()) };
    }
}

/// Registry of pooled descriptors keyed by identity.
#[derive(Default)]
pub struct TensorPool {
    entries: IndexMap<TensorKey, PooledBridge>,
}

impl TensorPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pooled descriptor over `spec.data` and return its key.
    ///
    /// The descriptor's deleter is [`noop_deleter`]; it stays valid until
    /// this pool invalidates it.
    pub fn wrap_pooled(&mut self, spec: &TensorSpec) -> TensorKey {
        let raw = DataBridge::allocate(spec, noop_deleter);
        // SAFETY: `allocate` never returns null.
        let bridge = PooledBridge(unsafe { NonNull::new_unchecked(raw) });
        let key = TensorKey::of(bridge.tensor_ptr());
        self.entries.insert(key, bridge);
        key
    }

    /// Raw descriptor for `key`, for handing to a foreign consumer.
    pub fn raw(&self, key: TensorKey) -> Option<*mut DLManagedTensor> {
        self.entries.get(&key).map(PooledBridge::tensor_ptr)
    }

    /// Metadata view of a pooled descriptor.
    pub fn get(&self, key: TensorKey) -> Option<TensorRef<'_>> {
        self.entries.get(&key).map(|b| {
            // SAFETY: the bridge is alive for the borrow of `self` and its
            // shape and strides are owned by it.
            unsafe { TensorRef::new(&*b.tensor_ptr()) }
        })
    }

    /// Whether `key` is still pooled.
    pub fn contains(&self, key: TensorKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Free one pooled descriptor. Returns `false` if it was not pooled,
    /// so invalidating twice is harmless.
    pub fn invalidate(&mut self, key: TensorKey) -> bool {
        self.entries.shift_remove(&key).is_some()
    }

    /// Free every pooled descriptor. Returns how many were freed.
    pub fn evict_all(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        if n > 0 {
            log::debug!("evicted {n} pooled tensors");
        }
        n
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = TensorKey> + '_ {
        self.entries.keys().copied()
    }

    /// Number of pooled descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
