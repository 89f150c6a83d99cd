//! Pooled descriptor FFI.
//!
//! Descriptors from `dlext_pool_wrap` carry a no-op deleter: the consumer
//! may call it freely and the descriptor stays usable until
//! `dlext_pool_invalidate` or `dlext_pool_evict_all` releases it.

use std::sync::Mutex;

use dlext_tensor::{DLManagedTensor, TensorKey, TensorPool};
use dlext_view::SystemView;

use crate::handle::{HandleKind, HandleTable};
use crate::status::DLExtStatus;
use crate::view::{decode, get_engine};

struct FfiPool(TensorPool);

// SAFETY: a pool owns heap bridges that only point at engine memory; it is
// never shared, and every access goes through the POOLS mutex.
#[allow(unsafe_code)]
unsafe impl Send for FfiPool {}

static POOLS: Mutex<HandleTable<FfiPool>> = Mutex::new(HandleTable::new(HandleKind::Pool));

/// Create an empty pool.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_create(pool_out: *mut u64) -> i32 {
    ffi_guard!({
        if pool_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(handle) = ffi_lock!(POOLS).insert(FfiPool(TensorPool::new())) else {
            return DLExtStatus::InternalError as i32;
        };
        // SAFETY: pool_out is non-null and valid per caller contract.
        unsafe { *pool_out = handle };
        DLExtStatus::Ok as i32
    })
}

/// Destroy a pool, releasing every descriptor it still owns.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_destroy(pool: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(POOLS).remove(pool) {
            Some(_) => DLExtStatus::Ok as i32,
            None => DLExtStatus::InvalidHandle as i32,
        }
    })
}

/// Wrap `property` from `view` into a descriptor owned by `pool`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_wrap(
    pool: u64,
    view: u64,
    property: i32,
    space: i32,
    tensor_out: *mut *mut DLManagedTensor,
) -> i32 {
    ffi_guard!({
        if tensor_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some((property, space)) = decode(property, space) else {
            return DLExtStatus::InvalidArgument as i32;
        };
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut pools = ffi_lock!(POOLS);
        let Some(FfiPool(pool)) = pools.get_mut(pool) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut engine = ffi_lock!(engine);
        let key = match SystemView::new(&mut *engine).wrap_pooled(pool, property, space) {
            Ok(key) => key,
            Err(e) => return DLExtStatus::from(&e) as i32,
        };
        let Some(raw) = pool.raw(key) else {
            return DLExtStatus::InternalError as i32;
        };
        // SAFETY: tensor_out is non-null and valid per caller contract.
        unsafe { *tensor_out = raw };
        DLExtStatus::Ok as i32
    })
}

/// Release one pooled descriptor.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_invalidate(pool: u64, tensor: *const DLManagedTensor) -> i32 {
    ffi_guard!({
        if tensor.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let mut pools = ffi_lock!(POOLS);
        let Some(FfiPool(pool)) = pools.get_mut(pool) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        if pool.invalidate(TensorKey::of(tensor)) {
            DLExtStatus::Ok as i32
        } else {
            DLExtStatus::NotFound as i32
        }
    })
}

/// Release every pooled descriptor; writes the count to `evicted_out` if
/// it is non-null.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_evict_all(pool: u64, evicted_out: *mut usize) -> i32 {
    ffi_guard!({
        let mut pools = ffi_lock!(POOLS);
        let Some(FfiPool(pool)) = pools.get_mut(pool) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let evicted = pool.evict_all();
        if !evicted_out.is_null() {
            // SAFETY: evicted_out is non-null and valid per caller contract.
            unsafe { *evicted_out = evicted };
        }
        DLExtStatus::Ok as i32
    })
}

/// Write the number of live pooled descriptors to `len_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_pool_len(pool: u64, len_out: *mut usize) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let pools = ffi_lock!(POOLS);
        let Some(FfiPool(pool)) = pools.get(pool) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        // SAFETY: len_out is non-null and valid per caller contract.
        unsafe { *len_out = pool.len() };
        DLExtStatus::Ok as i32
    })
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::testing::mock_table;
    use crate::view::{dlext_view_create, dlext_view_destroy};
    use dlext_core::{ExecutionSpace, Property};
    use dlext_test_utils::MockEngine;

    fn setup(mock: &mut MockEngine) -> (u64, u64) {
        let table = mock_table(mock);
        let (mut view, mut pool) = (0, 0);
        assert_eq!(dlext_view_create(&table, &mut view), 0);
        assert_eq!(dlext_pool_create(&mut pool), 0);
        (view, pool)
    }

    fn len(pool: u64) -> usize {
        let mut n = usize::MAX;
        assert_eq!(dlext_pool_len(pool, &mut n), 0);
        n
    }

    #[test]
    fn pooled_tensor_survives_its_deleter() {
        let mut mock = MockEngine::new(4, 1);
        let (view, pool) = setup(&mut mock);
        let mut raw = std::ptr::null_mut();
        let host = ExecutionSpace::Host.code();
        assert_eq!(
            dlext_pool_wrap(pool, view, Property::Velocities.code(), host, &mut raw),
            0
        );
        unsafe {
            let deleter = (*raw).deleter.unwrap();
            deleter(raw);
            assert_eq!((*raw).dl_tensor.ndim, 2);
            assert_eq!(*(*raw).dl_tensor.shape, 4);
        }
        assert_eq!(len(pool), 1);
        assert_eq!(dlext_pool_invalidate(pool, raw), 0);
        assert_eq!(dlext_pool_invalidate(pool, raw), DLExtStatus::NotFound as i32);
        assert_eq!(len(pool), 0);
        dlext_pool_destroy(pool);
        dlext_view_destroy(view);
    }

    #[test]
    fn evict_all_reports_count() {
        let mut mock = MockEngine::new(2, 1);
        let (view, pool) = setup(&mut mock);
        let mut raw = std::ptr::null_mut();
        for property in [Property::Positions, Property::Forces, Property::Types] {
            assert_eq!(dlext_pool_wrap(pool, view, property.code(), 0, &mut raw), 0);
        }
        let mut evicted = 0;
        assert_eq!(dlext_pool_evict_all(pool, &mut evicted), 0);
        assert_eq!(evicted, 3);
        assert_eq!(len(pool), 0);
        assert_eq!(dlext_pool_evict_all(pool, std::ptr::null_mut()), 0);
        dlext_pool_destroy(pool);
        dlext_view_destroy(view);
    }

    #[test]
    fn stale_pool_handle_rejected() {
        let mut n = 0;
        let mut pool = 0;
        assert_eq!(dlext_pool_create(&mut pool), 0);
        assert_eq!(dlext_pool_destroy(pool), 0);
        assert_eq!(dlext_pool_len(pool, &mut n), DLExtStatus::InvalidHandle as i32);
        assert_eq!(dlext_pool_destroy(pool), DLExtStatus::InvalidHandle as i32);
    }

    #[test]
    fn wrap_errors_leave_pool_empty() {
        let mut mock = MockEngine::new(2, 1).without_tags();
        let (view, pool) = setup(&mut mock);
        let mut raw = std::ptr::null_mut();
        assert_eq!(
            dlext_pool_wrap(pool, view, Property::Tags.code(), 0, &mut raw),
            DLExtStatus::PropertyUnavailable as i32
        );
        assert_eq!(
            dlext_pool_wrap(pool + 1, view, 0, 0, &mut raw),
            DLExtStatus::InvalidHandle as i32
        );
        assert_eq!(len(pool), 0);
        dlext_pool_destroy(pool);
        dlext_view_destroy(view);
    }
}
