//! View lifecycle and descriptor FFI.
//!
//! A view handle owns a `ForeignEngine` behind its own `Arc<Mutex<_>>`,
//! so the global `VIEWS` lock is held only for handle lookup and samplers
//! can share the engine.

use std::sync::{Arc, Mutex};

use dlext_core::{ExecutionSpace, Property};
use dlext_tensor::DLManagedTensor;
use dlext_view::SystemView;

use crate::engine::{DLExtEngine, ForeignEngine};
use crate::handle::{HandleKind, HandleTable};
use crate::status::DLExtStatus;

pub(crate) type EngineArc = Arc<Mutex<ForeignEngine>>;

static VIEWS: Mutex<HandleTable<EngineArc>> = Mutex::new(HandleTable::new(HandleKind::View));

/// Clone the engine Arc for a view handle, briefly locking the global table.
pub(crate) fn get_engine(handle: u64) -> Option<EngineArc> {
    VIEWS.lock().ok()?.get(handle).cloned()
}

/// Decode C property and space codes.
pub(crate) fn decode(property: i32, space: i32) -> Option<(Property, ExecutionSpace)> {
    Some((Property::from_code(property)?, ExecutionSpace::from_code(space)?))
}

/// Create a view over the engine described by `engine`.
///
/// The table is copied; `engine->user_data` must stay valid until the
/// view and every sampler created from it are destroyed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_create(engine: *const DLExtEngine, view_out: *mut u64) -> i32 {
    ffi_guard!({
        if engine.is_null() || view_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        // SAFETY: engine is non-null and valid per caller contract.
        let table = unsafe { &*engine };
        let Some(foreign) = ForeignEngine::from_table(table) else {
            return DLExtStatus::InvalidArgument as i32;
        };
        let Some(handle) = ffi_lock!(VIEWS).insert(Arc::new(Mutex::new(foreign))) else {
            return DLExtStatus::InternalError as i32;
        };
        // SAFETY: view_out is non-null and valid per caller contract.
        unsafe { *view_out = handle };
        DLExtStatus::Ok as i32
    })
}

/// Destroy a view. Samplers created from it keep their own engine reference.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_destroy(view: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(VIEWS).remove(view) {
            Some(_) => DLExtStatus::Ok as i32,
            None => DLExtStatus::InvalidHandle as i32,
        }
    })
}

/// Write the local particle count to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_local_particle_number(view: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut engine = ffi_lock!(engine);
        let n = SystemView::new(&mut *engine).local_particle_number();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = n as u64 };
        DLExtStatus::Ok as i32
    })
}

/// Write the global particle count to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_global_particle_number(view: u64, out: *mut u64) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut engine = ffi_lock!(engine);
        let n = SystemView::new(&mut *engine).global_particle_number();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = n };
        DLExtStatus::Ok as i32
    })
}

/// Write 1 to `out` if an accelerator is built in and engaged, else 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_has_accelerator_enabled(view: u64, out: *mut u8) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut engine = ffi_lock!(engine);
        let enabled = SystemView::new(&mut *engine).has_accelerator_enabled();
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = u8::from(enabled) };
        DLExtStatus::Ok as i32
    })
}

/// Make every exposable array current on `space` (after resolution).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_view_synchronize(view: u64, space: i32) -> i32 {
    ffi_guard!({
        let Some(space) = ExecutionSpace::from_code(space) else {
            return DLExtStatus::InvalidArgument as i32;
        };
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut engine = ffi_lock!(engine);
        SystemView::new(&mut *engine).synchronize(space);
        DLExtStatus::Ok as i32
    })
}

/// Wrap `property` on `space` into a new descriptor written to `tensor_out`.
///
/// The caller owns the descriptor and must call its `deleter` exactly once.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_wrap(
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
        let mut engine = ffi_lock!(engine);
        let tensor = match SystemView::new(&mut *engine).wrap(property, space) {
            Ok(t) => t,
            Err(e) => return DLExtStatus::from(&e) as i32,
        };
        // SAFETY: tensor_out is non-null and valid per caller contract.
        unsafe { *tensor_out = tensor.into_raw() };
        DLExtStatus::Ok as i32
    })
}

macro_rules! wrap_property {
    ($(#[$doc:meta])* $name:ident, $property:expr) => {
        $(#[$doc])*
        #[no_mangle]
        #[allow(unsafe_code)]
        pub extern "C" fn $name(view: u64, space: i32, tensor_out: *mut *mut DLManagedTensor) -> i32 {
            dlext_wrap(view, $property.code(), space, tensor_out)
        }
    };
}

wrap_property!(
    /// Positions, `[N, 3]` floats.
    dlext_positions, Property::Positions
);
wrap_property!(
    /// Velocities, `[N, 3]` floats.
    dlext_velocities, Property::Velocities
);
wrap_property!(
    /// Per-type masses, `[T + 1]` floats.
    dlext_masses, Property::Masses
);
wrap_property!(
    /// Forces, `[N, 3]` floats, writable.
    dlext_forces, Property::Forces
);
wrap_property!(
    /// Packed image counters, `[N]`.
    dlext_images, Property::Images
);
wrap_property!(
    /// Global particle IDs, `[N]`.
    dlext_tags, Property::Tags
);
wrap_property!(
    /// Global ID to local index table, int32.
    dlext_tags_map, Property::TagsMap
);
wrap_property!(
    /// Particle types, `[N]` int32.
    dlext_types, Property::Types
);

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::testing::mock_table;
    use dlext_core::DeviceType;
    use dlext_tensor::ManagedTensor;
    use dlext_test_utils::MockEngine;

    fn create(mock: &mut MockEngine) -> u64 {
        let table = mock_table(mock);
        let mut view = 0u64;
        assert_eq!(dlext_view_create(&table, &mut view), DLExtStatus::Ok as i32);
        view
    }

    #[test]
    fn create_rejects_null_arguments() {
        let mut mock = MockEngine::new(1, 1);
        let table = mock_table(&mut mock);
        let mut view = 0u64;
        assert_eq!(
            dlext_view_create(std::ptr::null(), &mut view),
            DLExtStatus::InvalidArgument as i32
        );
        assert_eq!(
            dlext_view_create(&table, std::ptr::null_mut()),
            DLExtStatus::InvalidArgument as i32
        );
    }

    #[test]
    fn counts_and_accelerator_flag() {
        let mut mock = MockEngine::new(5, 1).with_global(50);
        let view = create(&mut mock);
        let mut n = 0u64;
        assert_eq!(dlext_view_local_particle_number(view, &mut n), 0);
        assert_eq!(n, 5);
        assert_eq!(dlext_view_global_particle_number(view, &mut n), 0);
        assert_eq!(n, 50);
        let mut flag = 7u8;
        assert_eq!(dlext_view_has_accelerator_enabled(view, &mut flag), 0);
        assert_eq!(flag, 0);
        assert_eq!(dlext_view_destroy(view), 0);
    }

    #[test]
    fn destroyed_view_is_stale() {
        let mut mock = MockEngine::new(2, 1);
        let view = create(&mut mock);
        assert_eq!(dlext_view_destroy(view), DLExtStatus::Ok as i32);
        assert_eq!(dlext_view_destroy(view), DLExtStatus::InvalidHandle as i32);
        let mut n = 0u64;
        assert_eq!(
            dlext_view_local_particle_number(view, &mut n),
            DLExtStatus::InvalidHandle as i32
        );
    }

    #[test]
    fn wrap_hands_out_owned_descriptor() {
        let mut mock = MockEngine::new(4, 1);
        let view = create(&mut mock);
        let mut raw = std::ptr::null_mut();
        assert_eq!(dlext_positions(view, ExecutionSpace::Host.code(), &mut raw), 0);
        let tensor = unsafe { ManagedTensor::from_raw(raw) }.unwrap();
        assert_eq!(tensor.shape(), &[4, 3]);
        assert!(tensor.device().is_cpu());
        drop(tensor);
        dlext_view_destroy(view);
    }

    #[test]
    fn wrap_rejects_bad_codes() {
        let mut mock = MockEngine::new(4, 1);
        let view = create(&mut mock);
        let mut raw = std::ptr::null_mut();
        assert_eq!(dlext_wrap(view, 42, 0, &mut raw), DLExtStatus::InvalidArgument as i32);
        assert_eq!(dlext_wrap(view, 0, 9, &mut raw), DLExtStatus::InvalidArgument as i32);
        assert_eq!(
            dlext_wrap(view, 0, 0, std::ptr::null_mut()),
            DLExtStatus::InvalidArgument as i32
        );
        assert!(raw.is_null());
        dlext_view_destroy(view);
    }

    #[test]
    fn missing_precondition_maps_to_status() {
        let mut mock = MockEngine::new(4, 1).without_atom_map();
        let view = create(&mut mock);
        let mut raw = std::ptr::null_mut();
        assert_eq!(
            dlext_tags_map(view, 0, &mut raw),
            DLExtStatus::PropertyUnavailable as i32
        );
        dlext_view_destroy(view);
    }

    #[test]
    fn device_wrap_and_synchronize_reach_engine() {
        let mut mock = MockEngine::new(3, 1).with_accelerator(DeviceType::Cuda, true);
        let view = create(&mut mock);
        let mut raw = std::ptr::null_mut();
        assert_eq!(dlext_forces(view, ExecutionSpace::Device.code(), &mut raw), 0);
        let tensor = unsafe { ManagedTensor::from_raw(raw) }.unwrap();
        assert_eq!(tensor.device().kind(), Some(DeviceType::Cuda));
        drop(tensor);
        assert_eq!(dlext_view_synchronize(view, ExecutionSpace::Host.code()), 0);
        assert_eq!(dlext_view_synchronize(view, 5), DLExtStatus::InvalidArgument as i32);
        dlext_view_destroy(view);
        assert_eq!(mock.sync_log.len(), 2);
        assert_eq!(mock.modified_log.len(), 1);
    }

    #[test]
    fn every_property_export_wraps() {
        let mut mock = MockEngine::new(5, 2);
        let view = create(&mut mock);
        let exports: [(Property, extern "C" fn(u64, i32, *mut *mut DLManagedTensor) -> i32); 8] = [
            (Property::Positions, dlext_positions),
            (Property::Velocities, dlext_velocities),
            (Property::Masses, dlext_masses),
            (Property::Forces, dlext_forces),
            (Property::Images, dlext_images),
            (Property::Tags, dlext_tags),
            (Property::TagsMap, dlext_tags_map),
            (Property::Types, dlext_types),
        ];
        for (property, export) in exports {
            let mut raw = std::ptr::null_mut();
            assert_eq!(export(view, ExecutionSpace::Host.code(), &mut raw), 0, "{property}");
            let tensor = unsafe { ManagedTensor::from_raw(raw) }.unwrap();
            let mut generic = std::ptr::null_mut();
            assert_eq!(dlext_wrap(view, property.code(), 0, &mut generic), 0);
            let same = unsafe { ManagedTensor::from_raw(generic) }.unwrap();
            assert_eq!(tensor.shape(), same.shape(), "{property}");
            assert_eq!(tensor.data_ptr(), same.data_ptr(), "{property}");
        }
        dlext_view_destroy(view);
    }

    #[test]
    fn pool_and_sampler_handles_are_not_views() {
        let mut mock = MockEngine::new(2, 1);
        let view = create(&mut mock);
        let mut pool = 0;
        assert_eq!(crate::pool::dlext_pool_create(&mut pool), 0);
        let mut sampler = 0;
        assert_eq!(
            crate::sampler::dlext_sampler_create(view, std::ptr::null(), &mut sampler),
            0
        );

        let mut n = 0u64;
        for foreign in [pool, sampler] {
            assert_ne!(foreign, view);
            assert_eq!(
                dlext_view_local_particle_number(foreign, &mut n),
                DLExtStatus::InvalidHandle as i32
            );
            assert_eq!(dlext_view_destroy(foreign), DLExtStatus::InvalidHandle as i32);
        }
        let mut len = 0usize;
        assert_eq!(
            crate::pool::dlext_pool_len(view, &mut len),
            DLExtStatus::InvalidHandle as i32
        );
        assert_eq!(crate::pool::dlext_pool_destroy(view), DLExtStatus::InvalidHandle as i32);

        // Everything is still alive after the mismatched calls.
        assert_eq!(dlext_view_local_particle_number(view, &mut n), 0);
        assert_eq!(crate::sampler::dlext_sampler_destroy(sampler), 0);
        assert_eq!(crate::pool::dlext_pool_destroy(pool), 0);
        assert_eq!(dlext_view_destroy(view), 0);
    }

    #[test]
    fn poisoned_engine_reports_internal_error() {
        let mut mock = MockEngine::new(2, 1);
        let view = create(&mut mock);
        let engine = get_engine(view).unwrap();
        let poisoner = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = engine.lock().unwrap();
            panic!("poison the engine lock");
        }));
        assert!(poisoner.is_err());
        assert!(engine.is_poisoned());

        let mut raw = std::ptr::null_mut();
        assert_eq!(
            dlext_wrap(view, Property::Positions.code(), 0, &mut raw),
            DLExtStatus::InternalError as i32
        );
        assert!(raw.is_null());
        assert_eq!(dlext_view_synchronize(view, 0), DLExtStatus::InternalError as i32);
        assert_eq!(dlext_view_destroy(view), DLExtStatus::Ok as i32);
    }
}
