//! Sampler lifecycle and per-step FFI.
//!
//! Each sampler sits behind its own `Arc<Mutex<_>>` and keeps a clone of
//! its view's engine Arc, so destroying the view does not invalidate it.
//! Lock order is sampler, then engine. The engine lock is dropped once the
//! step's descriptors are built, so the callback may call the view and pool
//! functions on the same engine. Re-entering the same sampler from its
//! callback deadlocks and is not supported.

use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use dlext_core::{AccessMode, ExecutionSpace, Property, TimeStep};
use dlext_tensor::DLManagedTensor;
use dlext_view::{Sampler, SamplerConfig};
use smallvec::SmallVec;

use crate::handle::{HandleKind, HandleTable};
use crate::status::DLExtStatus;
use crate::view::{get_engine, EngineArc};

/// Consumer callback.
///
/// Receives `count` descriptors and their property codes in callback
/// order, plus the step counter. The callback takes ownership of every
/// descriptor and must release each through its `deleter`. A nonzero
/// return is reported by `dlext_sampler_post_force` as
/// `DLExtStatus::CallbackFailed`.
pub type DLExtSamplerCallback = unsafe extern "C" fn(
    user_data: *mut c_void,
    tensors: *const *mut DLManagedTensor,
    properties: *const i32,
    count: usize,
    step: i64,
) -> i32;

/// Sampler configuration passed from C.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DLExtSamplerArgs {
    /// Requested execution space code.
    pub space: i32,
    /// Access mode code (read = 0, read-write = 1, overwrite = 2).
    pub mode: i32,
    /// Property codes; may be null when `n_properties` is 0.
    pub properties: *const i32,
    /// Number of entries in `properties`. 0 selects positions, velocities
    /// and forces.
    pub n_properties: usize,
}

struct FfiSampler {
    sampler: Sampler,
    engine: EngineArc,
}

// SAFETY: the only callbacks installed through this module are C function
// pointers plus user_data, which the FFI contract requires to be usable from
// whichever thread drives the sampler. Access is serialized by the Mutex.
#[allow(unsafe_code)]
unsafe impl Send for FfiSampler {}

type SamplerArc = Arc<Mutex<FfiSampler>>;

static SAMPLERS: Mutex<HandleTable<SamplerArc>> = Mutex::new(HandleTable::new(HandleKind::Sampler));

fn get_sampler(handle: u64) -> Option<SamplerArc> {
    SAMPLERS.lock().ok()?.get(handle).cloned()
}

#[allow(unsafe_code)]
fn config_from_args(args: *const DLExtSamplerArgs) -> Option<SamplerConfig> {
    if args.is_null() {
        return Some(SamplerConfig::default());
    }
    // SAFETY: args is non-null and valid per caller contract.
    let args = unsafe { &*args };
    let space = ExecutionSpace::from_code(args.space)?;
    let mode = AccessMode::from_code(args.mode)?;
    if args.n_properties == 0 {
        return Some(SamplerConfig {
            mode,
            ..SamplerConfig::on(space)
        });
    }
    if args.properties.is_null() {
        return None;
    }
    // SAFETY: properties points to n_properties codes per caller contract.
    let codes = unsafe { std::slice::from_raw_parts(args.properties, args.n_properties) };
    let properties = codes
        .iter()
        .map(|&code| Property::from_code(code))
        .collect::<Option<SmallVec<[Property; 8]>>>()?;
    Some(SamplerConfig {
        space,
        mode,
        properties,
    })
}

/// Create a sampler over `view`. `args` may be null for the default
/// host configuration (positions, velocities, forces).
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_sampler_create(
    view: u64,
    args: *const DLExtSamplerArgs,
    sampler_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if sampler_out.is_null() {
            return DLExtStatus::InvalidArgument as i32;
        }
        let Some(config) = config_from_args(args) else {
            return DLExtStatus::InvalidArgument as i32;
        };
        let Some(engine) = get_engine(view) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let sampler = {
            let guard = ffi_lock!(engine);
            match Sampler::new(&*guard, config) {
                Ok(s) => s,
                Err(e) => {
                    log::warn!("rejected sampler configuration: {e}");
                    return DLExtStatus::from(&e) as i32;
                }
            }
        };
        let entry = Arc::new(Mutex::new(FfiSampler { sampler, engine }));
        let Some(handle) = ffi_lock!(SAMPLERS).insert(entry) else {
            return DLExtStatus::InternalError as i32;
        };
        // SAFETY: sampler_out is non-null and valid per caller contract.
        unsafe { *sampler_out = handle };
        DLExtStatus::Ok as i32
    })
}

/// Install `callback`, or restore the no-op callback when it is null.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_sampler_set_callback(
    sampler: u64,
    callback: Option<DLExtSamplerCallback>,
    user_data: *mut c_void,
) -> i32 {
    ffi_guard!({
        let Some(entry) = get_sampler(sampler) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut entry = ffi_lock!(entry);
        match callback {
            None => entry.sampler.clear_callback(),
            Some(callback) => entry.sampler.set_callback(move |tensors, step: TimeStep| {
                let (properties, raws): (Vec<i32>, Vec<*mut DLManagedTensor>) = tensors
                    .into_iter()
                    .map(|(p, t)| (p.code(), t.into_raw()))
                    .unzip();
                // SAFETY: callback and user_data are valid per caller contract;
                // ownership of every descriptor moves to the callback.
                let rc = unsafe {
                    callback(user_data, raws.as_ptr(), properties.as_ptr(), raws.len(), step)
                };
                if rc == 0 {
                    Ok(())
                } else {
                    Err(format!("callback returned {rc} at step {step}").into())
                }
            }),
        }
        DLExtStatus::Ok as i32
    })
}

/// Run the sampler for `step`, as the engine's post-force hook would.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_sampler_post_force(sampler: u64, step: i64) -> i32 {
    ffi_guard!({
        let Some(entry) = get_sampler(sampler) else {
            return DLExtStatus::InvalidHandle as i32;
        };
        let mut entry = ffi_lock!(entry);
        let FfiSampler { sampler, engine } = &mut *entry;
        let tensors = {
            let mut engine = ffi_lock!(engine);
            sampler.prepare(&mut *engine)
        };
        match tensors.and_then(|tensors| sampler.deliver(tensors, step)) {
            Ok(()) => DLExtStatus::Ok as i32,
            Err(e) => {
                log::error!("sampler failed at step {step}: {e}");
                DLExtStatus::CallbackFailed as i32
            }
        }
    })
}

/// Destroy a sampler.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn dlext_sampler_destroy(sampler: u64) -> i32 {
    ffi_guard!({
        match ffi_lock!(SAMPLERS).remove(sampler) {
            Some(_) => DLExtStatus::Ok as i32,
            None => DLExtStatus::InvalidHandle as i32,
        }
    })
}
