//! C-ABI trampolines over a `MockEngine` for in-crate tests.

#![allow(unsafe_code)]

use std::ffi::c_void;

use dlext_core::{DataMask, ExecutionSpace, ParticleEngine, Property};
use dlext_test_utils::MockEngine;

use crate::engine::DLExtEngine;

unsafe fn mock<'a>(user_data: *mut c_void) -> &'a mut MockEngine {
    unsafe { &mut *user_data.cast::<MockEngine>() }
}

unsafe extern "C" fn local(user_data: *mut c_void) -> u64 {
    unsafe { mock(user_data).local_particle_number() as u64 }
}

unsafe extern "C" fn global(user_data: *mut c_void) -> u64 {
    unsafe { mock(user_data).global_particle_number() }
}

unsafe extern "C" fn ntypes(user_data: *mut c_void) -> u64 {
    unsafe { mock(user_data).ntypes() as u64 }
}

unsafe extern "C" fn map_size(user_data: *mut c_void) -> u64 {
    unsafe { mock(user_data).map_size() as u64 }
}

unsafe extern "C" fn array_ptr(user_data: *mut c_void, property: i32, space: i32) -> *mut c_void {
    let (Some(property), Some(space)) = (Property::from_code(property), ExecutionSpace::from_code(space))
    else {
        return std::ptr::null_mut();
    };
    unsafe { mock(user_data).array_ptr(property, space) }
}

unsafe extern "C" fn sync(user_data: *mut c_void, space: i32, mask: u32) {
    if let Some(space) = ExecutionSpace::from_code(space) {
        unsafe { mock(user_data).sync(space, DataMask::from_bits(mask)) }
    }
}

unsafe extern "C" fn modified(user_data: *mut c_void, space: i32, mask: u32) {
    if let Some(space) = ExecutionSpace::from_code(space) {
        unsafe { mock(user_data).modified(space, DataMask::from_bits(mask)) }
    }
}

unsafe extern "C" fn step(user_data: *mut c_void) -> i64 {
    unsafe { mock(user_data).current_step() }
}

/// Callback table pointing at `engine`, which must outlive every use.
pub(crate) fn mock_table(engine: &mut MockEngine) -> DLExtEngine {
    let layout = engine.layout();
    let accelerator = engine.accelerator();
    DLExtEngine {
        user_data: (engine as *mut MockEngine).cast(),
        local_particle_number: Some(local),
        global_particle_number: Some(global),
        ntypes: Some(ntypes),
        map_size: Some(map_size),
        array_ptr: Some(array_ptr),
        sync: Some(sync),
        modified: Some(modified),
        current_step: Some(step),
        has_tags: u8::from(engine.has_tags()),
        has_atom_map: u8::from(engine.has_atom_map()),
        float_bits: u32::from(layout.float.bits()),
        tagint_bits: u32::from(layout.tagint.bits()),
        imageint_bits: u32::from(layout.imageint.bits()),
        accelerator_device_type: accelerator.map_or(0, |a| a.device_type as i32),
        accelerator_active: u8::from(accelerator.is_some_and(|a| a.active)),
    }
}
