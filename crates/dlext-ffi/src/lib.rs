//! C ABI for dlext.
//!
//! An engine describes itself with a [`DLExtEngine`](engine::DLExtEngine)
//! table of callbacks; views, samplers and pools are then addressed by
//! opaque `u64` handles. Every function returns a
//! [`DLExtStatus`](status::DLExtStatus) code and writes results through
//! out-pointers. This crate is one of two that may contain `unsafe` code
//! (along with `dlext-tensor`).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

/// Run an FFI body, turning a panic into `DLExtStatus::Panicked`.
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => $crate::status::DLExtStatus::Panicked as i32,
        }
    };
}

/// Lock a table mutex or return `DLExtStatus::InternalError` if poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::DLExtStatus::InternalError as i32,
        }
    };
}

pub mod engine;
mod handle;
pub mod image;
pub mod pool;
pub mod sampler;
pub mod status;
pub mod view;

#[cfg(test)]
mod testing;

pub use status::DLExtStatus;
