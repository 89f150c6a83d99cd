//! C-compatible status codes.
//!
//! [`DLExtStatus`] is a `repr(i32)` enum returned by every FFI function.
//! Conversions from the Rust error types (`ConfigError`, `PropertyError`)
//! are provided.

use dlext_core::PropertyError;
use dlext_view::ConfigError;

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DLExtStatus {
    /// Success.
    Ok = 0,
    /// Handle is invalid or was already destroyed.
    InvalidHandle = -1,
    /// An argument is null, out of range, or otherwise invalid.
    InvalidArgument = -2,
    /// Sampler configuration was rejected.
    ConfigError = -3,
    /// Device residency requested from an engine with no accelerator backend.
    DeviceUnavailable = -4,
    /// The engine cannot expose the requested property.
    PropertyUnavailable = -5,
    /// The consumer callback reported failure.
    CallbackFailed = -6,
    /// The descriptor is not owned by the given pool.
    NotFound = -7,
    /// Internal error (e.g. poisoned mutex after a prior panic).
    InternalError = -8,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&PropertyError> for DLExtStatus {
    fn from(_e: &PropertyError) -> Self {
        DLExtStatus::PropertyUnavailable
    }
}

impl From<&ConfigError> for DLExtStatus {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::DeviceUnavailable => DLExtStatus::DeviceUnavailable,
            ConfigError::Property(p) => DLExtStatus::from(p),
            ConfigError::IllegalArguments { .. }
            | ConfigError::NoProperties
            | ConfigError::MissingRequired { .. }
            | ConfigError::DuplicateProperty { .. } => DLExtStatus::ConfigError,
        }
    }
}
