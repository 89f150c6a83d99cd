//! Engine-facing half of dlext.
//!
//! A [`SystemView`] borrows a [`ParticleEngine`](dlext_core::ParticleEngine)
//! and turns registry rows into DLPack descriptors on the right residency.
//! A [`Sampler`] runs that once per step after force evaluation and hands
//! the descriptors to a consumer callback.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod registry;
pub mod sampler;
pub mod view;

pub use config::{ConfigError, FixArgs, SamplerConfig};
pub use registry::{standard_registry, PropertyRegistry, PropertySpec};
pub use sampler::{
    CallbackError, DLExtCallback, PostForceHook, Sampler, SamplerState, StepTensors,
};
pub use view::{SystemView, DEFAULT_DEVICE_ID};
