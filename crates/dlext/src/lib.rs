//! dlext: zero-copy DLPack views of molecular-dynamics particle arrays.
//!
//! This is the facade crate that re-exports the public API of the dlext
//! sub-crates. The C ABI lives separately in `dlext-ffi`.
//!
//! # Quick start
//!
//! ```rust
//! use dlext::prelude::*;
//! use dlext_test_utils::MockEngine;
//!
//! let mut engine = MockEngine::new(100, 2);
//! let mut sampler = Sampler::new(&engine, SamplerConfig::default()).unwrap();
//! sampler.set_callback(|tensors, step| {
//!     let x = tensors.get(Property::Positions).ok_or("positions missing")?;
//!     assert_eq!(x.shape(), &[100, 3]);
//!     assert_eq!(step, 1);
//!     Ok(())
//! });
//! let step = engine.advance();
//! sampler.post_force(&mut engine, step).unwrap();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `dlext-core` | Properties, spaces, masks, the engine trait |
//! | [`tensor`] | `dlext-tensor` | DLPack ABI structs, descriptor bridge, pool |
//! | [`view`] | `dlext-view` | Registry, residency resolver, sampler, config |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core vocabulary and the engine boundary (`dlext-core`).
pub use dlext_core as types;

/// DLPack structs and descriptor ownership (`dlext-tensor`).
///
/// [`tensor::wrap`] builds an owned [`tensor::ManagedTensor`];
/// [`tensor::TensorPool`] holds descriptors whose deleter is a no-op.
pub use dlext_tensor as tensor;

/// Engine-facing views and the per-step sampler (`dlext-view`).
pub use dlext_view as view;

/// Common imports for typical dlext usage.
pub mod prelude {
    pub use dlext_core::{
        AccessMode, DataMask, DeviceType, EngineLayout, ExecutionSpace, ParticleEngine, Property,
        PropertyError, TimeStep,
    };

    pub use dlext_tensor::{DLDataType, DLDevice, DLManagedTensor, ManagedTensor, TensorPool};

    pub use dlext_view::{
        CallbackError, ConfigError, FixArgs, PostForceHook, PropertyRegistry, Sampler,
        SamplerConfig, StepTensors, SystemView,
    };
}
