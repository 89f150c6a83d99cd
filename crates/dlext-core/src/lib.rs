//! Core types and traits for dlext.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the rest of the workspace: particle properties,
//! execution spaces, DLPack type codes, sync masks, the engine boundary
//! trait, and the setup-time error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod dtype;
pub mod engine;
pub mod error;
pub mod image;
pub mod mask;
pub mod property;
pub mod space;

pub use dtype::{DataTypeCode, DeviceType, EngineLayout, FloatWidth, IntWidth};
pub use engine::{Accelerator, ParticleEngine, TimeStep};
pub use error::PropertyError;
pub use image::ImageFlags;
pub use mask::{DataMask, FixMask};
pub use property::Property;
pub use space::{AccessMode, ExecutionSpace};
