//! Test utilities and a mock engine for dlext development.
//!
//! [`MockEngine`] implements [`ParticleEngine`](dlext_core::ParticleEngine)
//! over plain vectors, optionally with a second "device" copy of every
//! array and Kokkos-style stale tracking, so residency and sync behaviour
//! can be tested without a real accelerator.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

mod buffers;
mod engine;

pub use buffers::{FloatBuf, IntBuf};
pub use engine::{MockEngine, SyncCall};
