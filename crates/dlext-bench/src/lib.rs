//! Benchmark fixtures for dlext.
//!
//! - [`reference_engine`]: 10K particles, host only
//! - [`accelerated_engine`]: same size with an engaged device mirror

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use dlext_core::{DeviceType, EngineLayout, FloatWidth};
use dlext_test_utils::MockEngine;

/// Particle count used by the reference fixtures.
pub const REFERENCE_PARTICLES: usize = 10_000;

/// Host-only engine with seeded positions.
pub fn reference_engine(seed: u64) -> MockEngine {
    MockEngine::new(REFERENCE_PARTICLES, 4).with_seed(seed)
}

/// Single-precision engine with an engaged accelerator.
pub fn accelerated_engine(seed: u64) -> MockEngine {
    MockEngine::new(REFERENCE_PARTICLES, 4)
        .with_layout(EngineLayout {
            float: FloatWidth::Single,
            ..EngineLayout::default()
        })
        .with_seed(seed)
        .with_accelerator(DeviceType::Cuda, true)
}
