//! DLPack tensor descriptors over engine-owned memory.
//!
//! A descriptor aliases an engine array without copying it. Its shape and
//! stride buffers live in a heap [`bridge`] whose lifetime is tied to the
//! descriptor's deleter, so a consumer can release the descriptor on its
//! own schedule while the engine keeps owning the data.
//!
//! This crate is one of two that may contain `unsafe` code (along with
//! `dlext-ffi`). Unsafe blocks are confined to [`bridge`], [`managed`] and
//! [`pool`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bridge;
pub mod ffi;
pub mod managed;
pub mod pool;

pub use bridge::{delete_bridge, noop_deleter, wrap, TensorSpec};
pub use ffi::{DLDataType, DLDevice, DLManagedTensor, DLManagedTensorDeleter, DLTensor};
pub use managed::{ManagedTensor, TensorRef};
pub use pool::{TensorKey, TensorPool};
