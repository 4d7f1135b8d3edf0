#![cfg_attr(docsrs, feature(doc_cfg))]
//! # field-mirror
//!
//! field-mirror provides typed, strided, location-aware access to numeric
//! array fields stored in a hierarchical node store, and keeps lazily
//! created mirrors of those arrays in host and device memory.
//!
//! ## Features
//! - [`StridedView`](data::StridedView): a copyable, non-owning
//!   `values[offset + stride * i]` view that can be captured by parallel
//!   kernels
//! - [`ArrayInterface`](data::ArrayInterface): validates a field's element
//!   type once, resolves components by index or name, and hands out
//!   pointers or views in the requested [`MemorySpace`](memory::MemorySpace)
//! - Mirror caching: a buffer is allocated and copied at most once per
//!   (leaf, space) pair for the lifetime of the owning node
//! - Pluggable [`AllocationManager`](memory::AllocationManager) backends,
//!   passed explicitly; a host-only manager and a provenance-tracking
//!   simulated accelerator ship with the crate
//!
//! ## Usage
//! ```rust
//! # fn try_main() -> Result<(), field_mirror::mirror_error::MirrorError> {
//! use std::sync::Arc;
//! use field_mirror::prelude::*;
//!
//! let mut field = Node::new();
//! field.fetch_or_create("values/x").set_slice(&[1.0f64, 2.0, 3.0, 4.0]);
//! field.fetch_or_create("values/y").set_slice(&[5.0f64, 6.0, 7.0, 8.0]);
//!
//! let manager = Arc::new(SimulatedDeviceManager::new());
//! let arr = ArrayInterface::<f64>::new(&field, manager.clone())?;
//! assert_eq!(arr.components(), 2);
//! assert_eq!(arr.value_named("y", 2)?, 7.0);
//!
//! let x = arr.accessor(MemorySpace::Device, "x")?;
//! assert_eq!(x.len(), 4);
//! assert_eq!(manager.stats().device_allocations, 1);
//! # Ok(())
//! # }
//! # try_main().unwrap();
//! ```
//!
//! ## Concurrency
//! Mirror population is a host-side step that should finish before parallel
//! consumers start. The per-node cache serialises first-time requests, so
//! concurrent callers still allocate once per (leaf, space). Views are
//! read-only and `Send + Sync`.
//!
//! ## Logging
//! Mirror decisions (zero-copy, cache hit, cache miss, missing accelerator)
//! are reported through the `log` facade at `debug` level.

pub mod data;
pub mod debug_invariants;
pub mod memory;
pub mod mirror_error;
pub mod store;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::data::array_interface::ArrayInterface;
    pub use crate::data::dtype::DataType;
    pub use crate::data::scalar::{Scalar, ScalarType};
    pub use crate::data::strided::StridedView;
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::memory::buffer::{AllocatorId, Buffer};
    pub use crate::memory::manager::{AllocationManager, HostAllocationManager};
    pub use crate::memory::simulated::{AllocationStats, SimulatedDeviceManager};
    pub use crate::memory::space::{MemorySpace, Provenance};
    pub use crate::mirror_error::MirrorError;
    pub use crate::store::{MirrorCache, MirrorKey, Node, Schema};
}
