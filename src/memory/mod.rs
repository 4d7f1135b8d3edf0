//! Memory spaces, tagged buffers and allocation managers.

pub mod buffer;
pub mod manager;
pub mod simulated;
pub mod space;

pub use buffer::{AllocatorId, Buffer};
pub use manager::{AllocationManager, HostAllocationManager};
pub use simulated::{AllocationStats, SimulatedDeviceManager};
pub use space::{MemorySpace, Provenance};
