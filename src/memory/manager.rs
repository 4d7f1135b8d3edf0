//! Allocation manager: allocator identities, buffer allocation, pointer
//! provenance, and cross-space copies.
//!
//! The manager is passed explicitly (as `Arc<dyn AllocationManager>`) to
//! every [`ArrayInterface`](crate::data::array_interface::ArrayInterface);
//! there is no process-wide allocator registry.

use core::fmt::Debug;

use crate::memory::buffer::{AllocatorId, Buffer};
use crate::memory::space::{MemorySpace, Provenance};
use crate::mirror_error::MirrorError;

/// Hands out memory-space-tagged buffers and classifies pointers.
///
/// The byte-moving methods have host-addressable defaults; a backend whose
/// device memory is not host-addressable must override all three.
pub trait AllocationManager: Debug + Send + Sync {
    /// Allocator identity used for buffers in `space`.
    fn allocator_id(&self, space: MemorySpace) -> AllocatorId;

    /// Whether accelerator memory can be allocated at all.
    fn device_available(&self) -> bool;

    /// Allocate `bytes` zeroed bytes from `allocator`.
    fn allocate(&self, allocator: AllocatorId, bytes: usize) -> Result<Buffer, MirrorError>;

    /// Classify an arbitrary pointer, including interior pointers.
    fn provenance(&self, ptr: *const u8) -> Provenance;

    /// Copy the first `len` bytes of `src` into `dst`, across spaces if needed.
    fn copy(&self, dst: &mut Buffer, src: &Buffer, len: usize) -> Result<(), MirrorError> {
        if src.len() < len {
            return Err(MirrorError::CopyLengthMismatch {
                expected: len,
                found: src.len(),
            });
        }
        let found = dst.len();
        let out = dst
            .as_bytes_mut()
            .get_mut(..len)
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: len,
                found,
            })?;
        out.copy_from_slice(&src.as_bytes()[..len]);
        Ok(())
    }

    /// Blocking transfer of `dst.len()` bytes at `offset` in `src` to the host.
    fn read_bytes(&self, src: &Buffer, offset: usize, dst: &mut [u8]) -> Result<(), MirrorError> {
        let end = offset
            .checked_add(dst.len())
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: dst.len(),
                found: 0,
            })?;
        let from = src
            .as_bytes()
            .get(offset..end)
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: end,
                found: src.len(),
            })?;
        dst.copy_from_slice(from);
        Ok(())
    }

    /// Upload host bytes into `dst` starting at `offset`.
    fn write_bytes(&self, dst: &mut Buffer, offset: usize, src: &[u8]) -> Result<(), MirrorError> {
        let end = offset
            .checked_add(src.len())
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: src.len(),
                found: 0,
            })?;
        let found = dst.len();
        let to = dst
            .as_bytes_mut()
            .get_mut(offset..end)
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: end,
                found,
            })?;
        to.copy_from_slice(src);
        Ok(())
    }
}

/// Manager for builds without accelerator support.
///
/// Both spaces map to [`AllocatorId::HOST`] and every pointer is host
/// memory, so device requests on an
/// [`ArrayInterface`](crate::data::array_interface::ArrayInterface)
/// return the host pointer unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostAllocationManager;

impl HostAllocationManager {
    pub fn new() -> Self {
        Self
    }
}

impl AllocationManager for HostAllocationManager {
    fn allocator_id(&self, _space: MemorySpace) -> AllocatorId {
        AllocatorId::HOST
    }

    fn device_available(&self) -> bool {
        false
    }

    fn allocate(&self, allocator: AllocatorId, bytes: usize) -> Result<Buffer, MirrorError> {
        if allocator != AllocatorId::HOST {
            return Err(MirrorError::UnknownAllocator(allocator));
        }
        Ok(Buffer::zeroed(bytes, allocator))
    }

    fn provenance(&self, _ptr: *const u8) -> Provenance {
        Provenance::HOST
    }
}
