//! Accelerator stand-in backed by host RAM.
//!
//! Device and unified buffers are ordinary host allocations registered in an
//! address-range registry, so [`provenance`](AllocationManager::provenance)
//! classifies any interior pointer the way a driver's pointer-attribute
//! query would. Counters expose every allocation and transfer, which is how
//! the exactly-once mirroring guarantee is observed in tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::memory::buffer::{AllocatorId, Buffer, ReleaseHook};
use crate::memory::manager::AllocationManager;
use crate::memory::space::{MemorySpace, Provenance};
use crate::mirror_error::MirrorError;

const DEVICE_ALLOCATOR: AllocatorId = AllocatorId(1);
const UNIFIED_ALLOCATOR: AllocatorId = AllocatorId(2);

/// Snapshot of the manager's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocationStats {
    pub host_allocations: usize,
    pub device_allocations: usize,
    pub unified_allocations: usize,
    /// Device and unified bytes handed out so far, including freed ones.
    pub device_bytes: usize,
    /// Buffer-to-buffer copies (mirror materialisation).
    pub copies: usize,
    pub bytes_copied: usize,
    /// Blocking device-to-host reads.
    pub staged_reads: usize,
}

#[derive(Clone, Copy, Debug)]
struct Region {
    len: usize,
    provenance: Provenance,
}

/// Base address -> region, for every live device or unified buffer.
#[derive(Debug, Default)]
struct RegionRegistry {
    regions: RwLock<BTreeMap<usize, Region>>,
}

impl RegionRegistry {
    fn insert(&self, addr: usize, region: Region) {
        self.regions.write().insert(addr, region);
    }

    fn lookup(&self, addr: usize) -> Provenance {
        self.regions
            .read()
            .range(..=addr)
            .next_back()
            .filter(|(base, r)| addr < *base + r.len)
            .map(|(_, r)| r.provenance)
            .unwrap_or(Provenance::HOST)
    }

    fn live_bytes(&self) -> usize {
        self.regions.read().values().map(|r| r.len).sum()
    }
}

impl ReleaseHook for RegionRegistry {
    fn release(&self, addr: usize) {
        self.regions.write().remove(&addr);
    }
}

/// Simulated accelerator with host, device and unified allocators.
#[derive(Debug)]
pub struct SimulatedDeviceManager {
    registry: Arc<RegionRegistry>,
    stats: Mutex<AllocationStats>,
    capacity: Option<usize>,
}

impl Default for SimulatedDeviceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDeviceManager {
    /// Manager with unbounded device memory.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(RegionRegistry::default()),
            stats: Mutex::new(AllocationStats::default()),
            capacity: None,
        }
    }

    /// Manager whose device and unified allocations fail once more than
    /// `bytes` of them would be live at once. Dropped buffers return their
    /// bytes to the budget.
    pub fn with_capacity_limit(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::new()
        }
    }

    /// Allocator identity for unified (host-accessible device) memory.
    pub fn unified_allocator_id(&self) -> AllocatorId {
        UNIFIED_ALLOCATOR
    }

    /// Device and unified bytes held by buffers that are still alive.
    pub fn device_bytes_in_use(&self) -> usize {
        self.registry.live_bytes()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> AllocationStats {
        *self.stats.lock()
    }

    fn allocate_tracked(
        &self,
        allocator: AllocatorId,
        bytes: usize,
        provenance: Provenance,
    ) -> Result<Buffer, MirrorError> {
        let mut stats = self.stats.lock();
        if let Some(cap) = self.capacity {
            let in_use = self.registry.live_bytes();
            if in_use.saturating_add(bytes) > cap {
                log::warn!("device allocation of {bytes} bytes refused ({in_use} of {cap} in use)");
                return Err(MirrorError::AllocationFailure {
                    space: MemorySpace::Device,
                    bytes,
                });
            }
        }
        let buf = Buffer::zeroed(bytes, allocator).with_release_hook(self.registry.clone());
        if bytes > 0 {
            self.registry.insert(
                buf.as_ptr() as usize,
                Region {
                    len: bytes,
                    provenance,
                },
            );
        }
        stats.device_bytes += bytes;
        if provenance.is_unified {
            stats.unified_allocations += 1;
        } else {
            stats.device_allocations += 1;
        }
        Ok(buf)
    }
}

impl AllocationManager for SimulatedDeviceManager {
    fn allocator_id(&self, space: MemorySpace) -> AllocatorId {
        match space {
            MemorySpace::Host => AllocatorId::HOST,
            MemorySpace::Device => DEVICE_ALLOCATOR,
        }
    }

    fn device_available(&self) -> bool {
        true
    }

    fn allocate(&self, allocator: AllocatorId, bytes: usize) -> Result<Buffer, MirrorError> {
        log::trace!("simulated allocate {bytes} bytes from {allocator}");
        match allocator {
            AllocatorId::HOST => {
                self.stats.lock().host_allocations += 1;
                Ok(Buffer::zeroed(bytes, allocator))
            }
            DEVICE_ALLOCATOR => self.allocate_tracked(allocator, bytes, Provenance::DEVICE),
            UNIFIED_ALLOCATOR => self.allocate_tracked(allocator, bytes, Provenance::UNIFIED),
            other => Err(MirrorError::UnknownAllocator(other)),
        }
    }

    fn provenance(&self, ptr: *const u8) -> Provenance {
        self.registry.lookup(ptr as usize)
    }

    fn copy(&self, dst: &mut Buffer, src: &Buffer, len: usize) -> Result<(), MirrorError> {
        if src.len() < len || dst.len() < len {
            return Err(MirrorError::CopyLengthMismatch {
                expected: len,
                found: src.len().min(dst.len()),
            });
        }
        dst.as_bytes_mut()[..len].copy_from_slice(&src.as_bytes()[..len]);
        let mut stats = self.stats.lock();
        stats.copies += 1;
        stats.bytes_copied += len;
        Ok(())
    }

    fn read_bytes(&self, src: &Buffer, offset: usize, dst: &mut [u8]) -> Result<(), MirrorError> {
        let end = offset.saturating_add(dst.len());
        let from = src
            .as_bytes()
            .get(offset..end)
            .ok_or(MirrorError::CopyLengthMismatch {
                expected: end,
                found: src.len(),
            })?;
        dst.copy_from_slice(from);
        self.stats.lock().staged_reads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_covers_interior_pointers() {
        let m = SimulatedDeviceManager::new();
        let dev = m.allocate(m.allocator_id(MemorySpace::Device), 32).unwrap();
        let uni = m.allocate(m.unified_allocator_id(), 16).unwrap();
        let host = m.allocate(AllocatorId::HOST, 16).unwrap();

        assert_eq!(m.provenance(dev.as_ptr()), Provenance::DEVICE);
        assert_eq!(m.provenance(dev.as_ptr().wrapping_add(31)), Provenance::DEVICE);
        assert_eq!(m.provenance(uni.as_ptr().wrapping_add(8)), Provenance::UNIFIED);
        assert_eq!(m.provenance(host.as_ptr()), Provenance::HOST);

        let stats = m.stats();
        assert_eq!(stats.device_allocations, 1);
        assert_eq!(stats.unified_allocations, 1);
        assert_eq!(stats.host_allocations, 1);
        assert_eq!(stats.device_bytes, 48);
    }

    #[test]
    fn dropped_buffers_unregister() {
        let m = SimulatedDeviceManager::new();
        let dev = m.allocate(m.allocator_id(MemorySpace::Device), 8).unwrap();
        let addr = dev.as_ptr();
        drop(dev);
        assert_eq!(m.registry.regions.read().len(), 0);
        assert_eq!(m.provenance(addr), Provenance::HOST);
    }

    #[test]
    fn capacity_limit_refuses_allocation() {
        let m = SimulatedDeviceManager::with_capacity_limit(16);
        let _a = m.allocate(m.allocator_id(MemorySpace::Device), 16).unwrap();
        assert_eq!(
            m.allocate(m.allocator_id(MemorySpace::Device), 1).unwrap_err(),
            MirrorError::AllocationFailure {
                space: MemorySpace::Device,
                bytes: 1
            }
        );
        // host memory is not charged
        assert!(m.allocate(AllocatorId::HOST, 64).is_ok());
    }

    #[test]
    fn freed_device_memory_returns_to_the_budget() {
        let m = SimulatedDeviceManager::with_capacity_limit(16);
        let dev = m.allocator_id(MemorySpace::Device);
        let a = m.allocate(dev, 12).unwrap();
        assert_eq!(m.device_bytes_in_use(), 12);
        assert!(m.allocate(dev, 8).is_err());
        drop(a);
        assert_eq!(m.device_bytes_in_use(), 0);
        let _b = m.allocate(dev, 16).unwrap();
        assert_eq!(m.device_bytes_in_use(), 16);
        assert_eq!(m.stats().device_bytes, 28);
    }

    #[test]
    fn copies_and_reads_are_counted() {
        let m = SimulatedDeviceManager::new();
        let src = Buffer::from_slice(&[5i64, 6], AllocatorId::HOST);
        let mut dst = m.allocate(m.allocator_id(MemorySpace::Device), 16).unwrap();
        m.copy(&mut dst, &src, 16).unwrap();
        let mut out = [0u8; 8];
        m.read_bytes(&dst, 8, &mut out).unwrap();
        assert_eq!(i64::from_ne_bytes(out), 6);
        let stats = m.stats();
        assert_eq!((stats.copies, stats.bytes_copied, stats.staged_reads), (1, 16, 1));
    }
}
