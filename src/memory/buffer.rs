//! Memory-space-tagged byte buffers handed out by an allocation manager.

use core::fmt::{self, Debug, Display};
use std::sync::Arc;

use bytemuck::Pod;

/// Identity of the allocator a buffer came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocatorId(pub u32);

impl AllocatorId {
    /// Plain host allocator; every manager recognises it.
    pub const HOST: AllocatorId = AllocatorId(0);
}

impl Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "allocator#{}", self.0)
    }
}

/// Notified when a tracked buffer is dropped.
pub trait ReleaseHook: Send + Sync {
    /// `addr` is the base address of the released buffer.
    fn release(&self, addr: usize);
}

/// Contiguous byte buffer tagged with the allocator that produced it.
///
/// Storage is 8-byte aligned so every supported scalar type can be read in
/// place. The base address is stable for the buffer's lifetime.
pub struct Buffer {
    words: Box<[u64]>,
    len: usize,
    allocator: AllocatorId,
    hook: Option<Arc<dyn ReleaseHook>>,
}

impl Buffer {
    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize, allocator: AllocatorId) -> Self {
        Self {
            words: vec![0u64; len.div_ceil(8)].into_boxed_slice(),
            len,
            allocator,
            hook: None,
        }
    }

    /// Buffer holding a copy of `bytes`.
    pub fn from_bytes(bytes: &[u8], allocator: AllocatorId) -> Self {
        let mut buf = Self::zeroed(bytes.len(), allocator);
        buf.as_bytes_mut().copy_from_slice(bytes);
        buf
    }

    /// Buffer holding a packed copy of `values`.
    pub fn from_slice<T: Pod>(values: &[T], allocator: AllocatorId) -> Self {
        Self::from_bytes(bytemuck::cast_slice(values), allocator)
    }

    /// Attach a hook that is told when this buffer is dropped.
    pub fn with_release_hook(mut self, hook: Arc<dyn ReleaseHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Base address.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.words.as_ptr().cast()
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocator this buffer was tagged with.
    #[inline]
    pub fn allocator(&self) -> AllocatorId {
        self.allocator
    }

    /// Backing bytes.
    ///
    /// Only dereference on the host when the buffer's provenance is host
    /// accessible, or from an allocation manager that knows its device
    /// memory is host-addressable.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.len]
    }

    /// Mutable backing bytes; same caveat as [`as_bytes`](Self::as_bytes).
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)[..self.len]
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        if let Some(hook) = self.hook.take() {
            hook.release(self.as_ptr() as usize);
        }
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("len", &self.len)
            .field("allocator", &self.allocator)
            .field("addr", &self.as_ptr())
            .finish()
    }
}
