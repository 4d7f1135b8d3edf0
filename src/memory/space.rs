//! Memory spaces and pointer provenance.

use core::fmt::{self, Display};
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::mirror_error::MirrorError;

/// Where a pointer must be valid for the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySpace {
    /// CPU-accessible memory.
    Host,
    /// Accelerator-accessible memory.
    Device,
}

impl MemorySpace {
    /// Stable label, also used as the mirror-path tag.
    pub fn as_str(self) -> &'static str {
        match self {
            MemorySpace::Host => "host",
            MemorySpace::Device => "device",
        }
    }
}

impl Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemorySpace {
    type Err = MirrorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" => Ok(MemorySpace::Host),
            "device" => Ok(MemorySpace::Device),
            other => Err(MirrorError::InvalidLocation(other.to_string())),
        }
    }
}

/// Classification of an arbitrary pointer, as reported by an
/// [`AllocationManager`](crate::memory::manager::AllocationManager).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Provenance {
    /// The pointer refers to accelerator memory.
    pub is_device: bool,
    /// The pointer is additionally dereferenceable on the host (unified memory).
    pub is_unified: bool,
}

impl Provenance {
    /// Plain host memory.
    pub const HOST: Provenance = Provenance {
        is_device: false,
        is_unified: false,
    };
    /// Device-only memory.
    pub const DEVICE: Provenance = Provenance {
        is_device: true,
        is_unified: false,
    };
    /// Unified (managed) memory, valid in both spaces.
    pub const UNIFIED: Provenance = Provenance {
        is_device: true,
        is_unified: true,
    };

    /// Whether the host can dereference the pointer.
    ///
    /// `is_unified` without `is_device` is treated as plain host memory.
    #[inline]
    pub fn host_accessible(self) -> bool {
        !self.is_device || self.is_unified
    }

    /// Whether a pointer with this provenance may be handed out for `space`
    /// without mirroring.
    ///
    /// | is_device | is_unified | Device | Host |
    /// |-----------|------------|--------|------|
    /// | false     | false      | mirror | yes  |
    /// | false     | true       | mirror | yes  |
    /// | true      | false      | yes    | mirror |
    /// | true      | true       | yes    | yes  |
    #[inline]
    pub fn satisfies(self, space: MemorySpace) -> bool {
        match space {
            MemorySpace::Device => self.is_device,
            MemorySpace::Host => self.host_accessible(),
        }
    }
}
