//! MirrorError: Unified error type for field-mirror public APIs
//!
//! Every fallible operation in this crate reports through this enum. Nothing
//! is retried internally; errors surface to the caller that triggered them.

use thiserror::Error;

use crate::data::scalar::ScalarType;
use crate::memory::buffer::AllocatorId;
use crate::memory::space::MemorySpace;

/// Unified error type for field-mirror operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MirrorError {
    /// The requested field path is absent from the node.
    #[error("missing path `{path}` in node with schema {schema}")]
    MissingPath { path: String, schema: String },
    /// Stored element type disagrees with the statically chosen type.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}; schema {schema}")]
    TypeMismatch {
        path: String,
        expected: ScalarType,
        found: ScalarType,
        schema: String,
    },
    /// A node on the field path carries no array data.
    #[error("node at `{0}` holds no array data")]
    NotALeaf(String),
    /// Component index outside `[0, components)`.
    #[error("invalid component {index}; field has {components} component(s)")]
    InvalidComponentIndex { index: usize, components: usize },
    /// No child of the field carries the requested name.
    #[error("no component named `{0}`")]
    UnknownComponent(String),
    /// Empty component name on a field with more than one component.
    #[error("ambiguous component: field has {components} components but none was specified")]
    AmbiguousComponent { components: usize },
    /// Memory space string was neither `host` nor `device`.
    #[error("invalid location `{0}` (expected `host` or `device`)")]
    InvalidLocation(String),
    /// The allocation manager could not supply a buffer.
    #[error("allocation of {bytes} bytes in {space} memory failed")]
    AllocationFailure { space: MemorySpace, bytes: usize },
    /// The allocation manager does not know this allocator identity.
    #[error("unknown allocator {0}")]
    UnknownAllocator(AllocatorId),
    /// Element index outside `[0, len)` on a checked read.
    #[error("element index {index} out of range for length {len}")]
    ElementOutOfRange { index: usize, len: usize },
    /// Source and destination byte ranges differ in length.
    #[error("copy length mismatch: expected {expected} bytes, found {found}")]
    CopyLengthMismatch { expected: usize, found: usize },
    /// A `DataType` does not describe a valid layout over its buffer.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}
