//! Element-type tags and the statically chosen access types.
//!
//! The node store tags every leaf with a [`ScalarType`]; an
//! [`ArrayInterface`](crate::data::array_interface::ArrayInterface) is
//! generic over one [`Scalar`] and validates the tag once at construction.

use core::fmt::{self, Debug, Display};

use bytemuck::Pod;
use num_traits::Num;
use serde::{Deserialize, Serialize};

/// Element-type tag stored alongside every leaf array.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// 64-bit float.
    F64,
    /// 32-bit float.
    F32,
    /// 32-bit signed integer.
    I32,
    /// 64-bit signed integer.
    I64,
}

impl ScalarType {
    /// Returns a stable string label for the scalar type.
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarType::F64 => "float64",
            ScalarType::F32 => "float32",
            ScalarType::I32 => "int32",
            ScalarType::I64 => "int64",
        }
    }

    /// Parse a scalar type from a string label.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "float64" | "f64" => Some(ScalarType::F64),
            "float32" | "f32" => Some(ScalarType::F32),
            "int32" | "i32" => Some(ScalarType::I32),
            "int64" | "i64" => Some(ScalarType::I64),
            _ => None,
        }
    }

    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            ScalarType::F64 | ScalarType::I64 => 8,
            ScalarType::F32 | ScalarType::I32 => 4,
        }
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a concrete Rust element type to its stored tag.
///
/// Implemented for exactly the closed set `{f64, f32, i32, i64}`.
pub trait Scalar: Pod + Num + Debug + PartialOrd + Send + Sync + 'static {
    /// Tag for this concrete type.
    const SCALAR_TYPE: ScalarType;

    /// Whether a stored tag matches this type.
    #[inline]
    fn matches(tag: ScalarType) -> bool {
        tag == Self::SCALAR_TYPE
    }
}

impl Scalar for f64 {
    const SCALAR_TYPE: ScalarType = ScalarType::F64;
}

impl Scalar for f32 {
    const SCALAR_TYPE: ScalarType = ScalarType::F32;
}

impl Scalar for i32 {
    const SCALAR_TYPE: ScalarType = ScalarType::I32;
}

impl Scalar for i64 {
    const SCALAR_TYPE: ScalarType = ScalarType::I64;
}
