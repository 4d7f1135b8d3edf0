//! Data module: element types, layouts, strided views and array interfaces
#![warn(missing_docs)]

pub mod array_interface;
pub mod dtype;
pub mod scalar;
pub mod strided;

pub use array_interface::{ArrayInterface, DEFAULT_PATH};
pub use dtype::DataType;
pub use scalar::{Scalar, ScalarType};
pub use strided::StridedView;

/// Interface over `f64` fields.
pub type Float64Array<'a> = ArrayInterface<'a, f64>;
/// Interface over `f32` fields.
pub type Float32Array<'a> = ArrayInterface<'a, f32>;
/// Interface over `i32` fields.
pub type Int32Array<'a> = ArrayInterface<'a, i32>;
/// Interface over `i64` fields.
pub type Int64Array<'a> = ArrayInterface<'a, i64>;
