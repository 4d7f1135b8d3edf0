#![allow(dead_code)]
use std::sync::Arc;

use field_mirror::prelude::*;

/// Field with `values/x` and `values/y`, four float64 each.
pub fn xy_field() -> Node {
    let mut field = Node::new();
    field.fetch_or_create("values/x").set_slice(&[1.0f64, 2.0, 3.0, 4.0]);
    field.fetch_or_create("values/y").set_slice(&[10.0f64, 20.0, 30.0, 40.0]);
    field
}

/// Field whose `values` leaf holds `0..n` as int32.
pub fn scalar_field(n: i32) -> Node {
    let mut field = Node::new();
    let data: Vec<i32> = (0..n).collect();
    field.fetch_or_create("values").set_slice(&data);
    field
}

/// Store `values` at `path` in a buffer from `allocator`.
pub fn leaf_in<T: Scalar>(
    manager: &SimulatedDeviceManager,
    allocator: AllocatorId,
    field: &mut Node,
    path: &str,
    values: &[T],
) {
    let bytes: &[u8] = bytemuck::cast_slice(values);
    let mut buf = manager.allocate(allocator, bytes.len()).unwrap();
    manager.write_bytes(&mut buf, 0, bytes).unwrap();
    field
        .fetch_or_create(path)
        .set_leaf(DataType::compact(T::SCALAR_TYPE, values.len()), Arc::new(buf))
        .unwrap();
}

pub fn simulated() -> Arc<SimulatedDeviceManager> {
    Arc::new(SimulatedDeviceManager::new())
}
