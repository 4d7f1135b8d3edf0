//! In-crate node store: tree, schema snapshots and per-node mirror caches.

pub mod mirror_cache;
pub mod node;
pub mod schema;

pub use mirror_cache::{MirrorCache, MirrorKey};
pub use node::{Leaf, Node};
pub use schema::Schema;
