//! Serializable snapshot of a node tree's shape, used in diagnostics.

use core::fmt::{self, Display};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::data::dtype::DataType;

/// Shape of a node: empty, a typed leaf, or ordered named children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Schema {
    Empty,
    Leaf(DataType),
    Object(Vec<(String, Schema)>),
}

impl Schema {
    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Schema::Empty => 0,
            Schema::Leaf(_) => 1,
            Schema::Object(children) => children.iter().map(|(_, c)| c.leaf_count()).sum(),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Schema::Empty => serializer.serialize_unit(),
            Schema::Leaf(dtype) => dtype.serialize(serializer),
            // declaration order is significant, so emit as an ordered map
            Schema::Object(children) => {
                let mut map = serializer.serialize_map(Some(children.len()))?;
                for (name, child) in children {
                    map.serialize_entry(name, child)?;
                }
                map.end()
            }
        }
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
