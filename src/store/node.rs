//! Node: a tree of named entries whose leaves hold typed, strided arrays.
//!
//! Children keep declaration order. A leaf pairs a [`DataType`] with a
//! shared [`Buffer`]; several leaves may view one buffer (e.g. interleaved
//! `x`/`y` components). Every node also owns a [`MirrorCache`] holding
//! the host/device copies materialised for leaves beneath it. Reaching a
//! node mutably (through [`Node::fetch_or_create`] or a setter) clears the
//! caches it passes through, so a mirror never outlives the layout it was
//! copied from.

use std::sync::Arc;

use itertools::Itertools;

use crate::data::dtype::DataType;
use crate::data::scalar::Scalar;
use crate::debug_invariants::DebugInvariants;
use crate::memory::buffer::{AllocatorId, Buffer};
use crate::mirror_error::MirrorError;
use crate::store::mirror_cache::MirrorCache;
use crate::store::schema::Schema;

/// Typed view of (part of) a buffer.
#[derive(Clone, Debug)]
pub struct Leaf {
    dtype: DataType,
    buffer: Arc<Buffer>,
}

impl Leaf {
    /// Pair a layout with a buffer, rejecting layouts that overrun it.
    pub fn new(dtype: DataType, buffer: Arc<Buffer>) -> Result<Self, MirrorError> {
        dtype.validate_against(buffer.len())?;
        Ok(Self { dtype, buffer })
    }

    #[inline]
    pub fn dtype(&self) -> &DataType {
        &self.dtype
    }

    #[inline]
    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Base address of the underlying buffer (not offset-adjusted).
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }
}

/// One entry of the hierarchical store.
#[derive(Debug, Default)]
pub struct Node {
    children: Vec<(String, Node)>,
    leaf: Option<Leaf>,
    mirrors: MirrorCache,
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` names an existing descendant.
    pub fn has_path(&self, path: &str) -> bool {
        self.fetch(path).is_some()
    }

    /// Descendant at `path`; the empty path is `self`.
    pub fn fetch(&self, path: &str) -> Option<&Node> {
        segments(path).try_fold(self, |node, seg| node.child_named(seg))
    }

    /// Descendant at `path`, creating missing entries along the way.
    ///
    /// Mirrors cached on `self` and on every node down to the result are
    /// dropped, since the caller may now change the leaves they copy.
    pub fn fetch_or_create(&mut self, path: &str) -> &mut Node {
        let mut node = self;
        node.mirrors.clear();
        for seg in segments(path) {
            let idx = match node.children.iter().position(|(name, _)| name == seg) {
                Some(idx) => idx,
                None => {
                    node.leaf = None;
                    node.children.push((seg.to_string(), Node::default()));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[idx].1;
            node.mirrors.clear();
        }
        node
    }

    /// Direct child called `name`; first match in declaration order.
    pub fn child_named(&self, name: &str) -> Option<&Node> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    #[inline]
    pub fn number_of_children(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index).map(|(_, node)| node)
    }

    pub fn child_name(&self, index: usize) -> Option<&str> {
        self.children.get(index).map(|(name, _)| name.as_str())
    }

    /// `(name, child)` pairs in declaration order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    #[inline]
    pub fn leaf(&self) -> Option<&Leaf> {
        self.leaf.as_ref()
    }

    #[inline]
    pub fn dtype(&self) -> Option<&DataType> {
        self.leaf.as_ref().map(Leaf::dtype)
    }

    /// Make this node a leaf viewing `buffer` through `dtype`.
    ///
    /// Existing children are discarded.
    pub fn set_leaf(&mut self, dtype: DataType, buffer: Arc<Buffer>) -> Result<(), MirrorError> {
        let leaf = Leaf::new(dtype, buffer)?;
        self.children.clear();
        self.mirrors.clear();
        self.leaf = Some(leaf);
        #[cfg(any(debug_assertions, feature = "check-invariants"))]
        self.debug_assert_invariants();
        Ok(())
    }

    /// Make this node a leaf holding a compact host copy of `values`.
    pub fn set_slice<T: Scalar>(&mut self, values: &[T]) {
        let buffer = Arc::new(Buffer::from_slice(values, AllocatorId::HOST));
        self.children.clear();
        self.mirrors.clear();
        self.leaf = Some(Leaf {
            dtype: DataType::compact(T::SCALAR_TYPE, values.len()),
            buffer,
        });
    }

    /// Mirrors materialised for leaves under this node.
    #[inline]
    pub fn mirrors(&self) -> &MirrorCache {
        &self.mirrors
    }

    /// Shape snapshot of this subtree.
    pub fn schema(&self) -> Schema {
        match (&self.leaf, self.children.is_empty()) {
            (Some(leaf), _) => Schema::Leaf(leaf.dtype),
            (None, true) => Schema::Empty,
            (None, false) => Schema::Object(
                self.children
                    .iter()
                    .map(|(name, node)| (name.clone(), node.schema()))
                    .collect(),
            ),
        }
    }

    /// Paths of every leaf below this node, depth first.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_leaf_paths("", &mut out);
        out
    }

    fn collect_leaf_paths(&self, prefix: &str, out: &mut Vec<String>) {
        if self.leaf.is_some() {
            out.push(prefix.to_string());
        }
        for (name, node) in &self.children {
            let path = [prefix, name.as_str()]
                .iter()
                .filter(|s| !s.is_empty())
                .join("/");
            node.collect_leaf_paths(&path, out);
        }
    }
}

impl DebugInvariants for Node {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "Node");
    }

    fn validate_invariants(&self) -> Result<(), MirrorError> {
        if let Some(leaf) = &self.leaf {
            if !self.children.is_empty() {
                return Err(MirrorError::InvalidLayout(
                    "node holds both array data and children".into(),
                ));
            }
            leaf.dtype.validate_against(leaf.buffer.len())?;
        }
        self.children
            .iter()
            .try_for_each(|(_, node)| node.validate_invariants())
    }
}
