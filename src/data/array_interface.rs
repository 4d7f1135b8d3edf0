//! ArrayInterface: typed, location-aware access to one field of a node.
//!
//! A field is either a single leaf array or a set of named component
//! leaves. Construction checks every component's stored element type
//! against `T` once; afterwards components are resolved by index or name
//! and handed out as pointers or [`StridedView`]s in the requested
//! [`MemorySpace`].
//!
//! # Mirroring
//!
//! When a pointer is requested in a space its provenance does not satisfy,
//! a same-layout copy is allocated from the [`AllocationManager`] and cached
//! in the field node's [`MirrorCache`](crate::store::MirrorCache) under
//! `<space>_<leaf path>`. Later requests for the same (leaf, space) pair,
//! from this or any other interface over the same node, return the cached
//! buffer. Mirrors are never refreshed: the field's data is assumed not to
//! change once an interface exists.
//!
//! Without accelerator support ([`AllocationManager::device_available`] is
//! `false`) a device request returns the stored host pointer unchanged.

use core::marker::PhantomData;
use std::sync::Arc;

use crate::data::scalar::Scalar;
use crate::data::strided::StridedView;
use crate::memory::manager::AllocationManager;
use crate::memory::space::MemorySpace;
use crate::mirror_error::MirrorError;
use crate::store::mirror_cache::MirrorKey;
use crate::store::node::{Leaf, Node};

/// Field path used when none is given.
pub const DEFAULT_PATH: &str = "values";

/// Typed view of the field at `path` under a node.
#[derive(Debug)]
pub struct ArrayInterface<'a, T: Scalar> {
    field: &'a Node,
    values: &'a Node,
    path: String,
    components: usize,
    sizes: Vec<usize>,
    manager: Arc<dyn AllocationManager>,
    _marker: PhantomData<T>,
}

impl<'a, T: Scalar> ArrayInterface<'a, T> {
    /// Interface over `field["values"]`.
    pub fn new(field: &'a Node, manager: Arc<dyn AllocationManager>) -> Result<Self, MirrorError> {
        Self::with_path(field, DEFAULT_PATH, manager)
    }

    /// Interface over `field[path]`.
    ///
    /// # Errors
    /// - `MissingPath` if `field` has no entry at `path`.
    /// - `TypeMismatch` if any component is not stored as `T`.
    /// - `NotALeaf` if a component holds no array data.
    pub fn with_path(
        field: &'a Node,
        path: &str,
        manager: Arc<dyn AllocationManager>,
    ) -> Result<Self, MirrorError> {
        let values = field.fetch(path).ok_or_else(|| MirrorError::MissingPath {
            path: path.to_string(),
            schema: field.schema().to_string(),
        })?;

        let children = values.number_of_children();
        let sizes = if children == 0 {
            vec![Self::checked_len(field, values, path)?]
        } else {
            values
                .children()
                .map(|(name, child)| Self::checked_len(field, child, &format!("{path}/{name}")))
                .collect::<Result<Vec<_>, _>>()?
        };
        let components = children.max(1);
        debug_assert_eq!(sizes.len(), components);

        log::debug!(
            "array interface over `{path}`: {components} component(s) of {}",
            T::SCALAR_TYPE
        );
        Ok(Self {
            field,
            values,
            path: path.to_string(),
            components,
            sizes,
            manager,
            _marker: PhantomData,
        })
    }

    fn checked_len(field: &Node, node: &Node, path: &str) -> Result<usize, MirrorError> {
        let dtype = node
            .dtype()
            .ok_or_else(|| MirrorError::NotALeaf(path.to_string()))?;
        if !T::matches(dtype.scalar_type) {
            return Err(MirrorError::TypeMismatch {
                path: path.to_string(),
                expected: T::SCALAR_TYPE,
                found: dtype.scalar_type,
                schema: field.schema().to_string(),
            });
        }
        Ok(dtype.len)
    }

    /// Number of components (at least 1).
    #[inline]
    pub fn components(&self) -> usize {
        self.components
    }

    /// Element count of `component`, as recorded at construction.
    pub fn size(&self, component: usize) -> Result<usize, MirrorError> {
        self.sizes
            .get(component)
            .copied()
            .ok_or(MirrorError::InvalidComponentIndex {
                index: component,
                components: self.components,
            })
    }

    /// Field path this interface was built over.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Allocation manager used for provenance queries and mirrors.
    #[inline]
    pub fn manager(&self) -> &Arc<dyn AllocationManager> {
        &self.manager
    }

    /// Index of the component called `name`.
    ///
    /// The empty name resolves to 0 only on single-component fields.
    /// Otherwise children are scanned in declaration order; first match wins.
    pub fn resolve_component(&self, name: &str) -> Result<usize, MirrorError> {
        if name.is_empty() {
            return match self.components {
                1 => Ok(0),
                components => Err(MirrorError::AmbiguousComponent { components }),
            };
        }
        self.values
            .children()
            .position(|(child, _)| child == name)
            .ok_or_else(|| MirrorError::UnknownComponent(name.to_string()))
    }

    fn check_index(&self, component: usize) -> Result<usize, MirrorError> {
        if component < self.components {
            Ok(component)
        } else {
            Err(MirrorError::InvalidComponentIndex {
                index: component,
                components: self.components,
            })
        }
    }

    /// Path of the leaf backing `component`, relative to the field node.
    pub fn component_path(&self, component: usize) -> Result<String, MirrorError> {
        self.check_index(component)?;
        Ok(match self.values.child_name(component) {
            Some(name) => format!("{}/{name}", self.path),
            None => self.path.clone(),
        })
    }

    fn leaf(&self, component: usize) -> Result<(String, &'a Leaf), MirrorError> {
        let path = self.component_path(component)?;
        let node = match self.values.number_of_children() {
            0 => Some(self.values),
            _ => self.values.child(component),
        };
        let leaf = node
            .and_then(Node::leaf)
            .ok_or_else(|| MirrorError::NotALeaf(path.clone()))?;
        Ok((path, leaf))
    }

    /// Pointer to `component` as currently stored, in whichever space.
    pub fn raw_ptr(&self, component: usize) -> Result<*const T, MirrorError> {
        let (_, leaf) = self.leaf(component)?;
        Ok(leaf.as_ptr().cast())
    }

    /// Element `index` of a component, read on the host.
    ///
    /// Device-only data is staged with a blocking single-element transfer
    /// on every call; use [`accessor`](Self::accessor) for bulk reads.
    pub fn value(&self, component: usize, index: usize) -> Result<T, MirrorError> {
        let (path, leaf) = self.leaf(component)?;
        let dtype = leaf.dtype();
        if index >= dtype.len {
            return Err(MirrorError::ElementOutOfRange {
                index,
                len: dtype.len,
            });
        }
        let at = dtype.element_index(index);
        let size = size_of::<T>();
        let mut out = T::zeroed();
        let dst = bytemuck::bytes_of_mut(&mut out);
        if self.manager.provenance(leaf.as_ptr()).host_accessible() {
            dst.copy_from_slice(&leaf.buffer().as_bytes()[at..at + size]);
        } else {
            log::trace!("staging element {index} of `{path}` from device memory");
            self.manager.read_bytes(leaf.buffer(), at, dst)?;
        }
        Ok(out)
    }

    /// [`value`](Self::value) with the component given by name.
    pub fn value_named(&self, component: &str, index: usize) -> Result<T, MirrorError> {
        self.value(self.resolve_component(component)?, index)
    }

    /// Pointer to `component` valid in device memory.
    pub fn device_pointer(&self, component: usize) -> Result<*const T, MirrorError> {
        self.pointer_in(MemorySpace::Device, component)
    }

    /// Pointer to `component` valid in host memory.
    pub fn host_pointer(&self, component: usize) -> Result<*const T, MirrorError> {
        self.pointer_in(MemorySpace::Host, component)
    }

    /// Pointer to component 0 valid in `space`.
    pub fn ptr(&self, space: MemorySpace) -> Result<*const T, MirrorError> {
        self.pointer_in(space, 0)
    }

    /// Pointer to `component` valid in `space`, mirroring on first need.
    pub fn pointer_in(&self, space: MemorySpace, component: usize) -> Result<*const T, MirrorError> {
        let (leaf_path, leaf) = self.leaf(component)?;
        let ptr = leaf.as_ptr();

        if space == MemorySpace::Device && !self.manager.device_available() {
            log::debug!("no accelerator support; `{leaf_path}` stays in host memory");
            return Ok(ptr.cast());
        }

        let provenance = self.manager.provenance(ptr);
        if provenance.satisfies(space) {
            log::debug!("`{leaf_path}` already valid in {space} memory ({provenance:?})");
            return Ok(ptr.cast());
        }

        let key = MirrorKey::new(space, leaf_path);
        let bytes = leaf.dtype().spanned_bytes();
        let (mirror, created) = self.field.mirrors().get_or_try_insert_with(&key, || {
            let mut mirror = self
                .manager
                .allocate(self.manager.allocator_id(space), bytes)?;
            self.manager.copy(&mut mirror, leaf.buffer(), bytes)?;
            Ok(mirror)
        })?;
        if created {
            log::debug!("mirror miss: materialised `{key}` ({bytes} bytes)");
        } else {
            log::debug!("mirror hit: `{key}`");
            if mirror.len() < bytes {
                return Err(MirrorError::InvalidLayout(format!(
                    "mirror `{key}` holds {} bytes but the leaf spans {bytes}",
                    mirror.len()
                )));
            }
        }
        // The cache keeps the buffer alive for as long as `field` is borrowed.
        Ok(mirror.as_ptr().cast())
    }

    /// Whether a mirror of `component` exists for `space`.
    pub fn has_mirror(&self, space: MemorySpace, component: usize) -> Result<bool, MirrorError> {
        let key = MirrorKey::new(space, self.component_path(component)?);
        Ok(self.field.mirrors().get(&key).is_some())
    }

    /// Strided view of the component called `name`, valid in `space`.
    ///
    /// The empty name selects the sole component; on a multi-component
    /// field it is ambiguous.
    pub fn accessor(&self, space: MemorySpace, name: &str) -> Result<StridedView<'a, T>, MirrorError> {
        self.component_accessor(space, self.resolve_component(name)?)
    }

    /// [`accessor`](Self::accessor) with the space given as `"host"` or
    /// `"device"`.
    pub fn accessor_at(&self, location: &str, name: &str) -> Result<StridedView<'a, T>, MirrorError> {
        self.accessor(location.parse()?, name)
    }

    /// Strided view of `component` valid in `space`.
    pub fn component_accessor(
        &self,
        space: MemorySpace,
        component: usize,
    ) -> Result<StridedView<'a, T>, MirrorError> {
        let (_, leaf) = self.leaf(component)?;
        let ptr = self.pointer_in(space, component)?;
        // SAFETY: `ptr` is the base of either the leaf's own buffer or its
        // mirror. `pointer_in` only returns a mirror at least
        // `dtype.spanned_bytes()` long, and mirrors are dropped whenever the
        // tree is reached mutably. Both are 8-byte aligned and stay alive
        // and unmodified while `field` is borrowed for `'a`. The element
        // type was checked at construction.
        Ok(unsafe { StridedView::from_raw_parts(ptr, leaf.dtype()) })
    }
}
