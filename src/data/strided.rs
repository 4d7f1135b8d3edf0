//! StridedView: a non-owning, copyable element view over a typed buffer.
//!
//! A view is three integers and a pointer. It is built right before being
//! handed to a consumer (possibly a parallel kernel that captures it by
//! value) and discarded afterwards. The element read
//! `values[offset + stride * i]` is the hot path and is not bounds-checked
//! in [`get_unchecked`](StridedView::get_unchecked).

use core::fmt::{self, Debug};
use core::marker::PhantomData;
use core::ops::Index;

use static_assertions::assert_impl_all;

use crate::data::dtype::DataType;
use crate::data::scalar::Scalar;

/// Indexed read access to `size` elements at `offset + stride * i`
/// (both in elements) from `values`.
#[derive(Clone, Copy)]
pub struct StridedView<'a, T> {
    values: *const T,
    size: usize,
    offset: usize,
    stride: usize,
    _marker: PhantomData<&'a T>,
}

// SAFETY: a view only reads through `values`; the buffer outlives `'a` and
// is not mutated while borrowed.
unsafe impl<T: Sync> Send for StridedView<'_, T> {}
unsafe impl<T: Sync> Sync for StridedView<'_, T> {}

assert_impl_all!(StridedView<'static, f64>: Copy, Send, Sync, Default);

impl<T> Default for StridedView<'_, T> {
    /// The empty view. It has length zero; never read it unchecked.
    fn default() -> Self {
        Self {
            values: core::ptr::null(),
            size: 0,
            offset: 0,
            stride: 0,
            _marker: PhantomData,
        }
    }
}

impl<'a, T: Scalar> StridedView<'a, T> {
    /// Build a view from a buffer base pointer and its byte-based layout.
    ///
    /// # Safety
    /// `values` must be the base of a `T`-aligned allocation at least
    /// `dtype.spanned_bytes()` long, alive and unmodified for `'a`, and
    /// dereferenceable wherever the view is read. `dtype.scalar_type` must
    /// be `T::SCALAR_TYPE`.
    pub unsafe fn from_raw_parts(values: *const T, dtype: &DataType) -> Self {
        debug_assert_eq!(dtype.scalar_type, T::SCALAR_TYPE);
        debug_assert_eq!(dtype.element_size(), size_of::<T>());
        Self {
            values,
            size: dtype.len,
            offset: dtype.offset_in_elements(),
            stride: dtype.stride_in_elements(),
            _marker: PhantomData,
        }
    }

    /// Element `index` without bounds checking.
    ///
    /// # Safety
    /// `index < self.len()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, index: usize) -> T {
        // SAFETY: in-bounds by the caller's contract and `from_raw_parts`.
        unsafe { *self.values.add(self.offset + self.stride * index) }
    }

    /// Element `index`, or `None` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        // SAFETY: checked against `size`.
        (index < self.size).then(|| unsafe { self.get_unchecked(index) })
    }

    /// Elements in logical order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        // SAFETY: `i < size`.
        (0..self.size).map(move |i| unsafe { self.get_unchecked(i) })
    }

    /// Gather into a compact `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().collect()
    }

    /// Parallel iterator over elements in logical order.
    #[cfg(feature = "rayon")]
    pub fn par_iter(&self) -> impl rayon::iter::IndexedParallelIterator<Item = T> + 'a {
        use rayon::prelude::*;
        let view = *self;
        // SAFETY: `i < size`.
        (0..self.size)
            .into_par_iter()
            .map(move |i| unsafe { view.get_unchecked(i) })
    }
}

impl<T> StridedView<'_, T> {
    /// Number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the view has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Offset of element 0, in elements.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Distance between consecutive elements, in elements.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Buffer base pointer the view was built over.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.values
    }
}

impl<T: Scalar> Index<usize> for StridedView<'_, T> {
    type Output = T;

    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    fn index(&self, index: usize) -> &T {
        assert!(
            index < self.size,
            "StridedView index {index} out of range for length {}",
            self.size
        );
        // SAFETY: checked above.
        unsafe { &*self.values.add(self.offset + self.stride * index) }
    }
}

impl<T> Debug for StridedView<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StridedView")
            .field("values", &self.values)
            .field("size", &self.size)
            .field("offset", &self.offset)
            .field("stride", &self.stride)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::scalar::ScalarType;

    #[test]
    fn compact_view_reads_in_order() {
        let data = [1.0f64, 2.0, 3.0, 4.0];
        let view =
            unsafe { StridedView::from_raw_parts(data.as_ptr(), &DataType::compact(ScalarType::F64, 4)) };
        assert_eq!(view.len(), 4);
        assert_eq!(view[0], 1.0);
        assert_eq!(view.get(3), Some(4.0));
        assert_eq!(view.get(4), None);
        assert_eq!(view.to_vec(), data.to_vec());
    }

    #[test]
    fn strided_view_divides_byte_layout() {
        // interleaved (x, y) pairs; view the y column
        let data = [0i32, 10, 1, 11, 2, 12];
        let dtype = DataType::new(ScalarType::I32, 3, 4, 8);
        let view = unsafe { StridedView::from_raw_parts(data.as_ptr(), &dtype) };
        assert_eq!((view.offset(), view.stride()), (1, 2));
        assert_eq!(view.to_vec(), vec![10, 11, 12]);
    }

    #[test]
    fn default_view_is_empty() {
        let view = StridedView::<f32>::default();
        assert!(view.is_empty());
        assert_eq!(view.get(0), None);
        assert_eq!(view.iter().count(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn index_past_end_panics() {
        let data = [1i64];
        let view =
            unsafe { StridedView::from_raw_parts(data.as_ptr(), &DataType::compact(ScalarType::I64, 1)) };
        let _ = view[1];
    }

    #[test]
    fn copies_share_the_buffer() {
        let data = [5.0f32, 6.0];
        let view =
            unsafe { StridedView::from_raw_parts(data.as_ptr(), &DataType::compact(ScalarType::F32, 2)) };
        let copy = view;
        std::thread::scope(|s| {
            s.spawn(move || assert_eq!(copy.get(1), Some(6.0)));
        });
        assert_eq!(view.as_ptr(), copy.as_ptr());
    }
}
