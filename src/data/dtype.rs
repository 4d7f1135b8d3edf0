//! DataType: per-leaf layout descriptor.
//!
//! Offsets and strides are **byte** quantities, as the node store records
//! them. Views divide by the element size before indexing.

use serde::{Deserialize, Serialize};

use crate::data::scalar::ScalarType;
use crate::mirror_error::MirrorError;

/// Element type, count and byte layout of one leaf array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    /// Stored element-type tag.
    pub scalar_type: ScalarType,
    /// Number of logical elements.
    pub len: usize,
    /// Byte offset of element 0 from the start of the buffer.
    pub offset: usize,
    /// Byte distance between consecutive logical elements.
    pub stride: usize,
}

impl DataType {
    /// Layout with explicit byte offset and stride.
    pub fn new(scalar_type: ScalarType, len: usize, offset: usize, stride: usize) -> Self {
        Self {
            scalar_type,
            len,
            offset,
            stride,
        }
    }

    /// Densely packed layout starting at byte 0.
    pub fn compact(scalar_type: ScalarType, len: usize) -> Self {
        Self::new(scalar_type, len, 0, scalar_type.size_of())
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn element_size(&self) -> usize {
        self.scalar_type.size_of()
    }

    /// Byte position of logical element `index` within the buffer.
    #[inline]
    pub fn element_index(&self, index: usize) -> usize {
        self.offset + self.stride * index
    }

    /// Offset expressed in elements.
    #[inline]
    pub fn offset_in_elements(&self) -> usize {
        self.offset / self.element_size()
    }

    /// Stride expressed in elements.
    #[inline]
    pub fn stride_in_elements(&self) -> usize {
        self.stride / self.element_size()
    }

    /// Whether elements are densely packed from byte 0.
    pub fn is_compact(&self) -> bool {
        self.offset == 0 && (self.len <= 1 || self.stride == self.element_size())
    }

    /// Number of buffer bytes touched by this layout, starting at byte 0.
    pub fn spanned_bytes(&self) -> usize {
        match self.len {
            0 => 0,
            n => self.element_index(n - 1) + self.element_size(),
        }
    }

    /// Check that this layout addresses a buffer of `buffer_len` bytes
    /// without overrun and with element-aligned offset and stride.
    pub fn validate_against(&self, buffer_len: usize) -> Result<(), MirrorError> {
        let size = self.element_size();
        if self.offset % size != 0 {
            return Err(MirrorError::InvalidLayout(format!(
                "offset {} is not a multiple of the {} element size",
                self.offset, self.scalar_type
            )));
        }
        if self.stride % size != 0 {
            return Err(MirrorError::InvalidLayout(format!(
                "stride {} is not a multiple of the {} element size",
                self.stride, self.scalar_type
            )));
        }
        if self.len > 1 && self.stride < size {
            return Err(MirrorError::InvalidLayout(format!(
                "stride {} is smaller than the {} element size",
                self.stride, self.scalar_type
            )));
        }
        let span = self
            .len
            .checked_sub(1)
            .map(|last| {
                self.stride
                    .checked_mul(last)
                    .and_then(|b| b.checked_add(self.offset))
                    .and_then(|b| b.checked_add(size))
            })
            .unwrap_or(Some(0))
            .ok_or_else(|| MirrorError::InvalidLayout("layout span overflows usize".into()))?;
        if span > buffer_len {
            return Err(MirrorError::InvalidLayout(format!(
                "layout spans {span} bytes but buffer holds {buffer_len}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_layout_indexes_densely() {
        let dt = DataType::compact(ScalarType::F64, 4);
        assert_eq!(dt.element_index(0), 0);
        assert_eq!(dt.element_index(3), 24);
        assert_eq!(dt.spanned_bytes(), 32);
        assert!(dt.is_compact());
    }

    #[test]
    fn interleaved_layout_converts_to_elements() {
        // y of an interleaved [x0, y0, x1, y1, ...] float32 buffer
        let dt = DataType::new(ScalarType::F32, 3, 4, 8);
        assert_eq!(dt.offset_in_elements(), 1);
        assert_eq!(dt.stride_in_elements(), 2);
        assert_eq!(dt.element_index(2), 20);
        assert_eq!(dt.spanned_bytes(), 24);
        assert!(!dt.is_compact());
        assert!(dt.validate_against(24).is_ok());
    }

    #[test]
    fn empty_layout_spans_nothing() {
        let dt = DataType::compact(ScalarType::I32, 0);
        assert_eq!(dt.spanned_bytes(), 0);
        assert!(dt.validate_against(0).is_ok());
    }

    #[test]
    fn rejects_overrun_and_misalignment() {
        let dt = DataType::compact(ScalarType::I64, 4);
        assert!(matches!(
            dt.validate_against(31),
            Err(MirrorError::InvalidLayout(_))
        ));
        let dt = DataType::new(ScalarType::I64, 2, 3, 8);
        assert!(matches!(
            dt.validate_against(64),
            Err(MirrorError::InvalidLayout(_))
        ));
        let dt = DataType::new(ScalarType::I64, 2, 0, 4);
        assert!(matches!(
            dt.validate_against(64),
            Err(MirrorError::InvalidLayout(_))
        ));
    }
}
