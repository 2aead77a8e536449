use crate::error::{Error, Result};
use crate::shape::Shape;

// Layout - how a tensor's logical shape maps onto its flat storage
//
// The layout decides whether a buffer can be handed to the engine in place.
// The engine reads tensors as dense row-major blocks starting at the first
// element of the allocation, so a view is only possible when:
//
//   - the strides equal the row-major strides of the shape, and
//   - the offset into the storage is zero.
//
// Transposed or narrowed layouts fail that test and are gathered into a
// fresh contiguous block by `strided_indices` before being copied.

/// Shape, strides and offset (all in elements) of a tensor over its storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Shape,
    strides: Vec<usize>,
    offset: usize,
}

impl Layout {
    /// Row-major layout starting at element 0.
    pub fn contiguous(shape: Shape) -> Self {
        let strides = shape.stride_contiguous();
        Layout {
            shape,
            strides,
            offset: 0,
        }
    }

    /// Layout with explicit strides and offset.
    pub fn new(shape: Shape, strides: Vec<usize>, offset: usize) -> Result<Self> {
        if strides.len() != shape.rank() {
            crate::bail!("layout: {} strides given for shape {}", strides.len(), shape);
        }
        Ok(Layout {
            shape,
            strides,
            offset,
        })
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn dims(&self) -> &[usize] {
        self.shape.dims()
    }

    pub fn elem_count(&self) -> usize {
        self.shape.elem_count()
    }

    /// Row-major with no leading gap.
    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.strides == self.shape.stride_contiguous()
    }

    /// One past the largest storage index this layout can touch, i.e. the
    /// minimum storage length it needs.
    pub fn required_storage_len(&self) -> usize {
        if self.elem_count() == 0 {
            return self.offset;
        }
        let last: usize = self
            .dims()
            .iter()
            .zip(self.strides.iter())
            .map(|(&d, &s)| (d - 1) * s)
            .sum();
        self.offset + last + 1
    }

    /// Swap two dimensions without touching storage.
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Layout> {
        let rank = self.shape.rank();
        if dim0 >= rank || dim1 >= rank {
            return Err(Error::DimOutOfRange {
                dim: dim0.max(dim1),
                rank,
            });
        }
        let mut dims = self.dims().to_vec();
        let mut strides = self.strides.clone();
        dims.swap(dim0, dim1);
        strides.swap(dim0, dim1);
        Ok(Layout {
            shape: Shape::new(dims),
            strides,
            offset: self.offset,
        })
    }

    /// Restrict `dim` to `start..start + len`, sharing storage.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Layout> {
        let rank = self.shape.rank();
        if dim >= rank {
            return Err(Error::DimOutOfRange { dim, rank });
        }
        let dim_size = self.dims()[dim];
        if start.checked_add(len).map_or(true, |end| end > dim_size) {
            return Err(Error::NarrowOutOfBounds {
                dim,
                start,
                len,
                dim_size,
            });
        }
        let mut dims = self.dims().to_vec();
        dims[dim] = len;
        Ok(Layout {
            shape: Shape::new(dims),
            strides: self.strides.clone(),
            offset: self.offset + start * self.strides[dim],
        })
    }

    /// Storage indices of every element, in logical row-major order.
    pub fn strided_indices(&self) -> StridedIter {
        StridedIter::new(self)
    }
}

/// Yields the storage index of each logical element of a `Layout`.
pub struct StridedIter {
    current: Vec<usize>,
    dims: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
    remaining: usize,
    started: bool,
}

impl StridedIter {
    fn new(layout: &Layout) -> Self {
        StridedIter {
            current: vec![0; layout.shape.rank()],
            dims: layout.dims().to_vec(),
            strides: layout.strides.clone(),
            offset: layout.offset,
            remaining: layout.elem_count(),
            started: false,
        }
    }

    fn flat_index(&self) -> usize {
        self.offset
            + self
                .current
                .iter()
                .zip(self.strides.iter())
                .map(|(i, s)| i * s)
                .sum::<usize>()
    }

    // rightmost dimension moves fastest
    fn advance(&mut self) {
        for i in (0..self.dims.len()).rev() {
            self.current[i] += 1;
            if self.current[i] < self.dims[i] {
                return;
            }
            self.current[i] = 0;
        }
    }
}

impl Iterator for StridedIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        if self.started {
            self.advance();
        }
        self.started = true;
        self.remaining -= 1;
        Some(self.flat_index())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for StridedIter {}
