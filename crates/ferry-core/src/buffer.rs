use std::sync::Arc;

use crate::dtype::{ElementType, HostElement};
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::shape::Shape;

// TensorBuffer - host-side tensor storage
//
// A buffer is shared typed storage plus a layout over it. Storage sits behind
// an Arc so that:
//   - transposed / narrowed buffers share memory with their source
//   - an engine can pin the storage by holding a clone of the Arc, which keeps
//     the allocation alive (and unmoved) for as long as a native view exists
//
// The element type of a buffer is read from its storage variant. It is the
// single source of truth: schemas are checked against it, never the reverse.

/// Typed flat storage for a tensor.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
    F16(Vec<half::f16>),
    BF16(Vec<half::bf16>),
    String(Vec<String>),
    /// Packed bytes for element types with no Rust representation here
    /// (complex, float8, 4-bit integers).
    Raw {
        element_type: ElementType,
        bytes: Vec<u8>,
    },
}

impl TensorData {
    pub fn element_type(&self) -> ElementType {
        match self {
            TensorData::F32(_) => ElementType::F32,
            TensorData::F64(_) => ElementType::F64,
            TensorData::I8(_) => ElementType::I8,
            TensorData::I16(_) => ElementType::I16,
            TensorData::I32(_) => ElementType::I32,
            TensorData::I64(_) => ElementType::I64,
            TensorData::U8(_) => ElementType::U8,
            TensorData::U16(_) => ElementType::U16,
            TensorData::U32(_) => ElementType::U32,
            TensorData::U64(_) => ElementType::U64,
            TensorData::Bool(_) => ElementType::Bool,
            TensorData::F16(_) => ElementType::F16,
            TensorData::BF16(_) => ElementType::BF16,
            TensorData::String(_) => ElementType::String,
            TensorData::Raw { element_type, .. } => *element_type,
        }
    }

    /// Number of elements held.
    pub fn len(&self) -> usize {
        match self {
            TensorData::F32(v) => v.len(),
            TensorData::F64(v) => v.len(),
            TensorData::I8(v) => v.len(),
            TensorData::I16(v) => v.len(),
            TensorData::I32(v) => v.len(),
            TensorData::I64(v) => v.len(),
            TensorData::U8(v) => v.len(),
            TensorData::U16(v) => v.len(),
            TensorData::U32(v) => v.len(),
            TensorData::U64(v) => v.len(),
            TensorData::Bool(v) => v.len(),
            TensorData::F16(v) => v.len(),
            TensorData::BF16(v) => v.len(),
            TensorData::String(v) => v.len(),
            // 4-bit types report the slot count, which may include one
            // padding value
            TensorData::Raw {
                element_type,
                bytes,
            } => match element_type {
                ElementType::U4 | ElementType::I4 => bytes.len() * 2,
                other => other.size_in_bytes().map_or(0, |size| bytes.len() / size),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect the elements at `indices`, in order, into new storage.
    pub fn gather(&self, indices: impl Iterator<Item = usize>) -> Result<TensorData> {
        let gathered = match self {
            TensorData::F32(v) => TensorData::F32(indices.map(|i| v[i]).collect()),
            TensorData::F64(v) => TensorData::F64(indices.map(|i| v[i]).collect()),
            TensorData::I8(v) => TensorData::I8(indices.map(|i| v[i]).collect()),
            TensorData::I16(v) => TensorData::I16(indices.map(|i| v[i]).collect()),
            TensorData::I32(v) => TensorData::I32(indices.map(|i| v[i]).collect()),
            TensorData::I64(v) => TensorData::I64(indices.map(|i| v[i]).collect()),
            TensorData::U8(v) => TensorData::U8(indices.map(|i| v[i]).collect()),
            TensorData::U16(v) => TensorData::U16(indices.map(|i| v[i]).collect()),
            TensorData::U32(v) => TensorData::U32(indices.map(|i| v[i]).collect()),
            TensorData::U64(v) => TensorData::U64(indices.map(|i| v[i]).collect()),
            TensorData::Bool(v) => TensorData::Bool(indices.map(|i| v[i]).collect()),
            TensorData::F16(v) => TensorData::F16(indices.map(|i| v[i]).collect()),
            TensorData::BF16(v) => TensorData::BF16(indices.map(|i| v[i]).collect()),
            TensorData::String(v) => TensorData::String(indices.map(|i| v[i].clone()).collect()),
            TensorData::Raw { element_type, bytes } => {
                let size = element_type.size_in_bytes().ok_or_else(|| {
                    Error::msg(format!("cannot gather packed {element_type} elements"))
                })?;
                let mut out = Vec::new();
                for i in indices {
                    out.extend_from_slice(&bytes[i * size..(i + 1) * size]);
                }
                TensorData::Raw {
                    element_type: *element_type,
                    bytes: out,
                }
            }
        };
        Ok(gathered)
    }
}

/// Number of `element_type` values held by `len` raw bytes.
///
/// Packed 4-bit storage holds two values per byte with the last byte padded
/// when the count is odd, so its count is only known relative to `expected`.
fn raw_element_count(element_type: ElementType, len: usize, expected: usize) -> Result<usize> {
    match element_type {
        ElementType::String => {
            crate::bail!("string elements cannot be stored as raw bytes")
        }
        ElementType::U4 | ElementType::I4 if len == (expected + 1) / 2 => Ok(expected),
        ElementType::U4 | ElementType::I4 => Ok(len * 2),
        other => match other.size_in_bytes() {
            Some(size) if len % size == 0 => Ok(len / size),
            _ => crate::bail!("{len} bytes is not a whole number of {other} elements"),
        },
    }
}

/// A host tensor: shared storage viewed through a layout.
#[derive(Debug, Clone)]
pub struct TensorBuffer {
    data: Arc<TensorData>,
    layout: Layout,
}

impl TensorBuffer {
    /// Contiguous buffer over `data`; the element count must match `shape`.
    pub fn from_data(data: TensorData, shape: impl Into<Shape>) -> Result<Self> {
        let shape = shape.into();
        let expected = shape.elem_count();
        let got = match &data {
            TensorData::Raw {
                element_type,
                bytes,
            } => raw_element_count(*element_type, bytes.len(), expected)?,
            other => other.len(),
        };
        if got != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got,
            });
        }
        Ok(TensorBuffer {
            data: Arc::new(data),
            layout: Layout::contiguous(shape),
        })
    }

    /// Contiguous buffer from a vector of host elements.
    pub fn from_vec<T: HostElement>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        Self::from_data(T::into_data(data), shape)
    }

    /// Contiguous string tensor.
    pub fn from_strings<S: Into<String>>(
        data: impl IntoIterator<Item = S>,
        shape: impl Into<Shape>,
    ) -> Result<Self> {
        let strings = data.into_iter().map(Into::into).collect();
        Self::from_data(TensorData::String(strings), shape)
    }

    /// Buffer over shared storage with an arbitrary layout.
    pub fn with_layout(data: Arc<TensorData>, layout: Layout) -> Result<Self> {
        let needed = layout.required_storage_len();
        if data.len() < needed {
            crate::bail!(
                "layout over shape {} needs {} elements, storage holds {}",
                layout.shape(),
                needed,
                data.len()
            );
        }
        Ok(TensorBuffer { data, layout })
    }

    /// The element type, as reported by the storage itself.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    pub fn shape(&self) -> &Shape {
        self.layout.shape()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    /// The shared storage handle. Cloning it keeps the allocation alive.
    pub fn storage(&self) -> &Arc<TensorData> {
        &self.data
    }

    pub fn elem_count(&self) -> usize {
        self.layout.elem_count()
    }

    /// Whether the engine can reference this memory in place.
    ///
    /// Requires a dense row-major layout covering the whole storage and a
    /// fixed-size element type. Strings always go through a copy, since the
    /// engine keeps its own string representation.
    pub fn is_view_eligible(&self) -> bool {
        self.layout.is_contiguous()
            && self.element_type().size_in_bytes().is_some()
            && self.data.len() == self.layout.elem_count()
    }

    /// Elements in logical order as fresh contiguous storage.
    pub fn to_contiguous(&self) -> Result<TensorData> {
        self.data.gather(self.layout.strided_indices())
    }

    /// Swap two dimensions, sharing storage.
    pub fn transpose(&self, dim0: usize, dim1: usize) -> Result<Self> {
        Ok(TensorBuffer {
            data: Arc::clone(&self.data),
            layout: self.layout.transpose(dim0, dim1)?,
        })
    }

    /// Narrow one dimension, sharing storage.
    pub fn narrow(&self, dim: usize, start: usize, len: usize) -> Result<Self> {
        Ok(TensorBuffer {
            data: Arc::clone(&self.data),
            layout: self.layout.narrow(dim, start, len)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_reports_type() {
        let b = TensorBuffer::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3)).unwrap();
        assert_eq!(b.element_type(), ElementType::F32);
        assert_eq!(b.shape().dims(), &[2, 3]);
        assert!(b.is_view_eligible());
    }

    #[test]
    fn test_count_mismatch() {
        let err = TensorBuffer::from_vec(vec![1i32, 2, 3], (2, 2)).unwrap_err();
        assert!(matches!(err, Error::ElementCountMismatch { expected: 4, got: 3, .. }));
    }

    #[test]
    fn test_strings_are_never_views() {
        let b = TensorBuffer::from_strings(["a", "b"], 2).unwrap();
        assert_eq!(b.element_type(), ElementType::String);
        assert!(!b.is_view_eligible());
    }

    #[test]
    fn test_transpose_shares_storage_and_gathers() {
        let b = TensorBuffer::from_vec(vec![0i64, 1, 2, 3, 4, 5], (2, 3)).unwrap();
        let t = b.transpose(0, 1).unwrap();
        assert!(Arc::ptr_eq(t.storage(), b.storage()));
        assert!(!t.is_view_eligible());
        assert_eq!(
            t.to_contiguous().unwrap(),
            TensorData::I64(vec![0, 3, 1, 4, 2, 5])
        );
    }

    #[test]
    fn test_narrow_is_copied() {
        let b = TensorBuffer::from_vec(vec![0u8, 1, 2, 3], 4).unwrap();
        let n = b.narrow(0, 1, 2).unwrap();
        assert!(!n.is_view_eligible());
        assert_eq!(n.to_contiguous().unwrap(), TensorData::U8(vec![1, 2]));
    }

    #[test]
    fn test_raw_element_count() {
        let data = TensorData::Raw {
            element_type: ElementType::Complex64,
            bytes: vec![0; 16],
        };
        assert_eq!(data.len(), 2);
        let b = TensorBuffer::from_data(data, 2).unwrap();
        assert_eq!(b.element_type(), ElementType::Complex64);
    }

    #[test]
    fn test_raw_strings_are_rejected() {
        let data = TensorData::Raw {
            element_type: ElementType::String,
            bytes: vec![0; 3],
        };
        assert_eq!(data.len(), 0);
        let err = TensorBuffer::from_data(data, 6).unwrap_err();
        assert!(matches!(err, Error::Msg(_)), "{err}");
    }

    #[test]
    fn test_raw_partial_element_is_rejected() {
        let data = TensorData::Raw {
            element_type: ElementType::Complex64,
            bytes: vec![0; 12],
        };
        assert!(matches!(
            TensorBuffer::from_data(data, 1),
            Err(Error::Msg(_))
        ));
    }

    #[test]
    fn test_packed_4bit_byte_count() {
        // 5 values need 3 bytes, the last one half padding
        let packed = |n| TensorData::Raw {
            element_type: ElementType::I4,
            bytes: vec![0; n],
        };
        assert!(TensorBuffer::from_data(packed(3), 5).is_ok());
        assert!(TensorBuffer::from_data(packed(2), 4).is_ok());
        assert!(matches!(
            TensorBuffer::from_data(packed(2), 5),
            Err(Error::ElementCountMismatch {
                expected: 5,
                got: 4,
                ..
            })
        ));
        assert!(TensorBuffer::from_data(packed(4), 5).is_err());
    }

    #[test]
    fn test_with_layout_checks_storage_len() {
        let data = Arc::new(TensorData::F32(vec![0.0; 4]));
        let layout = Layout::contiguous(Shape::from((2, 3)));
        assert!(TensorBuffer::with_layout(data, layout).is_err());
    }

    #[test]
    fn test_half_types() {
        let b = TensorBuffer::from_vec(vec![half::f16::from_f32(1.5); 3], 3).unwrap();
        assert_eq!(b.element_type(), ElementType::F16);
        let b = TensorBuffer::from_vec(vec![half::bf16::from_f32(1.5); 3], 3).unwrap();
        assert_eq!(b.element_type(), ElementType::BF16);
    }
}
