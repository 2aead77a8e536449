use std::fmt;

use crate::buffer::TensorBuffer;
use crate::error::Result;
use crate::shape::Shape;
use crate::HostElement;

/// Kind of an engine value, as reported by model metadata.
///
/// Only tensors, sequences and maps have host payloads in this layer. The
/// remaining kinds exist because metadata can describe them; a value of such
/// a kind cannot be projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Tensor,
    Sequence,
    Map,
    Optional,
    SparseTensor,
    Opaque,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Tensor => "tensor",
            ValueKind::Sequence => "sequence",
            ValueKind::Map => "map",
            ValueKind::Optional => "optional",
            ValueKind::SparseTensor => "sparse tensor",
            ValueKind::Opaque => "opaque",
        };
        write!(f, "{}", s)
    }
}

/// The kinds model metadata can describe but that have no host payload in
/// this layer. Kept apart from `ValueKind` so a tensor, sequence or map can
/// never be tagged as "other".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherKind {
    Optional,
    SparseTensor,
    Opaque,
}

impl From<OtherKind> for ValueKind {
    fn from(kind: OtherKind) -> Self {
        match kind {
            OtherKind::Optional => ValueKind::Optional,
            OtherKind::SparseTensor => ValueKind::SparseTensor,
            OtherKind::Opaque => ValueKind::Opaque,
        }
    }
}

impl fmt::Display for OtherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&ValueKind::from(*self), f)
    }
}

/// Host representation of a map: a key tensor and a value per key.
///
/// Maps are carried so that callers can describe them, but they are never
/// projected.
#[derive(Debug, Clone)]
pub struct MapValue {
    pub keys: TensorBuffer,
    pub values: Box<TaggedValue>,
}

/// The payload of a tagged value. One case per kind, each carrying exactly
/// what that kind needs.
#[derive(Debug, Clone)]
pub enum Payload {
    Tensor(TensorBuffer),
    /// `None` marks a sequence whose element list is absent or unreadable,
    /// which is distinct from an empty sequence.
    Sequence(Option<Vec<TaggedValue>>),
    Map(MapValue),
    /// A value of a kind with no host payload here (optional, sparse, opaque).
    Other(OtherKind),
}

/// A host value with an explicit kind: the input to projection.
///
/// Root values are named after the model input they feed; nested values may
/// be anonymous. Values are never mutated by projection.
#[derive(Debug, Clone)]
pub struct TaggedValue {
    name: Option<String>,
    payload: Payload,
}

impl TaggedValue {
    pub fn new(name: Option<String>, payload: Payload) -> Self {
        TaggedValue { name, payload }
    }

    pub fn tensor(name: impl Into<String>, buffer: TensorBuffer) -> Self {
        Self::new(Some(name.into()), Payload::Tensor(buffer))
    }

    /// Anonymous tensor, for use inside a sequence.
    pub fn anonymous_tensor(buffer: TensorBuffer) -> Self {
        Self::new(None, Payload::Tensor(buffer))
    }

    /// Build a tensor value straight from host elements.
    pub fn from_vec<T: HostElement>(
        name: impl Into<String>,
        data: Vec<T>,
        shape: impl Into<Shape>,
    ) -> Result<Self> {
        Ok(Self::tensor(name, TensorBuffer::from_vec(data, shape)?))
    }

    pub fn sequence(name: impl Into<String>, elements: Vec<TaggedValue>) -> Self {
        Self::new(Some(name.into()), Payload::Sequence(Some(elements)))
    }

    /// Anonymous sequence, for nesting.
    pub fn anonymous_sequence(elements: Vec<TaggedValue>) -> Self {
        Self::new(None, Payload::Sequence(Some(elements)))
    }

    /// A sequence whose elements cannot be read.
    pub fn unreadable_sequence(name: impl Into<String>) -> Self {
        Self::new(Some(name.into()), Payload::Sequence(None))
    }

    pub fn map(name: impl Into<String>, keys: TensorBuffer, values: TaggedValue) -> Self {
        Self::new(
            Some(name.into()),
            Payload::Map(MapValue {
                keys,
                values: Box::new(values),
            }),
        )
    }

    pub fn other(name: Option<String>, kind: OtherKind) -> Self {
        Self::new(name, Payload::Other(kind))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> ValueKind {
        match &self.payload {
            Payload::Tensor(_) => ValueKind::Tensor,
            Payload::Sequence(_) => ValueKind::Sequence,
            Payload::Map(_) => ValueKind::Map,
            Payload::Other(kind) => (*kind).into(),
        }
    }

    pub fn as_tensor(&self) -> Option<&TensorBuffer> {
        match &self.payload {
            Payload::Tensor(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Elements of a readable sequence.
    pub fn as_sequence(&self) -> Option<&[TaggedValue]> {
        match &self.payload {
            Payload::Sequence(Some(elements)) => Some(elements),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_payload() {
        let t = TaggedValue::from_vec("x", vec![1.0f32, 2.0], 2).unwrap();
        assert_eq!(t.kind(), ValueKind::Tensor);
        assert_eq!(t.name(), Some("x"));

        let s = TaggedValue::sequence("ys", vec![t.clone()]);
        assert_eq!(s.kind(), ValueKind::Sequence);
        assert_eq!(s.as_sequence().map(|e| e.len()), Some(1));

        let o = TaggedValue::other(None, OtherKind::Opaque);
        assert_eq!(o.kind(), ValueKind::Opaque);
        assert!(o.name().is_none());
    }

    #[test]
    fn test_other_kinds_are_never_projectable_kinds() {
        for kind in [OtherKind::Optional, OtherKind::SparseTensor, OtherKind::Opaque] {
            let v = TaggedValue::other(None, kind);
            assert!(!matches!(
                v.kind(),
                ValueKind::Tensor | ValueKind::Sequence | ValueKind::Map
            ));
            assert_eq!(kind.to_string(), v.kind().to_string());
        }
    }

    #[test]
    fn test_unreadable_sequence_is_still_a_sequence() {
        let s = TaggedValue::unreadable_sequence("ys");
        assert_eq!(s.kind(), ValueKind::Sequence);
        assert!(s.as_sequence().is_none());
    }

    #[test]
    fn test_map_kind() {
        let keys = TensorBuffer::from_vec(vec![1i64, 2], 2).unwrap();
        let values = TaggedValue::from_vec("v", vec![0.5f32, 0.25], 2).unwrap();
        let m = TaggedValue::map("m", keys, values);
        assert_eq!(m.kind(), ValueKind::Map);
        assert!(m.as_tensor().is_none());
    }
}
