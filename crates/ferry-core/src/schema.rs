use std::collections::HashMap;
use std::fmt;

use crate::dtype::ElementType;
use crate::shape::Shape;
use crate::value::{OtherKind, ValueKind};

// SchemaNode - expected shape of a value at one nesting level
//
// Schemas come from model metadata: one tree per model input, read-only and
// shared freely between threads. A sequence node has exactly one child that
// describes every element, so `seq<seq<tensor<f32>>>` is a three-node chain.

/// One dimension of a tensor schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Must equal this size.
    Fixed(usize),
    /// Named free dimension. Any size matches, but every occurrence of the
    /// same name within one tensor must agree.
    Symbolic(String),
    /// Any size.
    Dynamic,
}

impl Dim {
    pub fn fixed(n: usize) -> Self {
        Dim::Fixed(n)
    }

    pub fn symbolic(name: impl Into<String>) -> Self {
        Dim::Symbolic(name.into())
    }

    /// Match `value`, binding symbolic names in `env` on first sight.
    fn unify<'a>(&'a self, value: usize, env: &mut HashMap<&'a str, usize>) -> bool {
        match self {
            Dim::Fixed(n) => value == *n,
            Dim::Symbolic(name) => *env.entry(name.as_str()).or_insert(value) == value,
            Dim::Dynamic => true,
        }
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Fixed(n) => write!(f, "{n}"),
            Dim::Symbolic(s) => write!(f, "{s}"),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

impl From<usize> for Dim {
    fn from(n: usize) -> Self {
        Dim::Fixed(n)
    }
}

impl From<&str> for Dim {
    fn from(s: &str) -> Self {
        Dim::Symbolic(s.to_string())
    }
}

/// Why a concrete shape failed a tensor schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimsMismatch {
    Rank { expected: usize, actual: usize },
    Dim { dim: usize, expected: String, actual: usize },
}

/// Expected element type and, optionally, dimensions of a tensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSchema {
    pub element_type: ElementType,
    /// `None` places no constraint on rank or sizes.
    pub dims: Option<Vec<Dim>>,
}

impl TensorSchema {
    pub fn new(element_type: ElementType) -> Self {
        TensorSchema {
            element_type,
            dims: None,
        }
    }

    pub fn with_dims(mut self, dims: impl IntoIterator<Item = Dim>) -> Self {
        self.dims = Some(dims.into_iter().collect());
        self
    }

    /// Check a concrete shape against the declared dimensions.
    pub fn check_dims(&self, shape: &Shape) -> std::result::Result<(), DimsMismatch> {
        let Some(dims) = &self.dims else {
            return Ok(());
        };
        if dims.len() != shape.rank() {
            return Err(DimsMismatch::Rank {
                expected: dims.len(),
                actual: shape.rank(),
            });
        }
        let mut env = HashMap::new();
        for (i, (want, &got)) in dims.iter().zip(shape.dims()).enumerate() {
            if !want.unify(got, &mut env) {
                let expected = match want {
                    Dim::Symbolic(name) => format!("{name}={}", env[name.as_str()]),
                    other => other.to_string(),
                };
                return Err(DimsMismatch::Dim {
                    dim: i,
                    expected,
                    actual: got,
                });
            }
        }
        Ok(())
    }
}

/// Expected value at one nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaNode {
    Tensor(TensorSchema),
    /// Every element is described by the single child.
    Sequence(Box<SchemaNode>),
    /// Not projected; see `ValueKind::Map`.
    Map {
        key_type: ElementType,
        value: Box<SchemaNode>,
    },
    Other(OtherKind),
}

impl SchemaNode {
    /// Tensor of `element_type`, any shape.
    pub fn tensor(element_type: ElementType) -> Self {
        SchemaNode::Tensor(TensorSchema::new(element_type))
    }

    /// Tensor of `element_type` with declared dimensions.
    pub fn tensor_with_dims(element_type: ElementType, dims: impl IntoIterator<Item = Dim>) -> Self {
        SchemaNode::Tensor(TensorSchema::new(element_type).with_dims(dims))
    }

    pub fn sequence_of(element: SchemaNode) -> Self {
        SchemaNode::Sequence(Box::new(element))
    }

    pub fn map_of(key_type: ElementType, value: SchemaNode) -> Self {
        SchemaNode::Map {
            key_type,
            value: Box::new(value),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            SchemaNode::Tensor(_) => ValueKind::Tensor,
            SchemaNode::Sequence(_) => ValueKind::Sequence,
            SchemaNode::Map { .. } => ValueKind::Map,
            SchemaNode::Other(kind) => (*kind).into(),
        }
    }
}

impl fmt::Display for SchemaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaNode::Tensor(t) => {
                write!(f, "tensor<{}", t.element_type)?;
                if let Some(dims) = &t.dims {
                    write!(f, ", [")?;
                    for (i, d) in dims.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{d}")?;
                    }
                    write!(f, "]")?;
                }
                write!(f, ">")
            }
            SchemaNode::Sequence(child) => write!(f, "seq<{child}>"),
            SchemaNode::Map { key_type, value } => write!(f, "map<{key_type}, {value}>"),
            SchemaNode::Other(kind) => write!(f, "{kind}"),
        }
    }
}
