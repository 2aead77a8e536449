use crate::dtype::ElementType;
use crate::value::ValueKind;

/// Failure reported by an engine when it cannot create a native value or
/// pin a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("engine: {message}")]
pub struct EngineError {
    pub message: String,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        EngineError {
            message: message.into(),
        }
    }
}

/// All errors that can occur within ferry.
///
/// Projection errors carry the `path` of the offending value: the root name,
/// followed by one `[index]` per sequence level (`ys[1][0]`). Every projection
/// error is fatal to the call that produced it; by the time the caller sees
/// one, every native resource of that call has been released.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The value kind disagrees with the schema kind.
    #[error("{path}: value kind {actual} does not match expected {expected}")]
    KindMismatch {
        path: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A sequence element's kind disagrees with the element schema.
    #[error("{path}: sequence element {index} expected to be {expected}, received {actual}")]
    ElementKindMismatch {
        path: String,
        index: usize,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// The element type read from a tensor buffer disagrees with the schema.
    #[error("{path}: tensor element type discovered {discovered}, expected {expected}")]
    ElementTypeMismatch {
        path: String,
        expected: ElementType,
        discovered: ElementType,
    },

    /// The tensor's element type cannot be projected.
    #[error("{path}: tensor element type {element_type} is not supported")]
    UnsupportedElementType {
        path: String,
        element_type: ElementType,
    },

    /// A sequence value carries no readable element list.
    #[error("{path}: sequence does not contain readable elements")]
    MissingElements { path: String },

    /// A value is neither a tensor, a sequence, nor a map.
    #[error("{path}: {kind} is not a tensor, sequence or map")]
    InvalidElementKind { path: String, kind: ValueKind },

    /// A construct this layer does not project (maps).
    #[error("{path}: {what} is not implemented")]
    Unimplemented { path: String, what: String },

    /// Tensor rank disagrees with the schema's dimensions.
    #[error("{path}: tensor rank {actual} does not match expected rank {expected}")]
    RankMismatch {
        path: String,
        expected: usize,
        actual: usize,
    },

    /// One tensor dimension disagrees with the schema.
    #[error("{path}: dimension {dim} is {actual}, expected {expected}")]
    DimMismatch {
        path: String,
        dim: usize,
        expected: String,
        actual: usize,
    },

    /// The buffer can only be projected by copying and copies are disabled.
    #[error("{path}: tensor layout is not view-eligible and copying is disabled")]
    CopyRequired { path: String },

    /// Nesting exceeds the configured maximum depth.
    #[error("{path}: nesting depth exceeds the limit of {max_depth}")]
    DepthExceeded { path: String, max_depth: usize },

    /// A root value handed to multi-input projection has no name.
    #[error("input at position {position} has no name")]
    MissingName { position: usize },

    /// No schema is known for the named input.
    #[error("no metadata for input {name}")]
    UnknownInput { name: String },

    /// The same input name was supplied twice.
    #[error("input {name} supplied more than once")]
    DuplicateInput { name: String },

    /// Storage length and shape disagree when building a buffer.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: crate::shape::Shape,
        expected: usize,
        got: usize,
    },

    /// Dimension index out of range for the layout's rank.
    #[error("dimension out of range: dim {dim} for layout with {rank} dimensions")]
    DimOutOfRange { dim: usize, rank: usize },

    /// Narrow out of bounds.
    #[error("narrow out of bounds: dim {dim}, start {start}, len {len}, dim_size {dim_size}")]
    NarrowOutOfBounds {
        dim: usize,
        start: usize,
        len: usize,
        dim_size: usize,
    },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Msg(String),
}

impl Error {
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Path of the offending value, for projection errors that have one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::KindMismatch { path, .. }
            | Error::ElementKindMismatch { path, .. }
            | Error::ElementTypeMismatch { path, .. }
            | Error::UnsupportedElementType { path, .. }
            | Error::MissingElements { path }
            | Error::InvalidElementKind { path, .. }
            | Error::Unimplemented { path, .. }
            | Error::RankMismatch { path, .. }
            | Error::DimMismatch { path, .. }
            | Error::CopyRequired { path }
            | Error::DepthExceeded { path, .. } => Some(path),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Early return with a formatted `Error::Msg`.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
