//! # ferry-core
//!
//! Value, schema, layout and engine types shared by the ferry crates.
//!
//! This crate provides:
//! - [`TaggedValue`]: host values tagged as tensor, sequence or map
//! - [`TensorBuffer`] / [`Layout`]: shared typed storage and its memory layout
//! - [`ElementType`]: the engine's tensor element table
//! - [`SchemaNode`]: expected kind, element type and dims per nesting level
//! - [`Engine`]: the engine operations projection is built on
//! - [`Error`]: the single error type of the workspace

pub mod buffer;
pub mod dtype;
pub mod engine;
pub mod error;
pub mod layout;
pub mod schema;
pub mod shape;
pub mod value;

pub use buffer::{TensorBuffer, TensorData};
pub use dtype::{ElementType, HostElement};
pub use engine::{Engine, NativeValue, PinHandle};
pub use error::{EngineError, Error, Result};
pub use layout::Layout;
pub use schema::{Dim, DimsMismatch, SchemaNode, TensorSchema};
pub use shape::Shape;
pub use value::{MapValue, OtherKind, Payload, TaggedValue, ValueKind};
