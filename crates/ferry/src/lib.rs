//! # ferry
//!
//! Projects nested host values (tensors, sequences of values) into an
//! inference engine's native value representation, and guarantees that every
//! native resource created along the way is released exactly once.
//!
//! ## Usage
//!
//! ```ignore
//! use ferry::prelude::*;
//! use ferry_host::HostEngine;
//!
//! let engine = HostEngine::new();
//! let x = TaggedValue::from_vec("x", vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3))?;
//! let projection = project(&engine, &x, &SchemaNode::tensor(ElementType::F32))?;
//! // hand projection.root() to the engine ...
//! projection.release();
//! ```
//!
//! ## Architecture
//!
//! | Crate | Purpose |
//! |-------|---------|
//! | `ferry-core` | TaggedValue, TensorBuffer, Layout, ElementType, SchemaNode, Engine trait, Error |
//! | `ferry-host` | In-process reference engine with handle accounting |
//! | `ferry` | Projection, resource ledger, configuration, multi-input projection |

pub use ferry_core::{
    Dim, ElementType, Engine, EngineError, Error, Layout, MapValue, NativeValue, OtherKind,
    Payload, PinHandle, Result, SchemaNode, Shape, TaggedValue, TensorBuffer, TensorData,
    TensorSchema, ValueKind,
};

pub mod config;
pub mod inputs;
pub mod ledger;
pub mod project;

pub use config::ProjectionConfig;
pub use inputs::{InputMetadata, MetadataProvider, ProjectedInputs};
pub use ledger::{Resource, ResourceLedger};
pub use project::validate::{validate, validate_with};
pub use project::{project, Projection, Projector};

/// Prelude: the types most callers need.
pub mod prelude {
    pub use crate::{
        project, validate, Dim, ElementType, Engine, Error, InputMetadata, MetadataProvider,
        NativeValue, ProjectedInputs, Projection, ProjectionConfig, Projector, ResourceLedger,
        Result, SchemaNode, TaggedValue, TensorBuffer,
    };
}
