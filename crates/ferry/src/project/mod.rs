// Projection - host TaggedValue -> engine NativeValue
//
// A projection walks one root value depth-first against its schema:
//
//   tensor    -> pin + view (or copy), then element type / dims checks
//   sequence  -> project every element in order, then assemble a native
//                sequence over the element handles
//   map       -> Unimplemented
//   other     -> InvalidElementKind
//
// The recursion only ever registers resources. The outermost call owns the
// ledger and makes the all-or-nothing decision: on success the ledger goes to
// the caller with the root value, on any error it is released before the
// error is returned.

mod sequence;
mod tensor;
pub mod validate;

use ferry_core::{Engine, Error, NativeValue, Payload, Result, SchemaNode, TaggedValue};

use crate::config::ProjectionConfig;
use crate::ledger::ResourceLedger;

pub(crate) const UNNAMED: &str = "<unnamed>";

/// Path of the root value in error messages.
pub(crate) fn root_path(value: &TaggedValue) -> String {
    value.name().unwrap_or(UNNAMED).to_string()
}

/// Path of element `index` below `path`.
pub(crate) fn element_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}

/// A successfully projected value and the resources backing it.
///
/// The caller must keep the projection (or at least its ledger) alive for as
/// long as the engine uses the root value, then release it. Dropping the
/// projection releases as well.
#[derive(Debug)]
pub struct Projection<E: Engine> {
    name: Option<String>,
    root: NativeValue,
    ledger: ResourceLedger<E>,
}

impl<E: Engine> Projection<E> {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The single native value standing for the whole host value.
    pub fn root(&self) -> NativeValue {
        self.root
    }

    pub fn ledger(&self) -> &ResourceLedger<E> {
        &self.ledger
    }

    pub fn into_parts(self) -> (NativeValue, ResourceLedger<E>) {
        (self.root, self.ledger)
    }

    /// Release every resource behind the root value.
    pub fn release(mut self) {
        self.ledger.release_all();
    }
}

/// Projects host values into native values of one engine.
#[derive(Debug, Clone)]
pub struct Projector<E: Engine> {
    engine: E,
    config: ProjectionConfig,
}

impl<E: Engine> Projector<E> {
    pub fn new(engine: E) -> Self {
        Projector {
            engine,
            config: ProjectionConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ProjectionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    /// Project `value` against `schema`.
    ///
    /// On error, every resource created before the failure has already been
    /// released; the caller has nothing to clean up.
    pub fn project(&self, value: &TaggedValue, schema: &SchemaNode) -> Result<Projection<E>> {
        let path = root_path(value);
        tracing::debug!(name = %path, %schema, "projecting value");

        let mut ledger = ResourceLedger::with_capacity(self.engine.clone(), 32);
        let projected = validate::check_kind(value, schema, &path)
            .and_then(|()| self.project_value(value, schema, &path, 1, &mut ledger));

        match projected {
            Ok(root) => {
                tracing::debug!(name = %path, %root, resources = ledger.len(), "projected value");
                Ok(Projection {
                    name: value.name().map(str::to_string),
                    root,
                    ledger,
                })
            }
            Err(error) => {
                tracing::warn!(
                    name = %path,
                    %error,
                    resources = ledger.len(),
                    "projection failed, releasing resources"
                );
                ledger.release_all();
                Err(error)
            }
        }
    }

    /// Run every check projection would run, without creating resources.
    pub fn validate(&self, value: &TaggedValue, schema: &SchemaNode) -> Result<()> {
        validate::validate_with(value, schema, &self.config)
    }

    /// Dispatch on the value's payload. The caller has already checked that
    /// the value kind matches `schema`.
    pub(crate) fn project_value(
        &self,
        value: &TaggedValue,
        schema: &SchemaNode,
        path: &str,
        depth: usize,
        ledger: &mut ResourceLedger<E>,
    ) -> Result<NativeValue> {
        if depth > self.config.max_depth {
            return Err(Error::DepthExceeded {
                path: path.to_string(),
                max_depth: self.config.max_depth,
            });
        }
        match (value.payload(), schema) {
            (Payload::Tensor(buffer), SchemaNode::Tensor(tensor_schema)) => {
                self.project_tensor(buffer, tensor_schema, path, ledger)
            }
            (Payload::Sequence(elements), SchemaNode::Sequence(element_schema)) => self
                .project_sequence(elements.as_deref(), element_schema, path, depth, ledger),
            (Payload::Map(_), _) | (_, SchemaNode::Map { .. }) => Err(Error::Unimplemented {
                path: path.to_string(),
                what: "map projection".to_string(),
            }),
            (Payload::Other(kind), _) => Err(Error::InvalidElementKind {
                path: path.to_string(),
                kind: (*kind).into(),
            }),
            (_, schema) => Err(Error::KindMismatch {
                path: path.to_string(),
                expected: schema.kind(),
                actual: value.kind(),
            }),
        }
    }
}

/// Project `value` against `schema` with the default configuration.
pub fn project<E: Engine>(
    engine: &E,
    value: &TaggedValue,
    schema: &SchemaNode,
) -> Result<Projection<E>> {
    Projector::new(engine.clone()).project(value, schema)
}
