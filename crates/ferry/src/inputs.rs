// Multi-input projection
//
// An inference call usually feeds several named inputs. Each input is looked
// up in the model's metadata and projected on its own; the per-input ledgers
// are merged into one so the call has a single thing to release afterwards.
// If any input fails, the inputs projected before it are released too: the
// caller gets either every input or nothing.

use std::collections::{HashMap, HashSet};

use ferry_core::{Engine, Error, NativeValue, Result, SchemaNode, TaggedValue};

use crate::ledger::ResourceLedger;
use crate::project::Projector;

/// Supplies the expected schema of each named model input.
pub trait MetadataProvider {
    fn schema(&self, input_name: &str) -> Option<&SchemaNode>;
}

impl MetadataProvider for HashMap<String, SchemaNode> {
    fn schema(&self, input_name: &str) -> Option<&SchemaNode> {
        self.get(input_name)
    }
}

/// Input metadata of a model, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputMetadata {
    inputs: Vec<(String, SchemaNode)>,
}

impl InputMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an input, replacing an earlier declaration of the same name.
    pub fn with_input(mut self, name: impl Into<String>, schema: SchemaNode) -> Self {
        self.insert(name, schema);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: SchemaNode) {
        let name = name.into();
        match self.inputs.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = schema,
            None => self.inputs.push((name, schema)),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl MetadataProvider for InputMetadata {
    fn schema(&self, input_name: &str) -> Option<&SchemaNode> {
        self.inputs
            .iter()
            .find(|(n, _)| n == input_name)
            .map(|(_, s)| s)
    }
}

/// Native values for a set of named inputs, backed by one ledger.
#[derive(Debug)]
pub struct ProjectedInputs<E: Engine> {
    inputs: Vec<(String, NativeValue)>,
    ledger: ResourceLedger<E>,
}

impl<E: Engine> ProjectedInputs<E> {
    /// Native value of the named input.
    pub fn get(&self, name: &str) -> Option<NativeValue> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// `(name, value)` pairs in the order the inputs were given.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NativeValue)> {
        self.inputs.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn ledger(&self) -> &ResourceLedger<E> {
        &self.ledger
    }

    pub fn into_parts(self) -> (Vec<(String, NativeValue)>, ResourceLedger<E>) {
        (self.inputs, self.ledger)
    }

    pub fn release(mut self) {
        self.ledger.release_all();
    }
}

impl<E: Engine> Projector<E> {
    /// Project several named root values, each against the schema `provider`
    /// declares for its name.
    pub fn project_inputs<P: MetadataProvider + ?Sized>(
        &self,
        values: &[TaggedValue],
        provider: &P,
    ) -> Result<ProjectedInputs<E>> {
        let mut ledger = ResourceLedger::new(self.engine().clone());
        let mut inputs = Vec::with_capacity(values.len());

        match self.project_each(values, provider, &mut inputs, &mut ledger) {
            Ok(()) => {
                tracing::debug!(
                    inputs = inputs.len(),
                    resources = ledger.len(),
                    "projected inputs"
                );
                Ok(ProjectedInputs { inputs, ledger })
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    projected = inputs.len(),
                    resources = ledger.len(),
                    "input projection failed, releasing earlier inputs"
                );
                ledger.release_all();
                Err(error)
            }
        }
    }

    fn project_each<P: MetadataProvider + ?Sized>(
        &self,
        values: &[TaggedValue],
        provider: &P,
        inputs: &mut Vec<(String, NativeValue)>,
        ledger: &mut ResourceLedger<E>,
    ) -> Result<()> {
        let mut seen = HashSet::with_capacity(values.len());
        for (position, value) in values.iter().enumerate() {
            let name = value.name().ok_or(Error::MissingName { position })?;
            if !seen.insert(name) {
                return Err(Error::DuplicateInput {
                    name: name.to_string(),
                });
            }
            let schema = provider.schema(name).ok_or_else(|| Error::UnknownInput {
                name: name.to_string(),
            })?;
            let (root, projected) = self.project(value, schema)?.into_parts();
            ledger.absorb(projected);
            inputs.push((name.to_string(), root));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::ElementType;

    #[test]
    fn test_metadata_insert_replaces() {
        let mut meta = InputMetadata::new()
            .with_input("x", SchemaNode::tensor(ElementType::F32))
            .with_input("y", SchemaNode::tensor(ElementType::I64));
        meta.insert("x", SchemaNode::tensor(ElementType::F64));
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(
            meta.schema("x"),
            Some(&SchemaNode::tensor(ElementType::F64))
        );
        assert!(meta.schema("z").is_none());
    }

    #[test]
    fn test_hashmap_provider() {
        let mut map = HashMap::new();
        map.insert("x".to_string(), SchemaNode::tensor(ElementType::Bool));
        assert_eq!(
            MetadataProvider::schema(&map, "x").map(|s| s.to_string()),
            Some("tensor<bool>".to_string())
        );
    }
}
