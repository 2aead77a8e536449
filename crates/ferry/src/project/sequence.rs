// Sequence projection - the recursive case
//
// Elements are projected strictly in order. Each one is kind-checked against
// the single element schema before anything is created for it, so a failure at
// index k leaves resources for indices 0..k in the ledger and nothing for k or
// later. The native sequence is assembled last and references the element
// handles without owning them.

use ferry_core::{Engine, Error, NativeValue, Result, SchemaNode, TaggedValue};

use super::validate::check_element_kind;
use super::{element_path, Projector};
use crate::ledger::ResourceLedger;

impl<E: Engine> Projector<E> {
    pub(super) fn project_sequence(
        &self,
        elements: Option<&[TaggedValue]>,
        element_schema: &SchemaNode,
        path: &str,
        depth: usize,
        ledger: &mut ResourceLedger<E>,
    ) -> Result<NativeValue> {
        let Some(elements) = elements else {
            return Err(Error::MissingElements {
                path: path.to_string(),
            });
        };

        let mut handles = Vec::with_capacity(elements.len());
        for (index, element) in elements.iter().enumerate() {
            check_element_kind(element, element_schema, path, index)?;
            let child = element_path(path, index);
            handles.push(self.project_value(element, element_schema, &child, depth + 1, ledger)?);
        }

        let sequence = self.engine.create_sequence(&handles)?;
        ledger.register_value(sequence);
        tracing::trace!(path, len = handles.len(), %sequence, "assembled sequence");
        Ok(sequence)
    }
}
