// Tensor projection - the base case
//
// One tensor becomes exactly one native value, plus one pin when the buffer
// is viewed in place:
//
//   view-eligible   pin storage, create view, register value then pin
//   otherwise       copy into engine memory, register value
//
// The schema is consulted only after registration. A mismatch therefore
// leaves the value (and pin) in the ledger, and the outermost frame releases
// them along with everything else.

use ferry_core::{DimsMismatch, Engine, Error, NativeValue, Result, TensorBuffer, TensorSchema};

use super::Projector;
use crate::config::ProjectionConfig;
use crate::ledger::ResourceLedger;

/// Checks that must pass before any resource is created for `buffer`.
pub(super) fn check_projectable(
    buffer: &TensorBuffer,
    path: &str,
    config: &ProjectionConfig,
) -> Result<()> {
    let element_type = buffer.element_type();
    if !element_type.is_supported() {
        return Err(Error::UnsupportedElementType {
            path: path.to_string(),
            element_type,
        });
    }
    if !buffer.is_view_eligible() && !config.allow_copy {
        return Err(Error::CopyRequired {
            path: path.to_string(),
        });
    }
    Ok(())
}

/// Compare the buffer's discovered element type, then its shape, with the
/// schema.
pub(super) fn check_against_schema(
    buffer: &TensorBuffer,
    schema: &TensorSchema,
    path: &str,
    config: &ProjectionConfig,
) -> Result<()> {
    let discovered = buffer.element_type();
    if discovered != schema.element_type {
        return Err(Error::ElementTypeMismatch {
            path: path.to_string(),
            expected: schema.element_type,
            discovered,
        });
    }
    if !config.check_shapes {
        return Ok(());
    }
    schema
        .check_dims(buffer.shape())
        .map_err(|mismatch| match mismatch {
            DimsMismatch::Rank { expected, actual } => Error::RankMismatch {
                path: path.to_string(),
                expected,
                actual,
            },
            DimsMismatch::Dim {
                dim,
                expected,
                actual,
            } => Error::DimMismatch {
                path: path.to_string(),
                dim,
                expected,
                actual,
            },
        })
}

impl<E: Engine> Projector<E> {
    pub(super) fn project_tensor(
        &self,
        buffer: &TensorBuffer,
        schema: &TensorSchema,
        path: &str,
        ledger: &mut ResourceLedger<E>,
    ) -> Result<NativeValue> {
        check_projectable(buffer, path, &self.config)?;

        let value = if buffer.is_view_eligible() {
            let pin = self.engine.pin_memory(buffer)?;
            match self.engine.create_tensor_view(buffer) {
                Ok(value) => {
                    ledger.register_value(value);
                    ledger.register_pin(pin);
                    value
                }
                Err(error) => {
                    ledger.register_pin(pin);
                    return Err(error.into());
                }
            }
        } else {
            tracing::trace!(path, shape = %buffer.shape(), "layout not view-eligible, copying");
            let value = self.engine.create_tensor_copy(buffer)?;
            ledger.register_value(value);
            value
        };

        check_against_schema(buffer, schema, path, &self.config)?;
        Ok(value)
    }
}
