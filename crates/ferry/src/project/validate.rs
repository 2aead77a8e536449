//! Kind checks shared by the projectors, and a resource-free dry run.
//!
//! Tensor element types are not validated up front from the schema: the
//! buffer's own element type is authoritative and is compared after the native
//! value exists (see the tensor projector). The dry run below applies the same
//! checks in the same order, so a value that validates will project unless the
//! engine itself fails.

use ferry_core::{Error, Payload, Result, SchemaNode, TaggedValue};

use super::{element_path, root_path, tensor};
use crate::config::ProjectionConfig;

/// Fail with `KindMismatch` unless `value` has the kind `schema` describes.
pub fn check_kind(value: &TaggedValue, schema: &SchemaNode, path: &str) -> Result<()> {
    if value.kind() != schema.kind() {
        return Err(Error::KindMismatch {
            path: path.to_string(),
            expected: schema.kind(),
            actual: value.kind(),
        });
    }
    Ok(())
}

/// Fail with `ElementKindMismatch` unless element `index` of the sequence at
/// `path` has the kind of the element schema.
pub fn check_element_kind(
    element: &TaggedValue,
    element_schema: &SchemaNode,
    path: &str,
    index: usize,
) -> Result<()> {
    if element.kind() != element_schema.kind() {
        return Err(Error::ElementKindMismatch {
            path: path.to_string(),
            index,
            expected: element_schema.kind(),
            actual: element.kind(),
        });
    }
    Ok(())
}

/// Dry-run projection with the default configuration.
pub fn validate(value: &TaggedValue, schema: &SchemaNode) -> Result<()> {
    validate_with(value, schema, &ProjectionConfig::default())
}

/// Dry-run projection: every check, no engine calls. Stops at the first
/// failure.
pub fn validate_with(
    value: &TaggedValue,
    schema: &SchemaNode,
    config: &ProjectionConfig,
) -> Result<()> {
    let path = root_path(value);
    check_kind(value, schema, &path)?;
    validate_value(value, schema, &path, 1, config)
}

fn validate_value(
    value: &TaggedValue,
    schema: &SchemaNode,
    path: &str,
    depth: usize,
    config: &ProjectionConfig,
) -> Result<()> {
    if depth > config.max_depth {
        return Err(Error::DepthExceeded {
            path: path.to_string(),
            max_depth: config.max_depth,
        });
    }
    match (value.payload(), schema) {
        (Payload::Tensor(buffer), SchemaNode::Tensor(tensor_schema)) => {
            tensor::check_projectable(buffer, path, config)?;
            tensor::check_against_schema(buffer, tensor_schema, path, config)
        }
        (Payload::Sequence(None), SchemaNode::Sequence(_)) => Err(Error::MissingElements {
            path: path.to_string(),
        }),
        (Payload::Sequence(Some(elements)), SchemaNode::Sequence(element_schema)) => {
            for (index, element) in elements.iter().enumerate() {
                check_element_kind(element, element_schema, path, index)?;
                let child = element_path(path, index);
                validate_value(element, element_schema, &child, depth + 1, config)?;
            }
            Ok(())
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::{ElementType, TensorBuffer, ValueKind};

    fn f32_tensor() -> TaggedValue {
        TaggedValue::anonymous_tensor(TensorBuffer::from_vec(vec![0.0f32; 4], (2, 2)).unwrap())
    }

    #[test]
    fn test_kind_mismatch_at_root() {
        let value = TaggedValue::sequence("ys", vec![]);
        let err = validate(&value, &SchemaNode::tensor(ElementType::F32)).unwrap_err();
        assert!(matches!(
            err,
            Error::KindMismatch {
                expected: ValueKind::Tensor,
                actual: ValueKind::Sequence,
                ..
            }
        ));
    }

    #[test]
    fn test_first_offending_element_wins() {
        let value = TaggedValue::sequence(
            "ys",
            vec![
                f32_tensor(),
                TaggedValue::anonymous_sequence(vec![]),
                TaggedValue::anonymous_sequence(vec![]),
            ],
        );
        let schema = SchemaNode::sequence_of(SchemaNode::tensor(ElementType::F32));
        match validate(&value, &schema).unwrap_err() {
            Error::ElementKindMismatch {
                path,
                index,
                expected,
                actual,
            } => {
                assert_eq!(path, "ys");
                assert_eq!(index, 1);
                assert_eq!(expected, ValueKind::Tensor);
                assert_eq!(actual, ValueKind::Sequence);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_type_mismatch_path() {
        let value = TaggedValue::sequence(
            "ys",
            vec![TaggedValue::anonymous_sequence(vec![f32_tensor(), f32_tensor()])],
        );
        let schema = SchemaNode::sequence_of(SchemaNode::sequence_of(SchemaNode::tensor(
            ElementType::I32,
        )));
        let err = validate(&value, &schema).unwrap_err();
        assert_eq!(err.path(), Some("ys[0][0]"));
        assert!(matches!(err, Error::ElementTypeMismatch { .. }));
    }

    #[test]
    fn test_map_is_unimplemented() {
        let keys = TensorBuffer::from_vec(vec![1i64], 1).unwrap();
        let value = TaggedValue::map("m", keys, f32_tensor());
        let schema = SchemaNode::map_of(ElementType::I64, SchemaNode::tensor(ElementType::F32));
        assert!(matches!(
            validate(&value, &schema),
            Err(Error::Unimplemented { .. })
        ));
    }

    #[test]
    fn test_unreadable_sequence() {
        let value = TaggedValue::unreadable_sequence("ys");
        let schema = SchemaNode::sequence_of(SchemaNode::tensor(ElementType::F32));
        assert!(matches!(
            validate(&value, &schema),
            Err(Error::MissingElements { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        let value = TaggedValue::sequence(
            "ys",
            vec![TaggedValue::anonymous_sequence(vec![f32_tensor()])],
        );
        let schema = SchemaNode::sequence_of(SchemaNode::sequence_of(SchemaNode::tensor(
            ElementType::F32,
        )));
        let config = ProjectionConfig::default().max_depth(2);
        let err = validate_with(&value, &schema, &config).unwrap_err();
        assert!(matches!(err, Error::DepthExceeded { max_depth: 2, .. }));
        assert_eq!(err.path(), Some("ys[0][0]"));
        assert!(validate(&value, &schema).is_ok());
    }
}
