// Randomized leak checks
//
// Builds random nested schemas and values, corrupts some of them, and injects
// engine failures at random points. Whatever the outcome, once the projection
// is released (or has failed) the engine must hold no live value and no pin,
// and must never have seen a double release.

use ferry::prelude::*;
use ferry::{OtherKind, Payload, TensorData};
use ferry_host::HostEngine;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TYPES: [ElementType; 5] = [
    ElementType::F32,
    ElementType::I64,
    ElementType::U8,
    ElementType::Bool,
    ElementType::String,
];

fn random_schema(rng: &mut StdRng, depth: usize) -> SchemaNode {
    if depth >= 3 || rng.gen_bool(0.4) {
        SchemaNode::tensor(TYPES[rng.gen_range(0..TYPES.len())])
    } else {
        SchemaNode::sequence_of(random_schema(rng, depth + 1))
    }
}

fn random_buffer(rng: &mut StdRng, element_type: ElementType) -> TensorBuffer {
    let rows = rng.gen_range(0..3);
    let cols = rng.gen_range(1..4);
    let n = rows * cols;
    let buffer = match element_type {
        ElementType::F32 => TensorBuffer::from_vec(vec![0.25f32; n], (rows, cols)),
        ElementType::I64 => TensorBuffer::from_vec(vec![-3i64; n], (rows, cols)),
        ElementType::U8 => TensorBuffer::from_vec(vec![7u8; n], (rows, cols)),
        ElementType::Bool => TensorBuffer::from_vec(vec![true; n], (rows, cols)),
        ElementType::String => TensorBuffer::from_strings(vec!["s"; n], (rows, cols)),
        other => TensorBuffer::from_data(
            TensorData::Raw {
                element_type: other,
                bytes: vec![0; n * other.size_in_bytes().unwrap_or(1)],
            },
            (rows, cols),
        ),
    }
    .unwrap();
    if rng.gen_bool(0.3) {
        buffer.transpose(0, 1).unwrap()
    } else {
        buffer
    }
}

fn corrupt(rng: &mut StdRng) -> TaggedValue {
    match rng.gen_range(0..6) {
        0 => TaggedValue::anonymous_tensor(random_buffer(rng, ElementType::F32)),
        1 => TaggedValue::anonymous_tensor(random_buffer(rng, ElementType::I64)),
        2 => TaggedValue::anonymous_sequence(vec![]),
        3 => TaggedValue::new(None, Payload::Sequence(None)),
        4 => TaggedValue::other(None, OtherKind::Opaque),
        _ => TaggedValue::anonymous_tensor(random_buffer(rng, ElementType::Complex64)),
    }
}

fn random_value(rng: &mut StdRng, schema: &SchemaNode) -> TaggedValue {
    if rng.gen_bool(0.08) {
        return corrupt(rng);
    }
    match schema {
        SchemaNode::Tensor(t) => TaggedValue::anonymous_tensor(random_buffer(rng, t.element_type)),
        SchemaNode::Sequence(element) => {
            let len = rng.gen_range(0..4);
            TaggedValue::anonymous_sequence(
                (0..len).map(|_| random_value(rng, element)).collect(),
            )
        }
        _ => corrupt(rng),
    }
}

fn named(value: TaggedValue, name: &str) -> TaggedValue {
    TaggedValue::new(Some(name.to_string()), value.payload().clone())
}

#[test]
fn test_random_structures_never_leak() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut succeeded = 0;
    let mut failed = 0;

    for round in 0..400 {
        let schema = random_schema(&mut rng, 0);
        let value = named(random_value(&mut rng, &schema), "root");
        let engine = if rng.gen_bool(0.25) {
            HostEngine::fail_after(rng.gen_range(0..12))
        } else {
            HostEngine::new()
        };

        match project(&engine, &value, &schema) {
            Ok(projection) => {
                let stats = engine.stats();
                let created = (stats.values_created + stats.pins_created) as usize;
                assert_eq!(projection.ledger().len(), created, "round {round}");
                projection.release();
                succeeded += 1;
            }
            Err(_) => failed += 1,
        }

        let stats = engine.stats();
        assert!(stats.is_clean(), "round {round}: {stats:?}");
        assert_eq!(stats.invalid_releases, 0, "round {round}: {stats:?}");
    }
    // the generator has to exercise both outcomes to mean anything
    assert!(succeeded > 0);
    assert!(failed > 0);
}

#[test]
fn test_random_inputs_are_all_or_nothing() {
    let mut rng = StdRng::seed_from_u64(42);

    for round in 0..100 {
        let count = rng.gen_range(1..4);
        let mut metadata = InputMetadata::new();
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let name = format!("in{i}");
            let schema = random_schema(&mut rng, 1);
            values.push(named(random_value(&mut rng, &schema), &name));
            metadata.insert(name, schema);
        }

        let engine = HostEngine::new();
        let projector = Projector::new(engine.clone());
        if let Ok(inputs) = projector.project_inputs(&values, &metadata) {
            assert_eq!(inputs.len(), count, "round {round}");
            inputs.release();
        }
        let stats = engine.stats();
        assert!(stats.is_clean(), "round {round}: {stats:?}");
        assert_eq!(stats.invalid_releases, 0);
    }
}
