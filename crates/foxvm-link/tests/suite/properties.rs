use std::collections::HashSet;

use foxvm_classfile::access::*;
use foxvm_link::lookup::overrides;
use foxvm_link::{ClassGraph, ClassId, ClassRecord, LinkError, MethodRef, PreResolvedField};
use proptest::prelude::*;

use super::support::{graph_with, link};

const FIELD_DESCRIPTORS: &[&str] = &[
    "D", "J", "I", "F", "S", "C", "Z", "B", "Ljava/lang/Object;", "[I",
];
const METHOD_DESCRIPTORS: &[&str] = &["()V", "(I)V"];
const METHOD_ACCESS: &[u16] = &[ACC_PUBLIC, ACC_PROTECTED, 0, ACC_PRIVATE];

#[derive(Debug, Clone)]
struct ClassShape {
    second_package: bool,
    fields: Vec<(bool, usize)>,
    methods: Vec<(usize, usize, usize, bool)>,
}

fn class_shape() -> impl Strategy<Value = ClassShape> {
    (
        any::<bool>(),
        prop::collection::vec((any::<bool>(), 0..FIELD_DESCRIPTORS.len()), 0..8),
        prop::collection::vec(
            (
                0..3usize,
                0..METHOD_DESCRIPTORS.len(),
                0..METHOD_ACCESS.len(),
                any::<bool>(),
            ),
            0..5,
        ),
    )
        .prop_map(|(second_package, fields, methods)| ClassShape {
            second_package,
            fields,
            methods,
        })
}

/// A single-inheritance chain `C0 <- C1 <- ...`, alternating packages at random.
fn chain_records(chain: &[ClassShape]) -> Vec<ClassRecord> {
    let names: Vec<String> = chain
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            let package = if shape.second_package { "q" } else { "p" };
            format!("{package}/C{i}")
        })
        .collect();

    chain
        .iter()
        .enumerate()
        .map(|(i, shape)| {
            let mut builder = ClassRecord::builder(&names[i]);
            if i > 0 {
                builder = builder.extends(&names[i - 1]);
            }
            for (j, &(is_static, desc)) in shape.fields.iter().enumerate() {
                let flags = if is_static { ACC_STATIC } else { 0 };
                builder = builder.field(flags, &format!("f{j}"), FIELD_DESCRIPTORS[desc]);
            }
            let mut seen = HashSet::new();
            for &(name, desc, access, is_static) in &shape.methods {
                if !seen.insert((name, desc)) {
                    continue;
                }
                let flags = METHOD_ACCESS[access] | if is_static { ACC_STATIC } else { 0 };
                builder = builder.method(flags, &format!("m{name}"), METHOD_DESCRIPTORS[desc]);
            }
            builder.build()
        })
        .collect()
}

fn own_fields(class: ClassId, fields: &[PreResolvedField]) -> Vec<&PreResolvedField> {
    fields.iter().filter(|f| f.field.class == class).collect()
}

fn assert_bucket_order(fields: &[&PreResolvedField]) -> Result<(), TestCaseError> {
    for pair in fields.windows(2) {
        prop_assert!(pair[0].category <= pair[1].category);
        if pair[0].category == pair[1].category {
            prop_assert!(pair[0].field.index < pair[1].field.index, "declaration order kept");
        }
    }
    Ok(())
}

fn declared_virtual_methods(graph: &ClassGraph, ids: &[ClassId]) -> Vec<MethodRef> {
    ids.iter()
        .flat_map(|&id| {
            let info = graph.class(id);
            info.methods
                .iter()
                .enumerate()
                .filter(|(_, m)| !m.is_static())
                .map(move |(i, _)| info.method_ref(i))
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn linked_chains_keep_layout_and_vtable_invariants(
        chain in prop::collection::vec(class_shape(), 1..6)
    ) {
        let (mut graph, ids) = graph_with(chain_records(&chain));
        let leaf = *ids.last().unwrap();
        match link(&mut graph, leaf) {
            Ok(()) => {}
            // Split-package overrides can legitimately be ambiguous.
            Err(LinkError::AmbiguousOverride { .. }) => return Ok(()),
            Err(err) => return Err(TestCaseError::fail(format!("linking failed: {err}"))),
        }

        for (i, &id) in ids.iter().enumerate() {
            let info = graph.class(id);
            assert_bucket_order(&own_fields(id, &info.static_fields))?;
            assert_bucket_order(&own_fields(id, &info.instance_fields))?;
            prop_assert!(info.static_fields.iter().all(|f| f.field.class == id));

            let parent = match i {
                0 => graph.class(info.super_class.unwrap()),
                _ => graph.class(ids[i - 1]),
            };
            prop_assert!(info.instance_fields.starts_with(&parent.instance_fields));

            prop_assert!(info.vtable.len() >= parent.vtable.len());
            for (slot, (&child, &inherited)) in info.vtable.iter().zip(&parent.vtable).enumerate() {
                prop_assert!(
                    child == inherited || overrides(&graph, child, inherited),
                    "slot {} of {} breaks index stability", slot, info.name
                );
            }
            for (a, &x) in info.vtable.iter().enumerate() {
                for &y in &info.vtable[a + 1..] {
                    prop_assert!(!overrides(&graph, x, y) && !overrides(&graph, y, x));
                }
            }
        }

        let methods = declared_virtual_methods(&graph, &ids);
        for &a in &methods {
            prop_assert!(overrides(&graph, a, a));
            for &b in &methods {
                if overrides(&graph, a, b) && overrides(&graph, b, a) {
                    prop_assert_eq!(a, b);
                }
            }
        }

        let snapshot = graph.class(leaf).clone();
        link(&mut graph, leaf).unwrap();
        prop_assert_eq!(graph.class(leaf), &snapshot);
    }
}
