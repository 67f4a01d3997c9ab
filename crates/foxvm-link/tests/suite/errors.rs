use foxvm_classfile::access::*;
use foxvm_link::{
    ClassGraph, ClassOrigin, ClassRecord, LinkError, LinkOptions, LinkState, Linker, MemberKind,
    OBJECT_CLASS,
};
use pretty_assertions::assert_eq;

use super::support::{graph_with, link};

fn link_last(records: Vec<ClassRecord>) -> Result<(), LinkError> {
    let (mut graph, ids) = graph_with(records);
    let last = *ids.last().unwrap();
    link(&mut graph, last)
}

#[test]
fn missing_superclass_is_unresolved() {
    let err = link_last(vec![ClassRecord::builder("a/A").extends("a/Missing").build()]).unwrap_err();
    assert_eq!(
        err,
        LinkError::UnresolvedDependency {
            class: "a/A".into(),
            dependency: "a/Missing".into(),
        }
    );
    assert_eq!(err.to_string(), "a/A: unable to find dependency class a/Missing");
}

#[test]
fn missing_interface_is_unresolved() {
    let err = link_last(vec![ClassRecord::builder("a/A").implements("a/Gone").build()]).unwrap_err();
    assert!(matches!(err, LinkError::UnresolvedDependency { dependency, .. } if dependency == "a/Gone"));
}

#[test]
fn only_the_root_may_lack_a_superclass() {
    let err = link_last(vec![ClassRecord::builder("a/Orphan").no_super().build()]).unwrap_err();
    assert!(matches!(err, LinkError::MalformedHierarchy { class, .. } if class == "a/Orphan"));

    let mut graph = ClassGraph::new();
    graph.add_class(ClassRecord::builder("a/Base").no_super().build(), ClassOrigin::Runtime);
    let root = graph.add_class(
        ClassRecord::builder(OBJECT_CLASS).extends("a/Base").build(),
        ClassOrigin::Runtime,
    );
    let err = link(&mut graph, root).unwrap_err();
    assert!(matches!(err, LinkError::MalformedHierarchy { class, .. } if class == OBJECT_CLASS));
}

#[test]
fn custom_root_class() {
    let mut graph = ClassGraph::new();
    let root = graph.add_class(
        ClassRecord::builder("rt/Root").no_super().method(ACC_PUBLIC, "hash", "()I").build(),
        ClassOrigin::Runtime,
    );
    let leaf = graph.add_class(
        ClassRecord::builder("app/Leaf").extends("rt/Root").build(),
        ClassOrigin::Application,
    );
    let options = LinkOptions {
        root_class: "rt/Root".into(),
        ..LinkOptions::default()
    };
    Linker::with_options(&mut graph, options).link(leaf).unwrap();
    assert_eq!(graph.class(leaf).super_class, Some(root));
    assert_eq!(graph.class(leaf).vtable.len(), 1);
}

#[test]
fn interfaces_must_extend_the_root() {
    let err = link_last(vec![
        ClassRecord::builder("a/Base").build(),
        ClassRecord::builder("a/I").interface().extends("a/Base").build(),
    ])
    .unwrap_err();
    assert!(matches!(err, LinkError::MalformedHierarchy { class, .. } if class == "a/I"));
}

#[test]
fn superclass_must_not_be_an_interface() {
    let err = link_last(vec![
        ClassRecord::builder("a/I").interface().build(),
        ClassRecord::builder("a/A").extends("a/I").build(),
    ])
    .unwrap_err();
    assert!(matches!(err, LinkError::IncompatibleHierarchy { class, .. } if class == "a/A"));
}

#[test]
fn superinterfaces_must_be_interfaces() {
    let err = link_last(vec![
        ClassRecord::builder("a/NotAnInterface").build(),
        ClassRecord::builder("a/A").implements("a/NotAnInterface").build(),
    ])
    .unwrap_err();
    assert!(matches!(err, LinkError::IncompatibleHierarchy { class, .. } if class == "a/A"));
}

#[test]
fn cycles_are_detected_and_rolled_back() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("a/A").extends("a/B").build(),
        ClassRecord::builder("a/B").extends("a/C").build(),
        ClassRecord::builder("a/C").extends("a/A").build(),
    ]);
    let err = link(&mut graph, ids[0]).unwrap_err();
    assert_eq!(err, LinkError::CircularInheritance { class: "a/A".into() });

    for &id in &ids {
        assert_eq!(graph.state(id), LinkState::Unlinked);
        assert!(graph.info(id).is_none());
    }
    // The cycle never reaches Object.
    let object = graph.lookup(OBJECT_CLASS).unwrap();
    assert_eq!(graph.state(object), LinkState::Unlinked);
}

#[test]
fn self_inheritance_is_circular() {
    let err = link_last(vec![ClassRecord::builder("a/Me").extends("a/Me").build()]).unwrap_err();
    assert_eq!(err, LinkError::CircularInheritance { class: "a/Me".into() });

    let err = link_last(vec![ClassRecord::builder("a/I").interface().implements("a/I").build()])
        .unwrap_err();
    assert_eq!(err, LinkError::CircularInheritance { class: "a/I".into() });
}

#[test]
fn failed_dependencies_do_not_poison_linked_ones() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("a/Good").build(),
        ClassRecord::builder("a/Bad").extends("a/Good").implements("a/Missing").build(),
    ]);
    assert!(link(&mut graph, ids[1]).is_err());
    assert_eq!(graph.state(ids[1]), LinkState::Unlinked);

    link(&mut graph, ids[0]).unwrap();
    assert_eq!(graph.state(ids[0]), LinkState::Linked);
}

#[test]
fn package_private_superclass_in_another_package_is_inaccessible() {
    let err = link_last(vec![
        ClassRecord::builder("p/Hidden").access(ACC_SUPER).build(),
        ClassRecord::builder("q/Sub").extends("p/Hidden").build(),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        LinkError::IllegalAccess {
            class: "q/Sub".into(),
            target: "class p/Hidden".into(),
        }
    );

    link_last(vec![
        ClassRecord::builder("p/Hidden").access(ACC_SUPER).build(),
        ClassRecord::builder("p/Sub").extends("p/Hidden").build(),
    ])
    .unwrap();
}

#[test]
fn package_private_interface_in_another_package_is_inaccessible() {
    let err = link_last(vec![
        ClassRecord::builder("p/I")
            .interface()
            .access(ACC_INTERFACE | ACC_ABSTRACT)
            .build(),
        ClassRecord::builder("q/Impl").implements("p/I").build(),
    ])
    .unwrap_err();
    assert!(matches!(err, LinkError::IllegalAccess { target, .. } if target == "interface p/I"));
}

#[test]
fn duplicate_members_are_rejected() {
    let err = link_last(vec![ClassRecord::builder("a/A")
        .field(0, "x", "I")
        .field(ACC_STATIC, "x", "I")
        .build()])
    .unwrap_err();
    assert_eq!(
        err,
        LinkError::DuplicateMember {
            class: "a/A".into(),
            kind: MemberKind::Field,
            member: "x:I".into(),
        }
    );

    // Same name, different descriptor is an overload, not a duplicate.
    link_last(vec![ClassRecord::builder("a/A")
        .method(ACC_PUBLIC, "m", "()V")
        .method(ACC_PUBLIC, "m", "(I)V")
        .build()])
    .unwrap();

    let err = link_last(vec![ClassRecord::builder("a/A")
        .method(ACC_PUBLIC, "m", "()V")
        .method(ACC_PRIVATE, "m", "()V")
        .build()])
    .unwrap_err();
    assert!(matches!(err, LinkError::DuplicateMember { kind: MemberKind::Method, member, .. } if member == "m()V"));
}

#[test]
fn interface_declaring_a_method_twice_is_rejected_before_its_implementor() {
    let err = link_last(vec![
        ClassRecord::builder("a/I")
            .access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
            .method(ACC_PUBLIC | ACC_ABSTRACT, "run", "()V")
            .method(ACC_PUBLIC | ACC_ABSTRACT, "run", "()V")
            .build(),
        ClassRecord::builder("a/Impl")
            .implements("a/I")
            .method(ACC_PUBLIC, "run", "()V")
            .build(),
    ])
    .unwrap_err();
    assert_eq!(
        err,
        LinkError::DuplicateMember {
            class: "a/I".into(),
            kind: MemberKind::Method,
            member: "run()V".into(),
        }
    );
}

#[test]
fn malformed_descriptors_are_format_errors() {
    let err = link_last(vec![ClassRecord::builder("a/A").field(0, "x", "Q").build()]).unwrap_err();
    assert!(matches!(err, LinkError::ClassFormat { class, .. } if class == "a/A"));

    let err = link_last(vec![ClassRecord::builder("a/A").method(0, "m", "(I").build()]).unwrap_err();
    assert!(matches!(err, LinkError::ClassFormat { .. }));
}

#[test]
fn concrete_class_must_implement_abstract_methods() {
    let records = vec![
        ClassRecord::builder("a/Shape")
            .access(ACC_PUBLIC | ACC_ABSTRACT)
            .method(ACC_PUBLIC | ACC_ABSTRACT, "area", "()D")
            .build(),
        ClassRecord::builder("a/Blob").extends("a/Shape").build(),
    ];
    let err = link_last(records.clone()).unwrap_err();
    assert!(
        matches!(&err, LinkError::AbstractMethod { class, reason } if class == "a/Blob" && reason.contains("a/Shape.area()D")),
        "{err}"
    );

    let mut fixed = records;
    fixed.push(
        ClassRecord::builder("a/Square")
            .extends("a/Shape")
            .method(ACC_PUBLIC, "area", "()D")
            .build(),
    );
    link_last(fixed).unwrap();
}

#[test]
fn unimplemented_interface_method_is_abstract() {
    let err = link_last(vec![
        ClassRecord::builder("a/Runnable")
            .interface()
            .method(ACC_PUBLIC | ACC_ABSTRACT, "run", "()V")
            .build(),
        ClassRecord::builder("a/Task").implements("a/Runnable").build(),
    ])
    .unwrap_err();
    assert!(matches!(err, LinkError::AbstractMethod { class, .. } if class == "a/Task"));
}

/// `p/A.m` is package-private; `q/B.m` cannot see it and opens a second slot. `p/C.m` then
/// overrides both.
fn split_package_override() -> Vec<ClassRecord> {
    vec![
        ClassRecord::builder("p/A").method(0, "m", "()V").build(),
        ClassRecord::builder("q/B")
            .extends("p/A")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
        ClassRecord::builder("p/C")
            .extends("q/B")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
    ]
}

#[test]
fn method_overriding_two_slots_is_ambiguous() {
    let (mut graph, ids) = graph_with(split_package_override());
    link(&mut graph, ids[1]).unwrap();
    let b = graph.class(ids[1]);
    assert_eq!(b.vtable.len(), graph.class(ids[0]).vtable.len() + 1);

    let err = link(&mut graph, ids[2]).unwrap_err();
    assert!(
        matches!(&err, LinkError::AmbiguousOverride { class, method, slots }
            if class == "p/C" && method == "p/C.m()V" && slots.contains("q/B.m()V")),
        "{err}"
    );
}

/// `S` picks up `I.m` (abstract) as a slot; `C` adds an unrelated default `K.m`, which is then
/// the single concrete candidate but does not override `I.m`.
fn unrelated_default_replacing_abstract_slot() -> Vec<ClassRecord> {
    vec![
        ClassRecord::builder("a/I")
            .interface()
            .method(ACC_PUBLIC | ACC_ABSTRACT, "m", "()V")
            .build(),
        ClassRecord::builder("a/K")
            .interface()
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
        ClassRecord::builder("a/S")
            .access(ACC_PUBLIC | ACC_ABSTRACT)
            .implements("a/I")
            .build(),
        ClassRecord::builder("a/C")
            .extends("a/S")
            .implements("a/K")
            .build(),
    ]
}

#[test]
fn vtable_verification_rejects_incompatible_slot_replacement() {
    let err = link_last(unrelated_default_replacing_abstract_slot()).unwrap_err();
    assert!(
        matches!(&err, LinkError::InconsistentVtable { class, .. } if class == "a/C"),
        "{err}"
    );
}

#[test]
fn vtable_verification_can_be_disabled() {
    let (mut graph, ids) = graph_with(unrelated_default_replacing_abstract_slot());
    let options = LinkOptions {
        verify_vtables: false,
        ..LinkOptions::default()
    };
    Linker::with_options(&mut graph, options).link(ids[3]).unwrap();

    let k_m = graph.class(ids[1]).find_method("m", "()V").unwrap();
    let s_slot = graph
        .class(ids[2])
        .vtable
        .iter()
        .position(|&m| graph.method(m).name == "m")
        .unwrap();
    assert_eq!(graph.class(ids[3]).vtable[s_slot], k_m);
}
