use foxvm_classfile::access::*;
use foxvm_link::access::{can_access_class, can_access_field, can_access_method};
use foxvm_link::lookup::{
    field_lookup, is_subtype_of, is_superclass_of, method_lookup, overrides, supertypes,
};
use foxvm_link::{ClassRecord, OBJECT_CLASS};
use pretty_assertions::assert_eq;

use super::support::{graph_with, link_all, method};

#[test]
fn supertypes_are_depth_first_superclass_first() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("t/I0").interface().build(),
        ClassRecord::builder("t/I1").interface().implements("t/I0").build(),
        ClassRecord::builder("t/I2").interface().build(),
        ClassRecord::builder("t/Base").implements("t/I2").build(),
        ClassRecord::builder("t/Leaf")
            .extends("t/Base")
            .implements("t/I1")
            .implements("t/I2")
            .build(),
    ]);
    link_all(&mut graph).unwrap();

    let names: Vec<&str> = supertypes(&graph, ids[4])
        .into_iter()
        .map(|id| graph.name(id))
        .collect();
    assert_eq!(names, ["t/Base", OBJECT_CLASS, "t/I2", "t/I1", "t/I0"]);

    assert!(is_subtype_of(&graph, ids[4], ids[0]));
    assert!(is_subtype_of(&graph, ids[4], ids[4]));
    assert!(!is_subtype_of(&graph, ids[3], ids[1]));
    assert!(is_superclass_of(&graph, ids[3], ids[4]));
    assert!(!is_superclass_of(&graph, ids[2], ids[4]), "interfaces are not superclasses");
    assert!(!is_superclass_of(&graph, ids[4], ids[4]));
}

#[test]
fn field_lookup_prefers_interfaces_over_the_superclass() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("f/Constants")
            .interface()
            .field(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "X", "I")
            .build(),
        ClassRecord::builder("f/Base").field(ACC_PUBLIC, "X", "I").build(),
        ClassRecord::builder("f/Impl")
            .extends("f/Base")
            .implements("f/Constants")
            .build(),
    ]);
    link_all(&mut graph).unwrap();

    let found = field_lookup(&graph, ids[2], "X", "I").unwrap().unwrap();
    assert_eq!(found.class, ids[0]);
    assert_eq!(field_lookup(&graph, ids[1], "X", "I").unwrap().unwrap().class, ids[1]);
    assert_eq!(field_lookup(&graph, ids[2], "X", "J").unwrap(), None);
}

#[test]
fn method_lookup_walks_superclasses_then_superinterfaces() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("m/Greeter")
            .interface()
            .method(ACC_PUBLIC, "greet", "()V")
            .method(ACC_PUBLIC | ACC_STATIC, "create", "()Lm/Greeter;")
            .build(),
        ClassRecord::builder("m/Base")
            .method(ACC_PUBLIC | ACC_STATIC, "util", "()V")
            .method(ACC_PROTECTED, "hook", "()V")
            .build(),
        ClassRecord::builder("m/Impl")
            .extends("m/Base")
            .implements("m/Greeter")
            .build(),
    ]);
    link_all(&mut graph).unwrap();
    let (greeter, base, impl_) = (ids[0], ids[1], ids[2]);

    assert_eq!(
        method_lookup(&graph, impl_, "hook", "()V"),
        Some(method(&graph, base, "hook", "()V"))
    );
    assert_eq!(
        method_lookup(&graph, impl_, "util", "()V"),
        Some(method(&graph, base, "util", "()V"))
    );
    assert_eq!(
        method_lookup(&graph, impl_, "greet", "()V"),
        Some(method(&graph, greeter, "greet", "()V"))
    );
    assert_eq!(method_lookup(&graph, impl_, "create", "()Lm/Greeter;"), None);
    assert_eq!(method_lookup(&graph, impl_, "missing", "()V"), None);
}

#[test]
fn interface_method_lookup_falls_back_to_public_root_methods() {
    let (mut graph, ids) = graph_with(vec![ClassRecord::builder("m/Shape")
        .interface()
        .method(ACC_PUBLIC | ACC_ABSTRACT, "area", "()D")
        .build()]);
    link_all(&mut graph).unwrap();
    let object = graph.lookup(OBJECT_CLASS).unwrap();

    assert_eq!(
        method_lookup(&graph, ids[0], "area", "()D"),
        Some(method(&graph, ids[0], "area", "()D"))
    );
    assert_eq!(
        method_lookup(&graph, ids[0], "hashCode", "()I"),
        Some(method(&graph, object, "hashCode", "()I"))
    );
    assert_eq!(
        method_lookup(&graph, ids[0], "clone", "()Ljava/lang/Object;"),
        None,
        "protected root methods are not interface members"
    );
}

#[test]
fn overrides_basic_rules() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("o/Parent")
            .method(ACC_PUBLIC, "pub", "()V")
            .method(ACC_PRIVATE, "priv", "()V")
            .method(ACC_STATIC, "stat", "()V")
            .method(0, "pkg", "()V")
            .build(),
        ClassRecord::builder("o/Child")
            .extends("o/Parent")
            .method(ACC_PUBLIC, "pub", "()V")
            .method(ACC_PUBLIC, "priv", "()V")
            .method(ACC_STATIC, "stat", "()V")
            .method(ACC_PUBLIC, "pkg", "()V")
            .build(),
        ClassRecord::builder("x/Stranger")
            .extends("o/Child")
            .method(ACC_PRIVATE, "pub", "()V")
            .build(),
    ]);
    link_all(&mut graph).unwrap();
    let (parent, child, stranger) = (ids[0], ids[1], ids[2]);
    let m = |class, name: &str| method(&graph, class, name, "()V");

    assert!(overrides(&graph, m(parent, "pub"), m(parent, "pub")));
    assert!(overrides(&graph, m(child, "pub"), m(parent, "pub")));
    assert!(!overrides(&graph, m(parent, "pub"), m(child, "pub")));
    assert!(!overrides(&graph, m(child, "priv"), m(parent, "priv")));
    assert!(!overrides(&graph, m(child, "stat"), m(parent, "stat")));
    assert!(!overrides(&graph, m(parent, "stat"), m(parent, "stat")));
    assert!(overrides(&graph, m(child, "pkg"), m(parent, "pkg")));
    assert!(!overrides(&graph, m(stranger, "pub"), m(child, "pub")));
}

fn widening_chain(widen: bool) -> Vec<ClassRecord> {
    let mut middle = ClassRecord::builder("p/B").extends("p/A");
    if widen {
        middle = middle.method(ACC_PUBLIC, "m", "()V");
    }
    vec![
        ClassRecord::builder("p/A").method(0, "m", "()V").build(),
        middle.build(),
        ClassRecord::builder("q/C")
            .extends("p/B")
            .method(ACC_PUBLIC, "m", "()V")
            .build(),
    ]
}

#[test]
fn overrides_through_an_access_widening_intermediate() {
    let (mut graph, ids) = graph_with(widening_chain(true));
    link_all(&mut graph).unwrap();
    let (a, b, c) = (ids[0], ids[1], ids[2]);
    let m = |class| method(&graph, class, "m", "()V");

    assert!(overrides(&graph, m(c), m(b)));
    assert!(overrides(&graph, m(b), m(a)));
    assert!(overrides(&graph, m(c), m(a)));

    // One slot for `m` all the way down.
    let a_len = graph.class(a).vtable.len();
    assert_eq!(graph.class(c).vtable.len(), a_len);
    assert_eq!(graph.class(c).vtable[a_len - 1], m(c));
}

#[test]
fn package_private_methods_are_not_overridden_across_packages() {
    let (mut graph, ids) = graph_with(widening_chain(false));
    link_all(&mut graph).unwrap();
    let (a, c) = (ids[0], ids[2]);
    let m = |class| method(&graph, class, "m", "()V");

    assert!(!overrides(&graph, m(c), m(a)));
    let a_len = graph.class(a).vtable.len();
    assert_eq!(graph.class(c).vtable.len(), a_len + 1);
    assert_eq!(graph.class(c).vtable[a_len - 1], m(a));
}

#[test]
fn member_access_rules() {
    let (mut graph, ids) = graph_with(vec![
        ClassRecord::builder("a/Owner")
            .field(ACC_PUBLIC, "open", "I")
            .field(ACC_PROTECTED, "prot", "I")
            .field(0, "pkg", "I")
            .field(ACC_PRIVATE, "own", "I")
            .method(ACC_PROTECTED, "hook", "()V")
            .build(),
        ClassRecord::builder("a/Neighbour").build(),
        ClassRecord::builder("b/Heir").extends("a/Owner").build(),
        ClassRecord::builder("b/Outsider").build(),
        ClassRecord::builder("a/Secret").access(ACC_SUPER).build(),
    ]);
    link_all(&mut graph).unwrap();
    let (owner, neighbour, heir, outsider, secret) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
    let field = |name: &str| graph.class(owner).find_field(name, "I").unwrap();

    for requester in [owner, neighbour, heir, outsider] {
        assert!(can_access_field(&graph, requester, field("open")));
    }
    assert!(can_access_field(&graph, heir, field("prot")));
    assert!(can_access_field(&graph, neighbour, field("prot")));
    assert!(!can_access_field(&graph, outsider, field("prot")));
    assert!(can_access_field(&graph, neighbour, field("pkg")));
    assert!(!can_access_field(&graph, heir, field("pkg")));
    assert!(can_access_field(&graph, owner, field("own")));
    assert!(!can_access_field(&graph, neighbour, field("own")));

    let hook = method(&graph, owner, "hook", "()V");
    assert!(can_access_method(&graph, heir, hook));
    assert!(!can_access_method(&graph, outsider, hook));

    assert!(can_access_class(&graph, neighbour, secret));
    assert!(!can_access_class(&graph, outsider, secret));
}
