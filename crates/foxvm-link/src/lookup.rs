//! Resolution primitives over linked classes (JVMS 5.4.3 and 5.4.5).
//!
//! Every function here is pure: it reads [`ClassInfo`](crate::ClassInfo) records through the
//! graph and never links anything. Classes passed in must already be linked, or be the class
//! currently being linked (whose record is visible before its vtable is filled in); an unlinked
//! class panics as in [`ClassGraph::class`].

use std::collections::HashSet;

use crate::access::same_package;
use crate::error::{LinkError, MemberKind, Result};
use crate::graph::{ClassGraph, ClassId};
use crate::info::{FieldRef, MethodRef};

/// Every direct and indirect supertype of `class`, excluding `class` itself.
///
/// Depth-first: the superclass and its own supertypes come first, then each direct interface
/// in declaration order. A type reachable along several paths is listed once, at its first
/// visit.
pub fn supertypes(graph: &ClassGraph, class: ClassId) -> Vec<ClassId> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = Vec::new();
    push_direct_supertypes(graph, class, &mut stack);
    while let Some(next) = stack.pop() {
        if !seen.insert(next) {
            continue;
        }
        out.push(next);
        push_direct_supertypes(graph, next, &mut stack);
    }
    out
}

fn push_direct_supertypes(graph: &ClassGraph, class: ClassId, stack: &mut Vec<ClassId>) {
    let info = graph.class(class);
    stack.extend(info.interfaces.iter().rev().copied());
    stack.extend(info.super_class);
}

/// Interfaces among [`supertypes`], same order.
pub fn superinterfaces(graph: &ClassGraph, class: ClassId) -> Vec<ClassId> {
    supertypes(graph, class)
        .into_iter()
        .filter(|&t| graph.class(t).is_interface())
        .collect()
}

/// Reflexive subtype test along super and interface edges.
pub fn is_subtype_of(graph: &ClassGraph, sub: ClassId, sup: ClassId) -> bool {
    if sub == sup {
        return true;
    }
    let mut seen = HashSet::new();
    let mut stack = Vec::new();
    push_direct_supertypes(graph, sub, &mut stack);
    while let Some(next) = stack.pop() {
        if next == sup {
            return true;
        }
        if seen.insert(next) {
            push_direct_supertypes(graph, next, &mut stack);
        }
    }
    false
}

/// Whether `sup` is a strict superclass of `sub` (interfaces are not considered).
pub fn is_superclass_of(graph: &ClassGraph, sup: ClassId, sub: ClassId) -> bool {
    superclasses(graph, sub).any(|c| c == sup)
}

/// Superclass chain above `class`, nearest first.
pub(crate) fn superclasses(graph: &ClassGraph, class: ClassId) -> impl Iterator<Item = ClassId> + '_ {
    std::iter::successors(graph.class(class).super_class, move |&c| graph.class(c).super_class)
}

/// The field `class` itself declares with this name and descriptor.
pub fn find_declared_field(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Result<Option<FieldRef>> {
    let info = graph.class(class);
    let mut found = info
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.matches(name, descriptor))
        .map(|(i, _)| info.field_ref(i));
    let first = found.next();
    if found.next().is_some() {
        return Err(LinkError::DuplicateMember {
            class: info.name.clone(),
            kind: MemberKind::Field,
            member: format!("{name}:{descriptor}"),
        });
    }
    Ok(first)
}

/// The method `class` itself declares with this name and descriptor.
pub fn find_declared_method(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Option<MethodRef> {
    graph.class(class).find_method(name, descriptor)
}

/// Field lookup (JVMS 5.4.3.2): `class` itself, then each direct superinterface depth-first,
/// then the superclass. `Ok(None)` when nothing matches; the caller decides whether that is
/// fatal.
pub fn field_lookup(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Result<Option<FieldRef>> {
    let mut stack = vec![class];
    while let Some(next) = stack.pop() {
        if let Some(field) = find_declared_field(graph, next, name, descriptor)? {
            return Ok(Some(field));
        }
        // Interfaces are searched before the superclass.
        let info = graph.class(next);
        stack.extend(info.super_class);
        stack.extend(info.interfaces.iter().rev().copied());
    }
    Ok(None)
}

/// Method lookup (JVMS 5.4.3.3 / 5.4.3.4).
///
/// For an interface: its own declaration, else a public instance method of the root class.
/// For a class: the nearest declaration in the class or its superclasses, else the single
/// non-abstract maximally-specific superinterface method, else any non-private instance method
/// of a superinterface.
pub fn method_lookup(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Option<MethodRef> {
    let info = graph.class(class);
    if info.is_interface() {
        if let Some(m) = info.find_method(name, descriptor) {
            return Some(m);
        }
        // An interface's superclass is always the root class.
        let root = info.super_class?;
        return graph
            .class(root)
            .find_method(name, descriptor)
            .filter(|&m| {
                let m = graph.method(m);
                m.is_public() && !m.is_static()
            });
    }

    let declared = std::iter::once(class)
        .chain(superclasses(graph, class))
        .find_map(|c| graph.class(c).find_method(name, descriptor));
    if declared.is_some() {
        return declared;
    }

    superinterface_method(graph, class, name, descriptor)
}

/// Steps 3 and 4 of method resolution: the one non-abstract maximally-specific method if
/// there is exactly one, else the first non-private instance method of any superinterface.
pub(crate) fn superinterface_method(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Option<MethodRef> {
    let specific = find_maximally_specific_superinterface_methods(graph, class, name, descriptor);
    let mut concrete = specific.iter().filter(|&&m| !graph.method(m).is_abstract());
    if let (Some(&only), None) = (concrete.next(), concrete.next()) {
        return Some(only);
    }

    superinterfaces(graph, class).into_iter().find_map(|i| {
        graph
            .class(i)
            .find_method(name, descriptor)
            .filter(|&m| {
                let m = graph.method(m);
                !m.is_private() && !m.is_static()
            })
    })
}

/// All maximally-specific superinterface methods of `class` matching `name` and `descriptor`.
///
/// Candidates are the non-private instance methods declared by any superinterface; a candidate
/// is dropped when another candidate is declared in a subinterface of its declaring interface.
/// More than one result means the signature is ambiguous.
pub fn find_maximally_specific_superinterface_methods(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
) -> Vec<MethodRef> {
    let candidates: Vec<MethodRef> = superinterfaces(graph, class)
        .into_iter()
        .filter_map(|i| graph.class(i).find_method(name, descriptor))
        .filter(|&m| {
            let m = graph.method(m);
            !m.is_private() && !m.is_static()
        })
        .collect();

    candidates
        .iter()
        .copied()
        .filter(|m| {
            !candidates
                .iter()
                .any(|other| other.class != m.class && is_subtype_of(graph, other.class, m.class))
        })
        .collect()
}

/// Whether `child` overrides `parent` (JVMS 5.4.5). Reflexive.
pub fn overrides(graph: &ClassGraph, child: MethodRef, parent: MethodRef) -> bool {
    let (c, p) = (graph.method(child), graph.method(parent));
    if c.is_static() || p.is_static() {
        return false;
    }
    if child == parent {
        return true;
    }
    if c.name != p.name || c.descriptor != p.descriptor || c.is_private() {
        return false;
    }
    if !is_subtype_of(graph, child.class, parent.class) {
        return false;
    }
    if p.is_public() || p.is_protected() {
        return true;
    }
    if p.is_private() {
        return false;
    }
    if same_package(graph.name(child.class), graph.name(parent.class)) {
        return true;
    }

    // Package-private parent seen from another package: look for an intermediate declaration
    // that widens access, strictly between the two declaring classes.
    superclasses(graph, child.class)
        .filter(|&c| c != parent.class && is_subtype_of(graph, c, parent.class))
        .filter_map(|c| graph.class(c).find_method(&p.name, &p.descriptor))
        .filter(|&m| graph.method(m).is_virtual())
        .any(|m| overrides(graph, child, m) && overrides(graph, m, parent))
}

/// Target of an `invokespecial` (JVMS 6.5), `ACC_SUPER` semantics always on.
///
/// `owner` is the class named by the call site and `resolved` the method it resolved to.
pub fn invokespecial_target(
    graph: &ClassGraph,
    current: ClassId,
    owner: ClassId,
    resolved: MethodRef,
) -> Result<MethodRef> {
    let resolved_info = graph.method(resolved);
    let (name, descriptor) = (resolved_info.name.as_str(), resolved_info.descriptor.as_str());
    let owner_info = graph.class(owner);

    let lookup_class = match graph.class(current).super_class {
        Some(super_class)
            if !resolved_info.is_constructor
                && !owner_info.is_interface()
                && is_superclass_of(graph, owner, current) =>
        {
            super_class
        }
        _ => owner,
    };
    let lookup_info = graph.class(lookup_class);

    let instance_method = |c: ClassId| {
        graph
            .class(c)
            .find_method(name, descriptor)
            .filter(|&m| !graph.method(m).is_static())
    };
    let selected = if let Some(m) = instance_method(lookup_class) {
        Some(m)
    } else if !lookup_info.is_interface() {
        superclasses(graph, lookup_class).find_map(instance_method)
    } else {
        lookup_info.super_class.and_then(|root| {
            instance_method(root).filter(|&m| graph.method(m).is_public())
        })
    };

    if let Some(m) = selected {
        if graph.method(m).is_abstract() {
            return Err(LinkError::AbstractMethod {
                class: graph.name(current).to_string(),
                reason: format!("invokespecial selects abstract {}", graph.method_signature(m)),
            });
        }
        return Ok(m);
    }

    let concrete: Vec<MethodRef> =
        find_maximally_specific_superinterface_methods(graph, lookup_class, name, descriptor)
            .into_iter()
            .filter(|&m| !graph.method(m).is_abstract())
            .collect();
    match concrete.as_slice() {
        [only] => Ok(*only),
        [] => Err(LinkError::AbstractMethod {
            class: graph.name(current).to_string(),
            reason: format!(
                "no concrete invokespecial target for {}.{name}{descriptor}",
                lookup_info.name
            ),
        }),
        many => Err(LinkError::IncompatibleClassChange {
            class: graph.name(current).to_string(),
            reason: format!(
                "multiple maximally-specific methods for {}.{name}{descriptor}: {}",
                lookup_info.name,
                join_signatures(graph, many)
            ),
        }),
    }
}

pub(crate) fn join_signatures(graph: &ClassGraph, methods: &[MethodRef]) -> String {
    methods
        .iter()
        .map(|&m| graph.method_signature(m))
        .collect::<Vec<_>>()
        .join(", ")
}
