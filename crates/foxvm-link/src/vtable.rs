//! Virtual and interface dispatch tables.

use crate::error::{LinkError, Result};
use crate::graph::{ClassGraph, ClassId};
use crate::info::{IvTableEntry, IvTableSlot, MethodRef};
use crate::lookup::{
    find_maximally_specific_superinterface_methods, is_subtype_of, join_signatures, overrides,
    superclasses, superinterfaces,
};

/// Builds the vtable of class `class`, whose own record is already in the graph.
///
/// Slot `i` of the superclass's table stays slot `i` here: the table starts as a copy of it,
/// overriding methods replace slots in place and everything else is appended.
pub(crate) fn build_vtable(graph: &ClassGraph, class: ClassId, verify: bool) -> Result<Vec<MethodRef>> {
    let info = graph.class(class);
    let inherited: &[MethodRef] = info
        .super_class
        .map(|s| graph.class(s).vtable.as_slice())
        .unwrap_or_default();
    let mut vtable = inherited.to_vec();

    // Methods declared here.
    for (index, method) in info.methods.iter().enumerate() {
        if !method.is_virtual() {
            continue;
        }
        let child = info.method_ref(index);
        let Some(slot) = vtable.iter().position(|&p| overrides(graph, child, p)) else {
            tracing::trace!(
                target = "foxvm.link",
                class = %info.name,
                slot = vtable.len(),
                method = %graph.method_signature(child),
                "vtable slot appended"
            );
            vtable.push(child);
            continue;
        };

        tracing::trace!(
            target = "foxvm.link",
            class = %info.name,
            slot,
            method = %graph.method_signature(child),
            replaced = %graph.method_signature(vtable[slot]),
            "vtable slot overridden"
        );
        vtable[slot] = child;
        let others: Vec<String> = vtable
            .iter()
            .enumerate()
            .filter(|&(i, &p)| i != slot && overrides(graph, child, p))
            .map(|(i, &p)| format!("#{i} {}", graph.method_signature(p)))
            .collect();
        if !others.is_empty() {
            return Err(LinkError::AmbiguousOverride {
                class: info.name.clone(),
                method: graph.method_signature(child),
                slots: others.join(", "),
            });
        }
    }

    // Methods inherited from superinterfaces.
    for interface in superinterfaces(graph, class) {
        let interface_info = graph.class(interface);
        for (index, method) in interface_info.methods.iter().enumerate() {
            if method.is_static() || method.is_private() || method.is_class_initializer {
                continue;
            }
            let (name, descriptor) = (method.name.as_str(), method.descriptor.as_str());
            let existing = vtable
                .iter()
                .position(|&s| graph.method(s).matches(name, descriptor));

            match existing {
                None => {
                    let specific =
                        find_maximally_specific_superinterface_methods(graph, class, name, descriptor);
                    let chosen = match concrete(graph, &specific).as_slice() {
                        [] => specific
                            .first()
                            .copied()
                            .unwrap_or(interface_info.method_ref(index)),
                        [only] => *only,
                        many => return Err(ambiguous_default(graph, class, name, descriptor, many)),
                    };
                    tracing::trace!(
                        target = "foxvm.link",
                        class = %info.name,
                        slot = vtable.len(),
                        method = %graph.method_signature(chosen),
                        "vtable slot appended from superinterface"
                    );
                    vtable.push(chosen);
                }
                Some(slot) if graph.class(vtable[slot].class).is_interface() => {
                    let specific =
                        find_maximally_specific_superinterface_methods(graph, class, name, descriptor);
                    match concrete(graph, &specific).as_slice() {
                        [] => {}
                        [only] => vtable[slot] = *only,
                        many => return Err(ambiguous_default(graph, class, name, descriptor, many)),
                    }
                }
                Some(_) => {}
            }
        }
    }

    if !info.is_abstract() {
        if let Some(&m) = vtable.iter().find(|&&m| graph.method(m).is_abstract()) {
            return Err(LinkError::AbstractMethod {
                class: info.name.clone(),
                reason: format!(
                    "vtable of a concrete class contains abstract method {}",
                    graph.method_signature(m)
                ),
            });
        }
    }

    if verify {
        verify_vtable(graph, class, &vtable, inherited)?;
    }
    Ok(vtable)
}

fn concrete(graph: &ClassGraph, methods: &[MethodRef]) -> Vec<MethodRef> {
    methods
        .iter()
        .copied()
        .filter(|&m| !graph.method(m).is_abstract())
        .collect()
}

fn ambiguous_default(
    graph: &ClassGraph,
    class: ClassId,
    name: &str,
    descriptor: &str,
    candidates: &[MethodRef],
) -> LinkError {
    LinkError::IncompatibleClassChange {
        class: graph.name(class).to_string(),
        reason: format!(
            "conflicting maximally-specific methods for {name}{descriptor}: {}",
            join_signatures(graph, candidates)
        ),
    }
}

fn verify_vtable(
    graph: &ClassGraph,
    class: ClassId,
    vtable: &[MethodRef],
    inherited: &[MethodRef],
) -> Result<()> {
    let inconsistent = |reason: String| LinkError::InconsistentVtable {
        class: graph.name(class).to_string(),
        reason,
    };

    for (i, &a) in vtable.iter().enumerate() {
        for (j, &b) in vtable.iter().enumerate().skip(i + 1) {
            if overrides(graph, a, b) || overrides(graph, b, a) {
                return Err(inconsistent(format!(
                    "slots #{i} {} and #{j} {} hold the same method",
                    graph.method_signature(a),
                    graph.method_signature(b)
                )));
            }
        }
    }

    for (i, (&child, &parent)) in vtable.iter().zip(inherited).enumerate() {
        if child != parent && !overrides(graph, child, parent) {
            return Err(inconsistent(format!(
                "slot #{i} {} does not override {} from the superclass",
                graph.method_signature(child),
                graph.method_signature(parent)
            )));
        }
    }
    Ok(())
}

/// Builds the ivtable of class `class` from its finished vtable.
///
/// For each superinterface method, the implementing slot is the one holding the nearest
/// declaration in `class` or its superclasses, else the slot filled from a superinterface.
/// An interface gets an entry when `class` declares one of its implementations itself, or when
/// the superclass does not implement the interface (so no ancestor carries an entry for it).
pub(crate) fn build_ivtable(graph: &ClassGraph, class: ClassId) -> Result<Vec<IvTableEntry>> {
    let info = graph.class(class);
    let vtable = info.vtable.as_slice();
    let mut ivtable = Vec::new();

    for interface in superinterfaces(graph, class) {
        let interface_info = graph.class(interface);
        let mut methods = Vec::new();
        let mut declared_here = false;

        // Ascending by interface method index.
        for (method_index, method) in interface_info.methods.iter().enumerate() {
            if method.is_static() || method.is_private() || method.is_class_initializer {
                continue;
            }
            let Some(vtable_index) = select_slot(graph, class, vtable, &method.name, &method.descriptor)
            else {
                continue;
            };
            // Interface methods are unique by name and descriptor, so each slot implements at
            // most one method of `interface`.
            declared_here |= vtable[vtable_index].class == class;
            methods.push(IvTableSlot {
                method_index,
                vtable_index,
            });
        }

        let inherited_from_super = info
            .super_class
            .is_some_and(|s| is_subtype_of(graph, s, interface));
        if !methods.is_empty() && (declared_here || !inherited_from_super) {
            ivtable.push(IvTableEntry { interface, methods });
        }
    }
    Ok(ivtable)
}

fn select_slot(
    graph: &ClassGraph,
    class: ClassId,
    vtable: &[MethodRef],
    name: &str,
    descriptor: &str,
) -> Option<usize> {
    let in_class = |c: ClassId| {
        vtable
            .iter()
            .position(|&s| s.class == c && graph.method(s).matches(name, descriptor))
    };
    std::iter::once(class)
        .chain(superclasses(graph, class))
        .find_map(in_class)
        .or_else(|| {
            vtable.iter().position(|&s| {
                graph.class(s.class).is_interface() && graph.method(s).matches(name, descriptor)
            })
        })
}
