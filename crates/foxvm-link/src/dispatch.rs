//! Call-site and field-access resolution for the bytecode lowering stage.
//!
//! Given a symbolic reference from the code of class `current`, these functions decide what the
//! generated code does: call a known method directly, index the receiver's vtable, go through
//! an interface's method index, or address a pre-resolved field slot. Owners are linked on
//! first reference.

use serde::Serialize;

use crate::access::{can_access_class, can_access_field, can_access_method};
use crate::error::{LinkError, Result};
use crate::graph::{ClassGraph, ClassId};
use crate::info::{FieldRef, MethodRef};
use crate::linker::Linker;
use crate::lookup::{field_lookup, invokespecial_target, method_lookup, overrides, superinterface_method};

const ARRAY_CLONE: (&str, &str) = ("clone", "()Ljava/lang/Object;");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvokeKind {
    Virtual,
    Special,
    Static,
    Interface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallTarget {
    /// Direct call of a static method.
    Static(MethodRef),
    /// Direct call of an instance method: `invokespecial`, or a private method.
    Special(MethodRef),
    /// Indexed call through the receiver's vtable. `method` is what a receiver of exactly
    /// `class` runs.
    Virtual {
        class: ClassId,
        vtable_index: usize,
        method: MethodRef,
    },
    /// Call through the receiver's ivtable entry for `interface`.
    Interface {
        interface: ClassId,
        method_index: usize,
        method: MethodRef,
    },
    /// `clone()` on an array receiver.
    ArrayClone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldAccessKind {
    GetStatic,
    PutStatic,
    GetField,
    PutField,
}

impl FieldAccessKind {
    pub fn is_static(self) -> bool {
        matches!(self, FieldAccessKind::GetStatic | FieldAccessKind::PutStatic)
    }

    pub fn is_write(self) -> bool {
        matches!(self, FieldAccessKind::PutStatic | FieldAccessKind::PutField)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldTarget {
    pub field: FieldRef,
    pub is_static: bool,
    /// Index into the declaring class's static layout, or into the instance layout of the
    /// declaring class (and, by prefix, of every subclass).
    pub slot: usize,
}

/// Resolves `invoke<kind> owner.name descriptor` appearing in the code of `current`.
pub fn resolve_invoke(
    linker: &mut Linker<'_>,
    current: ClassId,
    kind: InvokeKind,
    owner: &str,
    name: &str,
    descriptor: &str,
    owner_is_interface: bool,
) -> Result<CallTarget> {
    linker.link(current)?;
    let class_name = linker.graph().name(current).to_string();
    let icce = |reason: String| LinkError::IncompatibleClassChange {
        class: class_name.clone(),
        reason,
    };

    if owner.starts_with('[') {
        if kind != InvokeKind::Virtual {
            return Err(icce(format!(
                "array method {owner}.{name}{descriptor} can only be called by invokevirtual"
            )));
        }
        if (name, descriptor) != ARRAY_CLONE {
            return Err(icce(format!(
                "only clone()Ljava/lang/Object; can be called on array class {owner}"
            )));
        }
        return Ok(CallTarget::ArrayClone);
    }

    let owner_id = resolve_class(linker, current, owner)?;
    let graph = linker.graph();
    let owner_info = graph.class(owner_id);
    if owner_info.is_interface() != owner_is_interface {
        return Err(icce(format!(
            "method reference to {owner} does not match its class kind"
        )));
    }

    let found = if owner_info.is_interface() {
        method_lookup(graph, owner_id, name, descriptor)
            .or_else(|| superinterface_method(graph, owner_id, name, descriptor))
    } else {
        method_lookup(graph, owner_id, name, descriptor)
    };
    let resolved = found.ok_or_else(|| LinkError::NoSuchMethod {
        class: class_name.clone(),
        method: format!("{owner}.{name}{descriptor}"),
    })?;
    if !can_access_method(graph, current, resolved) {
        return Err(LinkError::IllegalAccess {
            class: class_name.clone(),
            target: format!("method {}", graph.method_signature(resolved)),
        });
    }
    let method = graph.method(resolved);

    match kind {
        InvokeKind::Static => {
            if !method.is_static() {
                return Err(icce(format!(
                    "{} is not a static method",
                    graph.method_signature(resolved)
                )));
            }
            Ok(CallTarget::Static(resolved))
        }
        InvokeKind::Special => {
            if method.is_constructor && resolved.class != owner_id {
                return Err(LinkError::NoSuchMethod {
                    class: class_name.clone(),
                    method: format!("{owner}.{name}{descriptor}"),
                });
            }
            if method.is_static() {
                return Err(icce(format!(
                    "{} is not an instance method",
                    graph.method_signature(resolved)
                )));
            }
            invokespecial_target(graph, current, owner_id, resolved).map(CallTarget::Special)
        }
        InvokeKind::Virtual => {
            if method.is_static() {
                return Err(icce(format!(
                    "{} is not an instance method",
                    graph.method_signature(resolved)
                )));
            }
            if method.is_private() {
                return Ok(CallTarget::Special(resolved));
            }
            virtual_target(graph, owner_id, resolved).ok_or_else(|| {
                icce(format!(
                    "{} is not present in the vtable of {owner}",
                    graph.method_signature(resolved)
                ))
            })
        }
        InvokeKind::Interface => {
            if method.is_static() || method.is_private() {
                return Err(icce(format!(
                    "{} cannot be called by invokeinterface",
                    graph.method_signature(resolved)
                )));
            }
            let declaring = graph.class(resolved.class);
            if declaring.is_interface() {
                Ok(CallTarget::Interface {
                    interface: resolved.class,
                    method_index: resolved.index as usize,
                    method: resolved,
                })
            } else if declaring.super_class.is_none() {
                // A root-class method reached through an interface: every vtable starts with
                // the root's slots.
                virtual_target(graph, resolved.class, resolved).ok_or_else(|| {
                    icce(format!(
                        "{} is not present in the root vtable",
                        graph.method_signature(resolved)
                    ))
                })
            } else {
                Err(icce(format!(
                    "{} is not an interface method",
                    graph.method_signature(resolved)
                )))
            }
        }
    }
}

fn virtual_target(graph: &ClassGraph, class: ClassId, resolved: MethodRef) -> Option<CallTarget> {
    let vtable = &graph.class(class).vtable;
    let vtable_index = vtable
        .iter()
        .position(|&m| m == resolved || overrides(graph, m, resolved))?;
    let method = vtable[vtable_index];
    if method != resolved {
        tracing::trace!(
            target = "foxvm.link",
            resolved = %graph.method_signature(resolved),
            dispatched = %graph.method_signature(method),
            "virtual call dispatches to an overriding method"
        );
    }
    Some(CallTarget::Virtual {
        class,
        vtable_index,
        method,
    })
}

/// Resolves a `getstatic`/`putstatic`/`getfield`/`putfield` of `owner.name:descriptor` that
/// appears in `current_method`, a method of `current`.
pub fn resolve_field_access(
    linker: &mut Linker<'_>,
    current: ClassId,
    current_method: MethodRef,
    kind: FieldAccessKind,
    owner: &str,
    name: &str,
    descriptor: &str,
) -> Result<FieldTarget> {
    linker.link(current)?;
    let owner_id = resolve_class(linker, current, owner)?;
    let graph = linker.graph();
    let class_name = graph.name(current);

    let field = field_lookup(graph, owner_id, name, descriptor)?.ok_or_else(|| {
        LinkError::NoSuchField {
            class: class_name.to_string(),
            field: format!("{owner}.{name}:{descriptor}"),
        }
    })?;
    if !can_access_field(graph, current, field) {
        return Err(LinkError::IllegalAccess {
            class: class_name.to_string(),
            target: format!("field {}", graph.field_signature(field)),
        });
    }

    let info = graph.field(field);
    if info.is_static() != kind.is_static() {
        let expected = if kind.is_static() { "static" } else { "instance" };
        return Err(LinkError::IncompatibleClassChange {
            class: class_name.to_string(),
            reason: format!("{} is not a {expected} field", graph.field_signature(field)),
        });
    }

    // Final fields are written only by the declaring class's own initializer.
    if kind.is_write() && info.is_final() {
        let method = graph.method(current_method);
        let in_initializer = if kind.is_static() {
            method.is_class_initializer
        } else {
            method.is_constructor
        };
        if field.class != current || current_method.class != current || !in_initializer {
            return Err(LinkError::IllegalAccess {
                class: class_name.to_string(),
                target: format!(
                    "final field {} from {}",
                    graph.field_signature(field),
                    graph.method_signature(current_method)
                ),
            });
        }
    }

    let declaring = graph.class(field.class);
    let slot = if kind.is_static() {
        declaring.static_slot(field)
    } else {
        declaring.instance_slot(field)
    };
    let slot = slot.ok_or_else(|| LinkError::NoSuchField {
        class: class_name.to_string(),
        field: graph.field_signature(field),
    })?;

    Ok(FieldTarget {
        field,
        is_static: kind.is_static(),
        slot,
    })
}

/// Class resolution (JVMS 5.4.3.1): find, link, check access.
fn resolve_class(linker: &mut Linker<'_>, current: ClassId, name: &str) -> Result<ClassId> {
    let class_name = linker.graph().name(current).to_string();
    let id = linker
        .graph()
        .lookup(name)
        .ok_or_else(|| LinkError::UnresolvedDependency {
            class: class_name.clone(),
            dependency: name.to_string(),
        })?;
    linker.link(id)?;
    if !can_access_class(linker.graph(), current, id) {
        return Err(LinkError::IllegalAccess {
            class: class_name,
            target: format!("class {name}"),
        });
    }
    Ok(id)
}
