//! Class linking: resolves supertypes, validates the hierarchy and computes layouts and
//! dispatch tables, one class at a time, dependencies first.

use std::collections::HashSet;

use foxvm_classfile::access::{ACC_INTERFACE, ACC_SUPER};
use serde::Deserialize;

use crate::access::{can_access_class, package_name};
use crate::error::{LinkError, MemberKind, Result};
use crate::graph::{ClassGraph, ClassId, ClassOrigin, LinkState};
use crate::info::{ClassInfo, ClassKind, FieldInfo, MethodInfo};
use crate::layout::{instance_layout, static_layout};
use crate::mangle::mangle_class_name;
use crate::vtable::{build_ivtable, build_vtable};
use crate::OBJECT_CLASS;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LinkOptions {
    /// Internal name of the universal root class.
    pub root_class: String,
    /// Re-check finished vtables for duplicate slots and for index compatibility with the
    /// superclass's table.
    pub verify_vtables: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            root_class: OBJECT_CLASS.to_string(),
            verify_vtables: true,
        }
    }
}

/// One class on the link stack, waiting for its dependencies.
struct Frame {
    id: ClassId,
    super_class: Option<ClassId>,
    interfaces: Vec<ClassId>,
    next: usize,
}

impl Frame {
    fn dependency(&self, n: usize) -> Option<ClassId> {
        match self.super_class {
            Some(s) if n == 0 => Some(s),
            Some(_) => self.interfaces.get(n - 1).copied(),
            None => self.interfaces.get(n).copied(),
        }
    }
}

pub struct Linker<'g> {
    graph: &'g mut ClassGraph,
    options: LinkOptions,
}

impl<'g> Linker<'g> {
    pub fn new(graph: &'g mut ClassGraph) -> Self {
        Self::with_options(graph, LinkOptions::default())
    }

    pub fn with_options(graph: &'g mut ClassGraph, options: LinkOptions) -> Self {
        Self { graph, options }
    }

    pub fn graph(&self) -> &ClassGraph {
        self.graph
    }

    pub fn options(&self) -> &LinkOptions {
        &self.options
    }

    /// Links `id` and, before it, every class it names as super or interface.
    ///
    /// Linking an already linked class is a no-op. On failure no class is left half-linked:
    /// classes whose linking was in progress go back to [`LinkState::Unlinked`].
    pub fn link(&mut self, id: ClassId) -> Result<()> {
        if self.graph.state(id) == LinkState::Linked {
            return Ok(());
        }

        let mut stack = Vec::new();
        let result = self.run(id, &mut stack);
        if result.is_err() {
            for frame in stack {
                self.graph.set_state(frame.id, LinkState::Unlinked);
                self.graph.set_info(frame.id, None);
            }
        }
        result
    }

    pub fn link_name(&mut self, name: &str) -> Result<ClassId> {
        let id = self
            .graph
            .lookup(name)
            .ok_or_else(|| LinkError::UnresolvedDependency {
                class: name.to_string(),
                dependency: name.to_string(),
            })?;
        self.link(id)?;
        Ok(id)
    }

    /// Links every class of `origin` in name order and returns how many were newly linked,
    /// dependencies pulled in from either partition included.
    pub fn link_all(&mut self, origin: ClassOrigin) -> Result<usize> {
        let before = self.linked_count();
        for id in self.graph.classes(origin) {
            self.link(id)?;
        }
        let linked = self.linked_count() - before;
        tracing::info!(
            target = "foxvm.link",
            ?origin,
            linked,
            "Pre-resolved {linked} class(es)"
        );
        Ok(linked)
    }

    fn linked_count(&self) -> usize {
        (0..self.graph.len())
            .filter(|&i| self.graph.state(ClassId::from_index(i)) == LinkState::Linked)
            .count()
    }

    fn run(&mut self, id: ClassId, stack: &mut Vec<Frame>) -> Result<()> {
        stack.push(self.enter(id)?);

        while let Some(top) = stack.last_mut() {
            let Some(dep) = top.dependency(top.next) else {
                let current = top.id;
                self.finish(&stack[stack.len() - 1])?;
                self.graph.set_state(current, LinkState::Linked);
                stack.pop();
                continue;
            };
            top.next += 1;

            match self.graph.state(dep) {
                LinkState::Linked => {}
                LinkState::Linking => {
                    return Err(LinkError::CircularInheritance {
                        class: self.graph.name(dep).to_string(),
                    })
                }
                LinkState::Unlinked => {
                    let frame = self.enter(dep)?;
                    stack.push(frame);
                }
            }
        }
        Ok(())
    }

    /// Resolves the direct supertypes of `id` by name and marks it as linking.
    fn enter(&mut self, id: ClassId) -> Result<Frame> {
        let record = self.graph.record(id);
        let is_root = record.name == self.options.root_class;
        match (&record.super_name, is_root) {
            (Some(super_name), true) => {
                return Err(LinkError::MalformedHierarchy {
                    class: record.name.clone(),
                    reason: format!("the root class cannot have superclass {super_name}"),
                })
            }
            (None, false) => {
                return Err(LinkError::MalformedHierarchy {
                    class: record.name.clone(),
                    reason: "class must have a superclass".to_string(),
                })
            }
            _ => {}
        }

        let graph = &*self.graph;
        let resolve = |name: &String| {
            graph
                .lookup(name)
                .ok_or_else(|| LinkError::UnresolvedDependency {
                    class: record.name.clone(),
                    dependency: name.clone(),
                })
        };
        let super_class = record.super_name.as_ref().map(resolve).transpose()?;
        let interfaces = record
            .interfaces
            .iter()
            .map(resolve)
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(target = "foxvm.link", class = %record.name, "Pre-resolving class");
        self.graph.set_state(id, LinkState::Linking);
        Ok(Frame {
            id,
            super_class,
            interfaces,
            next: 0,
        })
    }

    /// Links a class whose dependencies are all linked.
    fn finish(&mut self, frame: &Frame) -> Result<()> {
        let graph = &*self.graph;
        let id = frame.id;
        let record = graph.record(id);
        let class = record.name.clone();
        let kind = if record.access_flags & ACC_INTERFACE != 0 {
            ClassKind::Interface
        } else {
            ClassKind::Class
        };

        if let Some(super_class) = frame.super_class {
            let super_info = graph.class(super_class);
            if kind == ClassKind::Interface && super_info.name != self.options.root_class {
                return Err(LinkError::MalformedHierarchy {
                    class,
                    reason: format!(
                        "interface must have {} as superclass, found {}",
                        self.options.root_class, super_info.name
                    ),
                });
            }
            if !can_access_class(graph, id, super_class) {
                return Err(LinkError::IllegalAccess {
                    class,
                    target: format!("class {}", super_info.name),
                });
            }
            if super_info.is_interface() {
                return Err(LinkError::IncompatibleHierarchy {
                    class,
                    reason: format!("superclass {} is an interface", super_info.name),
                });
            }
        }
        for &interface in &frame.interfaces {
            let info = graph.class(interface);
            if !can_access_class(graph, id, interface) {
                return Err(LinkError::IllegalAccess {
                    class,
                    target: format!("interface {}", info.name),
                });
            }
            if !info.is_interface() {
                return Err(LinkError::IncompatibleHierarchy {
                    class,
                    reason: format!("superinterface {} is not an interface", info.name),
                });
            }
        }

        let (fields, methods) = populate_members(record)?;
        let inherited = frame
            .super_class
            .map(|s| graph.class(s).instance_fields.as_slice())
            .unwrap_or_default();
        let info = ClassInfo {
            id,
            mangled_name: mangle_class_name(&class),
            package: package_name(&class).to_string(),
            version: record.version,
            signature: record.signature.clone(),
            origin: graph.origin(id),
            kind,
            access_flags: record.access_flags,
            modifiers: record.inner_access_flags.unwrap_or(record.access_flags) & !ACC_SUPER,
            super_class: frame.super_class,
            interfaces: frame.interfaces.clone(),
            static_fields: static_layout(id, &fields),
            instance_fields: instance_layout(inherited, id, &fields),
            fields,
            methods,
            vtable: Vec::new(),
            ivtable: Vec::new(),
            name: class,
        };

        // The record goes in first: building the tables looks this class up through the graph.
        self.graph.set_info(id, Some(info));
        if kind == ClassKind::Class {
            let vtable = build_vtable(self.graph, id, self.options.verify_vtables)?;
            if let Some(info) = self.graph.info_mut(id) {
                info.vtable = vtable;
            }
            let ivtable = build_ivtable(self.graph, id)?;
            if let Some(info) = self.graph.info_mut(id) {
                info.ivtable = ivtable;
            }
        }

        let info = self.graph.class(id);
        tracing::debug!(
            target = "foxvm.link",
            class = %info.name,
            instance_fields = info.instance_fields.len(),
            static_fields = info.static_fields.len(),
            vtable = info.vtable.len(),
            ivtable = info.ivtable.len(),
            "class linked"
        );
        Ok(())
    }
}

fn populate_members(
    record: &crate::record::ClassRecord,
) -> Result<(Vec<FieldInfo>, Vec<MethodInfo>)> {
    let format_error = |e: foxvm_classfile::Error| LinkError::ClassFormat {
        class: record.name.clone(),
        reason: e.to_string(),
    };

    let mut seen = HashSet::new();
    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        if !seen.insert((field.name.as_str(), field.descriptor.as_str())) {
            return Err(LinkError::DuplicateMember {
                class: record.name.clone(),
                kind: MemberKind::Field,
                member: format!("{}:{}", field.name, field.descriptor),
            });
        }
        fields.push(FieldInfo::from_record(field).map_err(format_error)?);
    }

    seen.clear();
    let mut methods = Vec::with_capacity(record.methods.len());
    for method in &record.methods {
        if !seen.insert((method.name.as_str(), method.descriptor.as_str())) {
            return Err(LinkError::DuplicateMember {
                class: record.name.clone(),
                kind: MemberKind::Method,
                member: format!("{}{}", method.name, method.descriptor),
            });
        }
        methods.push(MethodInfo::from_record(method, record.version).map_err(format_error)?);
    }

    Ok((fields, methods))
}
