//! The whole-program class graph: an append-only arena of class records.

use std::collections::HashMap;
use std::fmt;

use foxvm_classfile::access::{
    ACC_FINAL, ACC_NATIVE, ACC_PROTECTED, ACC_PUBLIC, ACC_SUPER,
};
use serde::Serialize;

use crate::error::{LinkError, Result};
use crate::info::{ClassInfo, FieldInfo, FieldRef, MethodInfo, MethodRef};
use crate::record::ClassRecord;
use crate::OBJECT_CLASS;

/// Dense handle of a class inside a [`ClassGraph`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClassId(u32);

impl ClassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// Which half of the program a class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassOrigin {
    /// Runtime library class; only signatures are needed.
    Runtime,
    /// Application class; method bodies will be lowered.
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Unlinked,
    Linking,
    Linked,
}

#[derive(Debug)]
struct ClassSlot {
    record: ClassRecord,
    origin: ClassOrigin,
    state: LinkState,
    info: Option<ClassInfo>,
}

/// Name → class registry with a runtime and an application partition.
///
/// Lookups see a combined view in which application classes shadow runtime classes of the same
/// name. Classes are never removed; [`ClassId`]s stay valid for the lifetime of the graph.
#[derive(Debug, Default)]
pub struct ClassGraph {
    slots: Vec<ClassSlot>,
    runtime: HashMap<String, ClassId>,
    application: HashMap<String, ClassId>,
}

impl ClassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph holding just a runtime `java/lang/Object` with its usual public surface.
    pub fn with_minimal_runtime() -> Self {
        let mut graph = Self::new();
        graph.add_class(minimal_object(), ClassOrigin::Runtime);
        graph
    }

    /// Registers a class. If the partition already holds a class of the same name, the first
    /// definition is kept and its id returned.
    pub fn add_class(&mut self, record: ClassRecord, origin: ClassOrigin) -> ClassId {
        let partition = match origin {
            ClassOrigin::Runtime => &self.runtime,
            ClassOrigin::Application => &self.application,
        };
        if let Some(&existing) = partition.get(&record.name) {
            tracing::warn!(
                target = "foxvm.link",
                class = %record.name,
                ?origin,
                "duplicated class definition found, keeping the first one"
            );
            return existing;
        }

        let id = ClassId(
            u32::try_from(self.slots.len()).expect("class graph exceeds u32::MAX classes"),
        );
        let name = record.name.clone();
        self.slots.push(ClassSlot {
            record,
            origin,
            state: LinkState::Unlinked,
            info: None,
        });
        match origin {
            ClassOrigin::Runtime => self.runtime.insert(name, id),
            ClassOrigin::Application => self.application.insert(name, id),
        };
        id
    }

    /// Resolves a class name, preferring the application partition.
    pub fn lookup(&self, name: &str) -> Option<ClassId> {
        self.application
            .get(name)
            .or_else(|| self.runtime.get(name))
            .copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Classes of one partition, ordered by name.
    pub fn classes(&self, origin: ClassOrigin) -> Vec<ClassId> {
        let partition = match origin {
            ClassOrigin::Runtime => &self.runtime,
            ClassOrigin::Application => &self.application,
        };
        let mut ids: Vec<(&str, ClassId)> =
            partition.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        ids.sort_unstable_by(|a, b| a.0.cmp(b.0));
        ids.into_iter().map(|(_, id)| id).collect()
    }

    pub fn record(&self, id: ClassId) -> &ClassRecord {
        &self.slots[id.index()].record
    }

    pub fn name(&self, id: ClassId) -> &str {
        &self.slots[id.index()].record.name
    }

    pub fn origin(&self, id: ClassId) -> ClassOrigin {
        self.slots[id.index()].origin
    }

    pub fn state(&self, id: ClassId) -> LinkState {
        self.slots[id.index()].state
    }

    /// Linked metadata of `id`, if linking has produced it.
    pub fn info(&self, id: ClassId) -> Option<&ClassInfo> {
        self.slots[id.index()].info.as_ref()
    }

    /// Linked metadata of `id`, or [`LinkError::NotLinked`] when linking has not produced it.
    pub fn try_class(&self, id: ClassId) -> Result<&ClassInfo> {
        self.info(id).ok_or_else(|| LinkError::NotLinked {
            class: self.name(id).to_string(),
        })
    }

    /// Linked metadata of `id`.
    ///
    /// The helpers in [`crate::lookup`] read classes through this accessor and share its
    /// precondition. Use [`ClassGraph::try_class`] when `id` may be unlinked.
    ///
    /// # Panics
    ///
    /// Panics if `id` has not been linked. Every class reachable through a linked class's
    /// super/interface edges is linked.
    pub fn class(&self, id: ClassId) -> &ClassInfo {
        self.info(id)
            .unwrap_or_else(|| panic!("class {} has not been linked", self.name(id)))
    }

    pub fn field(&self, field: FieldRef) -> &FieldInfo {
        &self.class(field.class).fields[field.index as usize]
    }

    pub fn method(&self, method: MethodRef) -> &MethodInfo {
        &self.class(method.class).methods[method.index as usize]
    }

    /// `owner.name:descriptor`, for diagnostics.
    pub fn field_signature(&self, field: FieldRef) -> String {
        let f = self.field(field);
        format!("{}.{}:{}", self.name(field.class), f.name, f.descriptor)
    }

    /// `owner.namedescriptor`, for diagnostics.
    pub fn method_signature(&self, method: MethodRef) -> String {
        let m = self.method(method);
        format!("{}.{}{}", self.name(method.class), m.name, m.descriptor)
    }

    pub(crate) fn set_state(&mut self, id: ClassId, state: LinkState) {
        self.slots[id.index()].state = state;
    }

    pub(crate) fn set_info(&mut self, id: ClassId, info: Option<ClassInfo>) {
        self.slots[id.index()].info = info;
    }

    pub(crate) fn info_mut(&mut self, id: ClassId) -> Option<&mut ClassInfo> {
        self.slots[id.index()].info.as_mut()
    }
}

fn minimal_object() -> ClassRecord {
    ClassRecord::builder(OBJECT_CLASS)
        .access(ACC_PUBLIC | ACC_SUPER)
        .method(ACC_PUBLIC, "<init>", "()V")
        .method(ACC_PUBLIC, "equals", "(Ljava/lang/Object;)Z")
        .method(ACC_PUBLIC | ACC_NATIVE, "hashCode", "()I")
        .method(ACC_PUBLIC, "toString", "()Ljava/lang/String;")
        .method(ACC_PUBLIC | ACC_FINAL | ACC_NATIVE, "getClass", "()Ljava/lang/Class;")
        .method(ACC_PROTECTED | ACC_NATIVE, "clone", "()Ljava/lang/Object;")
        .method(ACC_PROTECTED, "finalize", "()V")
        .build()
}
