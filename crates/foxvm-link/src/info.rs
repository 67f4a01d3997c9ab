//! Linked class metadata: the linker's output.

use foxvm_classfile::access::*;
use foxvm_classfile::{
    parse_field_descriptor, parse_method_descriptor, Code, ConstantValue, FieldType,
    MethodDescriptor, ReturnType,
};
use serde::Serialize;

use crate::graph::{ClassId, ClassOrigin};
use crate::layout::FieldCategory;
use crate::mangle;
use crate::record::{ClassVersion, FieldRecord, MethodRecord};

pub const INIT: &str = "<init>";
pub const CLINIT: &str = "<clinit>";
pub const FINALIZE: &str = "finalize";

/// A field, named by its declaring class and its position in that class's field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FieldRef {
    pub class: ClassId,
    pub index: u32,
}

/// A method, named by its declaring class and its position in that class's method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: String,
    pub mangled_name: String,
    pub version: ClassVersion,
    pub signature: Option<String>,
    pub origin: ClassOrigin,
    pub kind: ClassKind,
    pub access_flags: u16,
    /// Source-level modifiers: the `InnerClasses` flags for member classes, `ACC_SUPER` removed.
    pub modifiers: u16,
    /// Internal package name (`java/lang`), empty for the unnamed package.
    pub package: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub static_fields: Vec<PreResolvedField>,
    /// Inherited instance fields first (superclass order), then this class's own.
    pub instance_fields: Vec<PreResolvedField>,
    pub vtable: Vec<MethodRef>,
    pub ivtable: Vec<IvTableEntry>,
}

impl ClassInfo {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & ACC_ENUM != 0
    }

    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & ACC_FINAL != 0
    }

    pub fn field_ref(&self, index: usize) -> FieldRef {
        FieldRef {
            class: self.id,
            index: index as u32,
        }
    }

    pub fn method_ref(&self, index: usize) -> MethodRef {
        MethodRef {
            class: self.id,
            index: index as u32,
        }
    }

    pub fn find_field(&self, name: &str, descriptor: &str) -> Option<FieldRef> {
        self.fields
            .iter()
            .position(|f| f.matches(name, descriptor))
            .map(|i| self.field_ref(i))
    }

    pub fn find_method(&self, name: &str, descriptor: &str) -> Option<MethodRef> {
        self.methods
            .iter()
            .position(|m| m.matches(name, descriptor))
            .map(|i| self.method_ref(i))
    }

    /// Position of `field` in this class's static layout.
    pub fn static_slot(&self, field: FieldRef) -> Option<usize> {
        self.static_fields.iter().position(|f| f.field == field)
    }

    /// Position of `field` in this class's instance layout (inherited prefix included).
    pub fn instance_slot(&self, field: FieldRef) -> Option<usize> {
        self.instance_fields.iter().position(|f| f.field == field)
    }

    pub fn ivtable_for(&self, interface: ClassId) -> Option<&IvTableEntry> {
        self.ivtable.iter().find(|e| e.interface == interface)
    }

    /// Offsets of reference-typed instance fields: the tail the collector has to scan.
    pub fn reference_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.instance_fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_reference)
            .map(|(i, _)| i)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub field_type: FieldType,
    pub mangled_name: String,
    pub signature: Option<String>,
    pub constant_value: Option<ConstantValue>,
    pub category: FieldCategory,
    pub is_reference: bool,
}

impl FieldInfo {
    pub(crate) fn from_record(record: &FieldRecord) -> foxvm_classfile::Result<Self> {
        let field_type = parse_field_descriptor(&record.descriptor)?;
        let category = FieldCategory::of(&field_type);
        Ok(Self {
            access_flags: record.access_flags,
            name: record.name.clone(),
            descriptor: record.descriptor.clone(),
            is_reference: field_type.is_reference(),
            field_type,
            mangled_name: mangle::mangle_field_name(&record.name),
            signature: record.signature.clone(),
            constant_value: record.constant_value.clone(),
            category,
        })
    }

    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }

    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access_flags & ACC_PRIVATE != 0
    }

    pub fn is_protected(&self) -> bool {
        self.access_flags & ACC_PROTECTED != 0
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & ACC_FINAL != 0
    }

    pub fn is_volatile(&self) -> bool {
        self.access_flags & ACC_VOLATILE != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub method_descriptor: MethodDescriptor,
    pub mangled_name: String,
    pub signature: Option<String>,
    pub code: Option<Code>,
    pub is_constructor: bool,
    pub is_class_initializer: bool,
}

impl MethodInfo {
    pub(crate) fn from_record(
        record: &MethodRecord,
        version: ClassVersion,
    ) -> foxvm_classfile::Result<Self> {
        let method_descriptor = parse_method_descriptor(&record.descriptor)?;
        let is_static = record.access_flags & ACC_STATIC != 0;
        // JVMS 2.9.2: from version 51 on, a class initializer must also be static and take no
        // arguments; before that the name alone is enough.
        let is_class_initializer = record.name == CLINIT
            && (version < ClassVersion::JAVA_7
                || (is_static
                    && method_descriptor.params.is_empty()
                    && method_descriptor.return_type == ReturnType::Void));
        Ok(Self {
            access_flags: record.access_flags,
            name: record.name.clone(),
            descriptor: record.descriptor.clone(),
            method_descriptor,
            mangled_name: mangle::mangle_method_name(&record.name),
            signature: record.signature.clone(),
            code: record.code.clone(),
            is_constructor: record.name == INIT,
            is_class_initializer,
        })
    }

    pub fn matches(&self, name: &str, descriptor: &str) -> bool {
        self.name == name && self.descriptor == descriptor
    }

    pub fn is_public(&self) -> bool {
        self.access_flags & ACC_PUBLIC != 0
    }

    pub fn is_private(&self) -> bool {
        self.access_flags & ACC_PRIVATE != 0
    }

    pub fn is_protected(&self) -> bool {
        self.access_flags & ACC_PROTECTED != 0
    }

    pub fn is_static(&self) -> bool {
        self.access_flags & ACC_STATIC != 0
    }

    pub fn is_final(&self) -> bool {
        self.access_flags & ACC_FINAL != 0
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & ACC_ABSTRACT != 0
    }

    pub fn is_native(&self) -> bool {
        self.access_flags & ACC_NATIVE != 0
    }

    pub fn is_concrete(&self) -> bool {
        !self.is_abstract() && !self.is_native()
    }

    pub fn is_finalizer(&self) -> bool {
        self.name == FINALIZE && self.descriptor == "()V"
    }

    /// Candidate for a vtable slot.
    pub fn is_virtual(&self) -> bool {
        !self.is_private() && !self.is_static() && !self.is_constructor && !self.is_class_initializer
    }

    /// Arguments passed at a call site, counting the implicit receiver of instance methods.
    pub fn argument_slots(&self) -> usize {
        self.method_descriptor.params.len() + usize::from(!self.is_static())
    }
}

/// A field placed in a static or instance layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreResolvedField {
    pub field: FieldRef,
    pub is_reference: bool,
    pub category: FieldCategory,
}

/// Interface dispatch table of one implemented interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IvTableEntry {
    pub interface: ClassId,
    /// Sorted by `method_index`.
    pub methods: Vec<IvTableSlot>,
}

impl IvTableEntry {
    /// Vtable slot implementing method `method_index` of the interface.
    pub fn vtable_index(&self, method_index: usize) -> Option<usize> {
        self.methods
            .binary_search_by_key(&method_index, |s| s.method_index)
            .ok()
            .map(|i| self.methods[i].vtable_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IvTableSlot {
    pub method_index: usize,
    pub vtable_index: usize,
}
