//! Raw class records: the linker's input, produced from parsed classfiles.

use foxvm_classfile::access::{ACC_ABSTRACT, ACC_INTERFACE, ACC_PUBLIC, ACC_SUPER};
use foxvm_classfile::{ClassFile, ClassMember, Code, ConstantValue};
use serde::Serialize;

use crate::graph::ClassOrigin;
use crate::OBJECT_CLASS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClassVersion {
    pub major: u16,
    pub minor: u16,
}

impl ClassVersion {
    /// Java 7: the first version with the stricter `<clinit>` rule.
    pub const JAVA_7: ClassVersion = ClassVersion::new(51, 0);
    pub const JAVA_8: ClassVersion = ClassVersion::new(52, 0);

    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub name: String,
    pub version: ClassVersion,
    pub access_flags: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldRecord>,
    pub methods: Vec<MethodRecord>,
    pub signature: Option<String>,
    /// Flags from the class's own `InnerClasses` entry when it is a member class.
    pub inner_access_flags: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub constant_value: Option<ConstantValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodRecord {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    pub code: Option<Code>,
}

impl ClassRecord {
    /// Converts a parsed classfile. Method bodies of runtime classes are dropped: only their
    /// signatures take part in linking.
    pub fn from_classfile(class: ClassFile, origin: ClassOrigin) -> Self {
        let inner_access_flags = class.member_access_flags();
        let keep_code = origin == ClassOrigin::Application;

        Self {
            name: class.this_class,
            version: ClassVersion::new(class.major_version, class.minor_version),
            access_flags: class.access_flags,
            super_name: class.super_class,
            interfaces: class.interfaces,
            fields: class
                .fields
                .into_iter()
                .map(|f| FieldRecord {
                    access_flags: f.access_flags,
                    name: f.name,
                    descriptor: f.descriptor,
                    signature: f.signature,
                    constant_value: f.constant_value,
                })
                .collect(),
            methods: class
                .methods
                .into_iter()
                .map(|m: ClassMember| MethodRecord {
                    access_flags: m.access_flags,
                    name: m.name,
                    descriptor: m.descriptor,
                    signature: m.signature,
                    code: if keep_code { m.code } else { None },
                })
                .collect(),
            signature: class.signature,
            inner_access_flags,
        }
    }

    pub fn builder(name: &str) -> ClassRecordBuilder {
        ClassRecordBuilder {
            record: ClassRecord {
                name: name.to_string(),
                version: ClassVersion::JAVA_8,
                access_flags: ACC_PUBLIC | ACC_SUPER,
                super_name: (name != OBJECT_CLASS).then(|| OBJECT_CLASS.to_string()),
                interfaces: Vec::new(),
                fields: Vec::new(),
                methods: Vec::new(),
                signature: None,
                inner_access_flags: None,
            },
        }
    }
}

/// Builder for records that do not come from a classfile (tests, synthesized classes).
///
/// Defaults: version 52.0, `public`, superclass `java/lang/Object` (none for Object itself).
#[derive(Debug, Clone)]
pub struct ClassRecordBuilder {
    record: ClassRecord,
}

impl ClassRecordBuilder {
    pub fn version(mut self, major: u16) -> Self {
        self.record.version = ClassVersion::new(major, 0);
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.record.access_flags = flags;
        self
    }

    /// Marks the record as an interface (`public abstract interface`).
    pub fn interface(mut self) -> Self {
        self.record.access_flags = ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT;
        self
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.record.super_name = Some(super_name.to_string());
        self
    }

    pub fn no_super(mut self) -> Self {
        self.record.super_name = None;
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.record.interfaces.push(interface.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.record.signature = Some(signature.to_string());
        self
    }

    pub fn inner_access(mut self, flags: u16) -> Self {
        self.record.inner_access_flags = Some(flags);
        self
    }

    pub fn field(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.record.fields.push(FieldRecord {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant_value: None,
        });
        self
    }

    pub fn constant_field(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        value: ConstantValue,
    ) -> Self {
        self.record.fields.push(FieldRecord {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant_value: Some(value),
        });
        self
    }

    pub fn method(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.record.methods.push(MethodRecord {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            code: None,
        });
        self
    }

    pub fn method_with_code(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        code: Code,
    ) -> Self {
        self.record.methods.push(MethodRecord {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            code: Some(code),
        });
        self
    }

    pub fn build(self) -> ClassRecord {
        self.record
    }
}
