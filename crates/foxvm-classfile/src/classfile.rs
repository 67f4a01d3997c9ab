use crate::constant_pool::{ConstantPool, CpEntry};
use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<ClassMember>,
    pub methods: Vec<ClassMember>,
    pub signature: Option<String>,
    pub inner_classes: Vec<InnerClassInfo>,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
    pub signature: Option<String>,
    /// `ConstantValue` attribute; only meaningful on fields.
    pub constant_value: Option<ConstantValue>,
    /// `Code` attribute; only meaningful on methods.
    pub code: Option<Code>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassInfo {
    pub inner_class: String,
    pub outer_class: Option<String>,
    pub inner_name: Option<String>,
    pub access_flags: u16,
}

/// The constant default of a static field.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// Raw method body. The exception table and nested attributes are not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub max_stack: u16,
    pub max_locals: u16,
    pub bytecode: Vec<u8>,
}

impl ClassFile {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFEBABE {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let cp = ConstantPool::parse(&mut reader)?;

        let access_flags = reader.read_u2()?;
        let this_class = cp.get_class_name(reader.read_u2()?)?;
        let super_class = optional_class(&cp, reader.read_u2()?)?;

        let interfaces_count = reader.read_u2()? as usize;
        let mut interfaces = Vec::with_capacity(interfaces_count);
        for _ in 0..interfaces_count {
            interfaces.push(cp.get_class_name(reader.read_u2()?)?);
        }

        let fields_count = reader.read_u2()? as usize;
        let mut fields = Vec::with_capacity(fields_count);
        for _ in 0..fields_count {
            fields.push(parse_member(&mut reader, &cp, AttributeTarget::Field)?);
        }

        let methods_count = reader.read_u2()? as usize;
        let mut methods = Vec::with_capacity(methods_count);
        for _ in 0..methods_count {
            methods.push(parse_member(&mut reader, &cp, AttributeTarget::Method)?);
        }

        let class_attrs = parse_attributes(&mut reader, &cp, AttributeTarget::Class)?;

        reader.ensure_empty()?;

        Ok(Self {
            minor_version,
            major_version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            signature: class_attrs.signature,
            inner_classes: class_attrs.inner_classes,
        })
    }

    /// Access flags recorded for this class in its own `InnerClasses` attribute.
    ///
    /// Member classes carry their source-level modifiers (`private`, `static`, ...) there rather
    /// than in the top-level access flags.
    pub fn member_access_flags(&self) -> Option<u16> {
        self.inner_classes
            .iter()
            .find(|inner| inner.inner_class == self.this_class)
            .map(|inner| inner.access_flags)
    }
}

fn parse_member(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    target: AttributeTarget,
) -> Result<ClassMember> {
    let access_flags = reader.read_u2()?;
    let name = cp.get_utf8(reader.read_u2()?)?.to_string();
    let descriptor = cp.get_utf8(reader.read_u2()?)?.to_string();

    let attrs = parse_attributes(reader, cp, target)?;
    Ok(ClassMember {
        access_flags,
        name,
        descriptor,
        signature: attrs.signature,
        constant_value: attrs.constant_value,
        code: attrs.code,
    })
}

#[derive(Default)]
struct ParsedAttributes {
    signature: Option<String>,
    constant_value: Option<ConstantValue>,
    code: Option<Code>,
    inner_classes: Vec<InnerClassInfo>,
}

#[derive(Clone, Copy)]
enum AttributeTarget {
    Class,
    Field,
    Method,
}

fn parse_attributes(
    reader: &mut Reader<'_>,
    cp: &ConstantPool,
    target: AttributeTarget,
) -> Result<ParsedAttributes> {
    let attributes_count = reader.read_u2()? as usize;
    let mut parsed = ParsedAttributes::default();
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let info = reader.read_bytes(length)?;
        let name = cp.get_utf8(name_index)?;

        let mut sub = Reader::new(info);
        match (name, target) {
            ("Signature", _) => {
                let sig_index = sub.read_u2()?;
                parsed.signature = Some(cp.get_utf8(sig_index)?.to_string());
                sub.ensure_empty()?;
            }
            ("ConstantValue", AttributeTarget::Field) => {
                let value_index = sub.read_u2()?;
                parsed.constant_value = Some(match cp.get(value_index)? {
                    CpEntry::Integer(v) => ConstantValue::Int(*v),
                    CpEntry::Long(v) => ConstantValue::Long(*v),
                    CpEntry::Float(v) => ConstantValue::Float(*v),
                    CpEntry::Double(v) => ConstantValue::Double(*v),
                    CpEntry::String { string_index } => {
                        ConstantValue::String(cp.get_utf8(*string_index)?.to_string())
                    }
                    _ => return Err(Error::MalformedAttribute("ConstantValue")),
                });
                sub.ensure_empty()?;
            }
            ("Code", AttributeTarget::Method) => {
                let max_stack = sub.read_u2()?;
                let max_locals = sub.read_u2()?;
                let code_length = sub.read_u4()? as usize;
                let bytecode = sub.read_bytes(code_length)?.to_vec();
                // Exception table entries and nested attributes (line numbers, stack maps, ...)
                // are not needed past this point; the length still has to add up.
                let exception_table_length = sub.read_u2()? as usize;
                sub.read_bytes(exception_table_length * 8)?;
                let nested = sub.read_u2()? as usize;
                for _ in 0..nested {
                    sub.read_u2()?;
                    let len = sub.read_u4()? as usize;
                    sub.read_bytes(len)?;
                }
                if sub.remaining() != 0 {
                    return Err(Error::MalformedAttribute("Code"));
                }
                parsed.code = Some(Code {
                    max_stack,
                    max_locals,
                    bytecode,
                });
            }
            ("InnerClasses", AttributeTarget::Class) => {
                let count = sub.read_u2()?;
                for _ in 0..count {
                    parsed.inner_classes.push(read_inner_class(&mut sub, cp)?);
                }
                sub.ensure_empty()?;
            }
            _ => {}
        }
    }

    Ok(parsed)
}

/// Index 0 stands for "none" in `super_class` and `outer_class_info_index`.
fn optional_class(cp: &ConstantPool, index: u16) -> Result<Option<String>> {
    match index {
        0 => Ok(None),
        index => cp.get_class_name(index).map(Some),
    }
}

fn read_inner_class(sub: &mut Reader<'_>, cp: &ConstantPool) -> Result<InnerClassInfo> {
    let inner_class = cp.get_class_name(sub.read_u2()?)?;
    let outer_class = optional_class(cp, sub.read_u2()?)?;
    let inner_name = match sub.read_u2()? {
        0 => None,
        index => Some(cp.get_utf8(index)?.to_string()),
    };
    Ok(InnerClassInfo {
        inner_class,
        outer_class,
        inner_name,
        access_flags: sub.read_u2()?,
    })
}
