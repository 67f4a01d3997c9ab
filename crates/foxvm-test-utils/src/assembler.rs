use std::collections::HashMap;

/// Constant default attached to a field through a `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

struct Member {
    access_flags: u16,
    name: String,
    descriptor: String,
    signature: Option<String>,
    constant: Option<Constant>,
    code: Option<(u16, u16, Vec<u8>)>,
}

/// Minimal classfile writer for tests.
///
/// Only the structures the parser understands are emitted: constant pool, members and the
/// `Signature`, `ConstantValue`, `Code` and `InnerClasses` attributes.
pub struct ClassFileBuilder {
    major_version: u16,
    access_flags: u16,
    name: String,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<Member>,
    methods: Vec<Member>,
    signature: Option<String>,
    inner_classes: Vec<(String, Option<String>, Option<String>, u16)>,
    extra_attribute: Option<(String, Vec<u8>)>,
}

impl ClassFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            major_version: 52,
            access_flags: 0x0021,
            name: name.to_string(),
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            signature: None,
            inner_classes: Vec::new(),
            extra_attribute: None,
        }
    }

    pub fn major_version(mut self, major: u16) -> Self {
        self.major_version = major;
        self
    }

    pub fn access(mut self, flags: u16) -> Self {
        self.access_flags = flags;
        self
    }

    pub fn super_class(mut self, name: Option<&str>) -> Self {
        self.super_class = name.map(str::to_string);
        self
    }

    pub fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn field(self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.push_field(access_flags, name, descriptor, None)
    }

    pub fn constant_field(
        self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        value: Constant,
    ) -> Self {
        self.push_field(access_flags, name, descriptor, Some(value))
    }

    pub fn method(mut self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.methods.push(Member {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant: None,
            code: None,
        });
        self
    }

    pub fn method_with_code(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        bytecode: &[u8],
    ) -> Self {
        self.methods.push(Member {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant: None,
            code: Some((max_stack, max_locals, bytecode.to_vec())),
        });
        self
    }

    pub fn inner_class(
        mut self,
        inner: &str,
        outer: Option<&str>,
        simple_name: Option<&str>,
        access_flags: u16,
    ) -> Self {
        self.inner_classes.push((
            inner.to_string(),
            outer.map(str::to_string),
            simple_name.map(str::to_string),
            access_flags,
        ));
        self
    }

    /// Adds a class attribute the parser does not know about.
    pub fn unknown_attribute(mut self, name: &str, payload: &[u8]) -> Self {
        self.extra_attribute = Some((name.to_string(), payload.to_vec()));
        self
    }

    fn push_field(
        mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        constant: Option<Constant>,
    ) -> Self {
        self.fields.push(Member {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant,
            code: None,
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut pool = PoolWriter::default();

        let this_class = pool.class(&self.name);
        let super_class = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        let interfaces: Vec<u16> = self.interfaces.iter().map(|i| pool.class(i)).collect();

        let mut body = Vec::new();
        put_u2(&mut body, self.access_flags);
        put_u2(&mut body, this_class);
        put_u2(&mut body, super_class);
        put_u2(&mut body, interfaces.len() as u16);
        for i in interfaces {
            put_u2(&mut body, i);
        }

        for members in [&self.fields, &self.methods] {
            put_u2(&mut body, members.len() as u16);
            for member in members.iter() {
                write_member(&mut body, &mut pool, member);
            }
        }

        let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
        if let Some(sig) = &self.signature {
            let idx = pool.utf8(sig);
            attributes.push((pool.utf8("Signature"), idx.to_be_bytes().to_vec()));
        }
        if !self.inner_classes.is_empty() {
            let mut info = Vec::new();
            put_u2(&mut info, self.inner_classes.len() as u16);
            for (inner, outer, simple, flags) in &self.inner_classes {
                let inner = pool.class(inner);
                let outer = outer.as_deref().map(|o| pool.class(o)).unwrap_or(0);
                let simple = simple.as_deref().map(|s| pool.utf8(s)).unwrap_or(0);
                put_u2(&mut info, inner);
                put_u2(&mut info, outer);
                put_u2(&mut info, simple);
                put_u2(&mut info, *flags);
            }
            attributes.push((pool.utf8("InnerClasses"), info));
        }
        if let Some((name, payload)) = &self.extra_attribute {
            attributes.push((pool.utf8(name), payload.clone()));
        }
        write_attributes(&mut body, &attributes);

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        put_u2(&mut out, 0);
        put_u2(&mut out, self.major_version);
        pool.write(&mut out);
        out.extend_from_slice(&body);
        out
    }
}

fn write_member(out: &mut Vec<u8>, pool: &mut PoolWriter, member: &Member) {
    put_u2(out, member.access_flags);
    put_u2(out, pool.utf8(&member.name));
    put_u2(out, pool.utf8(&member.descriptor));

    let mut attributes: Vec<(u16, Vec<u8>)> = Vec::new();
    if let Some(sig) = &member.signature {
        let idx = pool.utf8(sig);
        attributes.push((pool.utf8("Signature"), idx.to_be_bytes().to_vec()));
    }
    if let Some(constant) = &member.constant {
        let idx = pool.constant(constant);
        attributes.push((pool.utf8("ConstantValue"), idx.to_be_bytes().to_vec()));
    }
    if let Some((max_stack, max_locals, bytecode)) = &member.code {
        let mut info = Vec::new();
        put_u2(&mut info, *max_stack);
        put_u2(&mut info, *max_locals);
        info.extend_from_slice(&(bytecode.len() as u32).to_be_bytes());
        info.extend_from_slice(bytecode);
        put_u2(&mut info, 0); // exception table
        put_u2(&mut info, 0); // attributes
        attributes.push((pool.utf8("Code"), info));
    }
    write_attributes(out, &attributes);
}

fn write_attributes(out: &mut Vec<u8>, attributes: &[(u16, Vec<u8>)]) {
    put_u2(out, attributes.len() as u16);
    for (name, info) in attributes {
        put_u2(out, *name);
        out.extend_from_slice(&(info.len() as u32).to_be_bytes());
        out.extend_from_slice(info);
    }
}

fn put_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

#[derive(Default)]
struct PoolWriter {
    bytes: Vec<u8>,
    next_index: u16,
    utf8: HashMap<String, u16>,
    classes: HashMap<String, u16>,
}

impl PoolWriter {
    fn alloc(&mut self, slots: u16) -> u16 {
        if self.next_index == 0 {
            self.next_index = 1;
        }
        let index = self.next_index;
        self.next_index += slots;
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&idx) = self.utf8.get(value) {
            return idx;
        }
        let idx = self.alloc(1);
        self.bytes.push(1);
        let encoded = encode_modified_utf8(value);
        put_u2(&mut self.bytes, encoded.len() as u16);
        self.bytes.extend_from_slice(&encoded);
        self.utf8.insert(value.to_string(), idx);
        idx
    }

    fn class(&mut self, name: &str) -> u16 {
        if let Some(&idx) = self.classes.get(name) {
            return idx;
        }
        let name_idx = self.utf8(name);
        let idx = self.alloc(1);
        self.bytes.push(7);
        put_u2(&mut self.bytes, name_idx);
        self.classes.insert(name.to_string(), idx);
        idx
    }

    fn constant(&mut self, constant: &Constant) -> u16 {
        match constant {
            Constant::Int(v) => {
                let idx = self.alloc(1);
                self.bytes.push(3);
                self.bytes.extend_from_slice(&v.to_be_bytes());
                idx
            }
            Constant::Float(v) => {
                let idx = self.alloc(1);
                self.bytes.push(4);
                self.bytes.extend_from_slice(&v.to_bits().to_be_bytes());
                idx
            }
            Constant::Long(v) => {
                let idx = self.alloc(2);
                self.bytes.push(5);
                self.bytes.extend_from_slice(&v.to_be_bytes());
                idx
            }
            Constant::Double(v) => {
                let idx = self.alloc(2);
                self.bytes.push(6);
                self.bytes.extend_from_slice(&v.to_bits().to_be_bytes());
                idx
            }
            Constant::String(s) => {
                let utf8 = self.utf8(s);
                let idx = self.alloc(1);
                self.bytes.push(8);
                put_u2(&mut self.bytes, utf8);
                idx
            }
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        put_u2(out, self.next_index.max(1));
        out.extend_from_slice(&self.bytes);
    }
}

fn encode_modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}
