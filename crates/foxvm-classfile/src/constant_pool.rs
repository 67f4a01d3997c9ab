use crate::error::{Error, Result};
use crate::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CpEntry {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    MemberRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot of a long or double constant.
    Unusable,
}

impl CpEntry {
    fn kind(&self) -> &'static str {
        match self {
            CpEntry::Utf8(_) => "Utf8",
            CpEntry::Integer(_) => "Integer",
            CpEntry::Float(_) => "Float",
            CpEntry::Long(_) => "Long",
            CpEntry::Double(_) => "Double",
            CpEntry::Class { .. } => "Class",
            CpEntry::String { .. } => "String",
            CpEntry::MemberRef { .. } => "MemberRef",
            CpEntry::NameAndType { .. } => "NameAndType",
            CpEntry::MethodHandle { .. } => "MethodHandle",
            CpEntry::MethodType { .. } => "MethodType",
            CpEntry::Dynamic { .. } => "Dynamic",
            CpEntry::Module { .. } => "Module",
            CpEntry::Package { .. } => "Package",
            CpEntry::Unusable => "Unusable",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ConstantPool {
    // Index 0 is never valid; entries are stored 1-based.
    entries: Vec<CpEntry>,
}

impl ConstantPool {
    pub(crate) fn parse(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(CpEntry::Unusable);

        while entries.len() < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let len = reader.read_u2()? as usize;
                    CpEntry::Utf8(decode_modified_utf8(reader.read_bytes(len)?)?)
                }
                3 => CpEntry::Integer(reader.read_u4()? as i32),
                4 => CpEntry::Float(f32::from_bits(reader.read_u4()?)),
                5 => CpEntry::Long(reader.read_u8()? as i64),
                6 => CpEntry::Double(f64::from_bits(reader.read_u8()?)),
                7 => CpEntry::Class {
                    name_index: reader.read_u2()?,
                },
                8 => CpEntry::String {
                    string_index: reader.read_u2()?,
                },
                9..=11 => CpEntry::MemberRef {
                    class_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                12 => CpEntry::NameAndType {
                    name_index: reader.read_u2()?,
                    descriptor_index: reader.read_u2()?,
                },
                15 => CpEntry::MethodHandle {
                    kind: reader.read_u1()?,
                    reference_index: reader.read_u2()?,
                },
                16 => CpEntry::MethodType {
                    descriptor_index: reader.read_u2()?,
                },
                17 | 18 => CpEntry::Dynamic {
                    bootstrap_index: reader.read_u2()?,
                    name_and_type_index: reader.read_u2()?,
                },
                19 => CpEntry::Module {
                    name_index: reader.read_u2()?,
                },
                20 => CpEntry::Package {
                    name_index: reader.read_u2()?,
                },
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };

            let wide = matches!(entry, CpEntry::Long(_) | CpEntry::Double(_));
            entries.push(entry);
            if wide {
                entries.push(CpEntry::Unusable);
            }
        }

        // A wide constant in the last slot overflows the declared count.
        if entries.len() != count.max(1) {
            return Err(Error::InvalidConstantPoolIndex(count as u16));
        }

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, index: u16) -> Result<&CpEntry> {
        match self.entries.get(index as usize) {
            Some(CpEntry::Unusable) | None => Err(Error::InvalidConstantPoolIndex(index)),
            Some(entry) => Ok(entry),
        }
    }

    pub(crate) fn get_utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            CpEntry::Utf8(s) => Ok(s),
            other => Err(mismatch(index, "Utf8", other)),
        }
    }

    pub(crate) fn get_class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            CpEntry::Class { name_index } => Ok(self.get_utf8(*name_index)?.to_string()),
            other => Err(mismatch(index, "Class", other)),
        }
    }
}

fn mismatch(index: u16, expected: &'static str, found: &CpEntry) -> Error {
    Error::ConstantPoolTypeMismatch {
        index,
        expected,
        found: found.kind(),
    }
}

/// Decodes the "modified UTF-8" encoding of JVMS 4.4.7.
fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let x = bytes[i] as u16;
        if x & 0x80 == 0 {
            if x == 0 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(x);
            i += 1;
        } else if x & 0xE0 == 0xC0 {
            let y = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)? as u16;
            if y & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(((x & 0x1F) << 6) | (y & 0x3F));
            i += 2;
        } else if x & 0xF0 == 0xE0 {
            let y = *bytes.get(i + 1).ok_or(Error::InvalidModifiedUtf8)? as u16;
            let z = *bytes.get(i + 2).ok_or(Error::InvalidModifiedUtf8)? as u16;
            if y & 0xC0 != 0x80 || z & 0xC0 != 0x80 {
                return Err(Error::InvalidModifiedUtf8);
            }
            units.push(((x & 0x0F) << 12) | ((y & 0x3F) << 6) | (z & 0x3F));
            i += 3;
        } else {
            return Err(Error::InvalidModifiedUtf8);
        }
    }
    String::from_utf16(&units).map_err(|_| Error::InvalidModifiedUtf8)
}
