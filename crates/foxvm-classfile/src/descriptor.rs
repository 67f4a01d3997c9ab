use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            b'B' => BaseType::Byte,
            b'C' => BaseType::Char,
            b'D' => BaseType::Double,
            b'F' => BaseType::Float,
            b'I' => BaseType::Int,
            b'J' => BaseType::Long,
            b'S' => BaseType::Short,
            b'Z' => BaseType::Boolean,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Base(BaseType),
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Object and array types are references; everything else is a primitive value.
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Object(_) | FieldType::Array(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Type(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub return_type: ReturnType,
}

pub fn parse_field_descriptor(desc: &str) -> Result<FieldType> {
    match parse_field_type(desc.as_bytes()) {
        Some((ty, [])) => Ok(ty),
        _ => Err(Error::InvalidDescriptor(desc.to_string())),
    }
}

pub fn parse_method_descriptor(desc: &str) -> Result<MethodDescriptor> {
    let invalid = || Error::InvalidDescriptor(desc.to_string());

    let mut rest = desc.as_bytes().strip_prefix(b"(").ok_or_else(invalid)?;
    let mut params = Vec::new();
    loop {
        match rest {
            [b')', tail @ ..] => {
                rest = tail;
                break;
            }
            [] => return Err(invalid()),
            _ => {
                let (param, tail) = parse_field_type(rest).ok_or_else(invalid)?;
                params.push(param);
                rest = tail;
            }
        }
    }

    let return_type = match rest {
        [b'V'] => ReturnType::Void,
        _ => match parse_field_type(rest) {
            Some((ty, [])) => ReturnType::Type(ty),
            _ => return Err(invalid()),
        },
    };

    Ok(MethodDescriptor { params, return_type })
}

fn parse_field_type(input: &[u8]) -> Option<(FieldType, &[u8])> {
    let (&tag, rest) = input.split_first()?;
    match tag {
        b'L' => {
            let end = rest.iter().position(|&b| b == b';')?;
            if end == 0 {
                return None;
            }
            let name = std::str::from_utf8(&rest[..end]).ok()?;
            Some((FieldType::Object(name.to_string()), &rest[end + 1..]))
        }
        b'[' => {
            let (component, rest) = parse_field_type(rest)?;
            Some((FieldType::Array(Box::new(component)), rest))
        }
        _ => Some((FieldType::Base(BaseType::from_tag(tag)?), rest)),
    }
}
