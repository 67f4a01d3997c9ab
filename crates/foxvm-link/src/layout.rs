//! Static and instance field layout.
//!
//! Fields are grouped into five width buckets so that same-width primitives sit together and
//! references form a contiguous tail the collector can scan on its own.

use foxvm_classfile::{BaseType, FieldType};
use serde::Serialize;

use crate::info::{FieldInfo, FieldRef, PreResolvedField};
use crate::graph::ClassId;

/// Layout bucket of a field, in layout order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    /// `double`, `long`
    Wide,
    /// `int`, `float`
    Word,
    /// `short`, `char`
    Half,
    /// `boolean`, `byte`
    Byte,
    /// objects and arrays
    Reference,
}

impl FieldCategory {
    pub fn of(ty: &FieldType) -> Self {
        match ty {
            FieldType::Base(BaseType::Double | BaseType::Long) => FieldCategory::Wide,
            FieldType::Base(BaseType::Int | BaseType::Float) => FieldCategory::Word,
            FieldType::Base(BaseType::Short | BaseType::Char) => FieldCategory::Half,
            FieldType::Base(BaseType::Boolean | BaseType::Byte) => FieldCategory::Byte,
            FieldType::Object(_) | FieldType::Array(_) => FieldCategory::Reference,
        }
    }

    /// Storage width in bytes; references are counted as one pointer on a 64-bit target.
    pub fn width(self) -> usize {
        match self {
            FieldCategory::Wide | FieldCategory::Reference => 8,
            FieldCategory::Word => 4,
            FieldCategory::Half => 2,
            FieldCategory::Byte => 1,
        }
    }
}

/// Orders `fields` of `class` by bucket, keeping declaration order inside a bucket.
fn sorted(class: ClassId, fields: &[FieldInfo], want_static: bool) -> Vec<PreResolvedField> {
    let mut out: Vec<PreResolvedField> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_static() == want_static)
        .map(|(index, f)| PreResolvedField {
            field: FieldRef {
                class,
                index: index as u32,
            },
            is_reference: f.is_reference,
            category: f.category,
        })
        .collect();
    // `sort_by_key` is stable.
    out.sort_by_key(|f| f.category);
    out
}

pub(crate) fn static_layout(class: ClassId, fields: &[FieldInfo]) -> Vec<PreResolvedField> {
    sorted(class, fields, true)
}

/// The superclass's finished instance layout followed by `class`'s own sorted instance fields.
pub(crate) fn instance_layout(
    inherited: &[PreResolvedField],
    class: ClassId,
    fields: &[FieldInfo],
) -> Vec<PreResolvedField> {
    let own = sorted(class, fields, false);
    let mut out = Vec::with_capacity(inherited.len() + own.len());
    out.extend_from_slice(inherited);
    out.extend(own);
    out
}
