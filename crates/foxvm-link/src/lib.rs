//! Class linking and dispatch-table resolution for ahead-of-time translation of JVM classes.
//!
//! A [`ClassGraph`] holds every class of the program as a raw [`ClassRecord`]. The [`Linker`]
//! turns records into [`ClassInfo`]: resolved supertypes, field layouts, a vtable and an
//! ivtable. [`dispatch`] answers, per call site or field access, what the generated code must
//! do with those tables.
//!
//! ```
//! use foxvm_link::{ClassGraph, ClassOrigin, ClassRecord, Linker};
//!
//! let mut graph = ClassGraph::with_minimal_runtime();
//! let id = graph.add_class(
//!     ClassRecord::builder("demo/Point").field(0, "x", "I").field(0, "y", "I").build(),
//!     ClassOrigin::Application,
//! );
//! Linker::new(&mut graph).link(id).unwrap();
//! assert_eq!(graph.class(id).instance_fields.len(), 2);
//! ```

#![forbid(unsafe_code)]

pub mod access;
pub mod dispatch;
mod error;
mod graph;
mod info;
mod layout;
mod linker;
pub mod lookup;
pub mod mangle;
mod record;
mod vtable;

pub use crate::error::{LinkError, MemberKind, Result};
pub use crate::graph::{ClassGraph, ClassId, ClassOrigin, LinkState};
pub use crate::info::{
    ClassInfo, ClassKind, FieldInfo, FieldRef, IvTableEntry, IvTableSlot, MethodInfo, MethodRef,
    PreResolvedField, CLINIT, FINALIZE, INIT,
};
pub use crate::layout::FieldCategory;
pub use crate::linker::{LinkOptions, Linker};
pub use crate::record::{ClassRecord, ClassRecordBuilder, ClassVersion, FieldRecord, MethodRecord};

/// Internal name of the universal root class.
pub const OBJECT_CLASS: &str = "java/lang/Object";
