use std::fmt;

pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => f.write_str("field"),
            MemberKind::Method => f.write_str("method"),
        }
    }
}

/// A linkage violation. Every variant is fatal for the whole translation run.
///
/// `class` is always the class being linked (or, for call-site resolution, the class whose code
/// contains the call site).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("{class}: unable to find dependency class {dependency}")]
    UnresolvedDependency { class: String, dependency: String },

    #[error("{class}: malformed class hierarchy: {reason}")]
    MalformedHierarchy { class: String, reason: String },

    #[error("{class}: incompatible class hierarchy: {reason}")]
    IncompatibleHierarchy { class: String, reason: String },

    #[error("{class}: class is its own superclass or superinterface")]
    CircularInheritance { class: String },

    #[error("{class}: tried to access {target}")]
    IllegalAccess { class: String, target: String },

    #[error("{class}: duplicate {kind} {member}")]
    DuplicateMember {
        class: String,
        kind: MemberKind,
        member: String,
    },

    #[error("{class}: class format error: {reason}")]
    ClassFormat { class: String, reason: String },

    #[error("{class}: method {method} overrides multiple vtable slots: {slots}")]
    AmbiguousOverride {
        class: String,
        method: String,
        slots: String,
    },

    #[error("{class}: incompatible class change: {reason}")]
    IncompatibleClassChange { class: String, reason: String },

    #[error("{class}: abstract method error: {reason}")]
    AbstractMethod { class: String, reason: String },

    #[error("{class}: class has not been linked")]
    NotLinked { class: String },

    #[error("{class}: inconsistent vtable: {reason}")]
    InconsistentVtable { class: String, reason: String },

    #[error("{class}: no such field {field}")]
    NoSuchField { class: String, field: String },

    #[error("{class}: no such method {method}")]
    NoSuchMethod { class: String, method: String },
}

impl LinkError {
    /// Name of the class the error was raised for.
    pub fn class(&self) -> &str {
        match self {
            LinkError::UnresolvedDependency { class, .. }
            | LinkError::MalformedHierarchy { class, .. }
            | LinkError::IncompatibleHierarchy { class, .. }
            | LinkError::CircularInheritance { class }
            | LinkError::IllegalAccess { class, .. }
            | LinkError::DuplicateMember { class, .. }
            | LinkError::ClassFormat { class, .. }
            | LinkError::AmbiguousOverride { class, .. }
            | LinkError::IncompatibleClassChange { class, .. }
            | LinkError::AbstractMethod { class, .. }
            | LinkError::NotLinked { class }
            | LinkError::InconsistentVtable { class, .. }
            | LinkError::NoSuchField { class, .. }
            | LinkError::NoSuchMethod { class, .. } => class,
        }
    }
}
