//! Driver for the `foxvm-translator` binary: load the classpath, pre-resolve every application
//! class and report what the code generator would receive.

use std::fmt;

use serde::Serialize;

use foxvm_classpath::{load_into, ClasspathEntry, ClasspathError};
use foxvm_config::ClasspathConfig;
use foxvm_link::{ClassGraph, ClassId, ClassOrigin, LinkError, LinkOptions, Linker};

/// Per-class report of a linked application class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub mangled_name: String,
    pub kind: &'static str,
    pub super_class: Option<String>,
    pub static_fields: usize,
    pub instance_fields: usize,
    pub reference_slots: usize,
    pub vtable_len: usize,
    /// Interfaces with an ivtable entry, in entry order.
    pub ivtable: Vec<String>,
}

impl ClassSummary {
    fn new(graph: &ClassGraph, id: ClassId) -> Self {
        let info = graph.class(id);
        Self {
            name: info.name.clone(),
            mangled_name: info.mangled_name.clone(),
            kind: if info.is_interface() {
                "interface"
            } else {
                "class"
            },
            super_class: info.super_class.map(|s| graph.name(s).to_string()),
            static_fields: info.static_fields.len(),
            instance_fields: info.instance_fields.len(),
            reference_slots: info.reference_slots().count(),
            vtable_len: info.vtable.len(),
            ivtable: info
                .ivtable
                .iter()
                .map(|e| graph.name(e.interface).to_string())
                .collect(),
        }
    }
}

impl fmt::Display for ClassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} ({})", self.kind, self.name, self.mangled_name)?;
        if let Some(super_class) = &self.super_class {
            writeln!(f, "  extends: {super_class}")?;
        }
        writeln!(
            f,
            "  fields: {} static, {} instance ({} references)",
            self.static_fields, self.instance_fields, self.reference_slots
        )?;
        write!(f, "  vtable: {} slots", self.vtable_len)?;
        if !self.ivtable.is_empty() {
            write!(f, "\n  ivtable: {}", self.ivtable.join(", "))?;
        }
        Ok(())
    }
}

/// Builds the class graph: application entries first, then the runtime library.
///
/// With no runtime entries, a minimal `java/lang/Object` stands in for the runtime library.
pub fn load_graph(classpath: &ClasspathConfig) -> Result<ClassGraph, ClasspathError> {
    let mut graph = if classpath.runtime.is_empty() {
        ClassGraph::with_minimal_runtime()
    } else {
        ClassGraph::new()
    };

    let application: Vec<ClasspathEntry> = classpath
        .application
        .iter()
        .map(ClasspathEntry::from_path)
        .collect();
    let runtime: Vec<ClasspathEntry> = classpath
        .runtime
        .iter()
        .map(ClasspathEntry::from_path)
        .collect();

    let app_classes = load_into(&mut graph, &application, ClassOrigin::Application)?;
    let runtime_classes = load_into(&mut graph, &runtime, ClassOrigin::Runtime)?;
    tracing::info!(
        target = "foxvm.cli",
        application = app_classes,
        runtime = runtime_classes,
        "loaded classpath"
    );
    Ok(graph)
}

/// Links every application class. Runtime classes are linked only when reached.
pub fn link_application(
    graph: &mut ClassGraph,
    options: &LinkOptions,
) -> Result<Vec<ClassSummary>, LinkError> {
    Linker::with_options(graph, options.clone()).link_all(ClassOrigin::Application)?;
    Ok(graph
        .classes(ClassOrigin::Application)
        .into_iter()
        .map(|id| ClassSummary::new(graph, id))
        .collect())
}
