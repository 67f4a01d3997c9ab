//! Access control (JVMS 5.4.4), without run-time packages: two classes share a package when
//! their internal names have the same package prefix.

use crate::graph::{ClassGraph, ClassId};
use crate::info::{FieldRef, MethodRef};
use crate::lookup::is_subtype_of;

/// Package part of an internal class name: `java/lang` for `java/lang/Object`, empty for the
/// unnamed package.
pub fn package_name(class_name: &str) -> &str {
    class_name.rsplit_once('/').map_or("", |(package, _)| package)
}

pub fn same_package(a: &str, b: &str) -> bool {
    package_name(a) == package_name(b)
}

/// Whether `requester` may refer to class `target`. Works on unlinked classes.
pub fn can_access_class(graph: &ClassGraph, requester: ClassId, target: ClassId) -> bool {
    let flags = graph.record(target).access_flags;
    flags & foxvm_classfile::access::ACC_PUBLIC != 0
        || same_package(graph.name(requester), graph.name(target))
}

pub fn can_access_field(graph: &ClassGraph, requester: ClassId, field: FieldRef) -> bool {
    let f = graph.field(field);
    can_access_member(
        graph,
        requester,
        field.class,
        f.is_public(),
        f.is_protected(),
        f.is_private(),
    )
}

pub fn can_access_method(graph: &ClassGraph, requester: ClassId, method: MethodRef) -> bool {
    let m = graph.method(method);
    can_access_member(
        graph,
        requester,
        method.class,
        m.is_public(),
        m.is_protected(),
        m.is_private(),
    )
}

// The extra protected-instance rule (objectref must be the requester or a subclass) needs the
// run-time receiver type and is not checked.
fn can_access_member(
    graph: &ClassGraph,
    requester: ClassId,
    declaring: ClassId,
    public: bool,
    protected: bool,
    private: bool,
) -> bool {
    if public {
        return true;
    }
    if private {
        return requester == declaring;
    }
    if protected && is_subtype_of(graph, requester, declaring) {
        return true;
    }
    same_package(graph.name(requester), graph.name(declaring))
}
