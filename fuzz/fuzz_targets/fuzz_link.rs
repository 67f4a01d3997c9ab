#![no_main]

use foxvm_classfile::ClassFile;
use foxvm_link::{ClassGraph, ClassOrigin, ClassRecord, Linker};
use libfuzzer_sys::fuzz_target;

mod utils;

// Inputs are split on this marker so one run can carry a small hierarchy of classes.
const SEPARATOR: &[u8] = b"\xca\xfe\xd0\x0d";

fuzz_target!(|data: &[u8]| {
    let data = &data[..data.len().min(utils::MAX_INPUT_SIZE)];

    let mut graph = ClassGraph::with_minimal_runtime();
    let mut rest = data;
    loop {
        let (chunk, tail) = match rest.windows(SEPARATOR.len()).position(|w| w == SEPARATOR) {
            Some(at) => (&rest[..at], Some(&rest[at + SEPARATOR.len()..])),
            None => (rest, None),
        };
        if let Ok(class) = ClassFile::parse(chunk) {
            graph.add_class(
                ClassRecord::from_classfile(class, ClassOrigin::Application),
                ClassOrigin::Application,
            );
        }
        match tail {
            Some(tail) => rest = tail,
            None => break,
        }
    }

    let mut linker = Linker::new(&mut graph);
    for id in linker.graph().classes(ClassOrigin::Application) {
        // Errors are expected; panics and broken rollbacks are not.
        if linker.link(id).is_ok() {
            let info = linker.graph().class(id);
            for (index, &method) in info.vtable.iter().enumerate() {
                assert_eq!(info.vtable.iter().position(|&m| m == method), Some(index));
            }
        }
    }
});
