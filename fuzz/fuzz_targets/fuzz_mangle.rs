#![no_main]

use foxvm_link::mangle;
use libfuzzer_sys::fuzz_target;

mod utils;

fuzz_target!(|data: &[u8]| {
    let Some(text) = utils::truncate_utf8(data) else {
        return;
    };

    for mangled in [
        mangle::c_identifier(text),
        mangle::mangle_class_name(text),
        mangle::jni_short_name(text, text),
    ] {
        assert!(mangled
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
});
