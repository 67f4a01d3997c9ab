//! Stable identifiers for generated code.
//!
//! These names are part of the contract between the linker's output and the code generator
//! and runtime; they are formatting only and take no part in linking decisions.

use std::fmt::Write;

use crate::info::{CLINIT, INIT};

/// Maps a JVM name onto the characters allowed in a C identifier.
///
/// `/`, space, `$`, `-` and `_` become `_`; ASCII letters and digits are kept; every other
/// character is spelled as `uXXXX` (or `UXXXXXXXX` outside the basic multilingual plane).
pub fn c_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' => out.push(c),
            '/' | ' ' | '$' | '-' | '_' => out.push('_'),
            c if (c as u32) <= 0xFFFF => {
                let _ = write!(out, "u{:04x}", c as u32);
            }
            c => {
                let _ = write!(out, "U{:08x}", c as u32);
            }
        }
    }
    out
}

/// `aaa/bbbb/ccccc/DDD$EE$FFF` → `14Paaa_bbbb_ccccc10CDDD_EE_FFF`; `Main` → `0P4CMain`.
pub fn mangle_class_name(class_name: &str) -> String {
    let (package, simple) = class_name.rsplit_once('/').unwrap_or(("", class_name));
    let package = c_identifier(package);
    let simple = c_identifier(simple);
    format!("{}P{package}{}C{simple}", package.len(), simple.len())
}

pub fn mangle_field_name(field_name: &str) -> String {
    let ident = c_identifier(field_name);
    format!("{}F{ident}", ident.len())
}

/// Constructors and class initializers get fixed names; other methods are `<len>M<ident>`.
/// Overloads share a name: the descriptor is mangled separately by the code generator.
pub fn mangle_method_name(method_name: &str) -> String {
    match method_name {
        INIT => "4IINIT".to_string(),
        CLINIT => "6ICLINIT".to_string(),
        _ => {
            let ident = c_identifier(method_name);
            format!("{}M{ident}", ident.len())
        }
    }
}

/// JNI short name of a native method: `Java_<class>_<method>`.
pub fn jni_short_name(class_name: &str, method_name: &str) -> String {
    format!(
        "Java_{}_{}",
        jni_identifier(class_name),
        jni_identifier(method_name)
    )
}

/// JNI long name: the short name followed by `__` and the mangled argument descriptor.
pub fn jni_long_name(class_name: &str, method_name: &str, descriptor: &str) -> String {
    let args = descriptor
        .strip_prefix('(')
        .and_then(|d| d.rsplit_once(')'))
        .map_or("", |(args, _)| args);
    format!(
        "{}__{}",
        jni_short_name(class_name, method_name),
        jni_identifier(args)
    )
}

fn jni_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' => out.push(c),
            '/' => out.push('_'),
            '_' => out.push_str("_1"),
            ';' => out.push_str("_2"),
            '[' => out.push_str("_3"),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "_0{:04x}", unit);
                }
            }
        }
    }
    out
}
