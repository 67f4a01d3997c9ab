//! Utilities shared by foxvm tests.
//!
//! [`ClassFileBuilder`] assembles real `.class` bytes so parser, classpath and
//! end-to-end linking tests do not need checked-in binaries or a `javac`.

mod assembler;

#[cfg(feature = "fixture-fs")]
mod fixture_fs;

pub use assembler::{ClassFileBuilder, Constant};

#[cfg(feature = "fixture-fs")]
pub use fixture_fs::*;
