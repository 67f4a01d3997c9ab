//! Loads class directories and jars into a [`ClassGraph`].

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use foxvm_classfile::ClassFile;
use foxvm_link::{ClassGraph, ClassOrigin, ClassRecord};

#[derive(Debug, Error)]
pub enum ClasspathError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("{path}: classfile error: {source}")]
    ClassFile {
        path: String,
        #[source]
        source: foxvm_classfile::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClasspathEntry {
    ClassDir(PathBuf),
    Jar(PathBuf),
}

impl ClasspathEntry {
    /// `.jar` and `.zip` files are archives; anything else is a class directory.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_archive = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jar") || ext.eq_ignore_ascii_case("zip"));
        if is_archive {
            ClasspathEntry::Jar(path)
        } else {
            ClasspathEntry::ClassDir(path)
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ClasspathEntry::ClassDir(p) | ClasspathEntry::Jar(p) => p,
        }
    }

    /// Parses every class of this entry, in a deterministic order.
    pub fn read_classes(&self, origin: ClassOrigin) -> Result<Vec<ClassRecord>, ClasspathError> {
        match self {
            ClasspathEntry::ClassDir(dir) => read_class_dir(dir, origin),
            ClasspathEntry::Jar(path) => read_jar(path, origin),
        }
    }
}

/// Adds the classes of `entries` to `graph` under `origin`, returning how many were parsed.
///
/// Earlier entries win when two define the same class name.
pub fn load_into(
    graph: &mut ClassGraph,
    entries: &[ClasspathEntry],
    origin: ClassOrigin,
) -> Result<usize, ClasspathError> {
    let mut loaded = 0;
    for entry in entries {
        let records = entry.read_classes(origin)?;
        tracing::debug!(
            target = "foxvm.classpath",
            path = %entry.path().display(),
            classes = records.len(),
            ?origin,
            "read classpath entry"
        );
        loaded += records.len();
        for record in records {
            graph.add_class(record, origin);
        }
    }
    Ok(loaded)
}

fn is_ignored_class(internal_name: &str) -> bool {
    internal_name == "module-info"
        || internal_name == "package-info"
        || internal_name.ends_with("/package-info")
}

fn parse(path: &str, bytes: &[u8], origin: ClassOrigin) -> Result<Option<ClassRecord>, ClasspathError> {
    let class = ClassFile::parse(bytes).map_err(|source| ClasspathError::ClassFile {
        path: path.to_owned(),
        source,
    })?;
    if is_ignored_class(&class.this_class) {
        return Ok(None);
    }
    Ok(Some(ClassRecord::from_classfile(class, origin)))
}

fn read_class_dir(dir: &Path, origin: ClassOrigin) -> Result<Vec<ClassRecord>, ClasspathError> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.map_err(|err| {
            err.into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop in class directory"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension() != Some(OsStr::new("class")) {
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        let path = entry.path().display().to_string();
        if let Some(record) = parse(&path, &bytes, origin)? {
            out.push(record);
        }
    }
    Ok(out)
}

fn read_jar(path: &Path, origin: ClassOrigin) -> Result<Vec<ClassRecord>, ClasspathError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut out = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if !file.is_file() {
            continue;
        }
        let name = file.name().to_owned();
        // Multi-release variants under META-INF/versions are not selected.
        if !name.ends_with(".class") || name.starts_with("META-INF/") {
            continue;
        }

        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;
        let location = format!("{}!/{name}", path.display());
        if let Some(record) = parse(&location, &bytes, origin)? {
            out.push(record);
        }
    }
    Ok(out)
}
