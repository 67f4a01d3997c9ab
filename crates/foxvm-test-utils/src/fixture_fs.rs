use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Writes `<root>/<internal name>.class` for every entry, creating package directories.
pub fn write_class_dir(root: &Path, classes: &[(&str, Vec<u8>)]) -> io::Result<()> {
    for (internal_name, bytes) in classes {
        let path = root.join(format!("{internal_name}.class"));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
    }
    Ok(())
}

/// Writes a jar containing `<internal name>.class` entries (plus a manifest, like a real jar).
pub fn write_jar(path: &Path, classes: &[(&str, Vec<u8>)]) -> io::Result<()> {
    let file = fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("META-INF/MANIFEST.MF", options)
        .map_err(io::Error::other)?;
    zip.write_all(b"Manifest-Version: 1.0\n")?;

    for (internal_name, bytes) in classes {
        zip.start_file(format!("{internal_name}.class"), options)
            .map_err(io::Error::other)?;
        zip.write_all(bytes)?;
    }
    zip.finish().map_err(io::Error::other)?;
    Ok(())
}

/// A temporary directory pre-populated with class files.
pub struct TempClassDir {
    dir: TempDir,
}

impl TempClassDir {
    pub fn new(classes: &[(&str, Vec<u8>)]) -> io::Result<Self> {
        let dir = TempDir::new()?;
        write_class_dir(dir.path(), classes)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.dir.path().join(rel)
    }
}
