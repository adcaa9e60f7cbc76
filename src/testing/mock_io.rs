//! Mock I/O helpers for testing without hand-managed files.

use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// A temporary directory that is deleted when dropped.
pub struct TempDirPath {
    temp_dir: TempDir,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of a (possibly nested) file inside this directory.
    #[must_use]
    pub fn file_path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Every file below this directory, relative and `/`-separated, sorted.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be walked.
    pub fn files(&self) -> io::Result<Vec<String>> {
        let root = self.path().to_string_lossy().into_owned();
        let pattern = format!("{}/**/*", glob::Pattern::escape(&root));
        let mut out = Vec::new();
        for entry in glob::glob(&pattern).map_err(io::Error::other)? {
            let path = entry.map_err(glob::GlobError::into_error)?;
            if path.is_file()
                && let Ok(rel) = path.strip_prefix(self.path())
            {
                out.push(
                    rel.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect::<Vec<_>>()
                        .join("/"),
                );
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Build a zip archive in memory with stored (uncompressed) members.
///
/// # Errors
/// Returns an error if the archive cannot be assembled.
///
/// # Example
///
/// ```
/// use recordshift::testing::zip_archive;
///
/// let bytes = zip_archive(&[("data.csv", b"a,b\n1,2\n".as_slice())]).unwrap();
/// assert_eq!(&bytes[..2], b"PK");
/// ```
pub fn zip_archive(members: &[(&str, &[u8])]) -> io::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, data) in members {
        zip.start_file(*name, options).map_err(io::Error::other)?;
        zip.write_all(data)?;
    }
    Ok(zip.finish().map_err(io::Error::other)?.into_inner())
}

/// Gzip `data` in memory.
///
/// # Errors
/// Returns an error if compression fails.
pub fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
