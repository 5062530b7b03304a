use crate::rules::ResultText;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

/// Snapshot of a file's full contents at read time.
///
/// Carries the path it was read from and an xxh3 hash of the bytes so the
/// write-back can detect a file that changed underneath us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    path: PathBuf,
    content: String,
    hash: u64,
}

impl SourceText {
    /// Build a snapshot from contents already in memory.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            hash: xxh3_64(content.as_bytes()),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }
}

/// File access failures. Nothing here is recovered from.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not valid UTF-8: {source}")]
    Utf8 {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("{0} is not a regular file")]
    NotAFile(PathBuf),

    #[error("refusing to write {found}: text was read from {expected}")]
    TargetMismatch { expected: PathBuf, found: PathBuf },

    #[error("{path} changed on disk since it was read (xxh3 {expected:016x} -> {found:016x})")]
    ChangedOnDisk {
        path: PathBuf,
        expected: u64,
        found: u64,
    },
}

impl TextError {
    /// Path the failure refers to.
    pub fn path(&self) -> &Path {
        match self {
            TextError::Read { path, .. }
            | TextError::Write { path, .. }
            | TextError::Utf8 { path, .. }
            | TextError::ChangedOnDisk { path, .. } => path.as_path(),
            TextError::NotAFile(path) => path.as_path(),
            TextError::TargetMismatch { found, .. } => found.as_path(),
        }
    }
}

/// Outcome of writing a [`ResultText`] back to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "SaveOutcome tells whether the file was touched"]
pub enum SaveOutcome {
    /// New contents were written
    Written { file: PathBuf, bytes: usize },
    /// Result equals what is on disk; the file was left alone
    Unchanged { file: PathBuf },
}

/// Read the whole file at `path`.
///
/// Fails if the path is missing, unreadable, not a regular file, or not UTF-8.
/// Never creates anything.
pub fn load_text(path: impl AsRef<Path>) -> Result<SourceText, TextError> {
    let path = path.as_ref();

    let metadata = fs::metadata(path).map_err(|source| TextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(TextError::NotAFile(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| TextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let hash = xxh3_64(&bytes);
    let content = String::from_utf8(bytes).map_err(|e| TextError::Utf8 {
        path: path.to_path_buf(),
        source: e.utf8_error(),
    })?;

    debug!(path = %path.display(), bytes = content.len(), hash, "loaded source text");

    Ok(SourceText {
        path: path.to_path_buf(),
        content,
        hash,
    })
}

/// Overwrite the file at `path` with the transformed text.
///
/// `path` must be the path the text was loaded from, and the file must still
/// hold the bytes that were loaded. The write is atomic (tempfile + fsync +
/// rename) and keeps the original permissions. A result identical to the
/// source is not written at all.
pub fn save_text(path: impl AsRef<Path>, text: &ResultText) -> Result<SaveOutcome, TextError> {
    let path = path.as_ref();

    if path != text.origin() {
        return Err(TextError::TargetMismatch {
            expected: text.origin().to_path_buf(),
            found: path.to_path_buf(),
        });
    }

    let metadata = fs::metadata(path).map_err(|source| TextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if !metadata.is_file() {
        return Err(TextError::NotAFile(path.to_path_buf()));
    }

    let on_disk = fs::read(path).map_err(|source| TextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let found = xxh3_64(&on_disk);
    if found != text.origin_hash() {
        return Err(TextError::ChangedOnDisk {
            path: path.to_path_buf(),
            expected: text.origin_hash(),
            found,
        });
    }

    if !text.is_changed() {
        debug!(path = %path.display(), "result identical to source, skipping write");
        return Ok(SaveOutcome::Unchanged {
            file: path.to_path_buf(),
        });
    }

    atomic_write(path, text.as_str().as_bytes(), metadata.permissions()).map_err(|source| {
        TextError::Write {
            path: path.to_path_buf(),
            source,
        }
    })?;

    // Bump mtime so file watchers and the type generator pick the change up
    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now).map_err(|source| TextError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), bytes = text.as_str().len(), "wrote result text");

    Ok(SaveOutcome::Written {
        file: path.to_path_buf(),
        bytes: text.as_str().len(),
    })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write lands or the original file is left as it was.
fn atomic_write(
    path: &Path,
    content: &[u8],
    permissions: fs::Permissions,
) -> Result<(), std::io::Error> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().set_permissions(permissions)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
