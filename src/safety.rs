//! Write guard for the Payload project.
//!
//! The target path is built from the project root plus the rule set's
//! `target`, so the write can only land somewhere else through a symlinked
//! `Landing.ts` or `src/globals`. Links resolving outside the project, or
//! into a directory other tools regenerate, are refused before anything is
//! written.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directories whose contents are regenerated or managed by other tools.
/// Editing a `Landing.ts` inside them would be lost or corrupt the project.
const GENERATED_DIRS: &[(&str, &str)] = &[
    ("node_modules", "installed npm packages"),
    (".next", "Next.js build output"),
    (".git", "git repository metadata"),
    ("dist", "compiled Payload output"),
    ("build", "compiled Payload output"),
];

/// Keeps the Landing global write inside the project's own sources.
#[derive(Debug, Clone)]
pub struct ProjectGuard {
    /// Canonical project root
    project_root: PathBuf,
    /// Canonical generated directories that exist, with what they hold
    generated: Vec<(PathBuf, &'static str)>,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside project: {path} (project: {project})")]
    OutsideProject { path: PathBuf, project: PathBuf },

    #[error("Path is inside {dir} ({reason}): {path}")]
    GeneratedDir {
        path: PathBuf,
        dir: PathBuf,
        reason: &'static str,
    },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl ProjectGuard {
    /// Create a guard rooted at `project_root`, resolving symlinks.
    pub fn new(project_root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let project_root = project_root.as_ref().canonicalize()?;

        let generated = GENERATED_DIRS
            .iter()
            .filter_map(|(dir, reason)| {
                let path = project_root.join(dir).canonicalize().ok()?;
                Some((path, *reason))
            })
            .collect();

        Ok(Self {
            project_root,
            generated,
        })
    }

    /// Check that `path` resolves to a file the project owns. Relative paths
    /// resolve against the project root.
    ///
    /// Returns the canonical absolute path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();

        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        };

        let canonical = absolute.canonicalize()?;
        self.check_canonical(&canonical)?;

        Ok(canonical)
    }

    /// Re-check right before the write; the symlink may have been swapped
    /// since the file was read.
    pub fn revalidate(&self, path: &Path) -> Result<PathBuf, SafetyError> {
        let canonical = path.canonicalize()?;
        self.check_canonical(&canonical)?;
        Ok(canonical)
    }

    fn check_canonical(&self, canonical: &Path) -> Result<(), SafetyError> {
        if !canonical.starts_with(&self.project_root) {
            return Err(SafetyError::OutsideProject {
                path: canonical.to_path_buf(),
                project: self.project_root.clone(),
            });
        }

        for (dir, reason) in &self.generated {
            if canonical.starts_with(dir) {
                return Err(SafetyError::GeneratedDir {
                    path: canonical.to_path_buf(),
                    dir: dir.clone(),
                    reason: *reason,
                });
            }
        }

        Ok(())
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}
