//! Locating the Payload project whose Landing global gets patched.
//!
//! Priority order:
//! 1. Explicit `--project` flag
//! 2. `LANDING_UNTAB_PROJECT` environment variable
//! 3. Nearest ancestor of the current directory whose `package.json`
//!    depends on `payload`
//! 4. The current directory itself

use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

pub const PROJECT_ENV: &str = "LANDING_UNTAB_PROJECT";

/// Package that marks a directory as a Payload project.
const PAYLOAD_PACKAGE: &str = "payload";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("project root {path} is not accessible: {source}")]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot determine current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    Flag,
    Env,
    Detected,
    CurrentDir,
}

impl fmt::Display for RootSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RootSource::Flag => "--project",
            RootSource::Env => PROJECT_ENV,
            RootSource::Detected => "auto-detected",
            RootSource::CurrentDir => "current directory",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    pub path: PathBuf,
    pub source: RootSource,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct PackageManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Resolve the project root from the process environment.
pub fn resolve(explicit: Option<&Path>) -> Result<ProjectRoot, ProjectError> {
    let cwd = env::current_dir().map_err(ProjectError::CurrentDir)?;
    let from_env = env::var_os(PROJECT_ENV);
    resolve_root(explicit, from_env.as_deref(), &cwd)
}

/// Resolve the project root from explicit inputs.
pub fn resolve_root(
    explicit: Option<&Path>,
    from_env: Option<&OsStr>,
    cwd: &Path,
) -> Result<ProjectRoot, ProjectError> {
    if let Some(path) = explicit {
        return canonical(path).map(|path| ProjectRoot {
            path,
            source: RootSource::Flag,
        });
    }

    if let Some(value) = from_env.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        if path.is_dir() {
            return canonical(&path).map(|path| ProjectRoot {
                path,
                source: RootSource::Env,
            });
        }
        warn!(path = %path.display(), "{PROJECT_ENV} is set but is not a directory, ignoring");
    }

    if let Some(path) = detect_payload_root(cwd) {
        return canonical(&path).map(|path| ProjectRoot {
            path,
            source: RootSource::Detected,
        });
    }

    canonical(cwd).map(|path| ProjectRoot {
        path,
        source: RootSource::CurrentDir,
    })
}

/// Walk up from `start` looking for a `package.json` that depends on Payload.
pub fn detect_payload_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| is_payload_project(dir))
        .map(Path::to_path_buf)
}

/// Whether `dir` has a `package.json` listing `payload` as a dependency.
pub fn is_payload_project(dir: &Path) -> bool {
    let manifest_path = dir.join("package.json");
    let Ok(raw) = fs::read_to_string(&manifest_path) else {
        return false;
    };

    let manifest: PackageManifest = match serde_json::from_str(&raw) {
        Ok(manifest) => manifest,
        Err(err) => {
            debug!(
                path = %manifest_path.display(),
                error = %err,
                "skipping unparseable package.json"
            );
            return false;
        }
    };

    let found = manifest.dependencies.contains_key(PAYLOAD_PACKAGE)
        || manifest.dev_dependencies.contains_key(PAYLOAD_PACKAGE);
    if found {
        debug!(
            path = %dir.display(),
            package = manifest.name.as_deref().unwrap_or("<unnamed>"),
            "found Payload project"
        );
    }
    found
}

fn canonical(path: &Path) -> Result<PathBuf, ProjectError> {
    path.canonicalize()
        .map_err(|source| ProjectError::Inaccessible {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name":"creche","dependencies":{"payload":"^3.0.0","next":"15.0.0"}}"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("src/globals")).unwrap();
        dir
    }

    #[test]
    fn explicit_flag_wins() {
        let project = payload_project();
        let other = tempfile::tempdir().unwrap();

        let root = resolve_root(
            Some(other.path()),
            Some(project.path().as_os_str()),
            project.path(),
        )
        .unwrap();
        assert_eq!(root.path, other.path().canonicalize().unwrap());
        assert_eq!(root.source, RootSource::Flag);
    }

    #[test]
    fn missing_explicit_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_root(Some(missing.as_path()), None, dir.path()).unwrap_err();
        assert!(matches!(err, ProjectError::Inaccessible { .. }));
    }

    #[test]
    fn env_var_used_when_it_points_at_a_directory() {
        let project = payload_project();
        let cwd = tempfile::tempdir().unwrap();

        let root = resolve_root(None, Some(project.path().as_os_str()), cwd.path()).unwrap();
        assert_eq!(root.source, RootSource::Env);
    }

    #[test]
    fn bogus_env_var_falls_through_to_detection() {
        let project = payload_project();
        let nested = project.path().join("src/globals");

        let root = resolve_root(None, Some(OsStr::new("/definitely/not/here")), &nested).unwrap();
        assert_eq!(root.path, project.path().canonicalize().unwrap());
        assert_eq!(root.source, RootSource::Detected);
    }

    #[test]
    fn falls_back_to_current_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), r#"{"dependencies":{"react":"18"}}"#).unwrap();

        // An unrelated ancestor could be a Payload project on the test machine,
        // so only assert on the source when detection found nothing.
        let root = resolve_root(None, None, dir.path()).unwrap();
        if root.source == RootSource::CurrentDir {
            assert_eq!(root.path, dir.path().canonicalize().unwrap());
        }
    }

    #[test]
    fn dev_dependency_counts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"devDependencies":{"payload":"3.1.0"}}"#,
        )
        .unwrap();
        assert!(is_payload_project(dir.path()));
    }

    #[test]
    fn broken_manifest_is_not_a_project() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{ not json").unwrap();
        assert!(!is_payload_project(dir.path()));
        assert!(!is_payload_project(&dir.path().join("missing")));
    }
}
