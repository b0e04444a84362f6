//! Deployment archives and the modules they install into.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{DeployError, DeployResult};

/// File extension of deployment archives.
pub const ARCHIVE_EXTENSION: &str = "sar";

/// A named package file awaiting installation.
///
/// The module name is the file name with the `.sar` extension stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentArchive {
    path: PathBuf,
    name: String,
}

impl DeploymentArchive {
    /// Validate `path` as a deployment archive.
    ///
    /// Only the file name is inspected; nothing on disk is touched.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidArchive`] if the extension is not
    /// `.sar` or the remaining name is not usable as a module name.
    pub fn new(path: impl Into<PathBuf>) -> DeployResult<Self> {
        let path = path.into();

        let has_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if !has_extension {
            return Err(DeployError::invalid(
                &path,
                format!("expected a .{ARCHIVE_EXTENSION} file"),
            ));
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_owned();
        validate_module_name(&name).map_err(|message| DeployError::invalid(&path, message))?;

        Ok(Self { path, name })
    }

    /// Path to the archive file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Module name derived from the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hex BLAKE3 digest of the archive contents.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidArchive`] if the archive cannot be read.
    pub fn digest(&self) -> DeployResult<String> {
        digest_file(&self.path).map_err(|e| DeployError::invalid(&self.path, e.to_string()))
    }
}

/// Hex BLAKE3 digest of a file, streamed.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn digest_file(path: &Path) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    let mut file = File::open(path)?;
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Check that `name` can serve as a module directory name.
///
/// # Errors
///
/// Returns a description of the problem if the name is empty, hidden, or
/// not a single plain path component.
pub fn validate_module_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("module name is empty".into());
    }
    if name.starts_with('.') {
        return Err(format!("module name '{name}' must not start with '.'"));
    }
    if name.contains(['/', '\\']) || name.chars().any(char::is_control) {
        return Err(format!("module name '{name}' contains invalid characters"));
    }
    Ok(())
}

/// A live, unpacked module under the applications root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Module name.
    pub name: String,
    /// `<applications_root>/<name>`.
    pub root: PathBuf,
    /// Hex BLAKE3 digest of the archive it was installed from.
    pub digest: String,
    /// When the install completed.
    pub installed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_file() {
        let archive = DeploymentArchive::new("/drop/demo.sar").unwrap();
        assert_eq!(archive.name(), "demo");
        assert_eq!(archive.path(), Path::new("/drop/demo.sar"));
    }

    #[test]
    fn test_wrong_extension_rejected() {
        let result = DeploymentArchive::new("/drop/demo.zip");
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));

        let result = DeploymentArchive::new("/drop/demo");
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));
    }

    #[test]
    fn test_unusable_names_rejected() {
        assert!(DeploymentArchive::new("/drop/.sar").is_err());
        assert!(DeploymentArchive::new("/drop/.hidden.sar").is_err());
        assert!(validate_module_name("a/b").is_err());
        assert!(validate_module_name("shop").is_ok());
    }

    #[test]
    fn test_digest_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.sar");
        std::fs::write(&path, b"payload").unwrap();

        let archive = DeploymentArchive::new(&path).unwrap();
        assert_eq!(
            archive.digest().unwrap(),
            blake3::hash(b"payload").to_hex().to_string()
        );
    }
}
