//! Unpacks deployment archives into live module directories.
//!
//! An install never edits a live module in place. The archive is unpacked
//! into a hidden staging directory inside the applications root, and only a
//! fully unpacked tree is swapped in:
//!
//! ```text
//! <root>/.quay-stage-XXXX/<name>   unpack here
//! <root>/<name>                    → renamed to <root>/.quay-retired-<name>-<uuid>
//! <root>/.quay-stage-XXXX/<name>   → renamed to <root>/<name>
//! <root>/.quay-retired-…           removed
//! ```
//!
//! A failure before the swap leaves the previous version in place and the
//! staging directory is removed when its guard drops.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Component, Path};

use chrono::Utc;
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::archive::{DeploymentArchive, Module, validate_module_name};
use crate::error::{DeployError, DeployResult};

/// Size of the buffer file data is streamed through.
pub const COPY_BUFFER_SIZE: usize = 8 * 1024;

/// Maximum number of entries allowed in an archive.
const MAX_ENTRY_COUNT: usize = 50_000;

/// Maximum total unpacked size (2 GB).
const MAX_EXTRACTED_SIZE: u64 = 2_000_000_000;

const STAGING_PREFIX: &str = ".quay-stage-";
const RETIRED_PREFIX: &str = ".quay-retired-";

/// Installs and removes modules under an applications root.
///
/// Installs of the same module name must not run concurrently; callers
/// serialize them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Installer;

impl Installer {
    /// Create an installer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Unpack `archive` into `<applications_root>/<name>`, replacing any
    /// previous version wholesale.
    ///
    /// Entries whose first path component equals the module name are placed
    /// relative to the applications root; all others relative to the module
    /// directory.
    ///
    /// # Errors
    ///
    /// - [`DeployError::InvalidArchive`] for a bad file name, an unreadable
    ///   or corrupt archive, or unsafe entries. Name checks happen before any
    ///   filesystem mutation.
    /// - [`DeployError::Deployment`] if staging, writing, or swapping fails.
    pub fn install(&self, archive: &Path, applications_root: &Path) -> DeployResult<Module> {
        let archive = DeploymentArchive::new(archive)?;
        let name = archive.name().to_owned();
        let digest = archive.digest()?;

        fs::create_dir_all(applications_root)
            .map_err(|e| DeployError::deployment(applications_root, e.to_string()))?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(applications_root)
            .map_err(|e| DeployError::deployment(applications_root, e.to_string()))?;

        let staged_module = staging.path().join(&name);
        fs::create_dir(&staged_module)
            .map_err(|e| DeployError::deployment(&staged_module, e.to_string()))?;

        let entries = unpack(&archive, staging.path(), &staged_module)?;
        debug!(module = %name, entries, "Unpacked archive into staging");

        let live = applications_root.join(&name);
        swap_into_place(&name, &staged_module, &live, applications_root)?;

        info!(
            module = %name,
            root = %live.display(),
            digest = %digest,
            "Installed module"
        );

        Ok(Module {
            name,
            root: live,
            digest,
            installed_at: Utc::now(),
        })
    }

    /// Delete the module directory for `name`.
    ///
    /// Returns `false` if no such module was installed.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::InvalidArchive`] for an unusable name and
    /// [`DeployError::Deployment`] if the directory cannot be removed.
    pub fn remove(&self, name: &str, applications_root: &Path) -> DeployResult<bool> {
        let dir = applications_root.join(name);
        validate_module_name(name).map_err(|message| DeployError::invalid(&dir, message))?;

        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                info!(module = %name, "Removed module directory");
                Ok(true)
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DeployError::deployment(&dir, e.to_string())),
        }
    }

    /// Delete staging and retired directories an interrupted install left
    /// under `applications_root`. Returns how many were removed.
    ///
    /// Must not run while an install is in progress under the same root.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Deployment`] if the root cannot be listed.
    /// Leftovers that cannot be deleted are logged and skipped.
    pub fn sweep(&self, applications_root: &Path) -> DeployResult<usize> {
        let entries = match fs::read_dir(applications_root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(DeployError::deployment(applications_root, e.to_string())),
        };

        let mut removed = 0usize;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_str().is_some_and(is_working_dir) {
                continue;
            }
            let path = entry.path();
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed leftover working directory");
                    removed = removed.saturating_add(1);
                },
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove leftover working directory"
                ),
            }
        }
        if removed > 0 {
            info!(count = removed, "Swept interrupted installs");
        }
        Ok(removed)
    }
}

/// Unpack every entry of `archive`. Returns the number of entries written.
fn unpack(
    archive: &DeploymentArchive,
    staging_root: &Path,
    staged_module: &Path,
) -> DeployResult<usize> {
    let source = archive.path();
    let file = File::open(source).map_err(|e| DeployError::invalid(source, e.to_string()))?;
    let mut tar = Archive::new(GzDecoder::new(file));

    let mut entry_count = 0usize;
    let mut total_size: u64 = 0;
    let mut buffer = [0u8; COPY_BUFFER_SIZE];

    let entries = tar
        .entries()
        .map_err(|e| DeployError::invalid(source, format!("failed to read entries: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| DeployError::invalid(source, format!("failed to read entry: {e}")))?;

        entry_count = entry_count.saturating_add(1);
        if entry_count > MAX_ENTRY_COUNT {
            return Err(DeployError::invalid(
                source,
                format!("archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"),
            ));
        }

        let entry_type = entry.header().entry_type();
        let entry_path = entry
            .path()
            .map_err(|e| DeployError::invalid(source, format!("bad entry path: {e}")))?
            .into_owned();

        if !is_safe_entry_type(entry_type) {
            return Err(DeployError::invalid(
                source,
                format!(
                    "unsupported entry type {entry_type:?} at {}",
                    entry_path.display()
                ),
            ));
        }
        if matches!(
            entry_type,
            tar::EntryType::XHeader | tar::EntryType::XGlobalHeader | tar::EntryType::GNULongName
        ) {
            continue;
        }
        validate_entry_path(&entry_path)
            .map_err(|message| DeployError::invalid(source, message))?;

        let target = if starts_with_module(&entry_path, archive.name()) {
            staging_root.join(&entry_path)
        } else {
            staged_module.join(&entry_path)
        };

        if entry_type.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| DeployError::deployment(&target, e.to_string()))?;
            continue;
        }

        let size = entry
            .header()
            .size()
            .map_err(|e| DeployError::invalid(source, format!("bad entry size: {e}")))?;
        total_size = total_size.saturating_add(size);
        if total_size > MAX_EXTRACTED_SIZE {
            return Err(DeployError::invalid(
                source,
                format!("archive exceeds maximum unpacked size ({MAX_EXTRACTED_SIZE} bytes)"),
            ));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DeployError::deployment(parent, e.to_string()))?;
        }
        stream_entry(&mut entry, &target, &mut buffer, source)?;
    }

    Ok(entry_count)
}

/// Copy one entry to `target` through `buffer`.
fn stream_entry(
    entry: &mut impl Read,
    target: &Path,
    buffer: &mut [u8],
    source: &Path,
) -> DeployResult<()> {
    let mut out =
        File::create(target).map_err(|e| DeployError::deployment(target, e.to_string()))?;
    loop {
        let read = match entry.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(DeployError::invalid(
                    source,
                    format!("failed to read {}: {e}", target.display()),
                ));
            },
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        out.write_all(chunk)
            .map_err(|e| DeployError::deployment(target, e.to_string()))?;
    }
    out.flush()
        .map_err(|e| DeployError::deployment(target, e.to_string()))
}

/// Replace `live` with `staged`. The previous tree is renamed aside first and
/// restored if the staged tree cannot be moved in.
fn swap_into_place(
    name: &str,
    staged: &Path,
    live: &Path,
    applications_root: &Path,
) -> DeployResult<()> {
    let retired = if live.exists() {
        let retired = applications_root.join(format!("{RETIRED_PREFIX}{name}-{}", Uuid::new_v4()));
        fs::rename(live, &retired).map_err(|e| DeployError::deployment(live, e.to_string()))?;
        Some(retired)
    } else {
        None
    };

    if let Err(e) = fs::rename(staged, live) {
        if let Some(retired) = &retired
            && let Err(restore) = fs::rename(retired, live)
        {
            warn!(
                module = %name,
                retired = %retired.display(),
                error = %restore,
                "Failed to restore previous module version"
            );
        }
        return Err(DeployError::deployment(live, e.to_string()));
    }

    if let Some(retired) = retired
        && let Err(e) = fs::remove_dir_all(&retired)
    {
        warn!(
            module = %name,
            retired = %retired.display(),
            error = %e,
            "Failed to delete retired module version"
        );
    }
    Ok(())
}

fn starts_with_module(path: &Path, name: &str) -> bool {
    path.components()
        .next()
        .is_some_and(|first| first.as_os_str() == name)
}

/// Regular files and directories, plus the metadata headers `tar` may
/// surface. Links, devices, FIFOs and sparse files are refused.
fn is_safe_entry_type(entry_type: tar::EntryType) -> bool {
    matches!(
        entry_type,
        tar::EntryType::Regular
            | tar::EntryType::Directory
            | tar::EntryType::GNULongName
            | tar::EntryType::XHeader
            | tar::EntryType::XGlobalHeader
    )
}

fn validate_entry_path(path: &Path) -> Result<(), String> {
    if path.is_absolute() {
        return Err(format!("absolute entry path {}", path.display()));
    }
    let mut normal = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(_) => normal = normal.saturating_add(1),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(format!("entry path escapes module: {}", path.display()));
            },
        }
    }
    if normal == 0 {
        return Err(format!("empty entry path {}", path.display()));
    }
    Ok(())
}

/// Whether `name` is one of the installer's own hidden working directories.
#[must_use]
pub fn is_working_dir(name: &str) -> bool {
    name.starts_with(STAGING_PREFIX) || name.starts_with(RETIRED_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;

    fn build_sar(path: &Path, files: &[(&str, &[u8])]) {
        let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    /// Build a gzip tar with a raw header name, bypassing `tar::Builder`'s
    /// own path checks.
    fn build_raw_sar(path: &Path, entry_name: &[u8], entry_type: tar::EntryType) {
        let mut header = tar::Header::new_gnu();
        {
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..entry_name.len()].copy_from_slice(entry_name);
        }
        header.set_size(0);
        header.set_mode(0o644);
        header.set_entry_type(entry_type);
        header.set_cksum();

        let mut data = header.as_bytes().to_vec();
        data.extend_from_slice(&[0u8; 1024]);

        let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
        encoder.write_all(&data).unwrap();
        encoder.finish().unwrap();
    }

    fn list_tree(root: &Path) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(&dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    out.push(
                        path.strip_prefix(root)
                            .unwrap()
                            .to_string_lossy()
                            .replace('\\', "/"),
                    );
                }
            }
        }
        out.sort();
        out
    }

    #[test]
    fn test_prefixed_and_bare_entries() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("demo.sar");
        build_sar(
            &sar,
            &[
                ("demo/public/index.html", b"<h1>hi</h1>"),
                ("assets/logo.png", b"png"),
            ],
        );
        let root = dir.path().join("apps");

        let module = Installer::new().install(&sar, &root).unwrap();

        assert_eq!(module.name, "demo");
        assert_eq!(module.root, root.join("demo"));
        assert_eq!(
            fs::read(root.join("demo/public/index.html")).unwrap(),
            b"<h1>hi</h1>"
        );
        assert_eq!(fs::read(root.join("demo/assets/logo.png")).unwrap(), b"png");
    }

    #[test]
    fn test_reinstall_leaves_no_stale_files() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("demo.sar");
        let root = dir.path().join("apps");
        let installer = Installer::new();

        build_sar(&sar, &[("old/handler.wasm", b"v1"), ("shared.txt", b"v1")]);
        installer.install(&sar, &root).unwrap();

        build_sar(&sar, &[("new/handler.wasm", b"v2"), ("shared.txt", b"v2")]);
        let module = installer.install(&sar, &root).unwrap();

        assert_eq!(
            list_tree(&module.root),
            vec!["new/handler.wasm", "shared.txt"]
        );
        assert_eq!(fs::read(root.join("demo/shared.txt")).unwrap(), b"v2");

        // No staging or retired directories left behind.
        let leftovers: Vec<_> = fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["demo"]);
    }

    #[test]
    fn test_digest_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("demo.sar");
        build_sar(&sar, &[("index.html", b"x")]);

        let module = Installer::new()
            .install(&sar, &dir.path().join("apps"))
            .unwrap();
        assert_eq!(module.digest, crate::archive::digest_file(&sar).unwrap());
    }

    #[test]
    fn test_wrong_extension_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let zip = dir.path().join("demo.zip");
        fs::write(&zip, b"whatever").unwrap();
        let root = dir.path().join("apps");

        let result = Installer::new().install(&zip, &root);
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));
        assert!(!root.exists());
    }

    #[test]
    fn test_corrupt_archive_keeps_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("demo.sar");
        let root = dir.path().join("apps");
        let installer = Installer::new();

        build_sar(&sar, &[("index.html", b"v1")]);
        installer.install(&sar, &root).unwrap();

        fs::write(&sar, b"definitely not gzip").unwrap();
        let result = installer.install(&sar, &root);
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));

        assert_eq!(fs::read(root.join("demo/index.html")).unwrap(), b"v1");
        let names: Vec<_> = fs::read_dir(&root)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["demo"]);
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("evil.sar");
        build_raw_sar(&sar, b"../escape.txt", tar::EntryType::Regular);
        let root = dir.path().join("apps");

        let result = Installer::new().install(&sar, &root);
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!root.join("evil").exists());
    }

    #[test]
    fn test_symlink_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("evil.sar");
        build_raw_sar(&sar, b"link", tar::EntryType::Symlink);

        let result = Installer::new().install(&sar, &dir.path().join("apps"));
        assert!(matches!(result, Err(DeployError::InvalidArchive { .. })));
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let sar = dir.path().join("demo.sar");
        build_sar(&sar, &[("index.html", b"x")]);
        let root = dir.path().join("apps");
        let installer = Installer::new();
        installer.install(&sar, &root).unwrap();

        assert!(installer.remove("demo", &root).unwrap());
        assert!(!root.join("demo").exists());
        assert!(!installer.remove("demo", &root).unwrap());
        assert!(installer.remove("../etc", &root).is_err());
    }

    #[test]
    fn test_entry_path_validation() {
        assert!(validate_entry_path(Path::new("a/b.txt")).is_ok());
        assert!(validate_entry_path(Path::new("./a")).is_ok());
        assert!(validate_entry_path(Path::new("a/../../b")).is_err());
        assert!(validate_entry_path(Path::new("/etc/passwd")).is_err());
        assert!(validate_entry_path(Path::new(".")).is_err());
    }

    #[test]
    fn test_working_dir_names() {
        assert!(is_working_dir(".quay-stage-abc"));
        assert!(is_working_dir(".quay-retired-demo-1"));
        assert!(!is_working_dir("demo"));
    }

    #[test]
    fn test_sweep_removes_leftover_working_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("R");
        fs::create_dir_all(root.join(".quay-stage-abc/demo/lib")).unwrap();
        fs::create_dir_all(root.join(".quay-retired-demo-1")).unwrap();
        fs::create_dir_all(root.join("demo/public")).unwrap();

        let installer = Installer::new();
        assert_eq!(installer.sweep(&root).unwrap(), 2);
        assert!(!root.join(".quay-stage-abc").exists());
        assert!(!root.join(".quay-retired-demo-1").exists());
        assert!(root.join("demo/public").is_dir());

        assert_eq!(installer.sweep(&root).unwrap(), 0);
        assert_eq!(installer.sweep(&dir.path().join("missing")).unwrap(), 0);
    }
}
