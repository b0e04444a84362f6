//! Loadable locations and the recursive scan that discovers them.
//!
//! A location is either a directory (names resolve relative to it), a bundle
//! file (`.tgz`, `.tar.gz`, `.tar`, whose entries resolve by their path
//! inside the bundle), or any other file (which answers only its own file
//! name). Scanning a root yields every directory and every file beneath it,
//! each directory ahead of its children.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use flate2::read::GzDecoder;
use tracing::debug;
use walkdir::WalkDir;

use crate::artifact::entry_key;
use crate::error::{LoaderError, LoaderResult};

/// Maximum number of entries indexed from a single bundle.
const MAX_BUNDLE_ENTRIES: usize = 10_000;

/// What a location on disk is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationKind {
    /// A directory tree.
    Directory,
    /// A tar or gzip-compressed tar bundle of artifacts.
    Bundle,
    /// Any other single file.
    File,
}

impl LocationKind {
    /// Classify a file path by its extension.
    #[must_use]
    pub fn for_file(path: &Path) -> Self {
        if is_bundle(path) {
            Self::Bundle
        } else {
            Self::File
        }
    }
}

fn is_bundle(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".tgz") || name.ends_with(".tar.gz") || name.ends_with(".tar")
}

fn is_gzip(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    name.ends_with(".tgz") || name.ends_with(".tar.gz")
}

/// Ordered, duplicate-free set of locations found by scanning roots.
#[derive(Debug, Clone, Default)]
pub struct LoadableLocationSet {
    entries: Vec<(PathBuf, LocationKind)>,
    seen: HashSet<PathBuf>,
}

impl LoadableLocationSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a location. Returns `false` if the path was already present;
    /// the first insertion keeps its position.
    pub fn insert(&mut self, path: PathBuf, kind: LocationKind) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.entries.push((path, kind));
        true
    }

    /// Whether `path` is in the set.
    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// Position of `path` in scan order.
    #[must_use]
    pub fn position(&self, path: &Path) -> Option<usize> {
        self.entries.iter().position(|(p, _)| p == path)
    }

    /// Iterate over paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(|(p, _)| p.as_path())
    }

    /// Number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into the ordered backing list used for resolution.
    #[must_use]
    pub fn into_locations(self) -> Vec<Location> {
        self.entries
            .into_iter()
            .map(|(path, kind)| Location::new(path, kind))
            .collect()
    }
}

/// Recursively scan `roots` into a [`LoadableLocationSet`].
///
/// Symlinks are not followed. Siblings are visited in file-name order.
/// Unreadable entries are skipped and missing roots contribute nothing.
#[must_use]
pub fn build_locations<P: AsRef<Path>>(roots: &[P]) -> LoadableLocationSet {
    let mut set = LoadableLocationSet::new();

    for root in roots {
        let root = root.as_ref();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "Skipping unreadable entry");
                    continue;
                },
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                LocationKind::Directory
            } else if file_type.is_file() {
                LocationKind::for_file(entry.path())
            } else {
                continue;
            };
            set.insert(entry.into_path(), kind);
        }
    }

    debug!(count = set.len(), "Built loadable location set");
    set
}

type BundleIndex = HashMap<String, Arc<[u8]>>;

/// One resolvable location.
#[derive(Debug)]
pub struct Location {
    path: PathBuf,
    kind: LocationKind,
    index: OnceLock<Result<BundleIndex, String>>,
}

impl Location {
    /// Create a location of the given kind.
    #[must_use]
    pub fn new(path: PathBuf, kind: LocationKind) -> Self {
        Self {
            path,
            kind,
            index: OnceLock::new(),
        }
    }

    /// Path of the location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind of the location.
    #[must_use]
    pub fn kind(&self) -> LocationKind {
        self.kind
    }

    /// Read the file at `relative` from this location.
    ///
    /// Returns `Ok(None)` if this location does not hold it.
    pub(crate) fn read(&self, relative: &Path) -> LoaderResult<Option<Arc<[u8]>>> {
        match self.kind {
            LocationKind::Directory => {
                let candidate = self.path.join(relative);
                if !candidate.is_file() {
                    return Ok(None);
                }
                let bytes = std::fs::read(&candidate)?;
                Ok(Some(Arc::from(bytes)))
            },
            LocationKind::Bundle => Ok(self.bundle_index()?.get(&entry_key(relative)).cloned()),
            LocationKind::File => {
                if !self.answers_own_name(relative) {
                    return Ok(None);
                }
                let bytes = std::fs::read(&self.path)?;
                Ok(Some(Arc::from(bytes)))
            },
        }
    }

    /// Whether a file at `relative` exists in this location, returning the
    /// on-disk path for directory and plain-file locations.
    pub(crate) fn locate(&self, relative: &Path) -> Option<PathBuf> {
        match self.kind {
            LocationKind::Directory => {
                let candidate = self.path.join(relative);
                candidate.is_file().then_some(candidate)
            },
            LocationKind::File => self
                .answers_own_name(relative)
                .then(|| self.path.clone()),
            LocationKind::Bundle => None,
        }
    }

    /// Whether the location's own path ends with `relative`, so the
    /// location itself can be addressed by that name.
    pub(crate) fn is_named(&self, relative: &Path) -> bool {
        self.path.ends_with(relative)
    }

    fn answers_own_name(&self, relative: &Path) -> bool {
        let mut components = relative.components();
        match (components.next(), components.next()) {
            (Some(only), None) => self.path.file_name() == Some(only.as_os_str()),
            _ => false,
        }
    }

    /// The bundle's entry index, built on first use.
    fn bundle_index(&self) -> LoaderResult<&BundleIndex> {
        self.index
            .get_or_init(|| index_bundle(&self.path))
            .as_ref()
            .map_err(|message| LoaderError::Bundle {
                path: self.path.clone(),
                message: message.clone(),
            })
    }
}

fn index_bundle(path: &Path) -> Result<BundleIndex, String> {
    let file = File::open(path).map_err(|e| format!("failed to open: {e}"))?;
    let reader: Box<dyn Read> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut archive = tar::Archive::new(reader);

    let mut index = BundleIndex::new();
    let entries = archive
        .entries()
        .map_err(|e| format!("failed to read entries: {e}"))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| format!("failed to read entry: {e}"))?;
        if entry.header().entry_type() != tar::EntryType::Regular {
            continue;
        }
        if index.len() >= MAX_BUNDLE_ENTRIES {
            return Err(format!(
                "bundle exceeds maximum entry count ({MAX_BUNDLE_ENTRIES})"
            ));
        }

        let key = entry_key(
            &entry
                .path()
                .map_err(|e| format!("failed to read entry path: {e}"))?,
        );
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| format!("failed to read {key}: {e}"))?;
        index.insert(key, Arc::from(data));
    }

    debug!(bundle = %path.display(), entries = index.len(), "Indexed bundle");
    Ok(index)
}
