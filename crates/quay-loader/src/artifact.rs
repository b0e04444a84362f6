//! Resolved artifacts, resources, and the names that address them.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// File extension of compiled code artifacts.
pub const ARTIFACT_EXTENSION: &str = "wasm";

/// Separator between the segments of a symbol name.
pub const SYMBOL_SEPARATOR: &str = "::";

/// Map a symbol name (`app::handlers::Home`) to the relative path of its
/// artifact (`app/handlers/Home.wasm`).
///
/// Returns `None` for names with empty segments or segments that are not
/// plain path components.
#[must_use]
pub fn artifact_path(symbol: &str) -> Option<PathBuf> {
    if symbol.is_empty() {
        return None;
    }

    let mut segments = symbol.split(SYMBOL_SEPARATOR).peekable();
    let mut path = PathBuf::new();
    while let Some(segment) = segments.next() {
        if segment.is_empty()
            || segment.starts_with('.')
            || segment.contains(['/', '\\', ':'])
        {
            return None;
        }
        if segments.peek().is_some() {
            path.push(segment);
        } else {
            path.push(format!("{segment}.{ARTIFACT_EXTENSION}"));
        }
    }
    Some(path)
}

/// Normalize a resource name into a relative path made only of normal
/// components. `.` components are dropped; anything that could escape a
/// location (`..`, absolute paths, prefixes) yields `None`.
#[must_use]
pub fn resource_path(name: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {},
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    if path.as_os_str().is_empty() {
        None
    } else {
        Some(path)
    }
}

/// Join a relative path into the `/`-separated key used by bundle indexes.
pub(crate) fn entry_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A code artifact resolved for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// The symbol this artifact was resolved for.
    pub symbol: String,
    /// Scope of the resolver whose locations supplied it.
    pub defined_by: String,
    /// Location (directory, bundle, or file) it was found in.
    pub origin: PathBuf,
    /// Artifact bytes.
    pub bytes: Arc<[u8]>,
    /// Hex BLAKE3 digest of `bytes`.
    pub digest: String,
}

impl Artifact {
    pub(crate) fn new(
        symbol: &str,
        defined_by: &str,
        origin: PathBuf,
        bytes: Arc<[u8]>,
    ) -> Self {
        let digest = blake3::hash(&bytes).to_hex().to_string();
        Self {
            symbol: symbol.to_owned(),
            defined_by: defined_by.to_owned(),
            origin,
            bytes,
            digest,
        }
    }
}

/// Where a resolved resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// A path on disk: a file under a directory location, or a location
    /// itself when addressed directly.
    Path(PathBuf),
    /// An entry inside a bundle location.
    Bundled {
        /// The bundle file.
        bundle: PathBuf,
        /// Entry contents.
        data: Arc<[u8]>,
    },
}

/// A non-code asset resolved by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// The requested name.
    pub name: String,
    /// Scope of the resolver that supplied it.
    pub defined_by: String,
    /// Where the resource lives.
    pub source: ResourceSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path() {
        assert_eq!(
            artifact_path("app::handlers::Home").unwrap(),
            PathBuf::from("app/handlers/Home.wasm")
        );
        assert_eq!(artifact_path("Main").unwrap(), PathBuf::from("Main.wasm"));
    }

    #[test]
    fn test_artifact_path_keeps_dotted_names() {
        assert_eq!(
            artifact_path("util::Json.v2").unwrap(),
            PathBuf::from("util/Json.v2.wasm")
        );
        assert_ne!(artifact_path("util::Json.v2"), artifact_path("util::Json"));
    }

    #[test]
    fn test_artifact_path_rejects_bad_symbols() {
        assert!(artifact_path("").is_none());
        assert!(artifact_path("app::::Home").is_none());
        assert!(artifact_path("app::..::Home").is_none());
        assert!(artifact_path("app/evil").is_none());
        assert!(artifact_path("app:Home").is_none());
    }

    #[test]
    fn test_resource_path() {
        assert_eq!(
            resource_path("./static/site.css").unwrap(),
            PathBuf::from("static/site.css")
        );
        assert!(resource_path("../secret").is_none());
        assert!(resource_path("/etc/passwd").is_none());
        assert!(resource_path(".").is_none());
        assert!(resource_path("").is_none());
    }

    #[test]
    fn test_entry_key() {
        assert_eq!(entry_key(Path::new("./a/b/C.wasm")), "a/b/C.wasm");
    }

    #[test]
    fn test_artifact_digest() {
        let bytes: Arc<[u8]> = Arc::from(b"code".as_slice());
        let artifact = Artifact::new("Main", "shop", PathBuf::from("/lib"), bytes);
        assert_eq!(artifact.digest, blake3::hash(b"code").to_hex().to_string());
    }
}
