//! In-memory builders for deployment archives and bundle files.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

#[derive(Debug, Clone)]
enum Entry {
    Dir(String),
    File(String, Vec<u8>),
}

/// Builds a gzip-compressed tar and writes it as `<name>.sar`.
///
/// Entry paths are written exactly as given, so callers choose whether they
/// are prefixed with the module name.
#[derive(Debug, Clone)]
pub struct SarBuilder {
    name: String,
    entries: Vec<Entry>,
}

impl SarBuilder {
    /// Start an archive for module `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Add a directory entry.
    #[must_use]
    pub fn dir(mut self, path: impl Into<String>) -> Self {
        self.entries.push(Entry::Dir(path.into()));
        self
    }

    /// Add a regular file entry.
    #[must_use]
    pub fn file(mut self, path: impl Into<String>, contents: impl AsRef<[u8]>) -> Self {
        self.entries
            .push(Entry::File(path.into(), contents.as_ref().to_vec()));
        self
    }

    /// Module name the archive is written under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compressed archive bytes.
    ///
    /// # Panics
    ///
    /// Panics if an entry cannot be encoded.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.entries)
    }

    /// Write the archive to `<dir>/<name>.sar` and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_to(&self, dir: &Path) -> PathBuf {
        let path = dir.join(format!("{}.sar", self.name));
        std::fs::write(&path, self.to_bytes()).expect("write archive");
        path
    }
}

/// The `.tgz` bytes of a bundle holding `files`.
///
/// # Panics
///
/// Panics if an entry cannot be encoded.
#[must_use]
pub fn bundle_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let entries: Vec<Entry> = files
        .iter()
        .map(|(name, contents)| Entry::File((*name).to_owned(), contents.as_bytes().to_vec()))
        .collect();
    encode(&entries)
}

/// Write a `.tgz` bundle holding `files` to `path`.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_bundle(path: &Path, files: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create bundle parent");
    }
    std::fs::write(path, bundle_bytes(files)).expect("write bundle");
}

fn encode(entries: &[Entry]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for entry in entries {
        let mut header = tar::Header::new_gnu();
        match entry {
            Entry::Dir(path) => {
                header.set_entry_type(tar::EntryType::Directory);
                header.set_mode(0o755);
                header.set_size(0);
                builder
                    .append_data(&mut header, path, std::io::empty())
                    .expect("append directory");
            },
            Entry::File(path, data) => {
                header.set_entry_type(tar::EntryType::Regular);
                header.set_mode(0o644);
                header.set_size(data.len() as u64);
                builder
                    .append_data(&mut header, path, data.as_slice())
                    .expect("append file");
            },
        }
    }
    let mut encoder = builder.into_inner().expect("finish tar");
    encoder.flush().expect("flush gzip");
    encoder.finish().expect("finish gzip")
}
