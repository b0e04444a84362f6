//! Hot-deploy watcher for the archive drop directory.
//!
//! ```text
//! filesystem events (notify)
//!   → keep `.sar` files directly inside the drop directory
//!   → debounce per archive
//!   → blake3 digest of the archive
//!   → compare to last seen digest
//!   → emit DeployEvent::ArchiveChanged / ArchiveRemoved
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::archive::{ARCHIVE_EXTENSION, digest_file};
use crate::error::{DeployError, DeployResult};

/// Default debounce interval for archive change events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the deploy watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployEvent {
    /// An archive appeared or its contents changed.
    ArchiveChanged {
        /// Path to the archive in the drop directory.
        archive: PathBuf,
        /// blake3 digest of the archive after the change.
        digest: String,
    },
    /// A previously seen archive was deleted from the drop directory.
    ArchiveRemoved {
        /// Path the archive had.
        archive: PathBuf,
    },
    /// Watcher encountered a non-fatal error.
    Error(String),
}

/// Configuration for the deploy watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Directory scanned for `.sar` archives.
    pub drop_dir: PathBuf,
    /// Change events for one archive within this window are coalesced.
    pub debounce: Duration,
}

impl WatcherConfig {
    /// Watch `drop_dir` with the default debounce.
    #[must_use]
    pub fn new(drop_dir: impl Into<PathBuf>) -> Self {
        Self {
            drop_dir: drop_dir.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    /// Set the debounce window.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Watches the drop directory and emits [`DeployEvent`]s.
pub struct DeployWatcher {
    config: WatcherConfig,
    /// Last digest seen per archive path.
    digests: HashMap<PathBuf, String>,
    /// Kept alive for the watcher's lifetime; dropping it stops monitoring.
    watcher: RecommendedWatcher,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    event_tx: mpsc::Sender<DeployEvent>,
}

impl DeployWatcher {
    /// Create a new deploy watcher.
    ///
    /// Returns the watcher and a receiver for [`DeployEvent`]s. Call
    /// [`run()`](Self::run) to start the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::Watch`] if the filesystem watcher cannot be
    /// initialized.
    pub fn new(config: WatcherConfig) -> DeployResult<(Self, mpsc::Receiver<DeployEvent>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(64);

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| DeployError::Watch(format!("filesystem watcher: {e}")))?;

        Ok((
            Self {
                config,
                digests: HashMap::new(),
                watcher,
                raw_rx,
                event_tx,
            },
            event_rx,
        ))
    }

    /// Record an archive as already deployed so an unchanged copy does not
    /// trigger a redeploy.
    pub fn seed(&mut self, archive: impl Into<PathBuf>, digest: impl Into<String>) {
        self.digests.insert(archive.into(), digest.into());
    }

    /// Run the watcher event loop until the event receiver is dropped or the
    /// `notify` channel closes.
    pub async fn run(mut self) {
        let drop_dir = self.config.drop_dir.clone();
        match self.watcher.watch(&drop_dir, RecursiveMode::NonRecursive) {
            Ok(()) => info!(path = %drop_dir.display(), "Watching deploy directory"),
            Err(e) => {
                warn!(path = %drop_dir.display(), error = %e, "Failed to watch deploy directory");
                let _ = self
                    .event_tx
                    .send(DeployEvent::Error(format!(
                        "cannot watch {}: {e}",
                        drop_dir.display()
                    )))
                    .await;
                return;
            },
        }

        let debounce = self.config.debounce;
        let mut pending: HashMap<PathBuf, tokio::time::Instant> = HashMap::new();

        loop {
            let next_deadline = pending.values().copied().min();

            tokio::select! {
                biased;

                () = async {
                    match next_deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    let now = tokio::time::Instant::now();
                    let ready: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, deadline)| **deadline <= now)
                        .map(|(path, _)| path.clone())
                        .collect();

                    for archive in ready {
                        pending.remove(&archive);
                        if !self.process_archive_change(&archive).await {
                            return;
                        }
                    }
                }

                event = self.raw_rx.recv() => {
                    match event {
                        Some(Ok(ev)) => self.handle_raw_event(&ev, &mut pending, debounce),
                        Some(Err(e)) => {
                            warn!(error = %e, "Filesystem watcher error");
                            if self.event_tx.send(DeployEvent::Error(e.to_string())).await.is_err() {
                                debug!("Event receiver dropped, stopping watcher");
                                return;
                            }
                        }
                        None => {
                            debug!("Filesystem watcher channel closed, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Reset the debounce timer of every archive touched by `event`.
    fn handle_raw_event(
        &self,
        event: &Event,
        pending: &mut HashMap<PathBuf, tokio::time::Instant>,
        debounce: Duration,
    ) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {},
            _ => return,
        }

        for path in &event.paths {
            if !self.is_archive_in_drop_dir(path) {
                continue;
            }
            debug!(path = %path.display(), kind = ?event.kind, "Archive change detected");
            #[allow(clippy::arithmetic_side_effects)]
            // Instant + Duration cannot overflow in practice
            let deadline = tokio::time::Instant::now() + debounce;
            pending.insert(path.clone(), deadline);
        }
    }

    fn is_archive_in_drop_dir(&self, path: &Path) -> bool {
        is_archive(path)
            && path
                .parent()
                .is_some_and(|p| p.components().eq(self.config.drop_dir.components()))
    }

    /// Digest the archive and emit an event if it changed or disappeared.
    ///
    /// Returns `false` if the event receiver has been dropped.
    async fn process_archive_change(&mut self, archive: &Path) -> bool {
        if !archive.exists() {
            if self.digests.remove(archive).is_none() {
                return true;
            }
            info!(archive = %archive.display(), "Archive removed from deploy directory");
            return self
                .emit(DeployEvent::ArchiveRemoved {
                    archive: archive.to_path_buf(),
                })
                .await;
        }

        let path = archive.to_path_buf();
        let digest = match tokio::task::spawn_blocking(move || digest_file(&path)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Digest task was cancelled");
                return true;
            },
        };

        match digest {
            Ok(digest) => {
                if self.digests.get(archive).is_some_and(|d| d == &digest) {
                    debug!(archive = %archive.display(), "Archive digest unchanged, skipping");
                    return true;
                }
                info!(archive = %archive.display(), digest = %digest, "Archive changed");
                self.digests.insert(archive.to_path_buf(), digest.clone());
                self.emit(DeployEvent::ArchiveChanged {
                    archive: archive.to_path_buf(),
                    digest,
                })
                .await
            },
            Err(e) => {
                warn!(archive = %archive.display(), error = %e, "Failed to digest archive");
                self.emit(DeployEvent::Error(format!(
                    "digest failed for {}: {e}",
                    archive.display()
                )))
                .await
            },
        }
    }

    async fn emit(&self, event: DeployEvent) -> bool {
        if self.event_tx.send(event).await.is_err() {
            debug!("Event receiver dropped, stopping watcher");
            return false;
        }
        true
    }
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// List the `.sar` archives currently in `drop_dir`, sorted by path.
///
/// A missing drop directory yields an empty list.
///
/// # Errors
///
/// Returns an I/O error if the directory exists but cannot be read.
pub fn scan_drop_dir(drop_dir: &Path) -> DeployResult<Vec<PathBuf>> {
    if !drop_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    for entry in std::fs::read_dir(drop_dir)? {
        let Ok(entry) = entry else { continue };
        let path = entry.path();
        if path.is_file() && is_archive(&path) {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}
