//! The module table and the operations that change it.
//!
//! ```text
//! deploy(archive)
//!   → per-name lock
//!   → Installer::install (staged, swapped into place)
//!   → Application::start (loader, context, responders)
//!   → swap into module table
//!   → stop previous application
//!   → clear result caches
//! ```
//!
//! Lookups clone the application's `Arc` out of the table before serving,
//! so no table shard is held across template rendering or file I/O.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use quay_config::Config;
use quay_deploy::{
    DeployEvent, DeployWatcher, DeploymentArchive, Installer, Module, WatcherConfig,
    scan_drop_dir,
};
use quay_loader::{Artifact, LocationResolver, Resolver, Resource};
use quay_render::{Exchange, ResultCaches, ResultValue};
use quay_telemetry::RequestTrace;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::application::Application;
use crate::engine::EngineFactory;
use crate::error::{HostError, HostResult};

/// Scope name of the host's shared parent resolver.
pub const HOST_SCOPE: &str = "host";

/// Hosts every deployed application in one process.
pub struct Host {
    config: Config,
    parent: Arc<dyn Resolver>,
    engines: Arc<dyn EngineFactory>,
    installer: Installer,
    applications: DashMap<String, Arc<Application>>,
    caches: Arc<ResultCaches>,
    deploy_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl Host {
    /// Create a host with no applications.
    ///
    /// The shared parent resolver scans `server.shared_lib_dirs` once, here.
    #[must_use]
    pub fn new(config: Config, engines: Arc<dyn EngineFactory>) -> Self {
        let shared = LocationResolver::from_roots(HOST_SCOPE, &config.server.shared_lib_dirs);
        info!(
            applications_root = %config.server.applications_root.display(),
            shared_locations = shared.locations().len(),
            "Created host"
        );
        Self {
            config,
            parent: Arc::new(shared),
            engines,
            installer: Installer::new(),
            applications: DashMap::new(),
            caches: Arc::new(ResultCaches::new()),
            deploy_locks: DashMap::new(),
        }
    }

    /// Load layered configuration and create a host from it.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Config`] if the configuration cannot be loaded.
    pub fn load(explicit: Option<&Path>, engines: Arc<dyn EngineFactory>) -> HostResult<Self> {
        let resolved = Config::load(explicit)?;
        for file in &resolved.loaded_files {
            debug!(file = %file, "Loaded config file");
        }
        Ok(Self::new(resolved.config, engines))
    }

    /// Replace the shared parent resolver.
    #[must_use]
    pub fn with_parent(mut self, parent: Arc<dyn Resolver>) -> Self {
        self.parent = parent;
        self
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared parent every module loader falls back to.
    #[must_use]
    pub fn parent(&self) -> &Arc<dyn Resolver> {
        &self.parent
    }

    /// Result caches shared by all modules.
    #[must_use]
    pub fn caches(&self) -> &Arc<ResultCaches> {
        &self.caches
    }

    /// Directory modules are unpacked into.
    #[must_use]
    pub fn applications_root(&self) -> &Path {
        &self.config.server.applications_root
    }

    /// The hot-deploy drop directory, if configured.
    #[must_use]
    pub fn deploy_dir(&self) -> Option<&Path> {
        self.config.server.deploy_dir.as_deref()
    }

    /// The live application called `name`.
    #[must_use]
    pub fn application(&self, name: &str) -> Option<Arc<Application>> {
        self.applications
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Names of all live applications, sorted.
    #[must_use]
    pub fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .applications
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of live applications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    /// Whether no application is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    /// Install `archive` and make it the live version of its module.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Deploy`] if the archive cannot be installed, in
    /// which case the previous version keeps serving, and
    /// [`HostError::Render`] if the new responders fail to initialize.
    pub fn deploy(&self, archive: &Path) -> HostResult<Arc<Application>> {
        let name = DeploymentArchive::new(archive)?.name().to_owned();
        let lock = self.deploy_lock(&name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let module = self
            .installer
            .install(archive, self.applications_root())?;
        self.activate(module)
    }

    /// Rebuild the loader and responders of `name` from its live directory.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ModuleNotFound`] if `name` is not deployed, and
    /// [`HostError::Render`] if the responders fail to initialize.
    pub fn reload(&self, name: &str) -> HostResult<Arc<Application>> {
        let lock = self.deploy_lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let module = self
            .application(name)
            .map(|app| app.module().clone())
            .ok_or_else(|| HostError::ModuleNotFound(name.to_owned()))?;
        self.activate(module)
    }

    /// Stop `name`, drop it from the table and delete its directory.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ModuleNotFound`] if `name` is neither live nor
    /// installed, and [`HostError::Deploy`] if the directory cannot be
    /// removed.
    pub fn undeploy(&self, name: &str) -> HostResult<()> {
        let lock = self.deploy_lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let removed = self.applications.remove(name).map(|(_, app)| app);
        if let Some(app) = &removed {
            app.stop();
        }
        let deleted = self.installer.remove(name, self.applications_root())?;
        self.caches.clear();

        if removed.is_none() && !deleted {
            return Err(HostError::ModuleNotFound(name.to_owned()));
        }
        info!(module = %name, "Undeployed module");
        Ok(())
    }

    /// Serve `result` for module `name` inside a request trace span.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ModuleNotFound`] for an unknown module and
    /// [`HostError::Render`] naming the module when its responder fails.
    pub fn dispatch(
        &self,
        name: &str,
        result: &ResultValue,
        exchange: &mut Exchange,
    ) -> HostResult<()> {
        let trace = RequestTrace::new(name).with_operation(result.kind().to_string());
        let _span = trace.span().entered();

        let app = self
            .application(name)
            .ok_or_else(|| HostError::ModuleNotFound(name.to_owned()))?;

        match app.dispatch(result, exchange) {
            Ok(()) => {
                debug!(
                    status = exchange.response.status,
                    elapsed_ms = trace.elapsed_ms(),
                    "Dispatched result"
                );
                Ok(())
            },
            Err(e) => {
                warn!(error = %e, "Dispatch failed");
                Err(HostError::render(name, e))
            },
        }
    }

    /// Resolve `symbol` in the isolation context of module `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ModuleNotFound`] for an unknown module and
    /// [`HostError::Loader`] naming the module on a miss.
    pub fn resolve(&self, name: &str, symbol: &str) -> HostResult<Arc<Artifact>> {
        let app = self
            .application(name)
            .ok_or_else(|| HostError::ModuleNotFound(name.to_owned()))?;
        Ok(app.resolve(symbol)?)
    }

    /// Resolve resource `resource` in the isolation context of module `name`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::ModuleNotFound`] for an unknown module and
    /// [`HostError::Loader`] naming the module on a miss.
    pub fn resource(&self, name: &str, resource: &str) -> HostResult<Resource> {
        let app = self
            .application(name)
            .ok_or_else(|| HostError::ModuleNotFound(name.to_owned()))?;
        Ok(app.resource(resource)?)
    }

    /// Deploy every archive already present in the drop directory.
    ///
    /// Working directories left by an interrupted install are swept first,
    /// so call this at startup before any other deploy. Failures are logged
    /// and skipped. Returns the names that deployed.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Deploy`] if the applications root or the drop
    /// directory cannot be read.
    pub fn deploy_existing(&self) -> HostResult<Vec<String>> {
        self.installer.sweep(self.applications_root())?;

        let Some(drop_dir) = self.deploy_dir() else {
            return Ok(Vec::new());
        };

        let mut deployed = Vec::new();
        for archive in scan_drop_dir(drop_dir)? {
            match self.deploy(&archive) {
                Ok(app) => deployed.push(app.name().to_owned()),
                Err(e) => {
                    error!(archive = %archive.display(), error = %e, "Failed to deploy archive");
                },
            }
        }
        info!(count = deployed.len(), "Deployed existing archives");
        Ok(deployed)
    }

    /// A watcher over the drop directory, seeded with the digests of the
    /// live modules. `None` unless `server.watch` is set and a drop
    /// directory is configured.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Deploy`] if the filesystem watcher cannot start.
    pub fn deploy_watcher(
        &self,
    ) -> HostResult<Option<(DeployWatcher, mpsc::Receiver<DeployEvent>)>> {
        let Some(drop_dir) = self.deploy_dir().filter(|_| self.config.server.watch) else {
            return Ok(None);
        };

        let config = WatcherConfig::new(drop_dir)
            .with_debounce(Duration::from_millis(self.config.server.watch_debounce_ms));
        let (mut watcher, rx) = DeployWatcher::new(config)?;
        for entry in self.applications.iter() {
            let module = entry.value().module();
            watcher.seed(archive_path(drop_dir, &module.name), module.digest.clone());
        }
        Ok(Some((watcher, rx)))
    }

    /// Apply watcher events until the channel closes.
    ///
    /// Changed archives are redeployed and removed archives undeployed. The
    /// blocking install runs on the blocking thread pool.
    pub async fn run_hot_deploy(self: Arc<Self>, mut rx: mpsc::Receiver<DeployEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                DeployEvent::ArchiveChanged { archive, digest } => {
                    info!(
                        archive = %archive.display(),
                        digest = %digest,
                        "Archive changed, deploying"
                    );
                    let host = Arc::clone(&self);
                    let path = archive.clone();
                    match tokio::task::spawn_blocking(move || host.deploy(&path)).await {
                        Ok(Ok(app)) => info!(module = %app.name(), "Hot deploy complete"),
                        Ok(Err(e)) => {
                            error!(archive = %archive.display(), error = %e, "Hot deploy failed");
                        },
                        Err(e) => error!(error = %e, "Hot deploy task failed"),
                    }
                },
                DeployEvent::ArchiveRemoved { archive } => {
                    let Some(name) = archive.file_stem().and_then(|s| s.to_str()) else {
                        continue;
                    };
                    let name = name.to_owned();
                    let host = Arc::clone(&self);
                    let module = name.clone();
                    match tokio::task::spawn_blocking(move || host.undeploy(&module)).await {
                        Ok(Ok(())) => info!(module = %name, "Archive removed, module undeployed"),
                        Ok(Err(HostError::ModuleNotFound(_))) => {
                            debug!(module = %name, "Removed archive had no live module");
                        },
                        Ok(Err(e)) => error!(module = %name, error = %e, "Undeploy failed"),
                        Err(e) => error!(error = %e, "Undeploy task failed"),
                    }
                },
                DeployEvent::Error(message) => warn!(error = %message, "Deploy watcher error"),
            }
        }
        debug!("Deploy event channel closed");
    }

    /// Stop every application. Module directories are left in place.
    pub fn shutdown(&self) {
        let names = self.module_names();
        for name in &names {
            if let Some((_, app)) = self.applications.remove(name) {
                app.stop();
            }
        }
        self.caches.clear();
        info!(count = names.len(), "Host shut down");
    }

    fn activate(&self, module: Module) -> HostResult<Arc<Application>> {
        let name = module.name.clone();
        let app = Arc::new(Application::start(
            module,
            &self.config,
            Arc::clone(&self.parent),
            self.engines.as_ref(),
        )?);

        if let Some(previous) = self.applications.insert(name.clone(), Arc::clone(&app)) {
            previous.stop();
        }
        self.caches.clear();

        info!(module = %name, digest = %app.module().digest, "Module live");
        Ok(app)
    }

    fn deploy_lock(&self, name: &str) -> Arc<Mutex<()>> {
        Arc::clone(&*self.deploy_locks.entry(name.to_owned()).or_default())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("applications_root", &self.config.server.applications_root)
            .field("modules", &self.module_names())
            .field("parent", &self.parent.scope())
            .finish_non_exhaustive()
    }
}

fn archive_path(drop_dir: &Path, name: &str) -> PathBuf {
    drop_dir.join(format!("{name}.{}", quay_deploy::ARCHIVE_EXTENSION))
}

#[cfg(test)]
mod tests;
