//! A deployed module wired up for serving.

use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use quay_config::Config;
use quay_deploy::Module;
use quay_loader::{Artifact, LoaderResult, ModuleLoader, Resolver, Resource, create_loader};
use quay_render::{AppContext, Exchange, RenderResult, ResponderRegistry, ResultValue};
use tracing::debug;

use crate::engine::EngineFactory;
use crate::error::{HostError, HostResult};

/// One live application: the unpacked module, its isolation context and its
/// responders.
pub struct Application {
    module: Module,
    loader: ModuleLoader,
    context: Arc<AppContext>,
    responders: RwLock<ResponderRegistry>,
}

impl Application {
    /// Build the loader, context and responders for an installed module.
    pub(crate) fn start(
        module: Module,
        config: &Config,
        parent: Arc<dyn Resolver>,
        engines: &dyn EngineFactory,
    ) -> HostResult<Self> {
        let roots: Vec<PathBuf> = config
            .server
            .code_dirs
            .iter()
            .map(|dir| module.root.join(dir))
            .collect();
        let loader = create_loader(module.name.clone(), &roots, parent);

        let mut context = AppContext::new(
            module.name.clone(),
            module.root.clone(),
            &config.application,
            engines.template_engine(&module),
        );
        if let Some(messages) = engines.messages(&module) {
            context = context.with_messages(messages);
        }
        let context = Arc::new(context);

        let mut responders = ResponderRegistry::standard();
        responders
            .init(Arc::clone(&context))
            .map_err(|e| HostError::render(&module.name, e))?;

        debug!(module = %module.name, locations = loader.locations().len(), "Started application");
        Ok(Self {
            module,
            loader,
            context,
            responders: RwLock::new(responders),
        })
    }

    /// Tear down the responders. Later dispatches fail.
    pub(crate) fn stop(&self) {
        self.responders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .destroy();
        debug!(module = %self.module.name, "Stopped application");
    }

    /// Module name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// The installed module.
    #[must_use]
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// The module's isolation context.
    #[must_use]
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// The context the responders were initialized with.
    #[must_use]
    pub fn context(&self) -> &Arc<AppContext> {
        &self.context
    }

    /// Whether the responders are still initialized.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.responders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_initialized()
    }

    /// Render `result` into `exchange` with this module's responders.
    ///
    /// # Errors
    ///
    /// Returns whatever the responder for the result's kind returns.
    pub fn dispatch(&self, result: &ResultValue, exchange: &mut Exchange) -> RenderResult<()> {
        self.responders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .dispatch(result, exchange)
    }

    /// Resolve `symbol` self-first through the module's isolation context.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` scoped to this module on a miss.
    pub fn resolve(&self, symbol: &str) -> LoaderResult<Arc<Artifact>> {
        self.loader.resolve(symbol)
    }

    /// Resolve resource `name` through the module's isolation context.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` scoped to this module on a miss.
    pub fn resource(&self, name: &str) -> LoaderResult<Resource> {
        self.loader.resource(name)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("module", &self.module)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}
