//! Engine context
//!
//! Everything a script engine needs from outside itself: configuration,
//! the host adapter, the scanned script catalog and host API extensions.
//! Cloning is cheap and every engine of a manager shares one context.

use hookbridge_config::EngineConfig;
use std::sync::Arc;

use crate::host::{ApiExtension, Host, NullHost};
use crate::loader::ScriptCatalog;

/// Shared inputs of every script engine
#[derive(Clone)]
pub struct EngineContext {
    /// Engine configuration
    config: Arc<EngineConfig>,

    /// Host simulation adapter
    host: Arc<dyn Host>,

    /// Scripts found by the last scan
    catalog: Arc<ScriptCatalog>,

    /// Host-provided Lua globals
    extensions: Vec<Arc<dyn ApiExtension>>,
}

impl EngineContext {
    /// Create a context with an empty catalog and no extensions
    pub fn new(config: EngineConfig, host: Arc<dyn Host>) -> Self {
        Self {
            config: Arc::new(config),
            host,
            catalog: Arc::new(ScriptCatalog::default()),
            extensions: Vec::new(),
        }
    }

    /// Add a host API extension
    pub fn with_extension(mut self, extension: Arc<dyn ApiExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Replace the script catalog
    pub fn with_catalog(mut self, catalog: ScriptCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// Rescan the configured script folder
    pub fn rescan(&mut self) {
        self.catalog = Arc::new(ScriptCatalog::scan(&self.config));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn catalog(&self) -> &ScriptCatalog {
        &self.catalog
    }

    pub fn extensions(&self) -> &[Arc<dyn ApiExtension>] {
        &self.extensions
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(EngineConfig::default(), Arc::new(NullHost))
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("catalog", &self.catalog)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}
