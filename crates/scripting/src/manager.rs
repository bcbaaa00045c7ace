//! Engine manager
//!
//! Owns one [`ScriptEngine`] per world or map state and keeps them in step:
//! one update tick, one reload, one shared context.

use hookbridge_core::{ObjectGuid, StateKey};
use std::collections::HashMap;

use crate::context::EngineContext;
use crate::engine::ScriptEngine;
use crate::error::Result;

/// Script engine manager
///
/// Provides a high-level interface for creating, ticking and reloading the
/// script engines of every state.
#[derive(Debug)]
pub struct EngineManager {
    /// Inputs shared by every engine
    context: EngineContext,

    /// Live engines by state
    engines: HashMap<StateKey, ScriptEngine>,
}

impl EngineManager {
    /// Create a manager and scan the configured script folder
    pub fn new(mut context: EngineContext) -> Self {
        if context.config().enabled {
            context.rescan();
        } else {
            tracing::info!("Scripting is disabled, no engine will be created");
        }
        Self {
            context,
            engines: HashMap::new(),
        }
    }

    /// Create a manager around an already scanned context
    pub fn with_context(context: EngineContext) -> Self {
        Self {
            context,
            engines: HashMap::new(),
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn is_enabled(&self) -> bool {
        self.context.config().enabled
    }

    /// State an engine for `key` actually lives in.
    ///
    /// Compatibility mode runs everything in the world state.
    pub fn resolve(&self, key: StateKey) -> StateKey {
        if self.context.config().compatibility_mode {
            StateKey::GLOBAL
        } else {
            key
        }
    }

    /// Create the engine of a state
    ///
    /// # Purpose
    /// Opens an interpreter for `key` and runs its scripts. Does nothing if
    /// the engine already exists.
    ///
    /// # Returns
    /// The state the engine lives in, or `None` when scripting is disabled or
    /// the map is excluded by `Lua.OnlyOnMaps`.
    pub fn create(&mut self, key: StateKey) -> Result<Option<StateKey>> {
        if !self.is_enabled() {
            return Ok(None);
        }

        let key = self.resolve(key);
        if let Some(map_id) = key.map_id() {
            if !self.context.config().should_map_load(map_id) {
                tracing::debug!("Not creating an engine for map {}, excluded by configuration", map_id);
                return Ok(None);
            }
        }

        if !self.engines.contains_key(&key) {
            let engine = ScriptEngine::new(key, self.context.clone())?;
            tracing::info!("[{}] Script engine created", key);
            self.engines.insert(key, engine);
        }
        Ok(Some(key))
    }

    pub fn get(&self, key: StateKey) -> Option<&ScriptEngine> {
        self.engines.get(&self.resolve(key))
    }

    pub fn get_mut(&mut self, key: StateKey) -> Option<&mut ScriptEngine> {
        let key = self.resolve(key);
        self.engines.get_mut(&key)
    }

    /// The world state engine
    pub fn global(&self) -> Option<&ScriptEngine> {
        self.engines.get(&StateKey::GLOBAL)
    }

    /// Close and drop the engine of a state.
    ///
    /// In compatibility mode only the world state can be destroyed; map
    /// states share it and never own it.
    pub fn destroy(&mut self, key: StateKey) -> bool {
        if self.context.config().compatibility_mode && !key.is_global() {
            return false;
        }
        let removed = self.engines.remove(&key).is_some();
        if removed {
            tracing::info!("[{}] Script engine destroyed", key);
        }
        removed
    }

    /// Tick every engine
    pub fn update(&mut self, diff: u32) {
        for engine in self.engines.values_mut() {
            engine.update(diff);
        }
    }

    /// Forward an object removal to every engine that may hold its timers
    pub fn on_object_removed(&self, guid: ObjectGuid) {
        for engine in self.engines.values() {
            engine.on_object_removed(guid);
        }
    }

    /// Rescan the script folder and reload every engine.
    ///
    /// A failing engine is logged and left closed; the others still reload.
    pub fn reload_all(&mut self) {
        self.context.rescan();
        for (key, engine) in self.engines.iter_mut() {
            engine.set_context(self.context.clone());
            if let Err(err) = engine.reload() {
                tracing::error!("[{}] Reload failed: {}", key, err);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StateKey> {
        self.engines.keys()
    }
}
