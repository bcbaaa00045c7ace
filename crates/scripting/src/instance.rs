//! Scripted dungeon instances
//!
//! An [`InstanceScript`] is the host-side controller of one instance. Its
//! state lives in a Lua table owned by the engine of that map; the
//! controller only remembers the last save blob. A reload drops every
//! instance table, so each access first checks the table is still there and
//! reloads it from the last save when it is not.

use hookbridge_core::HostObject;
use mlua::{FromLua, IntoLua, Table, Value};

use crate::engine::ScriptEngine;
use crate::error::{Result, ScriptError};
use crate::persist;

/// Controller of one dungeon instance
#[derive(Debug, Clone)]
pub struct InstanceScript {
    map: HostObject,
    last_save: String,
}

impl InstanceScript {
    /// `map` must carry the map and instance ids of the instance
    pub fn new(map: HostObject) -> Self {
        Self {
            map,
            last_save: String::new(),
        }
    }

    pub fn map(&self) -> &HostObject {
        &self.map
    }

    pub fn instance_id(&self) -> u32 {
        self.map.instance_id
    }

    /// Blob produced by the last [`save`](Self::save) or passed to
    /// [`load`](Self::load)
    pub fn last_save(&self) -> &str {
        &self.last_save
    }

    /// Create the instance data table if missing, then run initialize hooks
    pub fn initialize(&mut self, engine: &ScriptEngine) -> Result<()> {
        let rt = engine.runtime().ok_or(ScriptError::Disabled)?;
        if rt.instance_data(self.instance_id()).is_none() {
            let table = rt.lua().create_table()?;
            rt.set_instance_data(self.instance_id(), table)?;
        }

        engine.on_instance_initialize(&self.map);
        Ok(())
    }

    /// Restore instance data from a save blob.
    ///
    /// `None` or an empty blob reuses the last one. A blob that decodes to a
    /// table replaces the instance data and runs the load hooks; anything
    /// else is logged and ignored. Initialization always follows.
    pub fn load(&mut self, engine: &ScriptEngine, data: Option<&str>) -> Result<()> {
        if let Some(data) = data.filter(|data| !data.is_empty()) {
            self.last_save = data.to_string();
        }

        if !self.last_save.is_empty() {
            let rt = engine.runtime().ok_or(ScriptError::Disabled)?;
            match persist::decode_table(rt.lua(), &self.last_save) {
                Ok(table) => {
                    rt.set_instance_data(self.instance_id(), table)?;
                    engine.on_instance_load(&self.map);
                }
                Err(err) => {
                    tracing::warn!(
                        "[{}] Ignoring save data of instance {}: {}",
                        engine.key(),
                        self.instance_id(),
                        err
                    );
                }
            }
        }

        self.initialize(engine)
    }

    /// Encode the instance data table and remember it as the last save
    pub fn save(&mut self, engine: &ScriptEngine) -> Result<&str> {
        let table = self.data(engine)?;
        self.last_save = persist::encode_table(&table)?;
        Ok(&self.last_save)
    }

    /// The instance data table, reloaded from the last save if a reload
    /// dropped it
    pub fn data(&mut self, engine: &ScriptEngine) -> Result<Table> {
        self.ensure_loaded(engine)?;
        let rt = engine.runtime().ok_or(ScriptError::Disabled)?;
        rt.instance_data(self.instance_id())
            .ok_or_else(|| ScriptError::Persistence(format!("instance {} has no data", self.instance_id())))
    }

    fn ensure_loaded(&mut self, engine: &ScriptEngine) -> Result<()> {
        if engine.has_instance_data(self.instance_id()) {
            return Ok(());
        }
        tracing::debug!(
            "[{}] Instance data of {} missing, reloading last save",
            engine.key(),
            self.instance_id()
        );
        self.load(engine, None)
    }

    fn get_value<T: FromLua + Default>(&mut self, engine: &ScriptEngine, key: u32) -> Result<T> {
        let table = self.data(engine)?;
        let value: Value = table.get(key)?;
        Ok(T::from_lua(value, engine.runtime().ok_or(ScriptError::Disabled)?.lua()).unwrap_or_default())
    }

    fn set_value<T: IntoLua>(&mut self, engine: &ScriptEngine, key: u32, value: T) -> Result<()> {
        let table = self.data(engine)?;
        table.set(key, value)?;
        Ok(())
    }

    /// 32-bit value stored under `key`, 0 when unset or not a number
    pub fn get_data(&mut self, engine: &ScriptEngine, key: u32) -> Result<u32> {
        self.get_value(engine, key)
    }

    pub fn set_data(&mut self, engine: &ScriptEngine, key: u32, value: u32) -> Result<()> {
        self.set_value(engine, key, value)
    }

    /// 64-bit value stored under `key`, 0 when unset or not a number.
    ///
    /// Stored bit-cast to a Lua integer, so guids with the top bit set read
    /// back unchanged and match what `GetGUID` hands to scripts.
    pub fn get_data64(&mut self, engine: &ScriptEngine, key: u32) -> Result<u64> {
        let bits: i64 = self.get_value(engine, key)?;
        Ok(bits as u64)
    }

    pub fn set_data64(&mut self, engine: &ScriptEngine, key: u32, value: u64) -> Result<()> {
        self.set_value(engine, key, value as i64)
    }

    pub fn update(&mut self, engine: &ScriptEngine, diff: u32) -> Result<()> {
        self.ensure_loaded(engine)?;
        engine.on_instance_update(&self.map, diff);
        Ok(())
    }

    pub fn on_player_enter(&mut self, engine: &ScriptEngine, player: &HostObject) -> Result<()> {
        self.ensure_loaded(engine)?;
        engine.on_instance_player_enter(&self.map, player);
        Ok(())
    }

    pub fn on_creature_create(&mut self, engine: &ScriptEngine, creature: &HostObject) -> Result<()> {
        self.ensure_loaded(engine)?;
        engine.on_instance_creature_create(&self.map, creature);
        Ok(())
    }

    pub fn on_gameobject_create(&mut self, engine: &ScriptEngine, gameobject: &HostObject) -> Result<()> {
        self.ensure_loaded(engine)?;
        engine.on_instance_gameobject_create(&self.map, gameobject);
        Ok(())
    }

    /// Whether a script reports an encounter in progress
    pub fn is_encounter_in_progress(&mut self, engine: &ScriptEngine) -> Result<bool> {
        self.ensure_loaded(engine)?;
        Ok(engine.on_instance_check_encounter(&self.map))
    }
}
