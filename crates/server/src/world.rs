//! Simulated world loop
//!
//! A tiny stand-in for a game world: one continent, one dungeon instance, a
//! handful of creatures and a console player. It exists to drive every
//! engine the way a real host would.

use std::sync::Arc;

use hookbridge_config::EngineConfig;
use hookbridge_core::{HostObject, ObjectGuid, ObjectKind, Result, StateKey};
use hookbridge_scripting::{EngineContext, EngineManager, InstanceScript, ScriptEngine};

use crate::host::SimHost;

/// Continent every creature spawns on
pub const CONTINENT_MAP: u32 = 0;
/// Dungeon kept running with an instance script
pub const DUNGEON_MAP: u32 = 631;
pub const DUNGEON_INSTANCE: u32 = 1;

pub struct World {
    host: Arc<SimHost>,
    engines: EngineManager,
    continent: HostObject,
    dungeon: InstanceScript,
    creatures: Vec<HostObject>,
    player: Option<HostObject>,
    next_guid: u64,
}

impl World {
    /// Open the world state and the map states of the simulation
    pub fn new(config: EngineConfig) -> Result<Self> {
        let host = Arc::new(SimHost::new());
        let context = EngineContext::new(config, host.clone());
        let mut engines = EngineManager::new(context);

        engines.create(StateKey::GLOBAL)?;
        engines.create(StateKey::map(CONTINENT_MAP, 0))?;
        engines.create(StateKey::map(DUNGEON_MAP, DUNGEON_INSTANCE))?;

        let continent =
            HostObject::new(ObjectKind::Map, u64::from(CONTINENT_MAP), CONTINENT_MAP).on_map(CONTINENT_MAP, 0);
        let dungeon = HostObject::new(ObjectKind::Map, u64::from(DUNGEON_MAP), DUNGEON_MAP)
            .on_map(DUNGEON_MAP, DUNGEON_INSTANCE);

        Ok(Self {
            host,
            engines,
            continent,
            dungeon: InstanceScript::new(dungeon),
            creatures: Vec::new(),
            player: None,
            next_guid: 1,
        })
    }

    fn world_engine(&self) -> Option<&ScriptEngine> {
        self.engines.global()
    }

    fn map_engine(&self, object: &HostObject) -> Option<&ScriptEngine> {
        self.engines.get(StateKey::map(object.map_id, object.instance_id))
    }

    fn allocate_guid(&mut self) -> ObjectGuid {
        let guid = ObjectGuid::new(self.next_guid);
        self.next_guid += 1;
        guid
    }

    pub fn start(&mut self) {
        if let Some(engine) = self.world_engine() {
            engine.on_config_load(false);
            engine.on_startup();
            engine.on_map_create(&self.continent);
            engine.on_map_create(self.dungeon.map());
            engine.on_open_state_change(true);
        }

        if let Some(engine) = self.engines.get(StateKey::map(DUNGEON_MAP, DUNGEON_INSTANCE)) {
            if let Err(err) = self.dungeon.load(engine, None) {
                tracing::error!("Failed to initialize instance {}: {}", DUNGEON_INSTANCE, err);
            }
        }

        self.spawn_creature(1000);
        self.login();
    }

    /// Spawn a creature on the continent
    pub fn spawn_creature(&mut self, entry: u32) -> HostObject {
        let guid = self.allocate_guid();
        let creature = HostObject::new(ObjectKind::Creature, guid, entry).on_map(CONTINENT_MAP, 0);
        self.host.add(creature);

        if let Some(engine) = self.map_engine(&creature) {
            engine.create_object_processor(&creature);
            engine.on_creature_add(&creature);
            engine.on_creature_spawn(&creature);
        }

        tracing::info!("Spawned creature {} (entry {})", guid, entry);
        self.creatures.push(creature);
        creature
    }

    /// Remove the most recently spawned creature
    pub fn despawn_creature(&mut self) -> Option<HostObject> {
        let creature = self.creatures.pop()?;
        if let Some(engine) = self.map_engine(&creature) {
            engine.on_creature_remove(&creature);
        }
        self.engines.on_object_removed(creature.guid);
        self.host.remove(creature.guid);

        tracing::info!("Despawned creature {}", creature.guid);
        Some(creature)
    }

    fn login(&mut self) {
        let guid = self.allocate_guid();
        let player = HostObject::new(ObjectKind::Player, guid, 0).on_map(CONTINENT_MAP, 0);
        self.host.add(player);
        self.host.grant_staff(guid);

        if let Some(engine) = self.world_engine() {
            engine.on_login(&player);
            engine.on_player_enter_map(&self.continent, &player);
        }
        tracing::info!("Console player {} logged in", guid);
        self.player = Some(player);
    }

    fn logout(&mut self) {
        let Some(player) = self.player.take() else { return };
        if let Some(engine) = self.world_engine() {
            engine.on_player_leave_map(&self.continent, &player);
            engine.on_logout(&player);
        }
        self.engines.on_object_removed(player.guid);
        self.host.remove(player.guid);
    }

    /// Advance every engine and the simulated objects by `diff` milliseconds
    pub fn tick(&mut self, diff: u32) {
        self.engines.update(diff);

        if let Some(engine) = self.world_engine() {
            engine.on_world_update(diff);
        }
        if let Some(engine) = self.map_engine(&self.continent) {
            engine.on_map_update(&self.continent, diff);
            for creature in &self.creatures {
                engine.on_creature_ai_update(creature, diff);
            }
        }
        if let Some(engine) = self.engines.get(StateKey::map(DUNGEON_MAP, DUNGEON_INSTANCE)) {
            if let Err(err) = self.dungeon.update(engine, diff) {
                tracing::warn!("Instance {} update failed: {}", DUNGEON_INSTANCE, err);
            }
        }
    }

    /// Rescan the script folder and reload every engine
    pub fn reload(&mut self) {
        tracing::info!("Reloading scripts...");
        self.engines.reload_all();
        if let Some(engine) = self.world_engine() {
            engine.on_config_load(true);
        }
    }

    /// Handle one console line.
    ///
    /// Scripts see every line first through the command hook. The built in
    /// commands are `spawn <entry>`, `despawn`, `say <text>` and `save`.
    pub fn console_command(&mut self, line: &str) {
        if line.is_empty() {
            return;
        }

        let pass_to_host = self.world_engine().map_or(true, |engine| engine.on_command(None, line));
        if self.world_engine().map_or(false, ScriptEngine::reload_requested) {
            self.reload();
            return;
        }
        if !pass_to_host {
            return;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "spawn" => match rest.trim().parse() {
                Ok(entry) => {
                    self.spawn_creature(entry);
                }
                Err(_) => tracing::warn!("Usage: spawn <entry>"),
            },
            "despawn" => {
                if self.despawn_creature().is_none() {
                    tracing::warn!("No creature to despawn");
                }
            }
            "say" => self.say(rest),
            "save" => self.save_dungeon(),
            _ => tracing::warn!("Unknown command `{}`", command),
        }
    }

    fn say(&self, text: &str) {
        let (Some(player), Some(engine)) = (self.player, self.world_engine()) else {
            return;
        };
        let mut message = text.to_string();
        if engine.on_chat(&player, &mut message, 1, 0) {
            tracing::info!("[Say] {}: {}", player.guid, message);
        } else {
            tracing::info!("Message blocked by a script");
        }
    }

    fn save_dungeon(&mut self) {
        let Some(engine) = self.engines.get(StateKey::map(DUNGEON_MAP, DUNGEON_INSTANCE)) else {
            return;
        };
        match self.dungeon.save(engine) {
            Ok(blob) => tracing::info!("Instance {} saved ({} bytes)", DUNGEON_INSTANCE, blob.len()),
            Err(err) => tracing::error!("Instance {} save failed: {}", DUNGEON_INSTANCE, err),
        }
    }

    pub fn shutdown(&mut self) {
        if let Some(engine) = self.world_engine() {
            engine.on_shutdown_init(0, 0);
            engine.on_open_state_change(false);
        }

        self.save_dungeon();
        self.logout();
        while self.despawn_creature().is_some() {}

        if let Some(engine) = self.world_engine() {
            engine.on_map_destroy(&self.continent);
            engine.on_map_destroy(self.dungeon.map());
            engine.on_shutdown();
        }

        let keys: Vec<StateKey> = self.engines.keys().copied().collect();
        for key in keys {
            self.engines.destroy(key);
        }
        tracing::info!("{} objects left in world", self.host.live_count());
    }
}
