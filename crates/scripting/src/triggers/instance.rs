//! Instance hooks
//!
//! Fired by [`InstanceScript`](crate::instance::InstanceScript). Bindings on
//! the map id run first, then bindings on the instance id. Every callback
//! gets the instance data table and the map before the hook's own values.

use hookbridge_core::HostObject;

use crate::binding::EntryKey;
use crate::engine::{bound, Bindings, Both, ScriptEngine, Target};
use crate::hooks::InstanceEvent;

fn instance_target<'a>(bindings: &'a Bindings, event: InstanceEvent, map: &HostObject) -> impl Target + 'a {
    Both(
        bound(&bindings.map, EntryKey::new(event, map.map_id)),
        bound(&bindings.instance, EntryKey::new(event, map.instance_id)),
    )
}

impl ScriptEngine {
    pub(crate) fn on_instance_initialize(&self, map: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnInitialize, map), || {
            (rt.instance_data(map.instance_id), rt.object(map))
        });
    }

    pub(crate) fn on_instance_load(&self, map: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnLoad, map), || {
            (rt.instance_data(map.instance_id), rt.object(map))
        });
    }

    pub(crate) fn on_instance_update(&self, map: &HostObject, diff: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnUpdate, map), || {
            (rt.instance_data(map.instance_id), rt.object(map), diff)
        });
    }

    pub(crate) fn on_instance_player_enter(&self, map: &HostObject, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnPlayerEnter, map), || {
            (rt.instance_data(map.instance_id), rt.object(map), rt.object(player))
        });
    }

    pub(crate) fn on_instance_creature_create(&self, map: &HostObject, creature: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnCreatureCreate, map), || {
            (rt.instance_data(map.instance_id), rt.object(map), rt.object(creature))
        });
    }

    pub(crate) fn on_instance_gameobject_create(&self, map: &HostObject, gameobject: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(instance_target(rt.bindings(), InstanceEvent::OnGameObjectCreate, map), || {
            (rt.instance_data(map.instance_id), rt.object(map), rt.object(gameobject))
        });
    }

    pub(crate) fn on_instance_check_encounter(&self, map: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(
            instance_target(rt.bindings(), InstanceEvent::OnCheckEncounterInProgress, map),
            false,
            || (rt.instance_data(map.instance_id), rt.object(map)),
        )
    }
}
