use hookbridge_core::HostObject;

use crate::binding::EntryKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::GameObjectEvent;

impl ScriptEngine {
    pub fn on_gameobject_add(&self, gameobject: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().gameobject, EntryKey::new(GameObjectEvent::OnAdd, gameobject.entry)),
            || rt.object(gameobject),
        );
    }

    pub fn on_gameobject_remove(&self, gameobject: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().gameobject, EntryKey::new(GameObjectEvent::OnRemove, gameobject.entry)),
            || rt.object(gameobject),
        );
    }

    pub fn on_gameobject_spawn(&self, gameobject: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().gameobject, EntryKey::new(GameObjectEvent::OnSpawn, gameobject.entry)),
            || rt.object(gameobject),
        );
    }

    pub fn on_gameobject_update(&self, gameobject: &HostObject, diff: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().gameobject, EntryKey::new(GameObjectEvent::OnAiUpdate, gameobject.entry)),
            || (rt.object(gameobject), diff),
        );
    }

    /// Player used a game object. Returns `true` to skip the default action.
    pub fn on_gameobject_use(&self, gameobject: &HostObject, player: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(
            bound(&rt.bindings().gameobject, EntryKey::new(GameObjectEvent::OnUse, gameobject.entry)),
            false,
            || (rt.object(gameobject), rt.object(player)),
        )
    }
}
