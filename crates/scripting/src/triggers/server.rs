use hookbridge_core::HostObject;

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::ServerEvent;

impl ScriptEngine {
    /// World tick, after [`update`](ScriptEngine::update) advanced the timers
    pub fn on_world_update(&self, diff: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnUpdate)), || diff);
    }

    pub fn on_startup(&self) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnStartup)), || ());
    }

    pub fn on_shutdown(&self) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnShutdown)), || ());
    }

    pub fn on_shutdown_init(&self, code: u32, mask: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnShutdownInit)), || {
            (code, mask)
        });
    }

    pub fn on_shutdown_cancel(&self) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnShutdownCancel)), || ());
    }

    pub fn on_open_state_change(&self, open: bool) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnOpenStateChange)), || open);
    }

    pub fn on_config_load(&self, reload: bool) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnConfigLoad)), || reload);
    }

    /// Fired once the scripts of a freshly opened interpreter have run
    pub(crate) fn on_lua_state_open(&self) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnLuaStateOpen)), || ());
    }

    /// Fired right before the interpreter is torn down
    pub(crate) fn on_lua_state_close(&self) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnLuaStateClose)), || ());
    }

    pub fn on_map_create(&self, map: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnMapCreate)), || rt.object(map));
    }

    pub fn on_map_destroy(&self, map: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnMapDestroy)), || rt.object(map));
    }

    pub fn on_map_update(&self, map: &HostObject, diff: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnMapUpdate)), || {
            (rt.object(map), diff)
        });
    }

    pub fn on_player_enter_map(&self, map: &HostObject, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnPlayerEnterMap)), || {
            (rt.object(map), rt.object(player))
        });
    }

    pub fn on_player_leave_map(&self, map: &HostObject, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnPlayerLeaveMap)), || {
            (rt.object(map), rt.object(player))
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::context::EngineContext;
    use crate::engine::ScriptEngine;
    use hookbridge_core::{HostObject, ObjectKind, StateKey};

    #[test]
    fn test_world_update_passes_diff() {
        let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
        engine
            .run_chunk("RegisterServerEvent(13, function(event, diff) last = { event, diff } end)", "update")
            .unwrap();

        engine.on_world_update(250);
        let (event, diff): (u32, u32) = engine
            .lua()
            .unwrap()
            .load("return last[1], last[2]")
            .eval()
            .unwrap();
        assert_eq!((event, diff), (13, 250));
    }

    #[test]
    fn test_player_enter_map_pushes_objects() {
        let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
        engine
            .run_chunk(
                "RegisterServerEvent(21, function(_, map, player) seen = map:GetTypeName() .. ':' .. player:GetGUID() end)",
                "enter",
            )
            .unwrap();

        let map = HostObject::new(ObjectKind::Map, 1u64, 571).on_map(571, 0);
        let player = HostObject::new(ObjectKind::Player, 99u64, 0).on_map(571, 0);
        engine.on_player_enter_map(&map, &player);

        let seen: String = engine.lua().unwrap().globals().get("seen").unwrap();
        assert_eq!(seen, "Map:99");
    }
}
