use hookbridge_core::HostObject;

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::BattlegroundEvent;

impl ScriptEngine {
    pub fn on_bg_create(&self, bg: &HostObject, type_id: u32, instance_id: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().battleground, EventKey::new(BattlegroundEvent::OnCreate)), || {
            (rt.object(bg), type_id, instance_id)
        });
    }

    pub fn on_bg_start(&self, bg: &HostObject, type_id: u32, instance_id: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().battleground, EventKey::new(BattlegroundEvent::OnStart)), || {
            (rt.object(bg), type_id, instance_id)
        });
    }

    pub fn on_bg_end(&self, bg: &HostObject, type_id: u32, instance_id: u32, winner: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().battleground, EventKey::new(BattlegroundEvent::OnEnd)), || {
            (rt.object(bg), type_id, instance_id, winner)
        });
    }

    pub fn on_bg_destroy(&self, bg: &HostObject, type_id: u32, instance_id: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().battleground, EventKey::new(BattlegroundEvent::OnPreDestroy)), || {
            (rt.object(bg), type_id, instance_id)
        });
    }
}

#[cfg(test)]
mod tests {
    use crate::context::EngineContext;
    use crate::engine::ScriptEngine;
    use hookbridge_core::{HostObject, ObjectKind, StateKey};

    #[test]
    fn test_bg_end_arguments() {
        let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
        engine
            .run_chunk(
                "RegisterBGEvent(2, function(event, bg, type_id, instance_id, winner) result = { event, type_id, instance_id, winner } end)",
                "bg",
            )
            .unwrap();

        let bg = HostObject::new(ObjectKind::Battleground, 1u64, 0);
        engine.on_bg_start(&bg, 2, 10);
        engine.on_bg_end(&bg, 2, 10, 469);

        let result: Vec<u32> = engine.lua().unwrap().globals().get("result").unwrap();
        assert_eq!(result, vec![2, 2, 10, 469]);
    }
}
