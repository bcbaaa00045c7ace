use hookbridge_core::{HostObject, ObjectGuid};

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::GroupEvent;

impl ScriptEngine {
    pub fn on_group_create(&self, group: &HostObject, leader: ObjectGuid, group_type: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().group, EventKey::new(GroupEvent::OnCreate)), || {
            (rt.object(group), leader.get(), group_type)
        });
    }

    pub fn on_group_member_add(&self, group: &HostObject, member: ObjectGuid) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().group, EventKey::new(GroupEvent::OnMemberAdd)), || {
            (rt.object(group), member.get())
        });
    }

    pub fn on_group_member_remove(&self, group: &HostObject, member: ObjectGuid, method: u8) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().group, EventKey::new(GroupEvent::OnMemberRemove)), || {
            (rt.object(group), member.get(), method)
        });
    }

    pub fn on_group_disband(&self, group: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().group, EventKey::new(GroupEvent::OnDisband)), || rt.object(group));
    }
}
