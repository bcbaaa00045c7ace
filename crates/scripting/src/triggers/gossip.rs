//! Gossip hooks
//!
//! Creature and game object gossip is handled by scripts as soon as one is
//! bound: the hook then returns `true` unless a script returns `false`.
//! Item gossip works the other way round and reports whether the item's
//! spell may still be cast.

use hookbridge_core::HostObject;

use crate::binding::EntryKey;
use crate::engine::{bound, Runtime, ScriptEngine, Target};
use crate::hooks::GossipEvent;
use mlua::IntoLuaMulti;

/// `false` when unbound, otherwise `true` unless a script returned `false`
fn handled_by_scripts<T: Target, A: IntoLuaMulti>(rt: &Runtime, target: T, args: impl FnOnce() -> A) -> bool {
    if !target.has_bindings() {
        return false;
    }
    rt.fire_bool(target, true, args)
}

impl ScriptEngine {
    pub fn on_creature_gossip_hello(&self, player: &HostObject, creature: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        handled_by_scripts(
            rt,
            bound(&rt.bindings().creature_gossip, EntryKey::new(GossipEvent::OnHello, creature.entry)),
            || (rt.object(player), rt.object(creature)),
        )
    }

    pub fn on_creature_gossip_select(
        &self,
        player: &HostObject,
        creature: &HostObject,
        sender: u32,
        action: u32,
        code: Option<&str>,
    ) -> bool {
        let Some(rt) = self.runtime() else { return false };
        handled_by_scripts(
            rt,
            bound(&rt.bindings().creature_gossip, EntryKey::new(GossipEvent::OnSelect, creature.entry)),
            || (rt.object(player), rt.object(creature), sender, action, code),
        )
    }

    pub fn on_gameobject_gossip_hello(&self, player: &HostObject, gameobject: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        handled_by_scripts(
            rt,
            bound(&rt.bindings().gameobject_gossip, EntryKey::new(GossipEvent::OnHello, gameobject.entry)),
            || (rt.object(player), rt.object(gameobject)),
        )
    }

    pub fn on_gameobject_gossip_select(
        &self,
        player: &HostObject,
        gameobject: &HostObject,
        sender: u32,
        action: u32,
        code: Option<&str>,
    ) -> bool {
        let Some(rt) = self.runtime() else { return false };
        handled_by_scripts(
            rt,
            bound(&rt.bindings().gameobject_gossip, EntryKey::new(GossipEvent::OnSelect, gameobject.entry)),
            || (rt.object(player), rt.object(gameobject), sender, action, code),
        )
    }

    /// Returns `false` when a script cancelled the item's spell
    pub fn on_item_gossip_hello(&self, player: &HostObject, item: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return true };
        rt.fire_bool(
            bound(&rt.bindings().item_gossip, EntryKey::new(GossipEvent::OnHello, item.entry)),
            true,
            || (rt.object(player), rt.object(item)),
        )
    }

    pub fn on_item_gossip_select(
        &self,
        player: &HostObject,
        item: &HostObject,
        sender: u32,
        action: u32,
        code: Option<&str>,
    ) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().item_gossip, EntryKey::new(GossipEvent::OnSelect, item.entry)),
            || (rt.object(player), rt.object(item), sender, action, code),
        );
    }

    /// Option picked from a menu a script sent to a player.
    ///
    /// The player is passed twice, as receiver and as sender, so the
    /// argument list lines up with the other gossip selects.
    pub fn on_player_gossip_select(
        &self,
        player: &HostObject,
        menu_id: u32,
        sender: u32,
        action: u32,
        code: Option<&str>,
    ) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().player_gossip, EntryKey::new(GossipEvent::OnSelect, menu_id)),
            || (rt.object(player), rt.object(player), sender, action, code),
        );
    }
}
