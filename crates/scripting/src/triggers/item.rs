use hookbridge_core::HostObject;

use crate::binding::EntryKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::ItemEvent;

impl ScriptEngine {
    /// Player used an item.
    ///
    /// Runs the item's use hooks, then its gossip hello. Returns `false` when
    /// either of them asked to cancel the item's spell.
    pub fn on_item_use(&self, player: &HostObject, item: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return true };
        let cast = rt.fire_bool(
            bound(&rt.bindings().item, EntryKey::new(ItemEvent::OnUse, item.entry)),
            true,
            || (rt.object(player), rt.object(item)),
        );
        let gossip = self.on_item_gossip_hello(player, item);
        cast && gossip
    }

    pub fn on_item_equip(&self, player: &HostObject, item: &HostObject, bag: u8, slot: u8) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().item, EntryKey::new(ItemEvent::OnEquip, item.entry)),
            || (rt.object(player), rt.object(item), bag, slot),
        );
    }

    pub fn on_item_unequip(&self, player: &HostObject, item: &HostObject, bag: u8, slot: u8) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(
            bound(&rt.bindings().item, EntryKey::new(ItemEvent::OnUnequip, item.entry)),
            || (rt.object(player), rt.object(item), bag, slot),
        );
    }

    /// Item expired. Returns `true` when a script handled it.
    pub fn on_item_expire(&self, player: &HostObject, item_entry: u32) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(
            bound(&rt.bindings().item, EntryKey::new(ItemEvent::OnExpire, item_entry)),
            false,
            || (rt.object(player), item_entry),
        )
    }
}
