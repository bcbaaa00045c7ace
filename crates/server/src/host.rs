//! Simulated host world state seen by the script engines

use dashmap::{DashMap, DashSet};
use hookbridge_core::{HostObject, ObjectGuid};
use hookbridge_scripting::{EntryKind, Host};

/// Tracks which objects are alive and which players are staff
#[derive(Debug, Default)]
pub struct SimHost {
    live: DashMap<ObjectGuid, HostObject>,
    staff: DashSet<ObjectGuid>,
}

impl SimHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, object: HostObject) {
        self.live.insert(object.guid, object);
    }

    pub fn remove(&self, guid: ObjectGuid) -> Option<HostObject> {
        self.staff.remove(&guid);
        self.live.remove(&guid).map(|(_, object)| object)
    }

    pub fn grant_staff(&self, guid: ObjectGuid) {
        self.staff.insert(guid);
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}

impl Host for SimHost {
    fn entry_exists(&self, kind: EntryKind, entry: u32) -> bool {
        // No template tables here; every template id except 0 exists
        match kind {
            EntryKind::Map | EntryKind::Opcode => true,
            EntryKind::Creature | EntryKind::GameObject | EntryKind::Item | EntryKind::Spell => {
                if entry == 0 {
                    tracing::debug!("Rejecting {} entry 0", kind.as_str());
                }
                entry != 0
            }
        }
    }

    fn is_in_world(&self, object: &HostObject) -> bool {
        self.live.contains_key(&object.guid)
    }

    fn can_reload_scripts(&self, player: &HostObject) -> bool {
        self.staff.contains(&player.guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_core::ObjectKind;

    #[test]
    fn test_liveness_follows_add_and_remove() {
        let host = SimHost::new();
        let creature = HostObject::new(ObjectKind::Creature, 7u64, 1000);

        assert!(!host.is_in_world(&creature));
        host.add(creature);
        assert!(host.is_in_world(&creature));
        assert_eq!(host.remove(creature.guid), Some(creature));
        assert!(!host.is_in_world(&creature));
    }

    #[test]
    fn test_only_staff_may_reload() {
        let host = SimHost::new();
        let player = HostObject::new(ObjectKind::Player, 1u64, 0);
        host.add(player);

        assert!(!host.can_reload_scripts(&player));
        host.grant_staff(player.guid);
        assert!(host.can_reload_scripts(&player));
        host.remove(player.guid);
        assert!(!host.can_reload_scripts(&player));
    }

    #[test]
    fn test_entry_zero_is_rejected_for_templates() {
        let host = SimHost::new();
        assert!(!host.entry_exists(EntryKind::Creature, 0));
        assert!(host.entry_exists(EntryKind::Creature, 1000));
        assert!(host.entry_exists(EntryKind::Map, 0));
    }
}
