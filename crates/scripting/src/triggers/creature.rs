//! Creature hooks fire bindings on the creature's entry first, then
//! bindings on that one spawned creature, in a single pass.

use hookbridge_core::HostObject;
use mlua::Value;

use crate::binding::{EntryKey, UniqueObjectKey};
use crate::engine::{bound, Bindings, Both, ScriptEngine, Target};
use crate::hooks::CreatureEvent;

fn creature_target<'a>(bindings: &'a Bindings, event: CreatureEvent, creature: &HostObject) -> impl Target + 'a {
    Both(
        bound(&bindings.creature, EntryKey::new(event, creature.entry)),
        bound(
            &bindings.creature_unique,
            UniqueObjectKey::new(event, creature.guid, creature.instance_id),
        ),
    )
}

impl ScriptEngine {
    /// Creature added to the world
    pub fn on_creature_add(&self, creature: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(creature_target(rt.bindings(), CreatureEvent::OnAdd, creature), || {
            rt.object(creature)
        });
    }

    /// Creature removed from the world
    pub fn on_creature_remove(&self, creature: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(creature_target(rt.bindings(), CreatureEvent::OnRemove, creature), || {
            rt.object(creature)
        });
    }

    /// Creature (re)spawned. Returns `true` when a script handled it.
    pub fn on_creature_spawn(&self, creature: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(creature_target(rt.bindings(), CreatureEvent::OnSpawn, creature), false, || {
            rt.object(creature)
        })
    }

    pub fn on_creature_enter_combat(&self, creature: &HostObject, target: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(
            creature_target(rt.bindings(), CreatureEvent::OnEnterCombat, creature),
            false,
            || (rt.object(creature), rt.object(target)),
        )
    }

    pub fn on_creature_died(&self, creature: &HostObject, killer: Option<&HostObject>) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(creature_target(rt.bindings(), CreatureEvent::OnDied, creature), false, || {
            (rt.object(creature), killer.map(|killer| rt.object(killer)))
        })
    }

    /// Damage about to be applied.
    ///
    /// Each script may return `true` to mark the hit as handled and a new
    /// damage value as its second result, which the following scripts see.
    pub fn on_creature_damage_taken(
        &self,
        creature: &HostObject,
        attacker: Option<&HostObject>,
        damage: &mut u32,
    ) -> bool {
        let Some(rt) = self.runtime() else { return false };
        let mut handled = false;
        let current = *damage;

        rt.dispatch(
            creature_target(rt.bindings(), CreatureEvent::OnDamageTaken, creature),
            || (rt.object(creature), attacker.map(|attacker| rt.object(attacker)), current),
            |argv, results| {
                let mut results = results.into_iter();
                if let Some(Value::Boolean(true)) = results.next() {
                    handled = true;
                }
                if let Some(returned) = results.next() {
                    rt.replace_argument(argv, 2, damage, returned);
                }
            },
        );
        handled
    }

    pub fn on_creature_receive_emote(&self, creature: &HostObject, player: &HostObject, emote_id: u32) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(
            creature_target(rt.bindings(), CreatureEvent::OnReceiveEmote, creature),
            false,
            || (rt.object(creature), rt.object(player), emote_id),
        )
    }

    pub fn on_creature_ai_update(&self, creature: &HostObject, diff: u32) -> bool {
        let Some(rt) = self.runtime() else { return false };
        rt.fire_bool(creature_target(rt.bindings(), CreatureEvent::OnAiUpdate, creature), false, || {
            (rt.object(creature), diff)
        })
    }
}
