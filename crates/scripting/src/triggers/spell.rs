use hookbridge_core::HostObject;

use crate::binding::EntryKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::SpellEvent;

impl ScriptEngine {
    /// Spell cast started; `spell.entry` is the spell id
    pub fn on_spell_cast(&self, spell: &HostObject, skip_check: bool) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().spell, EntryKey::new(SpellEvent::OnCast, spell.entry)), || {
            (rt.object(spell), skip_check)
        });
    }
}
