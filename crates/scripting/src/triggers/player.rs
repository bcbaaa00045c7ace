use hookbridge_core::HostObject;
use mlua::Value;

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::PlayerEvent;

/// Whether `command` is `reload scripts`, accepting any prefix of `scripts`
fn is_reload_command(command: &str) -> bool {
    let mut words = command.split_whitespace();
    let (Some(verb), Some(target), None) = (words.next(), words.next(), words.next()) else {
        return false;
    };
    verb.eq_ignore_ascii_case("reload") && "scripts".starts_with(target.to_ascii_lowercase().as_str())
}

impl ScriptEngine {
    pub fn on_character_create(&self, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnCharacterCreate)), || {
            rt.object(player)
        });
    }

    pub fn on_login(&self, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnLogin)), || rt.object(player));
    }

    pub fn on_first_login(&self, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnFirstLogin)), || {
            rt.object(player)
        });
    }

    pub fn on_logout(&self, player: &HostObject) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnLogout)), || rt.object(player));
    }

    /// Money gained (positive) or spent (negative); scripts may rewrite it
    pub fn on_money_change(&self, player: &HostObject, amount: &mut i32) {
        let Some(rt) = self.runtime() else { return };
        let current = *amount;
        rt.fire_inout(
            bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnMoneyChange)),
            1,
            amount,
            || (rt.object(player), current),
        );
    }

    /// Experience about to be granted; scripts may rewrite it
    pub fn on_give_xp(&self, player: &HostObject, amount: &mut u32, victim: Option<&HostObject>) {
        let Some(rt) = self.runtime() else { return };
        let current = *amount;
        rt.fire_inout(
            bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnGiveXp)),
            1,
            amount,
            || (rt.object(player), current, victim.map(|victim| rt.object(victim))),
        );
    }

    pub fn on_level_change(&self, player: &HostObject, old_level: u8) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnLevelChange)), || {
            (rt.object(player), old_level)
        });
    }

    /// Chat message about to be sent.
    ///
    /// Returns `false` when a script blocked the message. A script may also
    /// return a replacement text as its second value.
    pub fn on_chat(&self, player: &HostObject, message: &mut String, chat_type: u32, language: u32) -> bool {
        let Some(rt) = self.runtime() else { return true };
        let mut allowed = true;
        let text = message.clone();

        rt.dispatch(
            bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnChat)),
            || (rt.object(player), text, chat_type, language),
            |_, results| {
                let mut results = results.into_iter();
                if let Some(Value::Boolean(false)) = results.next() {
                    allowed = false;
                }
                // Numbers are accepted too, converted the way Lua prints them
                if let Some(value @ (Value::String(_) | Value::Integer(_) | Value::Number(_))) = results.next() {
                    if let Ok(Some(replacement)) = rt.lua().coerce_string(value) {
                        *message = replacement.to_string_lossy();
                    }
                }
            },
        );
        allowed
    }

    /// Chat command typed by a player, or by the console when `player` is
    /// `None`.
    ///
    /// `reload scripts` is handled here for the console and privileged
    /// players. Returns `false` when the command was consumed.
    pub fn on_command(&self, player: Option<&HostObject>, command: &str) -> bool {
        let Some(rt) = self.runtime() else { return true };

        let privileged = player.map_or(true, |player| self.context().host().can_reload_scripts(player));
        if privileged && is_reload_command(command) {
            tracing::info!("[{}] Reload requested by command", self.key());
            self.request_reload();
            return false;
        }

        rt.fire_bool(
            bound(&rt.bindings().player, EventKey::new(PlayerEvent::OnCommand)),
            true,
            || (player.map(|player| rt.object(player)), command),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineContext;
    use hookbridge_core::{ObjectKind, StateKey};

    fn player() -> HostObject {
        HostObject::new(ObjectKind::Player, 5u64, 0)
    }

    fn engine(source: &str) -> ScriptEngine {
        let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
        engine.run_chunk(source, "player").unwrap();
        engine
    }

    #[test]
    fn test_money_change_chains_overrides() {
        let engine = engine(
            r#"
            seen = {}
            RegisterPlayerEvent(14, function(_, _, amount) table.insert(seen, amount) return amount * 2 end)
            RegisterPlayerEvent(14, function(_, _, amount) table.insert(seen, amount) return "not a number" end)
            RegisterPlayerEvent(14, function(_, _, amount) table.insert(seen, amount) end)
            "#,
        );

        let mut amount = 10;
        engine.on_money_change(&player(), &mut amount);
        assert_eq!(amount, 20);

        let seen: Vec<i32> = engine.lua().unwrap().globals().get("seen").unwrap();
        assert_eq!(seen, vec![10, 20, 20]);
    }

    #[test]
    fn test_failed_callback_keeps_amount() {
        let engine = engine(
            r#"
            RegisterPlayerEvent(12, function(_, _, amount) error("no xp for you") end)
            RegisterPlayerEvent(12, function(_, _, amount, victim) victim_seen = victim return amount + 1 end)
            "#,
        );

        let mut xp = 100;
        engine.on_give_xp(&player(), &mut xp, None);
        assert_eq!(xp, 101);
        let victim: Value = engine.lua().unwrap().globals().get("victim_seen").unwrap();
        assert!(victim.is_nil());
    }

    #[test]
    fn test_chat_can_block_and_rewrite() {
        let engine = engine(
            r#"
            RegisterPlayerEvent(18, function(_, _, msg) if msg == "spam" then return false end end)
            RegisterPlayerEvent(18, function(_, _, msg) return true, msg:upper() end)
            "#,
        );

        let mut message = String::from("hello");
        assert!(engine.on_chat(&player(), &mut message, 1, 0));
        assert_eq!(message, "HELLO");

        let mut message = String::from("spam");
        assert!(!engine.on_chat(&player(), &mut message, 1, 0));
    }

    #[test]
    fn test_chat_accepts_number_replacement() {
        let engine = engine(
            r#"
            RegisterPlayerEvent(18, function(_, _, msg)
                if msg == "int" then return true, 42 end
                if msg == "float" then return true, 2.5 end
                return true, {}
            end)
            "#,
        );

        let mut message = String::from("int");
        assert!(engine.on_chat(&player(), &mut message, 1, 0));
        assert_eq!(message, "42");

        let mut message = String::from("float");
        assert!(engine.on_chat(&player(), &mut message, 1, 0));
        assert_eq!(message, "2.5");

        let mut message = String::from("table");
        assert!(engine.on_chat(&player(), &mut message, 1, 0));
        assert_eq!(message, "table");
    }

    #[test]
    fn test_reload_command_from_console() {
        let engine = engine("");
        assert!(!engine.on_command(None, "reload scr"));
        assert!(engine.reload_requested());
    }

    #[test]
    fn test_reload_command_needs_privilege() {
        let engine = engine("RegisterPlayerEvent(42, function(_, _, cmd) if cmd == 'secret' then return false end end)");
        assert!(engine.on_command(Some(&player()), "reload scripts"));
        assert!(!engine.reload_requested());
        assert!(!engine.on_command(Some(&player()), "secret"));
    }

    #[test]
    fn test_is_reload_command() {
        assert!(is_reload_command("reload scripts"));
        assert!(is_reload_command("RELOAD S"));
        assert!(!is_reload_command("reload"));
        assert!(!is_reload_command("reload config"));
        assert!(!is_reload_command("reload scripts now"));
    }
}
