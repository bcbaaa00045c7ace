use hookbridge_core::HostObject;

use crate::binding::EventKey;
use crate::engine::{bound, ScriptEngine};
use crate::hooks::GuildEvent;

impl ScriptEngine {
    pub fn on_guild_add_member(&self, guild: &HostObject, player: &HostObject, rank: u32) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().guild, EventKey::new(GuildEvent::OnAddMember)), || {
            (rt.object(guild), rt.object(player), rank)
        });
    }

    pub fn on_guild_remove_member(&self, guild: &HostObject, player: &HostObject, is_disbanding: bool) {
        let Some(rt) = self.runtime() else { return };
        rt.fire(bound(&rt.bindings().guild, EventKey::new(GuildEvent::OnRemoveMember)), || {
            (rt.object(guild), rt.object(player), is_disbanding)
        });
    }

    /// Money put into the guild bank; scripts may rewrite the amount
    pub fn on_guild_money_deposit(&self, guild: &HostObject, player: &HostObject, amount: &mut u32) {
        let Some(rt) = self.runtime() else { return };
        let current = *amount;
        rt.fire_inout(
            bound(&rt.bindings().guild, EventKey::new(GuildEvent::OnMoneyDeposit)),
            2,
            amount,
            || (rt.object(guild), rt.object(player), current),
        );
    }

    /// Money taken from the guild bank; scripts may rewrite the amount
    pub fn on_guild_money_withdraw(&self, guild: &HostObject, player: &HostObject, amount: &mut u32, is_repair: bool) {
        let Some(rt) = self.runtime() else { return };
        let current = *amount;
        rt.fire_inout(
            bound(&rt.bindings().guild, EventKey::new(GuildEvent::OnMoneyWithdraw)),
            2,
            amount,
            || (rt.object(guild), rt.object(player), current, is_repair),
        );
    }
}
