//! Packet hooks
//!
//! Every packet goes through the server-wide hook first, then through the
//! hooks bound to its opcode. Any script returning `false` drops the packet.

use hookbridge_core::HostObject;

use crate::binding::{EntryKey, EventKey};
use crate::engine::{bound, ScriptEngine};
use crate::hooks::{PacketEvent, ServerEvent};

impl ScriptEngine {
    /// Client packet received; `packet.entry` is the opcode
    pub fn on_packet_receive(&self, player: Option<&HostObject>, packet: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return true };
        let args = || (rt.object(packet), player.map(|player| rt.object(player)));

        let any = rt.fire_bool(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnPacketReceive)), true, args);
        let one = rt.fire_bool(
            bound(&rt.bindings().packet, EntryKey::new(PacketEvent::OnPacketReceive, packet.entry)),
            true,
            args,
        );
        any && one
    }

    /// Server packet about to be sent; `packet.entry` is the opcode
    pub fn on_packet_send(&self, player: Option<&HostObject>, packet: &HostObject) -> bool {
        let Some(rt) = self.runtime() else { return true };
        let args = || (rt.object(packet), player.map(|player| rt.object(player)));

        let any = rt.fire_bool(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnPacketSend)), true, args);
        let one = rt.fire_bool(
            bound(&rt.bindings().packet, EntryKey::new(PacketEvent::OnPacketSend, packet.entry)),
            true,
            args,
        );
        any && one
    }
}
