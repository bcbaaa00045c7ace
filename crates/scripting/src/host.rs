//! Host adapter
//!
//! The engine never reaches into the simulation directly. Everything it
//! needs to know about the host's world goes through [`Host`], and every
//! host-specific addition to the Lua surface goes through [`ApiExtension`].

use hookbridge_core::HostObject;
use mlua::Lua;

/// Template tables a registration entry is validated against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Creature,
    GameObject,
    Item,
    Spell,
    Map,
    Opcode,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creature => "creature",
            Self::GameObject => "gameobject",
            Self::Item => "item",
            Self::Spell => "spell",
            Self::Map => "map",
            Self::Opcode => "opcode",
        }
    }
}

/// Queries the engine makes against the host simulation
pub trait Host: Send + Sync {
    /// Whether a template entry exists
    fn entry_exists(&self, _kind: EntryKind, _entry: u32) -> bool {
        true
    }

    /// Whether an object is still part of the live world.
    ///
    /// Timed events owned by an object that left the world are still
    /// rescheduled, but their callbacks are not invoked.
    fn is_in_world(&self, _object: &HostObject) -> bool {
        true
    }

    /// Whether a player may run the `reload scripts` command
    fn can_reload_scripts(&self, _player: &HostObject) -> bool {
        false
    }
}

/// Host that knows every entry and keeps every object alive
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}

/// Additional globals installed on every fresh interpreter.
///
/// Runs after the core registration functions and before any script, on
/// the first open and again on every reload.
pub trait ApiExtension: Send + Sync {
    fn register(&self, lua: &Lua) -> mlua::Result<()>;
}
