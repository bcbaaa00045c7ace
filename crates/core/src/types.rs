//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Host object identity (64-bit, unique among live objects)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectGuid(pub u64);

impl ObjectGuid {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Bit-identical signed form, for places that only hold `i64` such as
    /// Lua integers. High guids come out negative.
    pub fn to_bits(&self) -> i64 {
        self.0 as i64
    }

    /// Inverse of [`to_bits`](Self::to_bits)
    pub const fn from_bits(bits: i64) -> Self {
        Self(bits as u64)
    }
}

impl From<u64> for ObjectGuid {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Identifies one script engine state.
///
/// The world state has no map; every other state is bound to a map and
/// one of its instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    map_id: Option<u32>,
    instance_id: u32,
}

impl StateKey {
    /// The world (global) state
    pub const GLOBAL: StateKey = StateKey {
        map_id: None,
        instance_id: 0,
    };

    pub const fn map(map_id: u32, instance_id: u32) -> Self {
        Self {
            map_id: Some(map_id),
            instance_id,
        }
    }

    pub fn is_global(&self) -> bool {
        self.map_id.is_none()
    }

    pub fn map_id(&self) -> Option<u32> {
        self.map_id
    }

    pub fn instance_id(&self) -> u32 {
        self.instance_id
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.map_id {
            None => write!(f, "world"),
            Some(map) => write!(f, "map {} instance {}", map, self.instance_id),
        }
    }
}

/// Kind of host object crossing into scripts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Player,
    Creature,
    GameObject,
    Item,
    Map,
    Guild,
    Group,
    Battleground,
    Vehicle,
    Spell,
    Packet,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Creature => "Creature",
            Self::GameObject => "GameObject",
            Self::Item => "Item",
            Self::Map => "Map",
            Self::Guild => "Guild",
            Self::Group => "Group",
            Self::Battleground => "BattleGround",
            Self::Vehicle => "Vehicle",
            Self::Spell => "Spell",
            Self::Packet => "WorldPacket",
        }
    }
}

/// A host-side object as seen by the bridge.
///
/// The bridge never owns host objects; it only carries their identity
/// so scripts can refer back to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostObject {
    pub kind: ObjectKind,
    pub guid: ObjectGuid,
    /// Template entry (creature/gameobject/item template, spell id, opcode...)
    pub entry: u32,
    pub map_id: u32,
    pub instance_id: u32,
}

impl HostObject {
    pub fn new(kind: ObjectKind, guid: impl Into<ObjectGuid>, entry: u32) -> Self {
        Self {
            kind,
            guid: guid.into(),
            entry,
            map_id: 0,
            instance_id: 0,
        }
    }

    /// Place the object on a map instance
    pub fn on_map(mut self, map_id: u32, instance_id: u32) -> Self {
        self.map_id = map_id;
        self.instance_id = instance_id;
        self
    }
}
