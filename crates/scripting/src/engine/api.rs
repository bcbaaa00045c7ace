//! Globals installed on every fresh interpreter.
//!
//! Registration functions come in three shapes matching the binding keys:
//!
//! - `RegisterXEvent(event, fn, shots?)`
//! - `RegisterXEvent(entry, event, fn, shots?)`
//! - `RegisterUniqueCreatureEvent(guid, instanceId, event, fn, shots?)`
//!
//! Each one returns a function that cancels exactly the binding it created.

use hookbridge_core::ObjectGuid;
use mlua::{FromLua, Function, Lua, Value};
use std::sync::Arc;

use super::{Bindings, Callback, EngineShared};
use crate::binding::{BindingStore, EntryKey, EventKey, HookKey, UniqueObjectKey};
use crate::error::ScriptError;
use crate::hooks::{
    BattlegroundEvent, CreatureEvent, GameObjectEvent, GossipEvent, GroupEvent, GuildEvent, HookEvent,
    InstanceEvent, ItemEvent, PacketEvent, PlayerEvent, RegisterType, ServerEvent, SpellEvent,
    VehicleEvent,
};
use crate::host::EntryKind;
use crate::timed::{EventId, EventState, TimedEvent, TimedEventProcessor};

type StoreFn<K> = fn(&Bindings) -> &BindingStore<K, Callback>;

pub(crate) fn register_globals(lua: &Lua, shared: &Arc<EngineShared>) -> mlua::Result<()> {
    register_event_fn::<ServerEvent>(lua, shared, "RegisterServerEvent", RegisterType::Server, |b| &b.server)?;
    register_event_fn::<PlayerEvent>(lua, shared, "RegisterPlayerEvent", RegisterType::Player, |b| &b.player)?;
    register_event_fn::<GuildEvent>(lua, shared, "RegisterGuildEvent", RegisterType::Guild, |b| &b.guild)?;
    register_event_fn::<GroupEvent>(lua, shared, "RegisterGroupEvent", RegisterType::Group, |b| &b.group)?;
    register_event_fn::<VehicleEvent>(lua, shared, "RegisterVehicleEvent", RegisterType::Vehicle, |b| &b.vehicle)?;
    register_event_fn::<BattlegroundEvent>(lua, shared, "RegisterBGEvent", RegisterType::Battleground, |b| {
        &b.battleground
    })?;

    register_entry_fn::<PacketEvent>(
        lua,
        shared,
        "RegisterPacketEvent",
        RegisterType::Packet,
        Some(EntryKind::Opcode),
        |b| &b.packet,
    )?;
    register_entry_fn::<CreatureEvent>(
        lua,
        shared,
        "RegisterCreatureEvent",
        RegisterType::Creature,
        Some(EntryKind::Creature),
        |b| &b.creature,
    )?;
    register_entry_fn::<GossipEvent>(
        lua,
        shared,
        "RegisterCreatureGossipEvent",
        RegisterType::CreatureGossip,
        Some(EntryKind::Creature),
        |b| &b.creature_gossip,
    )?;
    register_entry_fn::<GameObjectEvent>(
        lua,
        shared,
        "RegisterGameObjectEvent",
        RegisterType::GameObject,
        Some(EntryKind::GameObject),
        |b| &b.gameobject,
    )?;
    register_entry_fn::<GossipEvent>(
        lua,
        shared,
        "RegisterGameObjectGossipEvent",
        RegisterType::GameObjectGossip,
        Some(EntryKind::GameObject),
        |b| &b.gameobject_gossip,
    )?;
    register_entry_fn::<ItemEvent>(
        lua,
        shared,
        "RegisterItemEvent",
        RegisterType::Item,
        Some(EntryKind::Item),
        |b| &b.item,
    )?;
    register_entry_fn::<GossipEvent>(
        lua,
        shared,
        "RegisterItemGossipEvent",
        RegisterType::ItemGossip,
        Some(EntryKind::Item),
        |b| &b.item_gossip,
    )?;
    register_entry_fn::<GossipEvent>(
        lua,
        shared,
        "RegisterPlayerGossipEvent",
        RegisterType::PlayerGossip,
        None,
        |b| &b.player_gossip,
    )?;
    register_entry_fn::<SpellEvent>(
        lua,
        shared,
        "RegisterSpellEvent",
        RegisterType::Spell,
        Some(EntryKind::Spell),
        |b| &b.spell,
    )?;
    register_entry_fn::<InstanceEvent>(
        lua,
        shared,
        "RegisterMapEvent",
        RegisterType::Map,
        Some(EntryKind::Map),
        |b| &b.map,
    )?;
    register_entry_fn::<InstanceEvent>(
        lua,
        shared,
        "RegisterInstanceEvent",
        RegisterType::Instance,
        None,
        |b| &b.instance,
    )?;
    register_unique_creature_fn(lua, shared)?;

    clear_event_fn::<ServerEvent>(lua, shared, "ClearServerEvents", |b| &b.server)?;
    clear_event_fn::<PlayerEvent>(lua, shared, "ClearPlayerEvents", |b| &b.player)?;
    clear_event_fn::<GuildEvent>(lua, shared, "ClearGuildEvents", |b| &b.guild)?;
    clear_event_fn::<GroupEvent>(lua, shared, "ClearGroupEvents", |b| &b.group)?;
    clear_event_fn::<VehicleEvent>(lua, shared, "ClearVehicleEvents", |b| &b.vehicle)?;
    clear_event_fn::<BattlegroundEvent>(lua, shared, "ClearBattleGroundEvents", |b| &b.battleground)?;

    clear_entry_fn::<PacketEvent>(lua, shared, "ClearPacketEvents", |b| &b.packet)?;
    clear_entry_fn::<CreatureEvent>(lua, shared, "ClearCreatureEvents", |b| &b.creature)?;
    clear_entry_fn::<GossipEvent>(lua, shared, "ClearCreatureGossipEvents", |b| &b.creature_gossip)?;
    clear_entry_fn::<GameObjectEvent>(lua, shared, "ClearGameObjectEvents", |b| &b.gameobject)?;
    clear_entry_fn::<GossipEvent>(lua, shared, "ClearGameObjectGossipEvents", |b| &b.gameobject_gossip)?;
    clear_entry_fn::<ItemEvent>(lua, shared, "ClearItemEvents", |b| &b.item)?;
    clear_entry_fn::<GossipEvent>(lua, shared, "ClearItemGossipEvents", |b| &b.item_gossip)?;
    clear_entry_fn::<GossipEvent>(lua, shared, "ClearPlayerGossipEvents", |b| &b.player_gossip)?;
    clear_entry_fn::<SpellEvent>(lua, shared, "ClearSpellEvents", |b| &b.spell)?;
    clear_entry_fn::<InstanceEvent>(lua, shared, "ClearMapEvents", |b| &b.map)?;
    clear_entry_fn::<InstanceEvent>(lua, shared, "ClearInstanceEvents", |b| &b.instance)?;
    clear_unique_creature_fn(lua, shared)?;

    register_timed_event_fns(lua, shared)?;
    register_state_fns(lua, shared)?;

    Ok(())
}

/// Store a callback and build its cancel function
fn insert_binding<K>(
    lua: &Lua,
    shared: &Arc<EngineShared>,
    select: StoreFn<K>,
    key: K,
    callback: Function,
    shots: u32,
) -> mlua::Result<Function>
where
    K: HookKey + Send + Sync + 'static,
{
    let callback = lua.create_registry_value(callback)?;
    let id = select(&shared.bindings).insert(key, callback, shots);

    let owner = Arc::downgrade(shared);
    lua.create_function(move |_, ()| {
        if let Some(shared) = owner.upgrade() {
            select(&shared.bindings).remove(id);
        }
        Ok(())
    })
}

fn register_event_fn<E: HookEvent>(
    lua: &Lua,
    shared: &Arc<EngineShared>,
    name: &str,
    regtype: RegisterType,
    select: StoreFn<EventKey<E>>,
) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(
        move |lua, (event, callback, shots): (u32, Function, Option<u32>)| {
            let event = E::from_id(event).ok_or(ScriptError::UnknownEvent {
                regtype: regtype as u8,
                id: 0,
                event,
            })?;
            insert_binding(lua, &shared, select, EventKey::new(event), callback, shots.unwrap_or(0))
        },
    )?;
    lua.globals().set(name, function)
}

fn register_entry_fn<E: HookEvent>(
    lua: &Lua,
    shared: &Arc<EngineShared>,
    name: &str,
    regtype: RegisterType,
    validate: Option<EntryKind>,
    select: StoreFn<EntryKey<E>>,
) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(
        move |lua, (entry, event, callback, shots): (u32, u32, Function, Option<u32>)| {
            let event = E::from_id(event).ok_or(ScriptError::UnknownEvent {
                regtype: regtype as u8,
                id: entry,
                event,
            })?;
            if let Some(kind) = validate {
                if !shared.host.entry_exists(kind, entry) {
                    return Err(ScriptError::EntryNotFound {
                        kind: kind.as_str(),
                        entry,
                    }
                    .into());
                }
            }
            insert_binding(lua, &shared, select, EntryKey::new(event, entry), callback, shots.unwrap_or(0))
        },
    )?;
    lua.globals().set(name, function)
}

fn register_unique_creature_fn(lua: &Lua, shared: &Arc<EngineShared>) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(
        move |lua,
              (guid, instance_id, event, callback, shots): (i64, u32, u32, Function, Option<u32>)| {
            let event = CreatureEvent::from_id(event).ok_or(ScriptError::UnknownEvent {
                regtype: RegisterType::CreatureUnique as u8,
                id: 0,
                event,
            })?;
            let key = UniqueObjectKey::new(event, ObjectGuid::from_bits(guid), instance_id);
            let select: StoreFn<UniqueObjectKey<CreatureEvent>> = |b| &b.creature_unique;
            insert_binding(lua, &shared, select, key, callback, shots.unwrap_or(0))
        },
    )?;
    lua.globals().set("RegisterUniqueCreatureEvent", function)
}

/// Clear one event, or every event of the category, through `make_key`
fn clear_keys<K, E>(store: &BindingStore<K, Callback>, event: Option<u32>, make_key: impl Fn(E) -> K)
where
    K: HookKey,
    E: HookEvent,
{
    match event {
        None => {
            for event in E::ALL {
                store.clear(&make_key(*event));
            }
        }
        Some(id) => {
            if let Some(event) = E::from_id(id) {
                store.clear(&make_key(event));
            }
        }
    }
}

fn clear_event_fn<E: HookEvent>(
    lua: &Lua,
    shared: &Arc<EngineShared>,
    name: &str,
    select: StoreFn<EventKey<E>>,
) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(move |_, event: Option<u32>| {
        clear_keys(select(&shared.bindings), event, EventKey::<E>::new);
        Ok(())
    })?;
    lua.globals().set(name, function)
}

fn clear_entry_fn<E: HookEvent>(
    lua: &Lua,
    shared: &Arc<EngineShared>,
    name: &str,
    select: StoreFn<EntryKey<E>>,
) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(move |_, (entry, event): (u32, Option<u32>)| {
        clear_keys(select(&shared.bindings), event, |event: E| EntryKey::new(event, entry));
        Ok(())
    })?;
    lua.globals().set(name, function)
}

fn clear_unique_creature_fn(lua: &Lua, shared: &Arc<EngineShared>) -> mlua::Result<()> {
    let shared = Arc::clone(shared);
    let function = lua.create_function(
        move |_, (guid, instance_id, event): (i64, u32, Option<u32>)| {
            let guid = ObjectGuid::from_bits(guid);
            clear_keys(&shared.bindings.creature_unique, event, |event: CreatureEvent| {
                UniqueObjectKey::new(event, guid, instance_id)
            });
            Ok(())
        },
    )?;
    lua.globals().set("ClearUniqueCreatureEvents", function)
}

/// Read a delay argument: a number, or a `{min, max}` table
fn parse_delay(lua: &Lua, delay: Value) -> mlua::Result<(u32, u32)> {
    let (min, max) = match delay {
        Value::Table(range) => (range.get::<u32>(1)?, range.get::<u32>(2)?),
        other => {
            let delay = u32::from_lua(other, lua)?;
            (delay, delay)
        }
    };

    if min > max {
        return Err(ScriptError::InvalidDelay { min, max }.into());
    }
    Ok((min, max))
}

/// Schedule `func` on `processor`, returning the new event's id
pub(crate) fn schedule_event(
    lua: &Lua,
    shared: &EngineShared,
    processor: &TimedEventProcessor<Callback>,
    func: Function,
    delay: Value,
    repeats: Option<u32>,
) -> mlua::Result<EventId> {
    let (min, max) = parse_delay(lua, delay)?;
    let callback = lua.create_registry_value(func)?;
    let id = shared.next_event_id();

    processor.add_event(TimedEvent::new(id, callback, min, max, repeats.unwrap_or(1)));
    Ok(id)
}

fn register_timed_event_fns(lua: &Lua, shared: &Arc<EngineShared>) -> mlua::Result<()> {
    let globals = lua.globals();

    let owner = Arc::clone(shared);
    globals.set(
        "CreateLuaEvent",
        lua.create_function(
            move |lua, (func, delay, repeats): (Function, Value, Option<u32>)| {
                schedule_event(lua, &owner, owner.events.global(), func, delay, repeats)
            },
        )?,
    )?;

    let owner = Arc::clone(shared);
    globals.set(
        "RemoveEventById",
        lua.create_function(move |_, (id, all): (EventId, Option<bool>)| {
            if all.unwrap_or(false) {
                owner.events.set_event_state(id, EventState::Abort);
            } else {
                owner.events.global().set_state(id, EventState::Abort);
            }
            Ok(())
        })?,
    )?;

    let owner = Arc::clone(shared);
    globals.set(
        "RemoveEvents",
        lua.create_function(move |_, all: Option<bool>| {
            if all.unwrap_or(false) {
                owner.events.set_all_event_states(EventState::Abort);
            } else {
                owner.events.global().set_states(EventState::Abort);
            }
            Ok(())
        })?,
    )?;

    Ok(())
}

fn register_state_fns(lua: &Lua, shared: &Arc<EngineShared>) -> mlua::Result<()> {
    let globals = lua.globals();

    let owner = Arc::clone(shared);
    globals.set(
        "ReloadScripts",
        lua.create_function(move |_, ()| {
            tracing::info!("[{}] Reload requested by script", owner.key);
            owner.request_reload();
            Ok(())
        })?,
    )?;

    let key = shared.key;
    globals.set(
        "GetStateMapId",
        lua.create_function(move |_, ()| Ok(key.map_id().map_or(-1, i64::from)))?,
    )?;
    globals.set(
        "GetStateInstanceId",
        lua.create_function(move |_, ()| Ok(key.instance_id()))?,
    )?;

    Ok(())
}
