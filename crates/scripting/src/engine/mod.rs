//! # Script Engine
//!
//! One Lua interpreter and everything registered against it: the binding
//! stores of every hook category, the timed event manager and the per-state
//! call bookkeeping.
//!
//! ## Dispatch
//! Every typed trigger goes through [`Runtime::dispatch`]:
//! 1. bail out when no binding exists for the key (no marshaling at all)
//! 2. marshal the host arguments, prefixed with the event id
//! 3. take the callbacks to run for this firing from the store
//! 4. run each one in a protected call and hand its results to the policy
//!
//! ## Reload
//! Closing erases every timed event and clears every binding before the
//! interpreter is dropped. Opening creates a fresh interpreter and fresh
//! stores, registers the globals and host extensions, then runs the scripts.

mod api;

pub(crate) use api::schedule_event;

use hookbridge_core::{HostObject, ObjectGuid, StateKey};
use mlua::{FromLua, IntoLua, IntoLuaMulti, Lua, MultiValue, RegistryKey, Table, Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::binding::{BindingStore, EntryKey, EventKey, HookKey, UniqueObjectKey};
use crate::context::EngineContext;
use crate::error::Result;
use crate::event_mgr::{EventManager, ProcessorId};
use crate::hooks::{
    BattlegroundEvent, CreatureEvent, GameObjectEvent, GossipEvent, GroupEvent, GuildEvent,
    InstanceEvent, ItemEvent, PacketEvent, PlayerEvent, ServerEvent, SpellEvent, VehicleEvent,
};
use crate::host::Host;
use crate::loader;
use crate::object::ScriptObject;
use crate::timed::{EventId, EventState};

/// Interpreter handle of a registered callback
pub type Callback = RegistryKey;

/// One binding store per hook category
#[derive(Debug, Default)]
pub struct Bindings {
    pub server: BindingStore<EventKey<ServerEvent>, Callback>,
    pub player: BindingStore<EventKey<PlayerEvent>, Callback>,
    pub guild: BindingStore<EventKey<GuildEvent>, Callback>,
    pub group: BindingStore<EventKey<GroupEvent>, Callback>,
    pub vehicle: BindingStore<EventKey<VehicleEvent>, Callback>,
    pub battleground: BindingStore<EventKey<BattlegroundEvent>, Callback>,

    /// Keyed by opcode
    pub packet: BindingStore<EntryKey<PacketEvent>, Callback>,
    pub creature: BindingStore<EntryKey<CreatureEvent>, Callback>,
    pub creature_unique: BindingStore<UniqueObjectKey<CreatureEvent>, Callback>,
    pub creature_gossip: BindingStore<EntryKey<GossipEvent>, Callback>,
    pub gameobject: BindingStore<EntryKey<GameObjectEvent>, Callback>,
    pub gameobject_gossip: BindingStore<EntryKey<GossipEvent>, Callback>,
    pub spell: BindingStore<EntryKey<SpellEvent>, Callback>,
    pub item: BindingStore<EntryKey<ItemEvent>, Callback>,
    pub item_gossip: BindingStore<EntryKey<GossipEvent>, Callback>,
    /// Keyed by gossip menu id
    pub player_gossip: BindingStore<EntryKey<GossipEvent>, Callback>,
    /// Keyed by map id
    pub map: BindingStore<EntryKey<InstanceEvent>, Callback>,
    /// Keyed by instance id
    pub instance: BindingStore<EntryKey<InstanceEvent>, Callback>,
}

impl Bindings {
    /// Release every binding of every category
    pub fn clear_all(&self) {
        self.server.clear_all();
        self.player.clear_all();
        self.guild.clear_all();
        self.group.clear_all();
        self.vehicle.clear_all();
        self.battleground.clear_all();
        self.packet.clear_all();
        self.creature.clear_all();
        self.creature_unique.clear_all();
        self.creature_gossip.clear_all();
        self.gameobject.clear_all();
        self.gameobject_gossip.clear_all();
        self.spell.clear_all();
        self.item.clear_all();
        self.item_gossip.clear_all();
        self.player_gossip.clear_all();
        self.map.clear_all();
        self.instance.clear_all();
    }

    /// Total number of bindings across all categories
    pub fn len(&self) -> usize {
        self.server.len()
            + self.player.len()
            + self.guild.len()
            + self.group.len()
            + self.vehicle.len()
            + self.battleground.len()
            + self.packet.len()
            + self.creature.len()
            + self.creature_unique.len()
            + self.creature_gossip.len()
            + self.gameobject.len()
            + self.gameobject_gossip.len()
            + self.spell.len()
            + self.item.len()
            + self.item_gossip.len()
            + self.player_gossip.len()
            + self.map.len()
            + self.instance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Call nesting bookkeeping, kept across reloads
#[derive(Debug, Default)]
pub struct CallState {
    event_level: AtomicU32,
    callstack_id: AtomicU64,
}

impl CallState {
    /// Number of dispatches and calls currently on the stack
    pub fn event_level(&self) -> u32 {
        self.event_level.load(Ordering::Acquire)
    }

    /// Bumped every time the event level drops back to zero
    pub fn callstack_id(&self) -> u64 {
        self.callstack_id.load(Ordering::Acquire)
    }
}

/// Raises the event level for its lifetime
struct CallGuard<'a> {
    state: &'a CallState,
}

impl<'a> CallGuard<'a> {
    fn enter(state: &'a CallState) -> Self {
        state.event_level.fetch_add(1, Ordering::AcqRel);
        Self { state }
    }
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        let previous = self.state.event_level.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "event level underflow");
        if previous == 1 {
            // Objects pushed during this callstack are now stale
            self.state.callstack_id.fetch_add(1, Ordering::AcqRel);
        }
    }
}

/// Where a firing finds its callbacks
pub(crate) trait Target {
    fn event_id(&self) -> u32;

    fn has_bindings(&self) -> bool;

    /// Callbacks to run for one firing, in order
    fn callbacks(&self) -> Vec<Arc<Callback>>;
}

/// One key of one store
pub(crate) struct Bound<'a, K> {
    store: &'a BindingStore<K, Callback>,
    key: K,
}

pub(crate) fn bound<K: HookKey>(store: &BindingStore<K, Callback>, key: K) -> Bound<'_, K> {
    Bound { store, key }
}

impl<K: HookKey> Target for Bound<'_, K> {
    fn event_id(&self) -> u32 {
        self.key.event_id()
    }

    fn has_bindings(&self) -> bool {
        self.store.has_bindings_for(&self.key)
    }

    fn callbacks(&self) -> Vec<Arc<Callback>> {
        self.store.push_refs_for(&self.key)
    }
}

/// Two targets fired as a single pass, the first one's callbacks first
pub(crate) struct Both<A, B>(pub A, pub B);

impl<A: Target, B: Target> Target for Both<A, B> {
    fn event_id(&self) -> u32 {
        self.0.event_id()
    }

    fn has_bindings(&self) -> bool {
        self.0.has_bindings() || self.1.has_bindings()
    }

    fn callbacks(&self) -> Vec<Arc<Callback>> {
        let mut callbacks = self.0.callbacks();
        callbacks.extend(self.1.callbacks());
        callbacks
    }
}

/// State reachable from the Lua side through registered globals
pub(crate) struct EngineShared {
    pub(crate) key: StateKey,
    pub(crate) bindings: Bindings,
    pub(crate) events: EventManager<Callback>,
    pub(crate) host: Arc<dyn Host>,
    pub(crate) calls: Arc<CallState>,
    trace_back: bool,
    next_event_id: AtomicI64,
    reload_requested: AtomicBool,
    instance_data: Mutex<HashMap<u32, RegistryKey>>,
}

impl EngineShared {
    fn new(key: StateKey, host: Arc<dyn Host>, calls: Arc<CallState>, trace_back: bool) -> Self {
        Self {
            key,
            bindings: Bindings::default(),
            events: EventManager::new(),
            host,
            calls,
            trace_back,
            next_event_id: AtomicI64::new(1),
            reload_requested: AtomicBool::new(false),
            instance_data: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn next_event_id(&self) -> EventId {
        self.next_event_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn request_reload(&self) {
        self.reload_requested.store(true, Ordering::Release);
    }
}

/// An open interpreter and its shared state
pub(crate) struct Runtime {
    lua: Lua,
    shared: Arc<EngineShared>,
}

impl Runtime {
    pub(crate) fn lua(&self) -> &Lua {
        &self.lua
    }

    pub(crate) fn bindings(&self) -> &Bindings {
        &self.shared.bindings
    }

    /// Wrap a host object for the current callstack
    pub(crate) fn object(&self, object: &HostObject) -> ScriptObject {
        ScriptObject::new(*object, &self.shared)
    }

    /// Protected call of one registered callback.
    ///
    /// Errors are logged and swallowed; the caller sees `None` exactly as if
    /// the callback had returned nothing usable.
    fn execute_call(&self, callback: &Callback, args: MultiValue) -> Option<MultiValue> {
        let value: Value = match self.lua.registry_value(callback) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!("[{}] Cannot execute call: {}", self.shared.key, err);
                return None;
            }
        };
        let function = match value {
            Value::Function(function) => function,
            other => {
                tracing::error!(
                    "Cannot execute call: registered value is {}, not a function.",
                    other.type_name()
                );
                return None;
            }
        };

        let _call = CallGuard::enter(&self.shared.calls);
        match function.call::<MultiValue>(args) {
            Ok(results) => Some(results),
            Err(err) => {
                self.report(&err);
                if let Err(gc_err) = self.lua.gc_collect() {
                    tracing::debug!("Garbage collection after failed call failed: {}", gc_err);
                }
                None
            }
        }
    }

    fn report(&self, err: &mlua::Error) {
        let message = err.to_string();
        let message = if self.shared.trace_back {
            message.as_str()
        } else {
            message
                .split("\nstack traceback:")
                .next()
                .unwrap_or(message.as_str())
        };
        tracing::error!("[{}] {}", self.shared.key, message);
    }

    /// Fire every callback of `target`.
    ///
    /// `args` only runs when at least one binding exists. `on_return` sees
    /// the marshaled arguments (event id first) and each successful call's
    /// results, and may rewrite the arguments for the next callback.
    pub(crate) fn dispatch<T, A, F>(&self, target: T, args: impl FnOnce() -> A, mut on_return: F)
    where
        T: Target,
        A: IntoLuaMulti,
        F: FnMut(&mut Vec<Value>, MultiValue),
    {
        if !target.has_bindings() {
            return;
        }

        let _dispatch = CallGuard::enter(&self.shared.calls);
        let mut argv = match args().into_lua_multi(&self.lua) {
            Ok(values) => values.into_vec(),
            Err(err) => {
                tracing::error!(
                    "[{}] Failed to push arguments of event {}: {}",
                    self.shared.key,
                    target.event_id(),
                    err
                );
                return;
            }
        };
        argv.insert(0, Value::Integer(target.event_id().into()));

        for callback in target.callbacks() {
            if let Some(results) = self.execute_call(&callback, MultiValue::from_vec(argv.clone())) {
                on_return(&mut argv, results);
            }
        }
    }

    /// Fire and ignore every return value
    pub(crate) fn fire<T: Target, A: IntoLuaMulti>(&self, target: T, args: impl FnOnce() -> A) {
        self.dispatch(target, args, |_, _| {});
    }

    /// Fire and return `!default` if any callback returned it, else `default`
    pub(crate) fn fire_bool<T: Target, A: IntoLuaMulti>(
        &self,
        target: T,
        default: bool,
        args: impl FnOnce() -> A,
    ) -> bool {
        let mut result = default;
        self.dispatch(target, args, |_, results| {
            if let Some(Value::Boolean(returned)) = results.into_iter().next() {
                if returned != default {
                    result = returned;
                }
            }
        });
        result
    }

    /// Fire with an in/out argument.
    ///
    /// `slot` is the position of the value in the host arguments. A callback
    /// returning a value convertible to `V` replaces it for every following
    /// callback; anything else keeps the previous value.
    pub(crate) fn fire_inout<T, A, V>(&self, target: T, slot: usize, value: &mut V, args: impl FnOnce() -> A)
    where
        T: Target,
        A: IntoLuaMulti,
        V: FromLua + IntoLua + Clone,
    {
        self.dispatch(target, args, |argv, results| {
            if let Some(returned) = results.into_iter().next() {
                self.replace_argument(argv, slot, value, returned);
            }
        });
    }

    /// Overwrite an in/out argument with a callback's return value.
    ///
    /// Nil and values that do not convert to `V` leave both untouched.
    pub(crate) fn replace_argument<V>(&self, argv: &mut [Value], slot: usize, value: &mut V, returned: Value)
    where
        V: FromLua + IntoLua + Clone,
    {
        if returned.is_nil() {
            return;
        }
        let Ok(updated) = V::from_lua(returned, &self.lua) else {
            return;
        };
        match updated.clone().into_lua(&self.lua) {
            Ok(pushed) => {
                if let Some(arg) = argv.get_mut(slot + 1) {
                    *arg = pushed;
                }
                *value = updated;
            }
            Err(err) => tracing::error!("[{}] Failed to push updated argument: {}", self.shared.key, err),
        }
    }

    /// Tick every timed event processor
    fn update_timed_events(&self, diff: u32) {
        let shared = &self.shared;
        shared.events.update_processors(diff, |owner, fire| {
            if let Some(object) = &owner {
                if !shared.host.is_in_world(object) {
                    return;
                }
            }

            let _dispatch = CallGuard::enter(&shared.calls);
            let object = owner.map(|object| self.object(&object));
            match (fire.id, fire.delay, fire.repeats, object).into_lua_multi(&self.lua) {
                Ok(args) => {
                    self.execute_call(&fire.callback, args);
                }
                Err(err) => tracing::error!("[{}] Failed to push timed event {}: {}", shared.key, fire.id, err),
            }
        });
    }

    pub(crate) fn instance_data(&self, instance_id: u32) -> Option<Table> {
        let data = self.shared.instance_data.lock();
        let key = data.get(&instance_id)?;
        self.lua.registry_value::<Table>(key).ok()
    }

    pub(crate) fn set_instance_data(&self, instance_id: u32, table: Table) -> mlua::Result<()> {
        let key = self.lua.create_registry_value(table)?;
        self.shared.instance_data.lock().insert(instance_id, key);
        Ok(())
    }

    fn has_instance_data(&self, instance_id: u32) -> bool {
        self.shared.instance_data.lock().contains_key(&instance_id)
    }
}

/// A script engine bound to one world or map state
pub struct ScriptEngine {
    key: StateKey,
    context: EngineContext,
    calls: Arc<CallState>,
    runtime: Option<Runtime>,
}

impl ScriptEngine {
    /// Create an engine and run every script that belongs to `key`
    pub fn new(key: StateKey, context: EngineContext) -> Result<Self> {
        let mut engine = Self {
            key,
            context,
            calls: Arc::new(CallState::default()),
            runtime: None,
        };
        engine.open()?;
        Ok(engine)
    }

    pub fn key(&self) -> StateKey {
        self.key
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Swap the context, picked up by the next reload
    pub fn set_context(&mut self, context: EngineContext) {
        self.context = context;
    }

    pub fn is_open(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn lua(&self) -> Option<&Lua> {
        self.runtime.as_ref().map(Runtime::lua)
    }

    pub fn bindings(&self) -> Option<&Bindings> {
        self.runtime.as_ref().map(Runtime::bindings)
    }

    pub fn events(&self) -> Option<&EventManager<Callback>> {
        self.runtime.as_ref().map(|rt| &rt.shared.events)
    }

    pub fn calls(&self) -> &CallState {
        &self.calls
    }

    pub fn event_level(&self) -> u32 {
        self.calls.event_level()
    }

    /// Number of registered bindings across all categories
    pub fn binding_count(&self) -> usize {
        self.bindings().map_or(0, Bindings::len)
    }

    pub(crate) fn runtime(&self) -> Option<&Runtime> {
        self.runtime.as_ref()
    }

    /// Ask for a reload at the start of the next [`update`](Self::update)
    pub fn request_reload(&self) {
        if let Some(rt) = &self.runtime {
            rt.shared.request_reload();
        }
    }

    pub fn reload_requested(&self) -> bool {
        self.runtime
            .as_ref()
            .map_or(false, |rt| rt.shared.reload_requested.load(Ordering::Acquire))
    }

    /// Close the interpreter and start over from the scripts on disk
    pub fn reload(&mut self) -> Result<()> {
        tracing::info!("[{}] Reloading scripts", self.key);
        self.close();
        self.open()
    }

    /// Advance timed events, reloading first when a script asked for it
    pub fn update(&mut self, diff: u32) {
        if self.reload_requested() {
            if let Err(err) = self.reload() {
                tracing::error!("[{}] Reload failed: {}", self.key, err);
            }
        }

        if let Some(rt) = &self.runtime {
            rt.update_timed_events(diff);
        }
    }

    /// Run a chunk of Lua in this engine
    pub fn run_chunk(&self, source: &str, name: &str) -> Result<()> {
        let Some(rt) = &self.runtime else {
            return Err(crate::ScriptError::Disabled);
        };
        rt.lua.load(source).set_name(name).exec()?;
        Ok(())
    }

    /// Allocate the timed event processor of a newly spawned object
    pub fn create_object_processor(&self, object: &HostObject) -> Option<ProcessorId> {
        let rt = self.runtime.as_ref()?;
        Some(rt.shared.events.create_object_processor(*object))
    }

    /// Forget an object that is being destroyed.
    ///
    /// Its timed events stop firing and are released at the end of the next
    /// update.
    pub fn on_object_removed(&self, guid: ObjectGuid) {
        if let Some(rt) = &self.runtime {
            rt.shared.events.flag_object(guid);
        }
    }

    /// Whether this state holds instance data for `instance_id`
    pub fn has_instance_data(&self, instance_id: u32) -> bool {
        self.runtime
            .as_ref()
            .map_or(false, |rt| rt.has_instance_data(instance_id))
    }

    fn open(&mut self) -> Result<()> {
        let start = Instant::now();
        let config = self.context.config();

        let lua = Lua::new();
        let shared = Arc::new(EngineShared::new(
            self.key,
            Arc::clone(self.context.host()),
            Arc::clone(&self.calls),
            config.trace_back,
        ));

        api::register_globals(&lua, &shared)?;
        for extension in self.context.extensions() {
            extension.register(&lua)?;
        }
        loader::configure_package(&lua, self.context.catalog(), config)?;

        let runtime = self.runtime.insert(Runtime { lua, shared });
        let count = loader::run_scripts(
            runtime.lua(),
            self.context.catalog(),
            self.key,
            config.compatibility_mode,
        );

        tracing::info!(
            "[{}] Executed {} Lua scripts in {} ms",
            self.key,
            count,
            start.elapsed().as_millis()
        );

        self.on_lua_state_open();
        Ok(())
    }

    fn close(&mut self) {
        if self.runtime.is_none() {
            return;
        }
        self.on_lua_state_close();

        if let Some(runtime) = self.runtime.take() {
            runtime.shared.events.set_all_event_states(EventState::Erase);
            runtime.shared.bindings.clear_all();
            runtime.shared.instance_data.lock().clear();
        }
    }
}

impl Drop for ScriptEngine {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("key", &self.key)
            .field("open", &self.is_open())
            .field("bindings", &self.binding_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookbridge_core::ObjectKind;

    fn engine() -> ScriptEngine {
        ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap()
    }

    #[test]
    fn test_call_guard_bumps_callstack_at_zero() {
        let state = CallState::default();
        {
            let _outer = CallGuard::enter(&state);
            {
                let _inner = CallGuard::enter(&state);
                assert_eq!(state.event_level(), 2);
            }
            assert_eq!(state.callstack_id(), 0);
        }
        assert_eq!(state.event_level(), 0);
        assert_eq!(state.callstack_id(), 1);
    }

    #[test]
    fn test_fire_without_bindings_skips_marshaling() {
        let engine = engine();
        let rt = engine.runtime().unwrap();
        let mut marshaled = false;

        rt.fire(bound(&rt.bindings().server, EventKey::new(ServerEvent::OnStartup)), || {
            marshaled = true;
        });
        assert!(!marshaled);
        assert_eq!(engine.event_level(), 0);
    }

    #[test]
    fn test_non_function_binding_is_skipped() {
        let engine = engine();
        let rt = engine.runtime().unwrap();
        let bogus = rt.lua().create_registry_value(42).unwrap();
        let key = EventKey::new(ServerEvent::OnStartup);
        rt.bindings().server.insert(key, bogus, 0);

        let mut returns = 0;
        rt.dispatch(bound(&rt.bindings().server, key), || (), |_, _| returns += 1);
        assert_eq!(returns, 0);
        assert_eq!(engine.event_level(), 0);
    }

    #[test]
    fn test_errors_are_isolated() {
        let engine = engine();
        engine
            .run_chunk(
                r#"
                calls = 0
                RegisterServerEvent(14, function() calls = calls + 1; error("boom") end)
                RegisterServerEvent(14, function() calls = calls + 1 end)
                "#,
                "isolation",
            )
            .unwrap();

        engine.on_startup();
        let calls: u32 = engine.lua().unwrap().globals().get("calls").unwrap();
        assert_eq!(calls, 2);
        assert_eq!(engine.event_level(), 0);
    }

    #[test]
    fn test_timed_event_skips_objects_out_of_world() {
        struct Gone;
        impl Host for Gone {
            fn is_in_world(&self, _object: &HostObject) -> bool {
                false
            }
        }

        let context = EngineContext::new(Default::default(), Arc::new(Gone));
        let mut engine = ScriptEngine::new(StateKey::GLOBAL, context).unwrap();
        let creature = HostObject::new(ObjectKind::Creature, 7u64, 1);
        engine.create_object_processor(&creature);

        let rt = engine.runtime().unwrap();
        let func = rt
            .lua()
            .create_function(|lua, ()| lua.globals().set("fired", true))
            .unwrap();
        schedule_event(
            rt.lua(),
            &rt.shared,
            rt.shared.events.processor_for_object_or_create(&creature).processor(),
            func,
            Value::Integer(10),
            Some(2),
        )
        .unwrap();

        engine.update(10);
        let fired: Option<bool> = engine.lua().unwrap().globals().get("fired").unwrap();
        assert_eq!(fired, None);
        // Still rescheduled
        assert_eq!(engine.events().unwrap().event_count(), 1);
    }
}
