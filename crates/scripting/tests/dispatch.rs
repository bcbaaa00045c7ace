//! Dispatch and timed event behaviour driven through real Lua scripts

use hookbridge_core::{HostObject, ObjectKind, StateKey};
use hookbridge_scripting::{EngineContext, ScriptEngine};

fn engine(source: &str) -> ScriptEngine {
    let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
    engine.run_chunk(source, "test").unwrap();
    engine
}

fn global<T: mlua::FromLua>(engine: &ScriptEngine, name: &str) -> T {
    engine.lua().unwrap().globals().get(name).unwrap()
}

fn player(guid: u64) -> HostObject {
    HostObject::new(ObjectKind::Player, guid, 0)
}

#[test]
fn test_callbacks_run_in_registration_order() {
    let engine = engine(
        r#"
        order = {}
        RegisterPlayerEvent(3, function() table.insert(order, 1) end)
        RegisterPlayerEvent(3, function() table.insert(order, 2) end)
        RegisterPlayerEvent(3, function() table.insert(order, 3) end)
        "#,
    );

    engine.on_login(&player(1));
    engine.on_login(&player(2));
    let order: Vec<u32> = global(&engine, "order");
    assert_eq!(order, vec![1, 2, 3, 1, 2, 3]);
}

#[test]
fn test_shots_exhaust_across_firings() {
    let engine = engine(
        r#"
        fired = 0
        RegisterServerEvent(14, function() fired = fired + 1 end, 2)
        "#,
    );

    engine.on_startup();
    assert_eq!(engine.binding_count(), 1);
    engine.on_startup();
    assert_eq!(engine.binding_count(), 0);
    engine.on_startup();

    assert_eq!(global::<u32>(&engine, "fired"), 2);
}

#[test]
fn test_cancel_is_idempotent() {
    let engine = engine(
        r#"
        fired = 0
        cancel = RegisterServerEvent(14, function() fired = fired + 1 end, 1)
        "#,
    );

    engine.on_startup();
    assert_eq!(engine.binding_count(), 0);
    // Cancelling an exhausted binding and cancelling twice are both no-ops
    engine.run_chunk("cancel() cancel()", "cancel").unwrap();
    assert_eq!(global::<u32>(&engine, "fired"), 1);
}

#[test]
fn test_registration_during_firing_waits_for_next_pass() {
    let engine = engine(
        r#"
        calls = {}
        RegisterServerEvent(14, function()
            table.insert(calls, "outer")
            RegisterServerEvent(14, function() table.insert(calls, "inner") end)
        end, 1)
        RegisterServerEvent(14, function() table.insert(calls, "second") end)
        "#,
    );

    engine.on_startup();
    let calls: Vec<String> = global(&engine, "calls");
    assert_eq!(calls, vec!["outer", "second"]);

    engine.on_startup();
    let calls: Vec<String> = global(&engine, "calls");
    assert_eq!(calls, vec!["outer", "second", "second", "inner"]);
}

#[test]
fn test_cancel_during_firing_keeps_pass_intact() {
    let engine = engine(
        r#"
        calls = {}
        local cancel_third
        RegisterServerEvent(14, function() table.insert(calls, 1) cancel_third() end)
        RegisterServerEvent(14, function() table.insert(calls, 2) end)
        cancel_third = RegisterServerEvent(14, function() table.insert(calls, 3) end)
        "#,
    );

    // The pass already holds its callbacks; the cancellation shows next time
    engine.on_startup();
    engine.on_startup();
    let calls: Vec<u32> = global(&engine, "calls");
    assert_eq!(calls, vec![1, 2, 3, 1, 2]);
}

#[test]
fn test_timed_event_cancelling_itself() {
    let mut engine = engine(
        r#"
        fires = 0
        CreateLuaEvent(function(id) fires = fires + 1 RemoveEventById(id) end, 100, 0)
        "#,
    );

    for _ in 0..20 {
        engine.update(100);
    }
    assert_eq!(global::<u32>(&engine, "fires"), 1);
    assert_eq!(engine.events().unwrap().event_count(), 0);
}

#[test]
fn test_timed_event_arguments() {
    let mut engine = engine(
        r#"
        seen = {}
        id = CreateLuaEvent(function(event_id, delay, repeats, object)
            table.insert(seen, { event_id, delay, repeats, object == nil })
        end, 100, 2)
        "#,
    );

    engine.update(100);
    engine.update(100);
    engine.update(100);

    let (id, first_repeats, second_repeats, delay, no_object): (i64, u32, u32, u32, bool) = engine
        .lua()
        .unwrap()
        .load("return seen[1][1] == id and id or -1, seen[1][3], seen[2][3], seen[1][2], seen[1][4]")
        .eval()
        .unwrap();
    assert!(id > 0);
    assert_eq!((first_repeats, second_repeats), (1, 0));
    assert_eq!(delay, 100);
    assert!(no_object);
    assert_eq!(global::<mlua::Table>(&engine, "seen").raw_len(), 2);
}

#[test]
fn test_deferred_operations_replay_in_order() {
    let mut engine = engine(
        r#"
        order = {}
        b = CreateLuaEvent(function() table.insert(order, "b") end, 500)
        CreateLuaEvent(function()
            CreateLuaEvent(function() table.insert(order, "a") end, 50)
            RemoveEventById(b)
            CreateLuaEvent(function() table.insert(order, "c") end, 50)
        end, 100)
        "#,
    );

    engine.update(100);
    engine.update(50);
    engine.update(1000);

    let order: Vec<String> = global(&engine, "order");
    assert_eq!(order, vec!["a", "c"]);
    assert_eq!(engine.events().unwrap().event_count(), 0);
}

#[test]
fn test_object_timers_stop_when_object_is_removed() {
    let mut engine = engine(
        r#"
        ticks = 0
        RegisterCreatureEvent(500, 5, function(_, creature)
            creature:RegisterEvent(function(_, _, _, owner) ticks = ticks + 1 last_owner = owner:GetGUID() end, 100, 0)
        end)
        "#,
    );
    let creature = HostObject::new(ObjectKind::Creature, 42u64, 500);
    engine.create_object_processor(&creature);

    engine.on_creature_spawn(&creature);
    engine.update(100);
    engine.update(100);
    assert_eq!(global::<u32>(&engine, "ticks"), 2);
    assert_eq!(global::<u64>(&engine, "last_owner"), 42);

    engine.on_object_removed(creature.guid);
    engine.update(100);
    assert_eq!(global::<u32>(&engine, "ticks"), 2);
    assert_eq!(engine.events().unwrap().processor_count(), 1);
}

#[test]
fn test_objects_go_stale_after_their_callback() {
    let engine = engine(
        r#"
        RegisterPlayerEvent(3, function(_, player) kept = player inside = player:GetGUID() end)
        "#,
    );

    engine.on_login(&player(9));
    assert_eq!(global::<u64>(&engine, "inside"), 9);

    let err = engine.run_chunk("return kept:GetGUID()", "stale").unwrap_err();
    assert!(err.to_string().contains("Using an invalid Player object"));
    assert_eq!(engine.event_level(), 0);
}

#[test]
fn test_errors_do_not_leak_event_level() {
    let engine = engine(
        r#"
        RegisterPlayerEvent(3, function() error("first") end)
        RegisterPlayerEvent(3, function() nested = true error("second") end)
        "#,
    );

    let before = engine.calls().callstack_id();
    engine.on_login(&player(1));
    assert_eq!(engine.event_level(), 0);
    assert!(global::<bool>(&engine, "nested"));
    assert_eq!(engine.calls().callstack_id(), before + 1);
}
