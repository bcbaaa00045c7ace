use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hookbridge_core::{HostObject, ObjectKind, StateKey};
use hookbridge_scripting::{EngineContext, ScriptEngine, TimedEvent, TimedEventProcessor};

fn bench_dispatch(c: &mut Criterion) {
    let engine = ScriptEngine::new(StateKey::GLOBAL, EngineContext::default()).unwrap();
    engine
        .run_chunk(
            r#"
            logins = 0
            RegisterPlayerEvent(3, function(_, player) logins = logins + 1 end)
            RegisterPlayerEvent(18, function(_, player, msg) return true end)
            "#,
            "bench",
        )
        .unwrap();
    let player = HostObject::new(ObjectKind::Player, 1u64, 0);

    let mut group = c.benchmark_group("Hook Dispatch");

    group.bench_function("Unbound hook", |b| {
        b.iter(|| engine.on_world_update(black_box(50)));
    });

    group.bench_function("One callback", |b| {
        b.iter(|| engine.on_login(black_box(&player)));
    });

    group.bench_function("Chat with in/out message", |b| {
        b.iter(|| {
            let mut msg = String::from("hello");
            black_box(engine.on_chat(&player, &mut msg, 1, 0))
        });
    });

    group.finish();
}

fn bench_timed_events(c: &mut Criterion) {
    let processor = TimedEventProcessor::<u32>::new();
    for i in 0..1_000u32 {
        processor.add_event(TimedEvent::new(i64::from(i), i, 10 + i % 100, 10 + i % 100, 0));
    }

    c.bench_function("Timed update, 1000 repeating events", |b| {
        b.iter(|| {
            let mut fired = 0u32;
            processor.update(black_box(25), |fire| fired += *fire.callback);
            black_box(fired)
        });
    });
}

criterion_group!(benches, bench_dispatch, bench_timed_events);
criterion_main!(benches);
