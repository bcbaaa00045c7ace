//! Timed event processor
//!
//! A per-object (or global) queue of delayed and repeating script callbacks.
//! Callbacks run outside the processor's lock, so a callback may schedule,
//! cancel or flush events of the very processor that is firing it. While an
//! update pass is active such structural requests are queued and replayed in
//! order once the outermost pass finishes.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Identifier scripts use to refer to a timed event
pub type EventId = i64;

/// Lifecycle state of a timed event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventState {
    /// Fires again while repeats remain
    Run,
    /// Removed (and its callback released) at its next due time, without firing
    Abort,
    /// Terminal. The callback is released immediately and the event never fires again.
    Erase,
}

/// A scheduled callback
#[derive(Debug)]
pub struct TimedEvent<H> {
    id: EventId,
    callback: Option<Arc<H>>,
    min: u32,
    max: u32,
    delay: u32,
    /// Remaining fires, 0 = infinite
    repeats: u32,
    state: EventState,
}

impl<H> TimedEvent<H> {
    pub fn new(id: EventId, callback: H, min: u32, max: u32, repeats: u32) -> Self {
        Self {
            id,
            callback: Some(Arc::new(callback)),
            min,
            max,
            delay: 0,
            repeats,
            state: EventState::Run,
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    fn generate_delay(&mut self) {
        self.delay = if self.min >= self.max {
            self.min
        } else {
            rand::thread_rng().gen_range(self.min..=self.max)
        };
    }

    fn set_state(&mut self, state: EventState) {
        if self.state == EventState::Erase {
            return;
        }
        self.state = state;
        if state == EventState::Erase {
            self.callback = None;
        }
    }
}

/// One firing handed to the invoker
#[derive(Debug)]
pub struct TimedFire<H> {
    pub id: EventId,
    pub callback: Arc<H>,
    /// Delay this firing was scheduled with
    pub delay: u32,
    /// Fires left after this one, 0 when infinite or exhausted
    pub repeats: u32,
}

#[derive(Debug)]
enum DeferredOp<H> {
    AddEvent(TimedEvent<H>),
    SetState(EventId, EventState),
    SetStates(EventState),
    ClearAll,
}

enum Step<H> {
    Idle,
    Discarded,
    Fire(TimedFire<H>),
}

/// (due time, insertion sequence): equal due times keep insertion order
type QueueKey = (u64, u64);

#[derive(Debug)]
struct ProcessorState<H> {
    clock: u64,
    next_seq: u64,
    queue: BTreeMap<QueueKey, TimedEvent<H>>,
    index: HashMap<EventId, QueueKey>,
    /// Nesting depth of active update passes
    depth: u32,
    deferred: Vec<DeferredOp<H>>,
}

impl<H> ProcessorState<H> {
    fn updating(&self) -> bool {
        self.depth > 0
    }

    fn add_event(&mut self, mut event: TimedEvent<H>) {
        if self.updating() {
            self.deferred.push(DeferredOp::AddEvent(event));
            return;
        }

        event.generate_delay();
        let key = (self.clock + u64::from(event.delay), self.next_seq);
        self.next_seq += 1;
        self.index.insert(event.id, key);
        self.queue.insert(key, event);
    }

    fn set_state(&mut self, id: EventId, state: EventState) {
        if self.updating() {
            self.deferred.push(DeferredOp::SetState(id, state));
            return;
        }

        if let Some(key) = self.index.get(&id).copied() {
            if let Some(event) = self.queue.get_mut(&key) {
                event.set_state(state);
            }
        }
        if state == EventState::Erase {
            self.index.remove(&id);
        }
    }

    fn set_states(&mut self, state: EventState) {
        if self.updating() {
            self.deferred.push(DeferredOp::SetStates(state));
            return;
        }

        for event in self.queue.values_mut() {
            event.set_state(state);
        }
        if state == EventState::Erase {
            self.index.clear();
        }
    }

    fn clear_all(&mut self) {
        if self.updating() {
            self.deferred.push(DeferredOp::ClearAll);
            return;
        }

        self.queue.clear();
        self.index.clear();
        self.deferred.clear();
    }

    fn pop_due(&mut self) -> Step<H> {
        let Some(entry) = self.queue.first_entry() else {
            return Step::Idle;
        };
        if entry.key().0 > self.clock {
            return Step::Idle;
        }

        let mut event = entry.remove();
        if event.state != EventState::Erase {
            self.index.remove(&event.id);
        }
        if event.state != EventState::Run {
            return Step::Discarded;
        }
        let Some(callback) = event.callback.clone() else {
            return Step::Discarded;
        };

        let delay = event.delay;
        let last = event.repeats == 1;
        if event.repeats > 0 {
            event.repeats -= 1;
        }

        let fire = TimedFire {
            id: event.id,
            callback,
            delay,
            repeats: event.repeats,
        };

        // Rescheduled ahead of the callback's own requests
        if !last {
            self.add_event(event);
        }

        Step::Fire(fire)
    }

    fn process_deferred(&mut self) {
        let ops = std::mem::take(&mut self.deferred);
        for op in ops {
            match op {
                DeferredOp::AddEvent(event) => self.add_event(event),
                DeferredOp::SetState(id, state) => self.set_state(id, state),
                DeferredOp::SetStates(state) => self.set_states(state),
                DeferredOp::ClearAll => self.clear_all(),
            }
        }
    }
}

/// Time-ordered queue of timed events.
///
/// `H` is the interpreter handle of the callbacks; it is released when the
/// event is removed, aborted, erased or the processor is dropped.
#[derive(Debug)]
pub struct TimedEventProcessor<H> {
    state: Mutex<ProcessorState<H>>,
}

impl<H> TimedEventProcessor<H> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProcessorState {
                clock: 0,
                next_seq: 0,
                queue: BTreeMap::new(),
                index: HashMap::new(),
                depth: 0,
                deferred: Vec::new(),
            }),
        }
    }

    /// Schedule an event at `now + delay`, the delay drawn from its range
    pub fn add_event(&self, event: TimedEvent<H>) {
        self.state.lock().add_event(event);
    }

    /// Change the state of one event
    pub fn set_state(&self, id: EventId, state: EventState) {
        self.state.lock().set_state(id, state);
    }

    /// Change the state of every scheduled event
    pub fn set_states(&self, state: EventState) {
        self.state.lock().set_states(state);
    }

    /// Drop every event, releasing callbacks without firing them
    pub fn clear_all(&self) {
        self.state.lock().clear_all();
    }

    /// Advance the clock by `diff` and fire every due event.
    ///
    /// `invoke` runs without the processor locked. Deferred requests made
    /// during the pass are applied before this returns, unless this call is
    /// itself nested inside another update of the same processor.
    pub fn update<F>(&self, diff: u32, mut invoke: F)
    where
        F: FnMut(TimedFire<H>),
    {
        let _pass = UpdatePass::begin(self, diff);

        loop {
            let fire = match self.state.lock().pop_due() {
                Step::Idle => break,
                Step::Discarded => continue,
                Step::Fire(fire) => fire,
            };
            invoke(fire);
        }
    }

    pub fn is_updating(&self) -> bool {
        self.state.lock().updating()
    }

    /// Processor-local clock in milliseconds
    pub fn clock(&self) -> u64 {
        self.state.lock().clock
    }

    /// Whether an event is scheduled and not erased
    pub fn contains(&self, id: EventId) -> bool {
        self.state.lock().index.contains_key(&id)
    }

    /// State of a scheduled event
    pub fn state_of(&self, id: EventId) -> Option<EventState> {
        let state = self.state.lock();
        let key = state.index.get(&id)?;
        state.queue.get(key).map(TimedEvent::state)
    }

    /// Number of events in the due-time queue
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of requests waiting for the active pass to finish
    pub fn pending_ops(&self) -> usize {
        self.state.lock().deferred.len()
    }
}

impl<H> Default for TimedEventProcessor<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks an update pass; leaving the outermost one replays deferred requests
struct UpdatePass<'a, H> {
    processor: &'a TimedEventProcessor<H>,
}

impl<'a, H> UpdatePass<'a, H> {
    fn begin(processor: &'a TimedEventProcessor<H>, diff: u32) -> Self {
        let mut state = processor.state.lock();
        state.depth += 1;
        state.clock += u64::from(diff);
        Self { processor }
    }
}

impl<H> Drop for UpdatePass<'_, H> {
    fn drop(&mut self) {
        let mut state = self.processor.state.lock();
        state.depth -= 1;
        if state.depth == 0 {
            state.process_deferred();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Tracked {
        released: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(released: &Arc<AtomicUsize>) -> Tracked {
        Tracked {
            released: Arc::clone(released),
        }
    }

    #[test]
    fn test_repeat_twice_then_release() {
        let processor = TimedEventProcessor::new();
        let released = Arc::new(AtomicUsize::new(0));
        processor.add_event(TimedEvent::new(1, tracked(&released), 100, 100, 2));

        let mut fired = Vec::new();
        processor.update(100, |fire| fired.push((fire.delay, fire.repeats)));
        assert_eq!(fired, vec![(100, 1)]);
        assert!(processor.contains(1));
        assert_eq!(released.load(Ordering::SeqCst), 0);

        processor.update(100, |fire| fired.push((fire.delay, fire.repeats)));
        assert_eq!(fired, vec![(100, 1), (100, 0)]);
        assert!(processor.is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 1);

        processor.update(100, |fire| fired.push((fire.delay, fire.repeats)));
        assert_eq!(fired.len(), 2);
        assert_eq!(processor.clock(), 300);
    }

    #[test]
    fn test_clear_from_inside_callback() {
        let processor = TimedEventProcessor::new();
        let released = Arc::new(AtomicUsize::new(0));
        processor.add_event(TimedEvent::new(1, tracked(&released), 100, 100, 2));

        let mut calls = 0;
        processor.update(100, |_| {
            calls += 1;
            processor.clear_all();
            // Deferred: reschedule then clear
            assert_eq!(processor.pending_ops(), 2);
        });
        assert_eq!(calls, 1);
        assert!(processor.is_empty());
        assert_eq!(processor.pending_ops(), 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        processor.update(1000, |_| calls += 1);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_self_cancel_stops_repeating_event() {
        let processor = TimedEventProcessor::new();
        let released = Arc::new(AtomicUsize::new(0));
        processor.add_event(TimedEvent::new(7, tracked(&released), 10, 10, 0));

        let mut calls = 0;
        processor.update(10, |fire| {
            calls += 1;
            processor.set_state(fire.id, EventState::Abort);
        });
        assert_eq!(calls, 1);
        assert_eq!(processor.state_of(7), Some(EventState::Abort));

        for _ in 0..20 {
            processor.update(10, |_| calls += 1);
        }
        assert_eq!(calls, 1);
        assert!(processor.is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_deferred_ops_replay_in_order() {
        let processor = TimedEventProcessor::new();
        processor.add_event(TimedEvent::new(1, "trigger", 5, 5, 1));
        processor.add_event(TimedEvent::new(2, "b", 50, 50, 1));

        processor.update(5, |fire| {
            assert_eq!(*fire.callback, "trigger");
            processor.add_event(TimedEvent::new(3, "a", 10, 10, 1));
            processor.set_state(2, EventState::Abort);
            processor.add_event(TimedEvent::new(4, "c", 10, 10, 1));

            assert!(processor.is_updating());
            assert!(!processor.contains(3));
            assert_eq!(processor.state_of(2), Some(EventState::Run));
        });

        assert!(!processor.is_updating());
        assert!(processor.contains(3));
        assert!(processor.contains(4));
        assert_eq!(processor.state_of(2), Some(EventState::Abort));

        let mut fired = Vec::new();
        processor.update(100, |fire| fired.push(*fire.callback));
        assert_eq!(fired, vec!["a", "c"]);
    }

    #[test]
    fn test_equal_due_times_fire_in_insertion_order() {
        let processor = TimedEventProcessor::new();
        for (id, name) in [(1, "first"), (2, "second"), (3, "third")] {
            processor.add_event(TimedEvent::new(id, name, 20, 20, 1));
        }

        let mut fired = Vec::new();
        processor.update(20, |fire| fired.push(*fire.callback));
        assert_eq!(fired, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_erase_releases_immediately_and_is_sticky() {
        let processor = TimedEventProcessor::new();
        let released = Arc::new(AtomicUsize::new(0));
        processor.add_event(TimedEvent::new(1, tracked(&released), 10, 10, 0));
        processor.add_event(TimedEvent::new(2, tracked(&released), 10, 10, 0));

        processor.set_states(EventState::Erase);
        assert_eq!(released.load(Ordering::SeqCst), 2);
        assert!(!processor.contains(1));

        // Erased events stay queued until due, then vanish without firing
        processor.set_state(1, EventState::Run);
        let mut calls = 0;
        processor.update(10, |_| calls += 1);
        assert_eq!(calls, 0);
        assert!(processor.is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_random_delay_within_bounds() {
        let processor = TimedEventProcessor::new();
        processor.add_event(TimedEvent::new(1, (), 100, 200, 0));

        let mut delays = Vec::new();
        for _ in 0..50 {
            processor.update(200, |fire| delays.push(fire.delay));
        }
        assert!(!delays.is_empty());
        assert!(delays.iter().all(|d| (100..=200).contains(d)));
    }

    #[test]
    fn test_nested_update_defers_until_outermost_pass() {
        let processor = TimedEventProcessor::new();
        processor.add_event(TimedEvent::new(1, "outer", 1, 1, 1));
        processor.add_event(TimedEvent::new(2, "inner", 5, 5, 1));

        let mut fired = Vec::new();
        processor.update(1, |fire| {
            fired.push(*fire.callback);
            processor.add_event(TimedEvent::new(3, "late", 1, 1, 1));
            processor.update(4, |fire| fired.push(*fire.callback));
            // Still inside the outer pass
            assert!(!processor.contains(3));
        });
        assert_eq!(fired, vec!["outer", "inner"]);
        assert!(processor.contains(3));
    }
}
