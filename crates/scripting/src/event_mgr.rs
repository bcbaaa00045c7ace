//! # Event Manager
//!
//! Owns the global timed event processor and one processor per host object
//! that scheduled timers. Processors of destroyed objects are only flagged
//! while a tick may still be running them, and are freed by the cleanup pass
//! at the end of the next [`EventManager::update_processors`].

use dashmap::DashMap;
use hookbridge_core::{HostObject, IdGenerator, ObjectGuid};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::timed::{EventId, EventState, TimedEventProcessor, TimedFire};

/// Processor handle
pub type ProcessorId = u64;

/// Id of the global processor, which is never deleted
pub const GLOBAL_PROCESSOR: ProcessorId = 0;

/// A processor and the host object it belongs to
#[derive(Debug)]
pub struct ProcessorSlot<H> {
    id: ProcessorId,
    processor: TimedEventProcessor<H>,
    owner: Mutex<Option<HostObject>>,
    pending_deletion: AtomicBool,
}

impl<H> ProcessorSlot<H> {
    fn new(id: ProcessorId, owner: Option<HostObject>) -> Self {
        Self {
            id,
            processor: TimedEventProcessor::new(),
            owner: Mutex::new(owner),
            pending_deletion: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ProcessorId {
        self.id
    }

    pub fn processor(&self) -> &TimedEventProcessor<H> {
        &self.processor
    }

    /// Owning object, `None` for the global processor or once flagged
    pub fn owner(&self) -> Option<HostObject> {
        *self.owner.lock()
    }

    pub fn is_pending_deletion(&self) -> bool {
        self.pending_deletion.load(Ordering::Acquire)
    }
}

/// Global plus per-object timed event processors
///
/// # Thread Safety
/// The processor maps are DashMaps and every processor locks its own state,
/// so scripts may create or flag processors while a tick is running.
#[derive(Debug)]
pub struct EventManager<H> {
    global: Arc<ProcessorSlot<H>>,
    /// Every live processor, global included
    processors: DashMap<ProcessorId, Arc<ProcessorSlot<H>>>,
    /// Object guid to its current processor
    objects: DashMap<ObjectGuid, ProcessorId>,
    pending_delete: Mutex<BTreeSet<ProcessorId>>,
    next_id: IdGenerator,
}

impl<H> EventManager<H> {
    /// Create a manager holding only the global processor
    pub fn new() -> Self {
        tracing::debug!("Creating EventManager");

        let global = Arc::new(ProcessorSlot::new(GLOBAL_PROCESSOR, None));
        let processors = DashMap::new();
        processors.insert(GLOBAL_PROCESSOR, Arc::clone(&global));

        Self {
            global,
            processors,
            objects: DashMap::new(),
            pending_delete: Mutex::new(BTreeSet::new()),
            next_id: IdGenerator::starting_at(GLOBAL_PROCESSOR + 1),
        }
    }

    /// The global processor
    pub fn global(&self) -> &TimedEventProcessor<H> {
        &self.global.processor
    }

    /// Allocate a processor for a host object
    ///
    /// # Arguments
    /// * `owner` - The host object the processor belongs to
    ///
    /// # Returns
    /// The processor's id, used to flag it once the object goes away
    pub fn create_object_processor(&self, owner: HostObject) -> ProcessorId {
        self.insert_object_slot(owner).id
    }

    fn insert_object_slot(&self, owner: HostObject) -> Arc<ProcessorSlot<H>> {
        let id = self.next_id.next_id();
        let slot = Arc::new(ProcessorSlot::new(id, Some(owner)));
        self.processors.insert(id, Arc::clone(&slot));
        self.objects.insert(owner.guid, id);

        tracing::debug!("Created event processor {} for {} {}", id, owner.kind.as_str(), owner.guid);
        slot
    }

    /// Look up a live processor
    pub fn processor(&self, id: ProcessorId) -> Option<Arc<ProcessorSlot<H>>> {
        self.processors.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// The current processor of an object, if it has one
    pub fn processor_for_object(&self, guid: ObjectGuid) -> Option<Arc<ProcessorSlot<H>>> {
        let id = self.objects.get(&guid).map(|entry| *entry.value())?;
        self.processor(id)
    }

    /// The current processor of an object, created on first use
    pub fn processor_for_object_or_create(&self, owner: &HostObject) -> Arc<ProcessorSlot<H>> {
        match self.processor_for_object(owner.guid) {
            Some(slot) if !slot.is_pending_deletion() => slot,
            _ => self.insert_object_slot(*owner),
        }
    }

    /// Mark a processor whose object is being destroyed.
    ///
    /// The processor keeps its events until the next cleanup pass, but no
    /// longer refers to its object. Flagging twice is a no-op.
    pub fn flag_object_processor_for_deletion(&self, id: ProcessorId) {
        if id == GLOBAL_PROCESSOR {
            return;
        }
        let Some(slot) = self.processor(id) else {
            return;
        };
        if slot.pending_deletion.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(owner) = slot.owner.lock().take() {
            self.objects.remove_if(&owner.guid, |_, current| *current == id);
        }
        self.pending_delete.lock().insert(id);

        tracing::debug!("Event processor {} flagged for deletion", id);
    }

    /// Flag the processor of an object, if it has one
    pub fn flag_object(&self, guid: ObjectGuid) {
        if let Some(id) = self.objects.get(&guid).map(|entry| *entry.value()) {
            self.flag_object_processor_for_deletion(id);
        }
    }

    /// Tick every processor, then free the flagged ones.
    ///
    /// Iterates a snapshot: a callback may flag (or create) processors while
    /// the tick is running.
    pub fn update_processors<F>(&self, diff: u32, mut invoke: F)
    where
        F: FnMut(Option<HostObject>, TimedFire<H>),
    {
        let mut snapshot: Vec<_> = self
            .processors
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        snapshot.sort_by_key(|slot| slot.id);

        for slot in snapshot {
            if slot.is_pending_deletion() || !self.processors.contains_key(&slot.id) {
                continue;
            }
            slot.processor.update(diff, |fire| invoke(slot.owner(), fire));
        }

        self.cleanup_object_processors();
    }

    /// Erase and drop every flagged processor
    pub fn cleanup_object_processors(&self) {
        let pending = std::mem::take(&mut *self.pending_delete.lock());

        for id in pending {
            if let Some((_, slot)) = self.processors.remove(&id) {
                slot.processor.set_states(EventState::Erase);
                tracing::debug!("Event processor {} removed", id);
            }
        }
    }

    /// Set the state of every event in every processor
    pub fn set_all_event_states(&self, state: EventState) {
        for slot in self.snapshot() {
            slot.processor.set_states(state);
        }
    }

    /// Set the state of one event, searching every processor
    pub fn set_event_state(&self, id: EventId, state: EventState) {
        for slot in self.snapshot() {
            slot.processor.set_state(id, state);
        }
    }

    fn snapshot(&self) -> Vec<Arc<ProcessorSlot<H>>> {
        self.processors
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Number of live processors, global included
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    /// Number of processors waiting for cleanup
    pub fn pending_count(&self) -> usize {
        self.pending_delete.lock().len()
    }

    /// Number of queued events across all processors
    pub fn event_count(&self) -> usize {
        self.snapshot().iter().map(|slot| slot.processor.len()).sum()
    }
}

impl<H> Default for EventManager<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timed::TimedEvent;
    use hookbridge_core::ObjectKind;
    use std::sync::atomic::AtomicUsize;

    struct Tracked(Arc<AtomicUsize>);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn creature(guid: u64) -> HostObject {
        HostObject::new(ObjectKind::Creature, guid, 100)
    }

    #[test]
    fn test_global_processor() {
        let mgr: EventManager<()> = EventManager::new();
        assert_eq!(mgr.processor_count(), 1);

        mgr.global().add_event(TimedEvent::new(1, (), 10, 10, 1));
        let mut owners = Vec::new();
        mgr.update_processors(10, |owner, fire| owners.push((owner, fire.id)));
        assert_eq!(owners, vec![(None, 1)]);

        // Never deleted
        mgr.flag_object_processor_for_deletion(GLOBAL_PROCESSOR);
        assert_eq!(mgr.pending_count(), 0);
    }

    #[test]
    fn test_object_processor_receives_owner() {
        let mgr: EventManager<()> = EventManager::new();
        let id = mgr.create_object_processor(creature(5));
        assert_ne!(id, GLOBAL_PROCESSOR);

        let slot = mgr.processor(id).unwrap();
        slot.processor().add_event(TimedEvent::new(1, (), 10, 10, 1));

        let mut owners = Vec::new();
        mgr.update_processors(10, |owner, _| owners.push(owner.map(|o| o.guid.get())));
        assert_eq!(owners, vec![Some(5)]);
    }

    #[test]
    fn test_flag_is_idempotent_and_cleanup_releases() {
        let mgr = EventManager::new();
        let released = Arc::new(AtomicUsize::new(0));
        let id = mgr.create_object_processor(creature(9));
        let slot = mgr.processor(id).unwrap();
        slot.processor()
            .add_event(TimedEvent::new(1, Tracked(Arc::clone(&released)), 50, 50, 0));

        mgr.flag_object_processor_for_deletion(id);
        mgr.flag_object_processor_for_deletion(id);
        assert_eq!(mgr.pending_count(), 1);
        assert!(slot.owner().is_none());
        assert!(mgr.processor_for_object(ObjectGuid::new(9)).is_none());

        // Still valid until the cleanup pass
        assert_eq!(slot.processor().len(), 1);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        let mut calls = 0;
        mgr.update_processors(100, |_, _| calls += 1);
        assert_eq!(calls, 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(mgr.processor(id).is_none());
        assert_eq!(mgr.processor_count(), 1);
    }

    #[test]
    fn test_flag_during_tick_skips_later_processor() {
        let mgr: EventManager<()> = EventManager::new();
        let first = mgr.create_object_processor(creature(1));
        let second = mgr.create_object_processor(creature(2));
        mgr.processor(first)
            .unwrap()
            .processor()
            .add_event(TimedEvent::new(1, (), 10, 10, 1));
        mgr.processor(second)
            .unwrap()
            .processor()
            .add_event(TimedEvent::new(2, (), 10, 10, 1));

        let mut fired = Vec::new();
        mgr.update_processors(10, |_, fire| {
            fired.push(fire.id);
            // First object's callback despawns the second object
            mgr.flag_object(ObjectGuid::new(2));
        });

        assert_eq!(fired, vec![1]);
        assert!(mgr.processor(second).is_none());
        assert!(mgr.processor(first).is_some());
    }

    #[test]
    fn test_get_or_create_replaces_flagged_processor() {
        let mgr: EventManager<()> = EventManager::new();
        let obj = creature(3);

        let first = mgr.processor_for_object_or_create(&obj);
        let again = mgr.processor_for_object_or_create(&obj);
        assert_eq!(first.id(), again.id());

        mgr.flag_object(obj.guid);
        let fresh = mgr.processor_for_object_or_create(&obj);
        assert_ne!(fresh.id(), first.id());
    }

    #[test]
    fn test_set_event_state_searches_all_processors() {
        let mgr: EventManager<()> = EventManager::new();
        let id = mgr.create_object_processor(creature(4));
        mgr.processor(id)
            .unwrap()
            .processor()
            .add_event(TimedEvent::new(42, (), 10, 10, 0));
        mgr.global().add_event(TimedEvent::new(43, (), 10, 10, 0));

        mgr.set_event_state(42, EventState::Abort);
        let mut fired = Vec::new();
        mgr.update_processors(10, |_, fire| fired.push(fire.id));
        assert_eq!(fired, vec![43]);

        mgr.set_all_event_states(EventState::Erase);
        assert_eq!(mgr.event_count(), 1);
        mgr.update_processors(10, |_, fire| fired.push(fire.id));
        assert_eq!(fired, vec![43]);
        assert_eq!(mgr.event_count(), 0);
    }
}
