//! Binding store
//!
//! Script callbacks registered against hook keys. Every category of hook owns
//! one [`BindingStore`], indexed by one of three key shapes:
//!
//! - [`EventKey`]: the event alone (server, player, guild... events)
//! - [`EntryKey`]: event plus a template entry (all creatures of entry N)
//! - [`UniqueObjectKey`]: event plus one live object's guid and instance id
//!
//! The store is shared between the dispatch path and the registration
//! functions exposed to scripts, so it is internally synchronized with a
//! reader/writer lock. Only [`BindingStore::has_bindings_for`] takes the
//! shared side; firing prunes exhausted bindings and needs exclusive access.

use hookbridge_core::{IdGenerator, ObjectGuid};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use crate::hooks::HookEvent;

static NEXT_BINDING_ID: IdGenerator = IdGenerator::new();

/// Process-wide unique binding identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    fn next() -> Self {
        Self(NEXT_BINDING_ID.next_id())
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

/// Common behaviour of the three key shapes
pub trait HookKey: Copy + Eq + Hash {
    /// Numeric id of the event, passed to callbacks as their first argument
    fn event_id(&self) -> u32;
}

/// Key for category-wide bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKey<E> {
    pub event: E,
}

impl<E: HookEvent> EventKey<E> {
    pub fn new(event: E) -> Self {
        Self { event }
    }
}

/// Key for bindings shared by every object of one template entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey<E> {
    pub event: E,
    pub entry: u32,
}

impl<E: HookEvent> EntryKey<E> {
    pub fn new(event: E, entry: u32) -> Self {
        Self { event, entry }
    }
}

/// Key for bindings on exactly one live object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniqueObjectKey<E> {
    pub event: E,
    pub guid: ObjectGuid,
    pub instance_id: u32,
}

impl<E: HookEvent> UniqueObjectKey<E> {
    pub fn new(event: E, guid: ObjectGuid, instance_id: u32) -> Self {
        Self {
            event,
            guid,
            instance_id,
        }
    }
}

impl<E: HookEvent> HookKey for EventKey<E> {
    fn event_id(&self) -> u32 {
        self.event.id()
    }
}

impl<E: HookEvent> HookKey for EntryKey<E> {
    fn event_id(&self) -> u32 {
        self.event.id()
    }
}

impl<E: HookEvent> HookKey for UniqueObjectKey<E> {
    fn event_id(&self) -> u32 {
        self.event.id()
    }
}

/// One registered callback
#[derive(Debug)]
struct Binding<H> {
    id: BindingId,
    callback: Arc<H>,
    /// Remaining fires, 0 = unlimited
    shots: u32,
}

/// Callbacks keyed by hook key, in registration order.
///
/// `H` is the interpreter-side handle of the callback. The store owns it; it
/// is dropped (released) exactly once, when its binding is removed, cleared,
/// exhausted or the store itself is dropped. Handles handed out by
/// [`push_refs_for`](Self::push_refs_for) are shared clones that keep the
/// callback alive until the caller is done invoking it.
#[derive(Debug)]
pub struct BindingStore<K, H> {
    bindings: RwLock<HashMap<K, Vec<Binding<H>>>>,
}

impl<K: Eq + Hash, H> BindingStore<K, H> {
    pub fn new() -> Self {
        Self {
            bindings: RwLock::new(HashMap::new()),
        }
    }

    /// Register a callback under `key`
    ///
    /// # Arguments
    /// * `key` - The hook key
    /// * `callback` - Interpreter handle of the callback
    /// * `shots` - Number of fires before the binding removes itself, 0 = unlimited
    ///
    /// # Returns
    /// The new binding's id, usable with [`remove`](Self::remove)
    pub fn insert(&self, key: K, callback: H, shots: u32) -> BindingId {
        let id = BindingId::next();
        let mut bindings = self.bindings.write();
        bindings.entry(key).or_default().push(Binding {
            id,
            callback: Arc::new(callback),
            shots,
        });
        id
    }

    /// Remove one binding by id. Unknown ids are ignored.
    pub fn remove(&self, id: BindingId) {
        // No reverse index: removal is rare compared to firing
        let mut found = false;
        self.bindings.write().retain(|_, list| {
            if !found {
                if let Some(pos) = list.iter().position(|b| b.id == id) {
                    list.remove(pos);
                    found = true;
                }
            }
            !list.is_empty()
        });
    }

    /// Remove every binding under `key`
    pub fn clear(&self, key: &K) {
        self.bindings.write().remove(key);
    }

    /// Remove every binding in the store
    pub fn clear_all(&self) {
        self.bindings.write().clear();
    }

    /// Fast existence check done before any argument marshaling
    pub fn has_bindings_for(&self, key: &K) -> bool {
        self.bindings
            .read()
            .get(key)
            .map_or(false, |list| !list.is_empty())
    }

    /// Collect the callbacks to invoke for one firing of `key`.
    ///
    /// Every binding is visited once, in registration order. Finite bindings
    /// are decremented and removed when they reach zero, within the same
    /// exclusive pass.
    pub fn push_refs_for(&self, key: &K) -> Vec<Arc<H>> {
        let mut bindings = self.bindings.write();

        let Some(list) = bindings.get_mut(key) else {
            return Vec::new();
        };

        let mut refs = Vec::with_capacity(list.len());
        list.retain_mut(|binding| {
            refs.push(Arc::clone(&binding.callback));
            match binding.shots {
                0 => true,
                1 => false,
                _ => {
                    binding.shots -= 1;
                    true
                }
            }
        });

        if list.is_empty() {
            bindings.remove(key);
        }

        refs
    }

    /// Number of bindings under `key`
    pub fn count_for(&self, key: &K) -> usize {
        self.bindings.read().get(key).map_or(0, Vec::len)
    }

    /// Total number of bindings in the store
    pub fn len(&self) -> usize {
        self.bindings.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash, H> Default for BindingStore<K, H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{CreatureEvent, PlayerEvent, ServerEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Callback handle that counts its own release
    struct Tracked {
        name: &'static str,
        released: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn tracked(name: &'static str, released: &Arc<AtomicUsize>) -> Tracked {
        Tracked {
            name,
            released: Arc::clone(released),
        }
    }

    fn names(refs: &[Arc<Tracked>]) -> Vec<&'static str> {
        refs.iter().map(|r| r.name).collect()
    }

    #[test]
    fn test_single_shot_binding() {
        let store = BindingStore::new();
        let key = EventKey::new(ServerEvent::OnUpdate);
        let released = Arc::new(AtomicUsize::new(0));

        store.insert(key, tracked("a", &released), 1);
        let refs = store.push_refs_for(&key);

        assert_eq!(names(&refs), vec!["a"]);
        assert!(!store.has_bindings_for(&key));

        // Still held by the caller until it finishes invoking
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(refs);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_then_fire_repeatedly() {
        let store = BindingStore::new();
        let key = EventKey::new(PlayerEvent::OnLogin);
        let released = Arc::new(AtomicUsize::new(0));

        let first = store.insert(key, tracked("first", &released), 0);
        store.insert(key, tracked("second", &released), 0);
        store.remove(first);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        for _ in 0..5 {
            assert_eq!(names(&store.push_refs_for(&key)), vec!["second"]);
        }
        assert!(store.has_bindings_for(&key));
    }

    #[test]
    fn test_registration_order() {
        let store = BindingStore::new();
        let key = EntryKey::new(CreatureEvent::OnSpawn, 1234);
        let released = Arc::new(AtomicUsize::new(0));

        store.insert(key, tracked("c1", &released), 0);
        store.insert(key, tracked("c2", &released), 2);
        store.insert(key, tracked("c3", &released), 0);

        assert_eq!(names(&store.push_refs_for(&key)), vec!["c1", "c2", "c3"]);
        assert_eq!(names(&store.push_refs_for(&key)), vec!["c1", "c2", "c3"]);
        // c2 exhausted; order of the rest is unchanged
        assert_eq!(names(&store.push_refs_for(&key)), vec!["c1", "c3"]);
    }

    #[test]
    fn test_fire_count_exhaustion() {
        let store = BindingStore::new();
        let key = EventKey::new(ServerEvent::OnStartup);
        let released = Arc::new(AtomicUsize::new(0));

        store.insert(key, tracked("n", &released), 3);
        for _ in 0..2 {
            assert_eq!(store.push_refs_for(&key).len(), 1);
            assert!(store.has_bindings_for(&key));
        }
        assert_eq!(store.push_refs_for(&key).len(), 1);
        assert!(!store.has_bindings_for(&key));
        assert!(store.push_refs_for(&key).is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = BindingStore::new();
        let key = EventKey::new(ServerEvent::OnUpdate);
        let released = Arc::new(AtomicUsize::new(0));

        let id = store.insert(key, tracked("x", &released), 0);
        store.remove(id);
        store.remove(id);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());

        // Cancelling an exhausted one-shot is a no-op too
        let once = store.insert(key, tracked("once", &released), 1);
        drop(store.push_refs_for(&key));
        store.remove(once);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_keys_are_independent() {
        let store = BindingStore::new();
        let released = Arc::new(AtomicUsize::new(0));
        let a = UniqueObjectKey::new(CreatureEvent::OnDied, ObjectGuid::new(1), 0);
        let b = UniqueObjectKey::new(CreatureEvent::OnDied, ObjectGuid::new(1), 1);
        let c = UniqueObjectKey::new(CreatureEvent::OnDied, ObjectGuid::new(2), 0);

        store.insert(a, tracked("a", &released), 0);
        assert!(store.has_bindings_for(&a));
        assert!(!store.has_bindings_for(&b));
        assert!(!store.has_bindings_for(&c));

        store.clear(&b);
        assert!(store.has_bindings_for(&a));
        store.clear(&a);
        assert!(!store.has_bindings_for(&a));
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_all_releases_everything() {
        let store = BindingStore::new();
        let released = Arc::new(AtomicUsize::new(0));

        for event in [ServerEvent::OnUpdate, ServerEvent::OnStartup, ServerEvent::OnShutdown] {
            store.insert(EventKey::new(event), tracked("e", &released), 0);
            store.insert(EventKey::new(event), tracked("e", &released), 5);
        }
        assert_eq!(store.len(), 6);

        store.clear_all();
        assert!(store.is_empty());
        assert_eq!(released.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_ids_are_unique_across_stores() {
        let first: BindingStore<EventKey<ServerEvent>, ()> = BindingStore::new();
        let second: BindingStore<EventKey<PlayerEvent>, ()> = BindingStore::new();

        let a = first.insert(EventKey::new(ServerEvent::OnUpdate), (), 0);
        let b = second.insert(EventKey::new(PlayerEvent::OnLogin), (), 0);
        let c = first.insert(EventKey::new(ServerEvent::OnUpdate), (), 0);
        assert!(a < b && b < c);

        // An id from another store is simply not found
        first.remove(b);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(BindingStore::new());
        let key = EventKey::new(ServerEvent::OnUpdate);
        store.insert(key, (), 0);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || (0..1000).all(|_| store.has_bindings_for(&key)))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
    }
}
