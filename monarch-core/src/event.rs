//! Hierarchical event bus.
//!
//! Every distinct event `type` string is canonicalized to a small integer
//! [`EventId`] on first sight. Types start out attached only to the
//! wildcard root `"*"`; [`EventController::add_parent`] grafts an explicit
//! parent edge ("tap") onto the forest, so posting an event of the child
//! type also notifies observers registered on the parent (and, transitively,
//! the parent's own ancestors). The forest is a DAG with a single root:
//! `add_parent` walks the candidate parent's ancestor chain first and
//! refuses the edge if it would reach the child, so cycles cannot form.
//!
//! Every matching tap fires as its own queued [`Operation`] (never inline),
//! keeping the strict lock order Dispatcher < FiberScheduler <
//! EventController: `schedule` only ever acquires its own registry/tap
//! locks and then hands off to the kernel, never the reverse.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::kernel::Kernel;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TapId(u64);

const ROOT_TYPE: &str = "*";

/// A fired event: its interned type id, its type name, and its (possibly
/// structured) payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    pub type_name: String,
    pub payload: Value,
}

struct Registry {
    by_name: RwLock<HashMap<String, u32>>,
    names: RwLock<HashMap<u32, String>>,
    /// child id -> parent id. Every id other than the root's has exactly
    /// one entry here, installed at intern time (pointing at the root)
    /// and overwritable by `add_parent`.
    parents: RwLock<HashMap<u32, u32>>,
    next_id: AtomicU32,
    root: EventId,
}

impl Registry {
    fn new() -> Self {
        let registry = Registry {
            by_name: RwLock::new(HashMap::new()),
            names: RwLock::new(HashMap::new()),
            parents: RwLock::new(HashMap::new()),
            next_id: AtomicU32::new(1),
            root: EventId(0),
        };
        registry.by_name.write().unwrap().insert(ROOT_TYPE.to_string(), 0);
        registry.names.write().unwrap().insert(0, ROOT_TYPE.to_string());
        registry
    }

    /// Interns `name`, returning its existing id or minting a new one
    /// attached directly to the root.
    fn intern(&self, name: &str) -> EventId {
        if let Some(id) = self.by_name.read().unwrap().get(name) {
            return EventId(*id);
        }
        let mut by_name = self.by_name.write().unwrap();
        if let Some(id) = by_name.get(name) {
            return EventId(*id);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        by_name.insert(name.to_string(), id);
        self.names.write().unwrap().insert(id, name.to_string());
        self.parents.write().unwrap().insert(id, self.root.0);
        EventId(id)
    }

    /// Installs `parent` as `child`'s immediate ancestor. Rejects the edge
    /// (returning `false`) if `parent` is `child` itself or already
    /// descends from `child` — either would create a cycle.
    fn add_parent(&self, child: EventId, parent: EventId) -> bool {
        if child == parent {
            return false;
        }
        // Cycle iff `child` is already an ancestor of the candidate
        // `parent` — grafting the edge would then let you walk
        // child -> parent -> ... -> child.
        if self.is_ancestor(parent, child) {
            return false;
        }
        self.parents.write().unwrap().insert(child.0, parent.0);
        true
    }

    /// True if `candidate` appears in `of`'s ancestor chain.
    fn is_ancestor(&self, of: EventId, candidate: EventId) -> bool {
        self.ancestor_chain(of).contains(&candidate)
    }

    /// Root-first ancestor chain of `id`, ending with `id` itself, deduped
    /// against cycles that must not exist but guarded against regardless.
    fn ancestor_chain(&self, id: EventId) -> Vec<EventId> {
        let parents = self.parents.read().unwrap();
        let mut chain = vec![id];
        let mut current = id.0;
        let mut guard = 0usize;
        while current != self.root.0 {
            guard += 1;
            if guard > parents.len() + 1 {
                break;
            }
            match parents.get(&current) {
                Some(&parent) => {
                    chain.push(EventId(parent));
                    current = parent;
                }
                None => break,
            }
        }
        chain.reverse();
        chain
    }
}

type Callback = dyn Fn(&Event) + Send + Sync;

struct Tap {
    id: TapId,
    filter: Option<Value>,
    callback: Arc<Callback>,
}

struct Inner {
    kernel: Kernel,
    registry: Registry,
    taps: RwLock<HashMap<u32, Vec<Tap>>>,
    next_tap_id: AtomicU64,
}

/// Publishes events to observers registered on the event's type or any of
/// its ancestors in the tap forest, up to the `"*"` root.
///
/// Cheap to clone; all clones share the same registry and tap forest, the
/// same way [`crate::fiber::FiberScheduler`] shares its scheduler state.
#[derive(Clone)]
pub struct EventController {
    inner: Arc<Inner>,
}

impl EventController {
    pub fn new(kernel: Kernel) -> Self {
        EventController {
            inner: Arc::new(Inner {
                kernel,
                registry: Registry::new(),
                taps: RwLock::new(HashMap::new()),
                next_tap_id: AtomicU64::new(1),
            }),
        }
    }

    /// Canonicalizes `type_name` to its [`EventId`], minting one if this is
    /// the first time this type has been seen.
    pub fn event_id(&self, type_name: &str) -> EventId {
        self.inner.registry.intern(type_name)
    }

    /// Grafts `parent` onto `child` in the tap forest: events of `child`
    /// now also flow to observers of `parent` (and `parent`'s ancestors).
    /// Returns `false` if the edge would create a cycle; the forest is
    /// left unchanged in that case.
    pub fn add_parent(&self, child: &str, parent: &str) -> bool {
        let child = self.inner.registry.intern(child);
        let parent = self.inner.registry.intern(parent);
        self.inner.registry.add_parent(child, parent)
    }

    /// Registers `callback` on `pattern` (an event type, or `"*"` for
    /// every event). If `filter` is set, the tap only fires for events
    /// whose payload structurally matches it (see [`Value::matches_filter`]).
    pub fn observe<F>(&self, pattern: &str, filter: Option<Value>, callback: F) -> TapId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = TapId(self.inner.next_tap_id.fetch_add(1, Ordering::SeqCst));
        let event_id = self.inner.registry.intern(pattern);
        let tap = Tap {
            id,
            filter,
            callback: Arc::new(callback),
        };
        self.inner.taps.write().unwrap().entry(event_id.0).or_default().push(tap);
        id
    }

    /// Removes a previously registered tap. Returns `false` if `pattern`
    /// has no tap with that id.
    pub fn stop_observing(&self, pattern: &str, id: TapId) -> bool {
        let event_id = self.inner.registry.intern(pattern);
        let mut taps = self.inner.taps.write().unwrap();
        match taps.get_mut(&event_id.0) {
            Some(list) => {
                let before = list.len();
                list.retain(|tap| tap.id != id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Publishes an event of `type_name` with `payload`, fanning it out to
    /// every observer registered on `type_name` or one of its ancestors.
    /// Equivalent to `schedule_async`: each observer callback runs as its
    /// own queued operation and this call returns without waiting for any
    /// of them.
    pub fn schedule(&self, type_name: &str, payload: Value) -> Event {
        self.dispatch(type_name, payload, true)
    }

    /// Like [`EventController::schedule`], but with `async` explicit: pass
    /// `false` to block the caller until every matching observer has
    /// finished running.
    pub fn schedule_with(&self, type_name: &str, payload: Value, async_: bool) -> Event {
        self.dispatch(type_name, payload, async_)
    }

    /// Publishes an event and blocks until every matching observer's
    /// callback has completed.
    pub fn schedule_sync(&self, type_name: &str, payload: Value) -> Event {
        self.dispatch(type_name, payload, false)
    }

    /// The ancestor chain is walked root-first, so a wildcard observer's
    /// callback is enqueued before a more specific one's. In sync mode, the
    /// operations are still all queued up front (preserving that ordering
    /// for admission) and only then joined.
    fn dispatch(&self, type_name: &str, payload: Value, async_: bool) -> Event {
        let id = self.inner.registry.intern(type_name);
        let event = Event {
            id,
            type_name: type_name.to_string(),
            payload,
        };

        let matching: Vec<Arc<Callback>> = {
            let taps = self.inner.taps.read().unwrap();
            self.inner
                .registry
                .ancestor_chain(id)
                .iter()
                .filter_map(|ancestor| taps.get(&ancestor.0))
                .flatten()
                .filter(|tap| match &tap.filter {
                    Some(filter) => event.payload.matches_filter(filter),
                    None => true,
                })
                .map(|tap| Arc::clone(&tap.callback))
                .collect()
        };

        let mut dispatched = Vec::with_capacity(matching.len());
        for callback in matching {
            let event_clone = event.clone();
            dispatched.push(
                self.inner
                    .kernel
                    .run_operation(move |_op| callback(&event_clone)),
            );
        }

        if !async_ {
            for op in dispatched {
                op.join();
            }
        }

        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatcherConfig;
    use std::sync::Mutex;
    use std::time::Duration;

    fn test_kernel() -> Kernel {
        Kernel::new(DispatcherConfig::default())
    }

    #[test]
    fn explicit_parent_receives_child_event() {
        // S3: O1 on "net.http.request", O2 on "net.http", O3 on "*";
        // addParent("net.http.request", "net.http") then a single post
        // must reach all three exactly once.
        let controller = EventController::new(test_kernel());
        let seen1 = Arc::new(Mutex::new(0));
        let seen2 = Arc::new(Mutex::new(0));
        let seen3 = Arc::new(Mutex::new(0));

        let s1 = Arc::clone(&seen1);
        controller.observe("net.http.request", None, move |_| *s1.lock().unwrap() += 1);
        let s2 = Arc::clone(&seen2);
        controller.observe("net.http", None, move |_| *s2.lock().unwrap() += 1);
        let s3 = Arc::clone(&seen3);
        controller.observe("*", None, move |_| *s3.lock().unwrap() += 1);

        assert!(controller.add_parent("net.http.request", "net.http"));
        controller.schedule("net.http.request", Value::Bool(true));
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(*seen1.lock().unwrap(), 1);
        assert_eq!(*seen2.lock().unwrap(), 1);
        assert_eq!(*seen3.lock().unwrap(), 1);
    }

    #[test]
    fn unrelated_types_do_not_share_observers() {
        let controller = EventController::new(test_kernel());
        let seen = Arc::new(Mutex::new(0));
        let seen2 = Arc::clone(&seen);
        controller.observe("net.http", None, move |_| *seen2.lock().unwrap() += 1);

        controller.schedule("db.query.start", Value::Bool(true));
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn wildcard_root_receives_every_event() {
        let controller = EventController::new(test_kernel());
        let count = Arc::new(Mutex::new(0));

        let count2 = Arc::clone(&count);
        controller.observe("*", None, move |_event| {
            *count2.lock().unwrap() += 1;
        });

        controller.schedule("net.http.request", Value::Bool(true));
        controller.schedule("db.query.start", Value::Bool(true));
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(*count.lock().unwrap(), 2);
    }

    #[test]
    fn add_parent_rejects_cycle() {
        let controller = EventController::new(test_kernel());
        assert!(controller.add_parent("a", "b"));
        assert!(!controller.add_parent("b", "a"));
        assert!(!controller.add_parent("a", "a"));
    }

    #[test]
    fn filter_excludes_non_matching_payload() {
        let controller = EventController::new(test_kernel());
        let seen = Arc::new(Mutex::new(0));

        let mut filter = std::collections::BTreeMap::new();
        filter.insert("path".to_string(), Value::Str("/admin".into()));
        let seen2 = Arc::clone(&seen);
        controller.observe("net.http.request", Some(Value::Map(filter)), move |_event| {
            *seen2.lock().unwrap() += 1;
        });

        let mut payload = std::collections::BTreeMap::new();
        payload.insert("path".to_string(), Value::Str("/home".into()));
        controller.schedule("net.http.request", Value::Map(payload));
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn stop_observing_removes_tap() {
        let controller = EventController::new(test_kernel());
        let seen = Arc::new(Mutex::new(0));
        let seen2 = Arc::clone(&seen);
        let id = controller.observe("a.b", None, move |_event| {
            *seen2.lock().unwrap() += 1;
        });

        assert!(controller.stop_observing("a.b", id));
        controller.schedule("a.b", Value::Bool(true));
        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn schedule_sync_blocks_until_observers_finish() {
        let controller = EventController::new(test_kernel());
        let seen = Arc::new(Mutex::new(0));

        let seen2 = Arc::clone(&seen);
        controller.observe("a.b", None, move |_event| {
            std::thread::sleep(Duration::from_millis(30));
            *seen2.lock().unwrap() += 1;
        });

        controller.schedule_sync("a.b", Value::Bool(true));

        // No sleep: schedule_sync must not return until the observer above
        // has already run.
        assert_eq!(*seen.lock().unwrap(), 1);
    }
}
