//! Time-expiring, lazily populated cache slots.
//!
//! Each derived collection lives in one [`TtlSlot`]. The slot is a small
//! state machine (`Empty -> Populating -> Populated -> expired -> Empty`)
//! with three disciplines the workspace depends on:
//!
//! - **Lazy compute-once**: at most one build runs per slot at any moment;
//!   concurrent readers of a populating slot wait for that result instead of
//!   triggering their own build.
//! - **Read-time expiry**: an expired value is treated as empty on the next
//!   access; nothing sweeps proactively.
//! - **Whole-value replacement**: values are handed out as `Arc<T>` and only
//!   ever replaced, never mutated, so a reader can never observe a partially
//!   updated collection.
//!
//! A failed build leaves the slot empty so the next access retries; failures
//! are never cached.

use crate::model::Card;
use crate::CoreResult;
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Expiry applied to every cache entry unless overridden: one day, measured
/// from the last successful write.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

enum SlotState<T> {
    Empty,
    Populating,
    Populated { value: Arc<T>, written_at: Instant },
}

struct SlotInner<T> {
    state: SlotState<T>,
    /// Bumped by `invalidate` so a build that was in flight when the slot was
    /// invalidated does not resurrect its (now unwanted) result.
    generation: u64,
}

/// One named, TTL-guarded cache entry.
pub struct TtlSlot<T> {
    name: String,
    ttl: Duration,
    inner: Mutex<SlotInner<T>>,
    ready: Condvar,
}

impl<T> TtlSlot<T> {
    pub fn new(name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
            inner: Mutex::new(SlotInner {
                state: SlotState::Empty,
                generation: 0,
            }),
            ready: Condvar::new(),
        }
    }

    /// Return the cached value, building it via `build` on a miss.
    ///
    /// Exactly one build runs per slot at a time; concurrent callers wait for
    /// the in-flight result. A build error empties the slot and propagates;
    /// the value is never partially cached.
    pub fn get_or_populate<F>(&self, build: F) -> CoreResult<Arc<T>>
    where
        F: FnOnce() -> CoreResult<T>,
    {
        let mut inner = self.lock();
        loop {
            let fresh = match &inner.state {
                SlotState::Populated { value, written_at } if written_at.elapsed() <= self.ttl => {
                    Some(Arc::clone(value))
                }
                _ => None,
            };
            if let Some(value) = fresh {
                return Ok(value);
            }
            if matches!(inner.state, SlotState::Populating) {
                inner = self.wait(inner);
                continue;
            }
            break;
        }
        if matches!(inner.state, SlotState::Populated { .. }) {
            tracing::debug!(slot = %self.name, "cache entry expired, recomputing");
        }
        let claimed_generation = inner.generation;
        inner.state = SlotState::Populating;
        drop(inner);

        // Reset the claim even if the build panics, so waiters never hang on
        // a Populating state with no build behind it.
        let mut claim = PopulateClaim { slot: self, armed: true };
        let result = build();
        claim.armed = false;

        let mut inner = self.lock();
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                if inner.generation == claimed_generation {
                    inner.state = SlotState::Populated {
                        value: Arc::clone(&value),
                        written_at: Instant::now(),
                    };
                } else {
                    // Invalidated while computing: hand the value back to the
                    // caller but do not cache it.
                    inner.state = SlotState::Empty;
                }
                drop(inner);
                self.ready.notify_all();
                Ok(value)
            }
            Err(err) => {
                inner.state = SlotState::Empty;
                drop(inner);
                self.ready.notify_all();
                Err(err)
            }
        }
    }

    /// The cached value, if fresh, without triggering a build.
    pub fn peek(&self) -> Option<Arc<T>> {
        let inner = self.lock();
        match &inner.state {
            SlotState::Populated { value, written_at } if written_at.elapsed() <= self.ttl => {
                Some(Arc::clone(value))
            }
            _ => None,
        }
    }

    /// Clear this entry. An in-flight build is left to finish but its result
    /// will not be cached.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.generation = inner.generation.wrapping_add(1);
        if !matches!(inner.state, SlotState::Populating) {
            inner.state = SlotState::Empty;
        }
    }

    /// Atomically replace the cached value with a derived one.
    ///
    /// `derive` receives the current fresh value and returns `Some(new)` to
    /// swap it in or `None` to leave the entry untouched. The write timestamp
    /// is preserved; replacement is a correction, not a refresh. Returns
    /// whether a swap happened.
    pub fn replace_value<F>(&self, derive: F) -> bool
    where
        F: FnOnce(&T) -> Option<T>,
    {
        let mut inner = self.lock();
        if let SlotState::Populated { value, written_at } = &inner.state {
            if written_at.elapsed() <= self.ttl {
                if let Some(new_value) = derive(value.as_ref()) {
                    let written_at = *written_at;
                    inner.state = SlotState::Populated {
                        value: Arc::new(new_value),
                        written_at,
                    };
                    return true;
                }
            }
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner<T>> {
        // A poisoned lock means a panic elsewhere; the state machine is still
        // coherent, so recover the guard rather than propagate the panic.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait<'a>(&self, guard: MutexGuard<'a, SlotInner<T>>) -> MutexGuard<'a, SlotInner<T>> {
        self.ready
            .wait(guard)
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct PopulateClaim<'a, T> {
    slot: &'a TtlSlot<T>,
    armed: bool,
}

impl<T> Drop for PopulateClaim<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let mut inner = self.slot.lock();
            inner.state = SlotState::Empty;
            drop(inner);
            self.slot.ready.notify_all();
        }
    }
}

/// Cache of recommendation cards, keyed by hook id.
///
/// Hook ids are not known up front, so slots are created on demand and kept
/// for the life of the session (the set of hooks is small and fixed per
/// deployment). Suggestion removal reaches across every hook's entry.
pub struct CardCache {
    ttl: Duration,
    slots: Mutex<HashMap<String, Arc<TtlSlot<Vec<Card>>>>>,
}

impl CardCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, hook_id: &str) -> Arc<TtlSlot<Vec<Card>>> {
        let mut slots = self.lock_slots();
        Arc::clone(slots.entry(hook_id.to_string()).or_insert_with(|| {
            Arc::new(TtlSlot::new(format!("cards:{hook_id}"), self.ttl))
        }))
    }

    /// Return the cached cards for a hook, building them on a miss.
    pub fn get_or_populate<F>(&self, hook_id: &str, build: F) -> CoreResult<Arc<Vec<Card>>>
    where
        F: FnOnce() -> CoreResult<Vec<Card>>,
    {
        self.slot(hook_id).get_or_populate(build)
    }

    /// Clear exactly one hook's entry.
    pub fn invalidate(&self, hook_id: &str) {
        if let Some(slot) = self.lock_slots().get(hook_id).cloned() {
            slot.invalidate();
        }
    }

    /// Clear every hook's entry.
    pub fn invalidate_all(&self) {
        let slots: Vec<_> = self.lock_slots().values().cloned().collect();
        for slot in slots {
            slot.invalidate();
        }
    }

    /// Remove every suggestion carrying exactly `id`, across all cached hook
    /// entries. Each affected entry is replaced with a filtered copy, so
    /// concurrent readers keep seeing the complete old value. Returns whether
    /// anything was removed.
    pub fn remove_suggestion(&self, id: &str) -> bool {
        let slots: Vec<_> = self.lock_slots().values().cloned().collect();
        let mut removed = false;
        for slot in slots {
            removed |= slot.replace_value(|cards| {
                if cards.iter().any(|card| card.has_suggestion(id)) {
                    Some(cards.iter().map(|card| card.without_suggestion(id)).collect())
                } else {
                    None
                }
            });
        }
        removed
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<String, Arc<TtlSlot<Vec<Card>>>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Suggestion;
    use crate::CoreError;
    use crate::fetch::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn computes_once_for_repeated_gets() {
        let slot = TtlSlot::new("test", DEFAULT_TTL);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = slot
                .get_or_populate(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(41)
                })
                .expect("populate");
            assert_eq!(*value, 41);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn expired_entry_recomputes() {
        let slot = TtlSlot::new("test", Duration::from_millis(20));
        let calls = AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };
        slot.get_or_populate(build).expect("first");
        thread::sleep(Duration::from_millis(40));
        assert!(slot.peek().is_none());
        slot.get_or_populate(build).expect("second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_build_leaves_slot_empty_for_retry() {
        let slot = TtlSlot::new("test", DEFAULT_TTL);
        let err = slot
            .get_or_populate(|| -> CoreResult<i32> {
                Err(CoreError::retrieval(
                    "test data",
                    FetchError::Network("connection refused".into()),
                ))
            })
            .expect_err("should fail");
        assert!(matches!(err, CoreError::Retrieval { .. }));
        assert!(slot.peek().is_none());

        let value = slot.get_or_populate(|| Ok(7)).expect("retry succeeds");
        assert_eq!(*value, 7);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let slot = TtlSlot::new("test", DEFAULT_TTL);
        let calls = AtomicUsize::new(0);
        let build = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(1)
        };
        slot.get_or_populate(build).expect("first");
        slot.invalidate();
        assert!(slot.peek().is_none());
        slot.get_or_populate(build).expect("second");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_readers_share_one_build() {
        let slot = Arc::new(TtlSlot::new("test", DEFAULT_TTL));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..4 {
            let slot = Arc::clone(&slot);
            let calls = Arc::clone(&calls);
            handles.push(thread::spawn(move || {
                slot.get_or_populate(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    // widen the race window
                    thread::sleep(Duration::from_millis(30));
                    Ok(99)
                })
                .expect("populate")
            }));
        }
        for handle in handles {
            assert_eq!(*handle.join().expect("thread"), 99);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalidate_during_build_discards_the_result() {
        let slot = Arc::new(TtlSlot::new("test", DEFAULT_TTL));
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let builder_slot = Arc::clone(&slot);
        let builder = thread::spawn(move || {
            builder_slot.get_or_populate(move || {
                started_tx.send(()).expect("signal start");
                release_rx.recv().expect("await release");
                Ok(5)
            })
        });

        started_rx.recv().expect("build started");
        slot.invalidate();
        release_tx.send(()).expect("release build");

        // The caller still receives its value...
        let value = builder.join().expect("thread").expect("build ok");
        assert_eq!(*value, 5);
        // ...but the invalidated slot did not cache it.
        assert!(slot.peek().is_none());
    }

    #[test]
    fn replace_value_preserves_write_timestamp() {
        let slot = TtlSlot::new("test", Duration::from_millis(200));
        slot.get_or_populate(|| Ok(vec![1, 2, 3])).expect("populate");
        thread::sleep(Duration::from_millis(120));
        assert!(slot.replace_value(|v| Some(v.iter().filter(|&&x| x != 2).copied().collect())));
        assert_eq!(*slot.peek().expect("fresh"), vec![1, 3]);
        // The replacement did not extend the entry's life.
        thread::sleep(Duration::from_millis(120));
        assert!(slot.peek().is_none());
    }

    fn card_with_suggestions(ids: &[Option<&str>]) -> Card {
        Card {
            summary: Some("check blood pressure".into()),
            suggestions: ids
                .iter()
                .map(|id| Suggestion {
                    id: id.map(str::to_string),
                    ..Suggestion::default()
                })
                .collect(),
            ..Card::default()
        }
    }

    #[test]
    fn remove_suggestion_reaches_across_hooks_and_spares_the_rest() {
        let cache = CardCache::new(DEFAULT_TTL);
        cache
            .get_or_populate("hook-a", || {
                Ok(vec![card_with_suggestions(&[Some("s-1"), Some("s-2")])])
            })
            .expect("populate a");
        cache
            .get_or_populate("hook-b", || {
                Ok(vec![card_with_suggestions(&[Some("s-1"), None])])
            })
            .expect("populate b");

        let reader_view = cache
            .get_or_populate("hook-a", || unreachable!("cached"))
            .expect("cached");

        assert!(cache.remove_suggestion("s-1"));

        let a = cache
            .get_or_populate("hook-a", || unreachable!("cached"))
            .expect("cached");
        let b = cache
            .get_or_populate("hook-b", || unreachable!("cached"))
            .expect("cached");
        assert!(!a[0].has_suggestion("s-1"));
        assert!(a[0].has_suggestion("s-2"));
        assert!(!b[0].has_suggestion("s-1"));
        assert_eq!(b[0].suggestions.len(), 1); // the id-less suggestion survives

        // A reader holding the old value still sees a complete list.
        assert!(reader_view[0].has_suggestion("s-1"));
    }

    #[test]
    fn remove_suggestion_without_match_mutates_nothing() {
        let cache = CardCache::new(DEFAULT_TTL);
        cache
            .get_or_populate("hook-a", || {
                Ok(vec![card_with_suggestions(&[Some("s-1")])])
            })
            .expect("populate");
        let before = cache
            .get_or_populate("hook-a", || unreachable!("cached"))
            .expect("cached");

        assert!(!cache.remove_suggestion("s-404"));

        let after = cache
            .get_or_populate("hook-a", || unreachable!("cached"))
            .expect("cached");
        // no replacement happened at all: same Arc
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn invalidating_one_hook_spares_the_other() {
        let cache = CardCache::new(DEFAULT_TTL);
        let calls_a = AtomicUsize::new(0);
        let calls_b = AtomicUsize::new(0);
        let build_a = || {
            calls_a.fetch_add(1, Ordering::SeqCst);
            Ok(vec![card_with_suggestions(&[Some("s-1")])])
        };
        let build_b = || {
            calls_b.fetch_add(1, Ordering::SeqCst);
            Ok(vec![card_with_suggestions(&[Some("s-2")])])
        };
        cache.get_or_populate("hook-a", build_a).expect("a");
        cache.get_or_populate("hook-b", build_b).expect("b");

        cache.invalidate("hook-a");

        cache.get_or_populate("hook-a", build_a).expect("a again");
        cache.get_or_populate("hook-b", build_b).expect("b again");
        assert_eq!(calls_a.load(Ordering::SeqCst), 2);
        assert_eq!(calls_b.load(Ordering::SeqCst), 1);
    }
}
