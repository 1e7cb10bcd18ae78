// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::thread;
use std::thread::ThreadId;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::Error;
use crate::ErrorKind;
use crate::LogType;
use crate::descriptor::normalize;
use crate::sink::Sink;
use crate::sink::SinkFactory;

/// A lazily populated map of log type names to their sinks.
///
/// At most one sink is constructed per name, even when many threads dispatch to a log type for
/// the first time at once. The first caller for a name claims a slot under the map's entry lock
/// and builds the sink after releasing it; every other caller for that name waits on the slot and
/// then shares the result. Building never blocks callers of other names. A failed construction
/// leaves no entry behind, so the next call tries again.
///
/// A thread that dispatches to a name while it is still building that name's sink, for example
/// because the sink factory itself logs, gets an error instead of waiting on itself.
pub struct SinkCache {
    slots: DashMap<String, Arc<Slot>>,
    factory: Arc<dyn SinkFactory>,
}

impl fmt::Debug for SinkCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .slots
            .iter()
            .map(|e| e.key().clone())
            .collect::<Vec<_>>();
        f.debug_struct("SinkCache")
            .field("names", &names)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Built {
    sink: Arc<dyn Sink>,
    log_type: Arc<dyn LogType>,
}

enum SlotState {
    Building(ThreadId),
    Built(Built),
    Failed,
}

struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn building() -> Slot {
        Slot {
            state: Mutex::new(SlotState::Building(thread::current().id())),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn complete(&self, state: SlotState) {
        *self.lock() = state;
        self.ready.notify_all();
    }

    fn built(&self) -> Option<Built> {
        match &*self.lock() {
            SlotState::Built(built) => Some(built.clone()),
            _ => None,
        }
    }

    /// Wait for the builder. `Ok(None)` means the build failed.
    fn wait(&self, name: &str) -> Result<Option<Built>, Error> {
        let current = thread::current().id();
        let mut state = self.lock();
        loop {
            match &*state {
                SlotState::Building(builder) if *builder == current => {
                    return Err(Error::new(
                        ErrorKind::Unexpected,
                        "dispatched to a log type while building its sink",
                    )
                    .with_context("name", name));
                }
                SlotState::Building(_) => {
                    state = self.ready.wait(state).unwrap_or_else(|e| e.into_inner());
                }
                SlotState::Built(built) => return Ok(Some(built.clone())),
                SlotState::Failed => return Ok(None),
            }
        }
    }
}

// Marks the slot failed and unclaims it if the factory returns an error or panics.
struct BuildGuard<'a> {
    cache: &'a SinkCache,
    key: &'a str,
    slot: &'a Arc<Slot>,
    armed: bool,
}

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.remove_slot(self.key, self.slot);
            self.slot.complete(SlotState::Failed);
        }
    }
}

impl SinkCache {
    /// Create an empty cache building sinks with `factory`.
    pub fn new(factory: impl SinkFactory) -> SinkCache {
        SinkCache::with_factory(Arc::new(factory))
    }

    /// Create an empty cache building sinks with a shared `factory`.
    pub fn with_factory(factory: Arc<dyn SinkFactory>) -> SinkCache {
        SinkCache {
            slots: DashMap::new(),
            factory,
        }
    }

    /// Return the sink cached under `log_type`'s name, building it from `log_type` on first use.
    ///
    /// A sink already cached under the name is returned whichever log type it was built from.
    pub fn get_or_create(&self, log_type: &Arc<dyn LogType>) -> Result<Arc<dyn Sink>, Error> {
        self.acquire(log_type, false)
    }

    /// Return the sink cached under `log_type`'s name if it was built from this very `log_type`
    /// instance; otherwise replace it with one built from `log_type`.
    pub fn get_or_replace(&self, log_type: &Arc<dyn LogType>) -> Result<Arc<dyn Sink>, Error> {
        self.acquire(log_type, true)
    }

    fn acquire(&self, log_type: &Arc<dyn LogType>, exact: bool) -> Result<Arc<dyn Sink>, Error> {
        let key = normalize(log_type.name());
        loop {
            let (slot, claimed) = match self.slots.entry(key.clone()) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    let slot = Arc::new(Slot::building());
                    entry.insert(slot.clone());
                    (slot, true)
                }
            };

            if claimed {
                return self.build(&key, &slot, log_type);
            }

            match slot.wait(log_type.name())? {
                Some(built) if !exact || Arc::ptr_eq(&built.log_type, log_type) => {
                    return Ok(built.sink);
                }
                Some(_) => {
                    log::debug!(
                        target: "logroute::cache",
                        "replacing stale sink for log type {}",
                        log_type.name()
                    );
                    self.remove_slot(&key, &slot);
                }
                // the builder failed and unclaimed the slot; claim it ourselves
                None => {}
            }
        }
    }

    fn build(
        &self,
        key: &str,
        slot: &Arc<Slot>,
        log_type: &Arc<dyn LogType>,
    ) -> Result<Arc<dyn Sink>, Error> {
        let mut guard = BuildGuard {
            cache: self,
            key,
            slot,
            armed: true,
        };
        let sink = self.factory.create(log_type.as_ref())?;
        guard.armed = false;

        slot.complete(SlotState::Built(Built {
            sink: sink.clone(),
            log_type: log_type.clone(),
        }));
        log::debug!(
            target: "logroute::cache",
            "created sink for log type {} at {}",
            log_type.name(),
            log_type.log_path(None).display()
        );
        Ok(sink)
    }

    fn remove_slot(&self, key: &str, slot: &Arc<Slot>) {
        self.slots.remove_if(key, |_, cached| Arc::ptr_eq(cached, slot));
    }

    /// Remove the sink cached under `name`, returning it.
    ///
    /// The sink keeps serving whoever still holds it and shuts down once the last handle drops.
    /// A sink still being built is unclaimed; its builder's callers still receive it.
    pub fn evict(&self, name: &str) -> Option<Arc<dyn Sink>> {
        let (_, slot) = self.slots.remove(&normalize(name))?;
        log::debug!(target: "logroute::cache", "evicted sink for log type {name}");
        slot.built().map(|built| built.sink)
    }

    /// Return every sink built so far.
    pub fn sinks(&self) -> Vec<Arc<dyn Sink>> {
        let slots = self
            .slots
            .iter()
            .map(|e| e.value().clone())
            .collect::<Vec<_>>();
        slots
            .iter()
            .filter_map(|slot| slot.built())
            .map(|built| built.sink)
            .collect()
    }

    /// Return the log type the sink cached under `name` was built from.
    pub fn built_from(&self, name: &str) -> Option<Arc<dyn LogType>> {
        let slot = self.slots.get(&normalize(name))?.value().clone();
        slot.built().map(|built| built.log_type)
    }

    /// Return the number of cached names, including sinks still being built.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Return `true` if no sink has been built or claimed yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::OnceLock;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::LogTypeDescriptor;
    use crate::Severity;
    use crate::sink::Testing;

    fn named(name: &str) -> Arc<dyn LogType> {
        Arc::new(LogTypeDescriptor::builder(name).build())
    }

    fn counting_cache(sink: Testing, counter: Arc<AtomicUsize>) -> SinkCache {
        SinkCache::new(move |_: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
            counter.fetch_add(1, Ordering::SeqCst);
            // widen the race window
            thread::sleep(Duration::from_millis(10));
            Ok(Arc::new(sink.clone()))
        })
    }

    #[test]
    fn test_concurrent_first_use_builds_one_sink() {
        const THREADS: usize = 16;

        let sink = Testing::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = Arc::new(counting_cache(sink.clone(), counter.clone()));
        let orders = named("Orders");
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles = (0..THREADS)
            .map(|i| {
                let cache = cache.clone();
                let orders = orders.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let sink = cache.get_or_create(&orders).unwrap();
                    sink.write(Severity::Information, format!("entry {i}"))
                        .wait()
                        .unwrap();
                    sink
                })
            })
            .collect::<Vec<_>>();

        let sinks = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        for s in &sinks[1..] {
            assert!(Arc::ptr_eq(&sinks[0], s));
        }
        assert_eq!(sink.len(), THREADS);
    }

    #[test]
    fn test_names_share_sinks_case_insensitively() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Testing::default(), counter.clone());

        let a = cache.get_or_create(&named("Orders")).unwrap();
        let b = cache.get_or_create(&named("ORDERS")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        cache.get_or_create(&named("Payments")).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let cache = {
            let attempts = attempts.clone();
            SinkCache::new(move |_: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::new(ErrorKind::SinkWrite, "permission denied"))
                } else {
                    Ok(Arc::new(Testing::default()))
                }
            })
        };

        let orders = named("Orders");
        assert!(cache.get_or_create(&orders).is_err());
        assert!(cache.is_empty());
        assert!(cache.get_or_create(&orders).is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evict() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Testing::default(), counter.clone());
        let orders = named("Orders");

        cache.get_or_create(&orders).unwrap();
        assert!(cache.evict("orders").is_some());
        assert!(cache.evict("orders").is_none());
        cache.get_or_create(&orders).unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_replace_sink_built_from_another_log_type() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cache = counting_cache(Testing::default(), counter.clone());
        let old = named("Audit");
        let new = named("Audit");

        let stale = cache.get_or_create(&old).unwrap();
        // any cached sink satisfies a plain lookup
        assert!(Arc::ptr_eq(&stale, &cache.get_or_create(&new).unwrap()));

        let fresh = cache.get_or_replace(&new).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(Arc::ptr_eq(&cache.built_from("audit").unwrap(), &new));
        assert!(Arc::ptr_eq(&fresh, &cache.get_or_replace(&new).unwrap()));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_factory_may_use_the_cache() {
        let cell: Arc<OnceLock<Arc<SinkCache>>> = Arc::new(OnceLock::new());
        let nested = Arc::new(Mutex::new(vec![]));
        let cache = {
            let cell = cell.clone();
            let nested = nested.clone();
            Arc::new(SinkCache::new(
                move |log_type: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
                    if log_type.name() == "Outer" {
                        let cache = cell.get().unwrap();
                        let mut nested = nested.lock().unwrap();
                        nested.push(cache.get_or_create(&named("Inner")).is_ok());
                        nested.push(cache.get_or_create(&named("Outer")).is_ok());
                    }
                    Ok(Arc::new(Testing::default()))
                },
            ))
        };
        cell.set(cache.clone()).unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn({
            let cache = cache.clone();
            move || {
                let _ = tx.send(cache.get_or_create(&named("Outer")).is_ok());
            }
        });

        // building Outer completes; the nested Outer dispatch errors instead of waiting on itself
        assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
        assert_eq!(*nested.lock().unwrap(), vec![true, false]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_slow_build_does_not_block_other_names() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let cache = Arc::new(SinkCache::new(
            move |log_type: &dyn LogType| -> Result<Arc<dyn Sink>, Error> {
                if log_type.name() == "Slow" {
                    let released = release_rx
                        .lock()
                        .unwrap()
                        .recv_timeout(Duration::from_secs(5));
                    assert!(released.is_ok(), "slow build was never released");
                }
                Ok(Arc::new(Testing::default()))
            },
        ));

        let slow = thread::spawn({
            let cache = cache.clone();
            move || cache.get_or_create(&named("Slow")).is_ok()
        });

        // wait until the slow build has claimed its slot
        while cache.is_empty() {
            thread::sleep(Duration::from_millis(1));
        }
        for i in 0..64 {
            cache.get_or_create(&named(&format!("fast-{i}"))).unwrap();
        }
        release_tx.send(()).unwrap();
        assert!(slow.join().unwrap());
        assert_eq!(cache.len(), 65);
    }
}
