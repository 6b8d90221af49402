use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

type Outcome<V, E> = Option<Result<V, E>>;

enum Slot<V, E> {
    Ready(V),
    InFlight(watch::Receiver<Outcome<V, E>>),
}

enum Role<V, E> {
    Leader(watch::Sender<Outcome<V, E>>),
    Follower(watch::Receiver<Outcome<V, E>>),
}

type Slots<K, V, E> = Mutex<HashMap<K, Slot<V, E>>>;

fn lock<K, V, E>(slots: &Slots<K, V, E>) -> MutexGuard<'_, HashMap<K, Slot<V, E>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    shared: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    /// Calls that waited for another caller's computation
    pub shared: u64,
    pub misses: u64,
    pub failures: u64,
}

/// Memoizing cache running at most one computation per key at a time, only successes are kept
pub struct SingleFlight<K, V, E> {
    slots: Slots<K, V, E>,
    counters: Counters,
}

impl<K, V, E> Default for SingleFlight<K, V, E> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_compute<F, Fut>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        loop {
            let role = {
                let mut slots = lock(&self.slots);
                match slots.get(&key) {
                    Some(Slot::Ready(value)) => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        return Ok(value.clone());
                    }
                    Some(Slot::InFlight(receiver)) => Role::Follower(receiver.clone()),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        slots.insert(key.clone(), Slot::InFlight(receiver));
                        Role::Leader(sender)
                    }
                }
            };

            match role {
                Role::Follower(mut receiver) => {
                    if let Some(outcome) = Self::wait(&mut receiver).await {
                        self.counters.shared.fetch_add(1, Ordering::Relaxed);
                        return outcome;
                    }
                    // The leader was dropped before finishing, race for leadership again
                }
                Role::Leader(sender) => {
                    self.counters.misses.fetch_add(1, Ordering::Relaxed);
                    let flight = Flight {
                        slots: &self.slots,
                        key: &key,
                        sender,
                        landed: false,
                    };
                    let result = compute().await;
                    if result.is_err() {
                        self.counters.failures.fetch_add(1, Ordering::Relaxed);
                    }
                    flight.land(&result);
                    return result;
                }
            }
        }
    }

    async fn wait(receiver: &mut watch::Receiver<Outcome<V, E>>) -> Outcome<V, E> {
        loop {
            let outcome = receiver.borrow_and_update().clone();
            if outcome.is_some() {
                return outcome;
            }
            receiver.changed().await.ok()?;
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        match lock(&self.slots).get(key) {
            Some(Slot::Ready(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        matches!(lock(&self.slots).get(key), Some(Slot::Ready(_)))
    }

    /// Number of stored values, in-flight computations are not counted
    pub fn len(&self) -> usize {
        lock(&self.slots)
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            shared: self.counters.shared.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }
}

// Dropped without landing: the marker goes before the sender, so a waiter can take over
struct Flight<'a, K, V, E>
where
    K: Eq + Hash,
{
    slots: &'a Slots<K, V, E>,
    key: &'a K,
    sender: watch::Sender<Outcome<V, E>>,
    landed: bool,
}

impl<'a, K, V, E> Flight<'a, K, V, E>
where
    K: Eq + Hash + Clone,
    V: Clone,
    E: Clone,
{
    fn land(mut self, result: &Result<V, E>) {
        {
            let mut slots = lock(self.slots);
            match result {
                Ok(value) => {
                    slots.insert(self.key.clone(), Slot::Ready(value.clone()));
                }
                Err(_) => {
                    slots.remove(self.key);
                }
            }
        }
        self.sender.send_replace(Some(result.clone()));
        self.landed = true;
    }
}

impl<'a, K, V, E> Drop for Flight<'a, K, V, E>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        if !self.landed {
            lock(self.slots).remove(self.key);
        }
    }
}
