//! Per-key miss coalescing.
//!
//! Concurrent misses for the same key queue on one async lock. The holder
//! computes and fills the cache; waiters re-check the cache once they get
//! the lock, so a cold key is computed once instead of once per request.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::key::CacheKey;

#[derive(Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request is computing `key`.
    pub async fn acquire(&self, key: &CacheKey) -> FlightGuard<'_> {
        let lock = self
            .locks
            .entry(key.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock.clone().lock_owned().await;
        FlightGuard {
            flights: self,
            key: key.as_str().to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Keys with a computation in progress or queued.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}

/// Held while computing a key. Dropping it releases the next waiter and
/// removes the lock once nobody else references it.
pub struct FlightGuard<'a> {
    flights: &'a SingleFlight,
    key: String,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // map + this guard's handle: no waiter holds a clone
        self.flights.locks.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RouteId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn key(date: &str) -> CacheKey {
        CacheKey::builder(RouteId::Availability, "club-1")
            .param("date", date)
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_key_serializes() {
        let flights = Arc::new(SingleFlight::new());
        let running = Arc::new(AtomicUsize::new(0));
        let max_running = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let flights = flights.clone();
                let running = running.clone();
                let max_running = max_running.clone();
                tokio::spawn(async move {
                    let _guard = flights.acquire(&key("2024-03-15")).await;
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    max_running.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(max_running.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_distinct_keys_independent() {
        let flights = SingleFlight::new();
        let a = flights.acquire(&key("2024-03-15")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), flights.acquire(&key("2024-03-16")))
            .await
            .expect("different key must not wait");
        assert_eq!(flights.in_flight(), 2);

        drop(a);
        drop(b);
        assert_eq!(flights.in_flight(), 0);
    }
}
