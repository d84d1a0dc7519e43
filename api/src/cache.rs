//! Bounded-freshness cache keyed by request URL.
//!
//! Concurrent `get`s for one key share a single in-flight request. Every
//! request is numbered; a response older than the stored entry (or issued
//! before the key was invalidated) never replaces it.

use crate::client::{Fetch, FetchError, FetchResult};
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

type SharedRequest = Shared<BoxFuture<'static, FetchResult<Cached>>>;

/// The last successful payload for a key.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub fetched_at: Instant,
    pub fetched_at_wall: DateTime<Utc>,
    /// Sequence number of the request that produced this entry.
    pub seq: u64,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed()
    }

    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// A value handed out by [`FreshnessCache::get`].
#[derive(Debug, Clone)]
pub struct Cached {
    pub value: Arc<Value>,
    pub fetched_at: Instant,
    pub fetched_at_wall: DateTime<Utc>,
    /// Set when a refresh failed and the previous value is being served.
    pub refresh_error: Option<FetchError>,
}

impl Cached {
    pub fn is_stale(&self) -> bool {
        self.refresh_error.is_some()
    }

    fn from_entry(entry: &CacheEntry, refresh_error: Option<FetchError>) -> Self {
        Self {
            value: entry.value.clone(),
            fetched_at: entry.fetched_at,
            fetched_at_wall: entry.fetched_at_wall,
            refresh_error,
        }
    }

}

struct InFlight {
    seq: u64,
    request: SharedRequest,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    /// key -> highest sequence number issued before the last `invalidate`.
    floors: HashMap<String, u64>,
    next_seq: u64,
}

impl CacheState {
    fn accepts(&self, key: &str, seq: u64) -> bool {
        let above_floor = self.floors.get(key).is_none_or(|floor| seq > *floor);
        let newer = self.entries.get(key).is_none_or(|entry| seq >= entry.seq);
        above_floor && newer
    }
}

#[derive(Clone)]
pub struct FreshnessCache {
    fetcher: Arc<dyn Fetch>,
    state: Arc<Mutex<CacheState>>,
}

impl FreshnessCache {
    pub fn new(fetcher: impl Fetch) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return the value for `key`, fetching it when the stored copy is older
    /// than `ttl`.
    ///
    /// On fetch failure the previous value is returned with
    /// [`Cached::refresh_error`] set; with no previous value the error is
    /// returned as-is.
    pub async fn get(&self, key: &str, ttl: Duration) -> FetchResult<Cached> {
        let request = {
            let mut state = self.lock();
            if let Some(entry) = state.entries.get(key)
                && entry.is_fresh(ttl, Instant::now())
            {
                return Ok(Cached::from_entry(entry, None));
            }

            match state.in_flight.get(key) {
                Some(in_flight) => {
                    debug!("joining in-flight request #{} for {key}", in_flight.seq);
                    in_flight.request.clone()
                }
                None => {
                    state.next_seq += 1;
                    let seq = state.next_seq;
                    debug!("fetching {key} (request #{seq})");
                    let request = self.start_request(key, seq);
                    state.in_flight.insert(
                        key.to_owned(),
                        InFlight { seq, request: request.clone() },
                    );
                    request
                }
            }
        };

        request.await
    }

    /// Force the next `get` for `key` to hit the network. Responses to
    /// requests already in flight are no longer stored.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut state = self.lock();
        let floor = state.next_seq;
        state.floors.insert(key.to_owned(), floor);
        state.in_flight.remove(key);
        state.entries.remove(key).is_some()
    }

    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.lock().entries.get(key).cloned()
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        let floor = state.next_seq;
        let keys: Vec<String> = state
            .entries
            .keys()
            .chain(state.in_flight.keys())
            .cloned()
            .collect();
        for key in keys {
            state.floors.insert(key, floor);
        }
        state.entries.clear();
        state.in_flight.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the fetch on its own task so it completes, and leaves
    /// `in_flight`, even when every waiter has been dropped.
    fn start_request(&self, key: &str, seq: u64) -> SharedRequest {
        let fetch = self.fetcher.fetch(key);
        let state = self.state.clone();
        let key = key.to_owned();
        let task = tokio::spawn({
            let state = state.clone();
            let key = key.clone();
            async move {
                let outcome = fetch.await;
                settle(&mut lock_state(&state), &key, seq, outcome)
            }
        });

        async move {
            task.await.unwrap_or_else(|e| {
                let mut state = lock_state(&state);
                if state.in_flight.get(&key).is_some_and(|f| f.seq == seq) {
                    state.in_flight.remove(&key);
                }
                Err(FetchError::Network { url: key, message: e.to_string(), timed_out: false })
            })
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    // Never held across an await; a poisoned lock only means a panic
    // elsewhere, the map itself is still consistent.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Record the outcome of request `seq` and decide what its waiters see.
fn settle(
    state: &mut CacheState,
    key: &str,
    seq: u64,
    outcome: FetchResult<Value>,
) -> FetchResult<Cached> {
    if state.in_flight.get(key).is_some_and(|f| f.seq == seq) {
        state.in_flight.remove(key);
    }

    match outcome {
        Ok(value) => {
            let entry = CacheEntry {
                value: Arc::new(value),
                fetched_at: Instant::now(),
                fetched_at_wall: Utc::now(),
                seq,
            };
            if state.accepts(key, seq) {
                let cached = Cached::from_entry(&entry, None);
                state.entries.insert(key.to_owned(), entry);
                return Ok(cached);
            }

            debug!("discarding out-of-date response #{seq} for {key}");
            let current = state.entries.get(key).unwrap_or(&entry);
            Ok(Cached::from_entry(current, None))
        }
        Err(e) => match state.entries.get(key) {
            Some(current) if current.seq > seq => Ok(Cached::from_entry(current, None)),
            Some(previous) => {
                warn!("refresh of {key} failed, serving stale value: {e}");
                Ok(Cached::from_entry(previous, Some(e)))
            }
            None => Err(e),
        },
    }
}
