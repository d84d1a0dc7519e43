//! Fixed-interval polling of live resources through the freshness cache.
//!
//! Each tracked id owns one tokio task. Starting an id that is already
//! tracked cancels the old task first, so there is never more than one timer
//! per id. Callbacks run behind a per-session gate: once a cancel returns,
//! that session delivers nothing more.

use crate::cache::{Cached, FreshnessCache};
use crate::client::FetchError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(250);

/// What to poll: a stable id, the URL that backs it and how stale it may get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveResource {
    pub id: String,
    pub url: String,
    pub ttl: Duration,
}

impl LiveResource {
    pub fn new(id: impl Into<String>, url: impl Into<String>, ttl: Duration) -> Self {
        Self { id: id.into(), url: url.into(), ttl }
    }
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub resource_id: String,
    pub value: Arc<Value>,
    pub fetched_at: Instant,
    pub fetched_at_wall: DateTime<Utc>,
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone)]
pub enum PollUpdate {
    Fresh(Snapshot),
    /// The refresh failed; `snapshot` is the last good value.
    Stale { snapshot: Snapshot, error: FetchError },
    /// The refresh failed and nothing was ever fetched for this resource.
    Failed(FetchError),
}

impl PollUpdate {
    fn from_result(resource_id: &str, result: Result<Cached, FetchError>) -> Self {
        match result {
            Ok(cached) => {
                let Cached { value, fetched_at, fetched_at_wall, refresh_error } = cached;
                let snapshot = Snapshot {
                    resource_id: resource_id.to_owned(),
                    value,
                    fetched_at,
                    fetched_at_wall,
                };
                match refresh_error {
                    Some(error) => PollUpdate::Stale { snapshot, error },
                    None => PollUpdate::Fresh(snapshot),
                }
            }
            Err(error) => PollUpdate::Failed(error),
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            PollUpdate::Fresh(snapshot) | PollUpdate::Stale { snapshot, .. } => Some(snapshot),
            PollUpdate::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            PollUpdate::Fresh(_) => None,
            PollUpdate::Stale { error, .. } | PollUpdate::Failed(error) => Some(error),
        }
    }
}

struct Gate {
    open: AtomicBool,
    /// Held while `is_terminal` and `on_update` run.
    delivery: Mutex<()>,
}

struct Session {
    generation: u64,
    gate: Arc<Gate>,
    handle: JoinHandle<()>,
}

impl Session {
    fn cancel(self) {
        if tokio::task::try_id() == Some(self.handle.id()) {
            // A callback stopping its own session already holds the gate.
            self.gate.open.store(false, Ordering::Release);
        } else {
            let _delivery = lock(&self.gate.delivery);
            self.gate.open.store(false, Ordering::Release);
        }
        self.handle.abort();
    }
}

type Sessions = Arc<Mutex<HashMap<String, Session>>>;

#[derive(Clone)]
pub struct Poller {
    cache: FreshnessCache,
    sessions: Sessions,
    generations: Arc<AtomicU64>,
}

impl Poller {
    pub fn new(cache: FreshnessCache) -> Self {
        Self {
            cache,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            generations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    /// Begin polling `resource`, replacing any session already running for
    /// its id.
    ///
    /// `compute_interval` is evaluated once, here. The first cycle runs
    /// immediately. A session ends when `is_terminal` holds for a fresh
    /// snapshot or when [`Poller::stop_tracking`] is called; errors never end it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_tracking<I, U, T>(
        &self,
        resource: LiveResource,
        compute_interval: I,
        on_update: U,
        is_terminal: T,
    ) where
        I: FnOnce() -> Duration,
        U: FnMut(PollUpdate) + Send + 'static,
        T: Fn(&Snapshot) -> bool + Send + 'static,
    {
        let period = compute_interval().max(MIN_INTERVAL);
        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let gate = Arc::new(Gate { open: AtomicBool::new(true), delivery: Mutex::new(()) });

        // Cancelling waits for a running callback, so never under the map lock.
        let previous = lock(&self.sessions).remove(&resource.id);
        if let Some(previous) = previous {
            debug!("restarting poll session for {}", resource.id);
            previous.cancel();
        }

        debug!("polling {} every {:?}", resource.id, period);
        let id = resource.id.clone();
        let mut sessions = lock(&self.sessions);
        let handle = tokio::spawn(run_session(
            self.cache.clone(),
            self.sessions.clone(),
            resource,
            period,
            generation,
            gate.clone(),
            on_update,
            is_terminal,
        ));
        let displaced = sessions.insert(id, Session { generation, gate, handle });
        drop(sessions);
        if let Some(displaced) = displaced {
            displaced.cancel();
        }
    }

    /// Cancel polling for `id`. Returns whether a session was running.
    pub fn stop_tracking(&self, id: &str) -> bool {
        let removed = lock(&self.sessions).remove(id);
        match removed {
            Some(session) => {
                debug!("stopped polling {id}");
                session.cancel();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&self) {
        let drained: Vec<Session> = lock(&self.sessions).drain().map(|(_, s)| s).collect();
        for session in drained {
            session.cancel();
        }
    }

    pub fn is_tracking(&self, id: &str) -> bool {
        lock(&self.sessions).contains_key(id)
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = lock(&self.sessions).keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session<U, T>(
    cache: FreshnessCache,
    sessions: Sessions,
    resource: LiveResource,
    period: Duration,
    generation: u64,
    gate: Arc<Gate>,
    mut on_update: U,
    is_terminal: T,
) where
    U: FnMut(PollUpdate) + Send + 'static,
    T: Fn(&Snapshot) -> bool + Send + 'static,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let result = cache.get(&resource.url, resource.ttl).await;
        let update = PollUpdate::from_result(&resource.id, result);

        let terminal = {
            let _delivery = lock(&gate.delivery);
            if !gate.open.load(Ordering::Acquire) {
                break;
            }
            if let Some(error) = update.error() {
                warn!("poll of {} failed: {error}", resource.id);
            }
            let terminal =
                matches!(&update, PollUpdate::Fresh(snapshot) if is_terminal(snapshot));
            on_update(update);
            if terminal {
                gate.open.store(false, Ordering::Release);
            }
            terminal
        };

        if terminal {
            let mut sessions = lock(&sessions);
            if sessions.get(&resource.id).is_some_and(|s| s.generation == generation) {
                sessions.remove(&resource.id);
            }
            debug!("{} reached a terminal state, polling stopped", resource.id);
            break;
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
