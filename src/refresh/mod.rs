//! Shared dashboard state and the refresh loop.
//!
//! [`Dashboard`] holds the one current [`Snapshot`] and replaces it wholesale
//! after each completed reconciliation.
//!
//! Refreshes are single-flight per settings generation. A trigger (poll tick
//! or manual refresh) that arrives while a refresh for the current settings
//! is outstanding is dropped. Saving settings through
//! [`Dashboard::save_source`] starts a new generation: a refresh against the
//! new settings may run while one against the old settings still hangs, and
//! the old one's result is discarded when it returns.
//!
//! [`spawn_poller`] drives refreshes on a fixed interval from a background
//! thread until the returned [`PollerHandle`] is stopped or dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::analytics::events;
use crate::config::{ConfigStore, SourceConfig};
use crate::model::{ConnectivityState, DashboardPayload};
use crate::source::{self, Reconciled, Transport};

/// Fixed polling interval for the dashboard.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Granularity at which a sleeping poller notices a stop request.
const STOP_CHECK: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The currently displayed payload and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub payload: DashboardPayload,
    pub state: ConnectivityState,
    pub failure: Option<String>,
    pub dropped_records: usize,
    /// `None` until the first refresh completes.
    pub updated_at: Option<DateTime<Utc>>,
    /// Number of completed refreshes.
    pub refreshes: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            payload: DashboardPayload::empty(),
            state: ConnectivityState::Disconnected,
            failure: None,
            dropped_records: 0,
            updated_at: None,
            refreshes: 0,
        }
    }
}

/// What happened to a refresh trigger.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The refresh ran and its result is now the current snapshot.
    Completed(ConnectivityState),
    /// Another refresh for the same settings was in flight; this trigger
    /// was ignored.
    AlreadyRunning,
    /// The settings changed while this refresh was running; its result was
    /// dropped.
    Superseded,
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Shared, cloneable handle to the dashboard state.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Shared>,
}

struct Shared {
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn Transport>,
    snapshot: Mutex<Snapshot>,
    /// Bumped on every settings change made through the dashboard.
    generation: AtomicU64,
    /// Generation of the refresh currently holding the single-flight slot.
    in_flight: Mutex<Option<u64>>,
    log_events: bool,
}

impl Dashboard {
    pub fn new(store: Arc<dyn ConfigStore>, transport: Arc<dyn Transport>) -> Self {
        Self::build(store, transport, false)
    }

    /// Like [`Dashboard::new`], additionally writing every completed refresh
    /// to the fetch-event log.
    pub fn with_event_log(store: Arc<dyn ConfigStore>, transport: Arc<dyn Transport>) -> Self {
        Self::build(store, transport, true)
    }

    fn build(store: Arc<dyn ConfigStore>, transport: Arc<dyn Transport>, log_events: bool) -> Self {
        Self {
            inner: Arc::new(Shared {
                store,
                transport,
                snapshot: Mutex::new(Snapshot::default()),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                log_events,
            }),
        }
    }

    /// Re-read the configuration, reconcile, and publish the result.
    pub fn refresh(&self) -> RefreshOutcome {
        let generation = self.inner.generation.load(Ordering::Acquire);
        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight, generation) else {
            return RefreshOutcome::AlreadyRunning;
        };

        let source = self.inner.store.read();
        let result = source::fetch_dashboard_data(&source, self.inner.transport.as_ref());
        if self.inner.generation.load(Ordering::Acquire) != generation {
            return RefreshOutcome::Superseded;
        }
        if self.inner.log_events {
            events::log_fetch(&source, &result);
        }

        let state = result.state;
        self.publish(result);
        RefreshOutcome::Completed(state)
    }

    /// A copy of the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.lock_snapshot().clone()
    }

    /// Persist new data-source settings and start a new generation.
    ///
    /// A refresh still running against the previous settings will not
    /// publish its result, and does not block the next [`Dashboard::refresh`].
    pub fn save_source(&self, source: &SourceConfig) -> Result<()> {
        self.inner.store.write(source)?;
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Whether a refresh for the current settings is outstanding.
    pub fn is_refreshing(&self) -> bool {
        lock_slot(&self.inner.in_flight).is_some()
    }

    /// The configuration store this dashboard reads from.
    pub fn store(&self) -> &dyn ConfigStore {
        self.inner.store.as_ref()
    }

    fn publish(&self, result: Reconciled) {
        let mut snapshot = self.lock_snapshot();
        let refreshes = snapshot.refreshes + 1;
        *snapshot = Snapshot {
            payload: result.payload,
            state: result.state,
            failure: result.failure,
            dropped_records: result.dropped_records,
            updated_at: Some(Utc::now()),
            refreshes,
        };
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Snapshot> {
        // The snapshot is replaced in a single assignment, so a poisoned lock
        // still guards a consistent value.
        self.inner
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Holds the single-flight slot for one generation; releases it on drop,
/// including during unwinding.
///
/// A newer generation may take the slot over while an older refresh is still
/// running. The older guard then leaves the slot alone when it drops.
struct InFlightGuard<'a> {
    slot: &'a Mutex<Option<u64>>,
    generation: u64,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(slot: &'a Mutex<Option<u64>>, generation: u64) -> Option<Self> {
        let mut current = lock_slot(slot);
        if matches!(*current, Some(running) if running >= generation) {
            return None;
        }
        *current = Some(generation);
        Some(Self { slot, generation })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut current = lock_slot(self.slot);
        if *current == Some(self.generation) {
            *current = None;
        }
    }
}

fn lock_slot(slot: &Mutex<Option<u64>>) -> MutexGuard<'_, Option<u64>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

/// Handle to a running poller thread.
pub struct PollerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Ask the poller to stop and wait for its thread to exit. An in-flight
    /// refresh is allowed to finish first.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Refresh immediately, then every `interval`, on a background thread.
pub fn spawn_poller(dashboard: Dashboard, interval: Duration) -> PollerHandle {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let thread = thread::spawn(move || {
        while !stop_flag.load(Ordering::Acquire) {
            dashboard.refresh();
            sleep_unless_stopped(interval, &stop_flag);
        }
    });

    PollerHandle {
        stop,
        thread: Some(thread),
    }
}

fn sleep_unless_stopped(total: Duration, stop: &AtomicBool) {
    let mut remaining = total;
    while !remaining.is_zero() && !stop.load(Ordering::Acquire) {
        let step = remaining.min(STOP_CHECK);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
