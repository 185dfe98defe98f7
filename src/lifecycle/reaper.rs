//! Idle connection reaper.
//!
//! # Responsibilities
//! - Keep at most one pending close per connection
//! - Rearm that close on every lifecycle transition
//! - Close connections that stay too long in New/Idle (5 min) or Active (10 min)
//!
//! # Design Decisions
//! - One registry lock, held for the whole cancel-and-rearm
//! - Timers run as detached tasks and never touch the registry
//! - A timer/cancel race is settled by a compare-and-swap on the entry: if the
//!   cancel wins, the timer does nothing

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::net::connection::{ConnHandle, ConnStateHook, ConnectionId, ConnectionState};

/// Deadline for connections in [`ConnectionState::New`] or [`ConnectionState::Idle`].
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Deadline for connections in [`ConnectionState::Active`].
pub const ACTIVE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// How long a connection may remain in `state`, or `None` if the state is
/// never reaped.
pub fn timeout_for(state: ConnectionState) -> Option<Duration> {
    match state {
        ConnectionState::New | ConnectionState::Idle => Some(IDLE_TIMEOUT),
        ConnectionState::Active => Some(ACTIVE_TIMEOUT),
        ConnectionState::Hijacked | ConnectionState::Closed => None,
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryState {
    Armed = 0,
    Fired = 1,
    Cancelled = 2,
}

/// A scheduled close for one connection.
#[derive(Debug)]
struct ReaperEntry {
    deadline: Instant,
    state: Arc<AtomicU8>,
    timer: JoinHandle<()>,
}

impl ReaperEntry {
    fn schedule(conn: ConnHandle, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let state = Arc::new(AtomicU8::new(EntryState::Armed as u8));

        let timer_state = Arc::clone(&state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;

            let fired = timer_state.compare_exchange(
                EntryState::Armed as u8,
                EntryState::Fired as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            if fired.is_err() {
                return;
            }

            let elapsed = format_duration(timeout);
            tracing::info!(
                connection_id = %conn.id(),
                remote_addr = %conn.remote_addr(),
                timeout = %elapsed,
                "closing idle conn {} after {}",
                conn.remote_addr(),
                elapsed
            );
            conn.close();
        });

        Self {
            deadline,
            state,
            timer,
        }
    }

    /// Disarm the entry. Returns `false` if the timer had already fired.
    fn cancel(self) -> bool {
        let cancelled = self
            .state
            .compare_exchange(
                EntryState::Armed as u8,
                EntryState::Cancelled as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        self.timer.abort();
        cancelled
    }
}

/// Registry of pending closes, keyed by connection identity.
///
/// Construct one at startup and hand it to the server as its
/// [`ConnStateHook`]. Must be used from within a Tokio runtime.
#[derive(Debug, Default)]
pub struct IdleReaper {
    entries: Mutex<HashMap<ConnectionId, ReaperEntry>>,
}

impl IdleReaper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending close for `conn`, then arm a new one if `state`
    /// has a timeout.
    pub fn on_state_change(&self, conn: &ConnHandle, state: ConnectionState) {
        let mut entries = self.entries.lock();

        if let Some(previous) = entries.remove(&conn.id()) {
            if !previous.cancel() {
                tracing::trace!(connection_id = %conn.id(), "Reaper timer already fired");
            }
        }

        let Some(timeout) = timeout_for(state) else {
            tracing::trace!(connection_id = %conn.id(), %state, "Connection untracked");
            return;
        };

        tracing::trace!(
            connection_id = %conn.id(),
            %state,
            timeout_secs = timeout.as_secs(),
            "Reaper armed"
        );
        entries.insert(conn.id(), ReaperEntry::schedule(conn.clone(), timeout));
    }

    /// Number of connections with a pending close.
    pub fn tracked(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether `id` has a pending close.
    pub fn is_tracking(&self, id: ConnectionId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    /// When the pending close for `id` is due.
    pub fn deadline(&self, id: ConnectionId) -> Option<Instant> {
        self.entries.lock().get(&id).map(|entry| entry.deadline)
    }
}

impl ConnStateHook for IdleReaper {
    fn on_state_change(&self, conn: &ConnHandle, state: ConnectionState) {
        IdleReaper::on_state_change(self, conn, state);
    }
}

impl Drop for IdleReaper {
    fn drop(&mut self) {
        for (_, entry) in self.entries.get_mut().drain() {
            entry.cancel();
        }
    }
}

/// Render a duration as `5m0s`, `1h2m3s`, `1.5s`.
pub fn format_duration(d: Duration) -> String {
    let total = d.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }

    let nanos = d.subsec_nanos();
    if nanos == 0 {
        let _ = write!(out, "{seconds}s");
    } else {
        let fraction = format!("{nanos:09}");
        let _ = write!(out, "{seconds}.{}s", fraction.trim_end_matches('0'));
    }
    out
}
