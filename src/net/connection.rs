//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing and reaper bookkeeping
//! - Expose a close signal that other subsystems can fire without owning the socket
//! - Derive Active/Idle transitions from in-flight requests
//! - Deliver every transition, in order, to a [`ConnStateHook`]

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Lifecycle phase of an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted; no request seen yet (TLS handshake may still be running).
    New,
    /// At least one request is in flight.
    Active,
    /// Every request so far has completed.
    Idle,
    /// Taken over by a protocol upgrade. Never tracked.
    Hijacked,
    /// The connection is gone.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::New => "new",
            ConnectionState::Active => "active",
            ConnectionState::Idle => "idle",
            ConnectionState::Hijacked => "hijacked",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Shared, non-owning handle to an accepted connection.
///
/// Cloning is cheap. The handle does not keep the socket alive: closing it
/// only signals the task that owns the connection, which then drops it.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    inner: Arc<HandleInner>,
}

#[derive(Debug)]
struct HandleInner {
    id: ConnectionId,
    remote_addr: SocketAddr,
    close_tx: watch::Sender<bool>,
}

impl ConnHandle {
    /// Create a handle for a freshly accepted connection.
    pub fn new(remote_addr: SocketAddr) -> Self {
        let (close_tx, _) = watch::channel(false);
        Self {
            inner: Arc::new(HandleInner {
                id: ConnectionId::new(),
                remote_addr,
                close_tx,
            }),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_addr
    }

    /// Ask the owning task to close the connection. Never blocks.
    pub fn close(&self) {
        self.inner.close_tx.send_replace(true);
    }

    /// Whether [`close`](Self::close) has been requested.
    pub fn is_closed(&self) -> bool {
        *self.inner.close_tx.borrow()
    }

    /// Resolves once a close has been requested.
    pub async fn closed(&self) {
        let mut rx = self.inner.close_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Receiver of connection lifecycle transitions.
///
/// Invoked synchronously from the connection's own task; implementations must
/// not block.
pub trait ConnStateHook: Send + Sync + 'static {
    fn on_state_change(&self, conn: &ConnHandle, state: ConnectionState);
}

impl<F> ConnStateHook for F
where
    F: Fn(&ConnHandle, ConnectionState) + Send + Sync + 'static,
{
    fn on_state_change(&self, conn: &ConnHandle, state: ConnectionState) {
        self(conn, state)
    }
}

/// Derives Active/Idle transitions from the number of in-flight requests.
///
/// All notifications for one connection go through a single lock, so the hook
/// observes them in a total order. Once [`close`](Self::close) has run no
/// further transitions are reported.
pub struct ConnectionActivity {
    conn: ConnHandle,
    hook: Arc<dyn ConnStateHook>,
    state: Mutex<ActivityState>,
}

struct ActivityState {
    in_flight: usize,
    closed: bool,
}

impl ConnectionActivity {
    /// Start tracking `conn`, reporting [`ConnectionState::New`].
    pub fn start(conn: ConnHandle, hook: Arc<dyn ConnStateHook>) -> Arc<Self> {
        hook.on_state_change(&conn, ConnectionState::New);
        Arc::new(Self {
            conn,
            hook,
            state: Mutex::new(ActivityState {
                in_flight: 0,
                closed: false,
            }),
        })
    }

    pub fn conn(&self) -> &ConnHandle {
        &self.conn
    }

    /// Record a request entering the connection. Returns a guard that marks it
    /// finished on drop.
    pub fn begin_request(self: &Arc<Self>) -> RequestGuard {
        let mut state = self.state.lock();
        state.in_flight += 1;
        if state.in_flight == 1 && !state.closed {
            self.hook.on_state_change(&self.conn, ConnectionState::Active);
        }
        RequestGuard {
            activity: Arc::clone(self),
        }
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Report [`ConnectionState::Closed`]. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        self.hook.on_state_change(&self.conn, ConnectionState::Closed);
    }

    fn finish_request(&self) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        if state.in_flight == 0 && !state.closed {
            self.hook.on_state_change(&self.conn, ConnectionState::Idle);
        }
    }
}

/// Guard that tracks one request's lifetime.
/// Marks the request finished when dropped.
pub struct RequestGuard {
    activity: Arc<ConnectionActivity>,
}

impl fmt::Debug for RequestGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("connection_id", &self.activity.conn.id())
            .finish()
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.activity.finish_request();
    }
}
