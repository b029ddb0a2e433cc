//! ConnectionPool (component E): an adaptive pool that grows physical
//! connections while raising the per-connection client cap by a halving
//! schedule, and asynchronously reclaims idle connections.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::Result;

use super::connection::Connection;
use super::reaper;
use super::schedule::CapacitySchedule;
use super::settings::DatabaseSettings;

/// Pool-wide configuration: the capacity schedule plus the idle timeout an
/// idle connection survives before the reaper closes it.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    capacity_schedule: CapacitySchedule,
    keep_alive: Duration,
}

impl PoolConfig {
    pub fn new(capacity_schedule: CapacitySchedule, keep_alive: Duration) -> Self {
        Self { capacity_schedule, keep_alive }
    }

    pub fn from_halving(max_connections: usize, hard_cap: usize, keep_alive: Duration) -> Self {
        Self::new(CapacitySchedule::from_halving(max_connections, hard_cap), keep_alive)
    }

    pub fn capacity_schedule(&self) -> &CapacitySchedule {
        &self.capacity_schedule
    }

    pub fn keep_alive(&self) -> Duration {
        self.keep_alive
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_halving(16, 5, Duration::from_secs(300))
    }
}

struct ReusableConnectionInner {
    connection: Connection,
    active_client_count: usize,
    last_leave: Instant,
    closed: bool,
}

/// A pool entry: one native connection plus how many clients currently share
/// it. `tryJoin`/leave/close are all serialised by this entry's own mutex, so
/// the pool's list mutex need not be held while a client runs.
pub(super) struct ReusableConnection {
    pub(super) index: usize,
    inner: Mutex<ReusableConnectionInner>,
}

impl ReusableConnection {
    fn new(index: usize, connection: Connection) -> Self {
        Self {
            index,
            inner: Mutex::new(ReusableConnectionInner {
                connection,
                active_client_count: 0,
                last_leave: Instant::now(),
                closed: false,
            }),
        }
    }

    /// Attempts to join under `cap`. Fails if already closed or at cap.
    fn try_join(&self, cap: usize) -> bool {
        let mut inner = self.inner.lock();
        if inner.closed || inner.active_client_count >= cap {
            return false;
        }
        inner.active_client_count += 1;
        true
    }

    fn current_count(&self) -> usize {
        self.inner.lock().active_client_count
    }

    pub(super) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub(super) fn is_idle_since(&self, now: Instant, keep_alive: Duration) -> Option<Instant> {
        let inner = self.inner.lock();
        if inner.active_client_count == 0 && now.duration_since(inner.last_leave) >= keep_alive {
            Some(inner.last_leave)
        } else {
            None
        }
    }

    pub(super) fn is_idle(&self) -> bool {
        self.inner.lock().active_client_count == 0
    }

    pub(super) fn last_leave(&self) -> Instant {
        self.inner.lock().last_leave
    }

    /// Marks closed and closes the native handle only if no client currently
    /// holds it; otherwise defers to the eventual `leave` that brings the
    /// count to zero.
    pub(super) fn close_if_idle(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.active_client_count == 0 {
            inner.closed = true;
            inner.connection.close();
            true
        } else {
            inner.closed = true;
            false
        }
    }

    fn leave(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.active_client_count = inner.active_client_count.saturating_sub(1);
        inner.last_leave = Instant::now();
        if inner.active_client_count == 0 {
            if inner.closed {
                inner.connection.close();
            }
            true
        } else {
            false
        }
    }

    fn run_with_connection<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        let mut inner = self.inner.lock();
        inner.connection.ensure_open()?;
        f(&mut inner.connection)
    }
}

/// An adaptive pool of reusable connections. Share via `Arc<ConnectionPool>`
/// across threads.
pub struct ConnectionPool {
    settings: Arc<DatabaseSettings>,
    database_name: String,
    config: PoolConfig,
    pub(super) entries: Mutex<Vec<Arc<ReusableConnection>>>,
    next_index: AtomicUsize,
    pub(super) reaper_active: AtomicBool,
}

impl ConnectionPool {
    pub fn new(settings: Arc<DatabaseSettings>, database_name: impl Into<String>, config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            settings,
            database_name: database_name.into(),
            config,
            entries: Mutex::new(Vec::new()),
            next_index: AtomicUsize::new(0),
            reaper_active: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn open_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// `borrow(client)`: selects (or opens) a reusable connection under the
    /// current capacity cap, runs `client` with it, and always records the
    /// leave — even if `client` returns an error or panics.
    pub fn borrow<F, R>(self: &Arc<Self>, client: F) -> Result<R>
    where
        F: FnOnce(&mut Connection) -> Result<R>,
    {
        let entry = self.acquire_entry();
        let _guard = BorrowGuard { pool: self, entry: &entry };
        entry.run_with_connection(client)
    }

    pub(super) fn acquire_entry(self: &Arc<Self>) -> Arc<ReusableConnection> {
        let mut entries = self.entries.lock();
        let cap = self.config.capacity_schedule.cap_for(entries.len());

        let mut candidates: Vec<&Arc<ReusableConnection>> = entries.iter().collect();
        candidates.sort_by_key(|e| e.current_count());
        for entry in candidates {
            if entry.try_join(cap) {
                return entry.clone();
            }
        }

        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let connection = Connection::new(self.settings.clone(), self.database_name.clone());
        let new_entry = Arc::new(ReusableConnection::new(index, connection));
        new_entry.try_join(usize::MAX);
        entries.push(new_entry.clone());
        debug!(index, open_count = entries.len(), "opened new pool entry");
        new_entry
    }

    fn release_entry(self: &Arc<Self>, entry: &Arc<ReusableConnection>) {
        let became_idle = entry.leave();
        if became_idle && !entry.is_closed() {
            reaper::signal(self);
        }
    }
}

/// Runs the "leave" bookkeeping on drop so it fires on unwind as well as on
/// normal return — a panicking client must not leak the entry's join count.
struct BorrowGuard<'a> {
    pool: &'a Arc<ConnectionPool>,
    entry: &'a Arc<ReusableConnection>,
}

impl Drop for BorrowGuard<'_> {
    fn drop(&mut self) {
        self.pool.release_entry(self.entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(cap_schedule: Vec<(usize, usize)>, keep_alive: Duration) -> Arc<ConnectionPool> {
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        ConnectionPool::new(settings, "app", PoolConfig::new(CapacitySchedule::new(cap_schedule), keep_alive))
    }

    #[test]
    fn test_open_count_starts_at_zero() {
        let p = pool(vec![(1, 1), (3, 2)], Duration::from_secs(1));
        assert_eq!(p.open_count(), 0);
    }

    #[test]
    fn test_acquire_entry_opens_new_when_none_joinable() {
        let p = pool(vec![(1, 1), (3, 2)], Duration::from_secs(1));
        let e1 = p.acquire_entry();
        assert_eq!(p.open_count(), 1);
        // cap for open_count=1 is 1, so e1 is at cap; a second acquire opens a new entry.
        let e2 = p.acquire_entry();
        assert_eq!(p.open_count(), 2);
        assert_ne!(e1.index, e2.index);
    }

    #[test]
    fn test_release_marks_idle_and_does_not_panic() {
        let p = pool(vec![(1, 1), (3, 2)], Duration::from_secs(1));
        let e = p.acquire_entry();
        p.release_entry(&e);
        assert!(e.is_idle());
    }
}
