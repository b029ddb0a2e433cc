//! Idle reaper: a single background thread per pool that closes connections
//! which have sat idle past `keep_alive`, then exits once nothing remains to
//! watch. Re-armed by `signal` whenever an entry goes idle.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::pool::ConnectionPool;

/// Starts the reaper thread if it is not already running.
pub(super) fn signal(pool: &Arc<ConnectionPool>) {
    if pool
        .reaper_active
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
    {
        let pool = pool.clone();
        thread::spawn(move || run(pool));
    }
}

fn run(pool: Arc<ConnectionPool>) {
    let keep_alive = pool.config().keep_alive();
    loop {
        let sleep_for = sweep(&pool, keep_alive);
        match sleep_for {
            Some(duration) => thread::sleep(duration),
            None => break,
        }
    }
    pool.reaper_active.store(false, Ordering::SeqCst);
}

/// Closes every entry idle for at least `keep_alive`, drops closed entries
/// from the live list, and returns how long to sleep before the next sweep
/// (`None` when nothing idle remains to watch).
fn sweep(pool: &Arc<ConnectionPool>, keep_alive: Duration) -> Option<Duration> {
    let now = Instant::now();
    let mut entries = pool.entries.lock();

    let mut next_wake: Option<Duration> = None;
    let mut any_idle = false;
    entries.retain(|entry| {
        if entry.is_closed() {
            return false;
        }
        if let Some(last_leave) = entry.is_idle_since(now, keep_alive) {
            let _ = last_leave;
            entry.close_if_idle();
            return false;
        }
        if entry.is_idle() {
            any_idle = true;
            let remaining = keep_alive.saturating_sub(now.duration_since(entry.last_leave()));
            next_wake = Some(next_wake.map_or(remaining, |w: Duration| w.min(remaining)));
        }
        true
    });

    if entries.is_empty() {
        debug!("reaper sweep: no entries remain, stopping");
        return None;
    }
    if !any_idle {
        debug!("reaper sweep: entries remain but none are idle, stopping");
        return None;
    }
    next_wake.or(Some(keep_alive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::pool::PoolConfig;
    use super::super::schedule::CapacitySchedule;
    use super::super::settings::DatabaseSettings;

    #[test]
    fn test_sweep_on_empty_pool_returns_none() {
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        let pool = ConnectionPool::new(
            settings,
            "app",
            PoolConfig::new(CapacitySchedule::new(vec![(1, 1)]), Duration::from_millis(1)),
        );
        assert_eq!(sweep(&pool, Duration::from_millis(1)), None);
    }

    #[test]
    fn test_sweep_with_all_entries_busy_returns_none() {
        let settings = Arc::new(DatabaseSettings::builder().build().unwrap());
        let pool = ConnectionPool::new(
            settings,
            "app",
            PoolConfig::new(CapacitySchedule::new(vec![(1, 1)]), Duration::from_millis(1)),
        );
        // acquire_entry joins the new entry itself, leaving active_client_count
        // at 1 with no matching release: the entry stays busy, never idle.
        let entry = pool.acquire_entry();
        assert!(!entry.is_idle());
        assert_eq!(sweep(&pool, Duration::from_millis(1)), None);
    }
}
