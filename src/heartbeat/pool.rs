//! Bounded worker pool for fan-out work.
//!
//! # Responsibilities
//! - Cap concurrent dials/RPCs at a fixed number of worker slots
//! - Track running, active and queued work for the pool gauges
//! - Admit at most one sweep submission at a time
//! - Discard queued and in-flight work on close

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinHandle, JoinSet};

use crate::observability::metrics;

#[derive(Debug, Default)]
struct PoolStats {
    running: AtomicUsize,
    active: AtomicUsize,
    queued_tasks: AtomicUsize,
    queued_submissions: AtomicUsize,
}

impl PoolStats {
    fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            running: self.running.load(Ordering::SeqCst),
            active: self.active.load(Ordering::SeqCst),
            queued_tasks: self.queued_tasks.load(Ordering::SeqCst),
            queued_submissions: self.queued_submissions.load(Ordering::SeqCst),
        }
    }

    fn publish(&self) {
        let s = self.snapshot();
        metrics::record_pool_state(s.running, s.active, s.queued_tasks, s.queued_submissions);
    }
}

fn running(s: &PoolStats) -> &AtomicUsize {
    &s.running
}

fn active(s: &PoolStats) -> &AtomicUsize {
    &s.active
}

fn queued_tasks(s: &PoolStats) -> &AtomicUsize {
    &s.queued_tasks
}

fn queued_submissions(s: &PoolStats) -> &AtomicUsize {
    &s.queued_submissions
}

/// Holds one unit of a pool counter; releases it on drop, including abort.
struct Tally {
    stats: Arc<PoolStats>,
    counter: fn(&PoolStats) -> &AtomicUsize,
}

impl Tally {
    fn enter(stats: &Arc<PoolStats>, counter: fn(&PoolStats) -> &AtomicUsize) -> Self {
        counter(stats).fetch_add(1, Ordering::SeqCst);
        stats.publish();
        Self {
            stats: stats.clone(),
            counter,
        }
    }
}

impl Drop for Tally {
    fn drop(&mut self) {
        (self.counter)(&self.stats).fetch_sub(1, Ordering::SeqCst);
        self.stats.publish();
    }
}

/// Point-in-time view of the pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    /// Pool tasks alive, waiting or working.
    pub running: usize,
    /// Pool tasks holding a worker slot.
    pub active: usize,
    /// Pool tasks waiting for a worker slot.
    pub queued_tasks: usize,
    /// Sweeps submitted and not yet finished.
    pub queued_submissions: usize,
}

/// Fixed-capacity pool shared by every fan-out unit.
#[derive(Debug)]
pub struct WorkerPool {
    capacity: usize,
    slots: Arc<Semaphore>,
    stats: Arc<PoolStats>,
    current_sweep: Mutex<Option<AbortHandle>>,
}

impl WorkerPool {
    /// Capacity is clamped to `1..=Semaphore::MAX_PERMITS`.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            stats: Arc::new(PoolStats::default()),
            current_sweep: Mutex::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.stats.snapshot()
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// True while a sweep submission is outstanding.
    pub fn has_queued_submissions(&self) -> bool {
        self.stats.queued_submissions.load(Ordering::SeqCst) > 0
    }

    /// Spawn `sweep` unless another sweep is outstanding or the pool is closed.
    ///
    /// The sweep itself does not occupy a worker slot.
    pub fn try_submit<F>(&self, sweep: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_closed() {
            return None;
        }
        if self
            .stats
            .queued_submissions
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.stats.publish();

        // Released on completion or abort, even if never polled.
        let submission = Tally {
            stats: self.stats.clone(),
            counter: queued_submissions,
        };
        let handle = tokio::spawn(async move {
            let _submission = submission;
            sweep.await;
        });

        let mut current = self.current_sweep.lock().unwrap_or_else(|p| p.into_inner());
        *current = Some(handle.abort_handle());
        Some(handle)
    }

    /// Spawn `task` onto `set`; it starts once a worker slot is free.
    ///
    /// If the pool closes while the task is queued, the task never runs.
    pub fn spawn<F>(&self, set: &mut JoinSet<()>, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let slots = self.slots.clone();
        let stats = self.stats.clone();
        let alive = Tally::enter(&self.stats, running);
        let queued = Tally::enter(&self.stats, queued_tasks);

        set.spawn(async move {
            let _alive = alive;
            let slot = slots.acquire_owned().await;
            drop(queued);
            let Ok(_slot) = slot else {
                return;
            };
            let _active = Tally::enter(&stats, active);
            task.await;
        });
    }

    /// Run `task` inline once a worker slot is free. `None` if the pool closed.
    pub async fn run<F>(&self, task: F) -> Option<F::Output>
    where
        F: Future,
    {
        let _alive = Tally::enter(&self.stats, running);
        let slot = {
            let _queued = Tally::enter(&self.stats, queued_tasks);
            self.slots.acquire().await
        };
        let _slot = slot.ok()?;
        let _active = Tally::enter(&self.stats, active);
        Some(task.await)
    }

    /// Stop admitting work and abort the outstanding sweep.
    pub fn close(&self) {
        self.slots.close();
        let current = self.current_sweep.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(sweep) = current {
            sweep.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_spawn_respects_capacity() {
        let pool = WorkerPool::new(2);
        let peak = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(AtomicUsize::new(0));
        let mut set = JoinSet::new();

        for _ in 0..10 {
            let peak = peak.clone();
            let current = current.clone();
            pool.spawn(&mut set, async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while set.join_next().await.is_some() {}

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.snapshot(), PoolSnapshot::default());
    }

    #[tokio::test]
    async fn test_snapshot_tracks_queued_work() {
        let pool = WorkerPool::new(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let mut set = JoinSet::new();

        pool.spawn(&mut set, async move {
            let _ = release_rx.await;
        });
        pool.spawn(&mut set, async {});
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snap = pool.snapshot();
        assert_eq!(snap.running, 2);
        assert_eq!(snap.active, 1);
        assert_eq!(snap.queued_tasks, 1);

        release_tx.send(()).unwrap();
        while set.join_next().await.is_some() {}
        assert_eq!(pool.snapshot().running, 0);
    }

    #[tokio::test]
    async fn test_single_submission_in_flight() {
        let pool = WorkerPool::new(4);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = pool
            .try_submit(async move {
                let _ = release_rx.await;
            })
            .unwrap();
        assert!(pool.has_queued_submissions());
        assert!(pool.try_submit(async {}).is_none());

        release_tx.send(()).unwrap();
        first.await.unwrap();
        assert!(!pool.has_queued_submissions());
        assert!(pool.try_submit(async {}).is_some());
    }

    #[tokio::test]
    async fn test_close_aborts_sweep_and_rejects_work() {
        let pool = WorkerPool::new(4);
        let handle = pool
            .try_submit(async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            })
            .unwrap();

        pool.close();
        assert!(handle.await.unwrap_err().is_cancelled());
        assert!(!pool.has_queued_submissions());
        assert!(pool.try_submit(async {}).is_none());
        assert!(pool.run(async { 1 }).await.is_none());
    }

    #[tokio::test]
    async fn test_run_inline() {
        let pool = WorkerPool::new(1);
        assert_eq!(pool.run(async { 42 }).await, Some(42));
        assert_eq!(pool.snapshot(), PoolSnapshot::default());
    }

    #[tokio::test]
    async fn test_capacity_is_clamped() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.capacity(), 1);
        assert_eq!(pool.run(async { 7 }).await, Some(7));

        let pool = WorkerPool::new(usize::MAX);
        assert_eq!(pool.capacity(), Semaphore::MAX_PERMITS);
    }
}
