//! Ordered worker pool.
//!
//! Runs the heavy half of each job on any free worker thread and the cheap
//! half strictly in submission order. This parallelizes loops of the shape
//!
//! ```text
//! while (...) { emit(heavy(input)) }
//! ```
//!
//! where `heavy` may run concurrently but `emit` must observe submission
//! order.
//!
//! # Example
//!
//! ```
//! use ordered_pool::core::OrderedPool;
//! use std::sync::{Arc, Mutex};
//!
//! let out = Arc::new(Mutex::new(Vec::new()));
//! let pool = OrderedPool::new(4, 8)?;
//! for i in 0..32_u64 {
//!     let out = Arc::clone(&out);
//!     pool.submit(move || i * i, move |sq| out.lock().unwrap().push(sq))?;
//! }
//! let failures = pool.close();
//! assert!(failures.is_empty());
//! assert_eq!(*out.lock().unwrap(), (0..32).map(|i| i * i).collect::<Vec<_>>());
//! # Ok::<(), ordered_pool::core::PoolError>(())
//! ```
//!
//! # Locks
//!
//! - The job queue and its pending count share one mutex with two condvars
//!   (job added / job removed).
//! - The ticket sequencer has its own mutex and condvar. Completions are
//!   mutually exclusive with each other only.
//!
//! # Nested submits without workers
//!
//! With zero workers, a job that submits to its own pool from `compute` or
//! `complete` gets the next ticket as usual, but runs to completion right
//! away, before the outer job's completion is served. The sequencer then
//! steps over the nested ticket.

mod queue;
mod sequencer;
mod worker;

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::OrderedPoolConfig;
use crate::core::error::{JobFailure, PoolError};
use crate::core::job::{Job, Ticket};

use queue::JobQueue;
use worker::spawn_worker;

pub(crate) use sequencer::TicketSequencer;

/// Snapshot of pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads; 0 means jobs run on the submitting thread.
    pub worker_count: usize,
    /// Queue capacity; 0 means unbounded.
    pub max_pending: usize,
    /// Tickets issued so far.
    pub submitted_jobs: u64,
    /// Jobs admitted but not yet picked up by a worker.
    pub queued_jobs: usize,
    /// Jobs picked up whose ticket has not been served yet.
    pub active_jobs: u64,
    /// Jobs whose completion ran without panicking.
    pub completed_jobs: u64,
    /// Jobs whose compute or completion panicked.
    pub failed_jobs: u64,
    /// Ticket whose completion is allowed to run next.
    pub next_ticket_to_serve: u64,
}

/// Lock-free counters behind [`PoolStats`].
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn job_started(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    fn job_finished(&self, succeeded: bool) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        if succeeded {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

thread_local! {
    /// Pools with an inline job in progress on this thread.
    static INLINE_JOBS: RefCell<Vec<Uuid>> = const { RefCell::new(Vec::new()) };
}

/// Marks a pool as running an inline job on the current thread until dropped.
struct InlineGuard(Uuid);

impl InlineGuard {
    /// `None` if this thread is already inside an inline job of the same pool.
    fn enter(pool_id: Uuid) -> Option<Self> {
        INLINE_JOBS.with(|active| {
            let mut active = active.borrow_mut();
            if active.contains(&pool_id) {
                return None;
            }
            active.push(pool_id);
            Some(Self(pool_id))
        })
    }
}

impl Drop for InlineGuard {
    fn drop(&mut self) {
        INLINE_JOBS.with(|active| {
            let mut active = active.borrow_mut();
            if let Some(pos) = active.iter().rposition(|id| *id == self.0) {
                active.remove(pos);
            }
        });
    }
}

/// State shared between the pool handle and its workers.
pub(crate) struct PoolShared<R> {
    pub(crate) pool_id: Uuid,
    pub(crate) queue: JobQueue<R>,
    pub(crate) sequencer: TicketSequencer,
    pub(crate) counters: PoolCounters,
    failures: Sender<JobFailure>,
}

impl<R> PoolShared<R> {
    /// Account for a finished job and forward any failure to the side channel.
    pub(crate) fn record(&self, ticket: Ticket, outcome: Result<(), JobFailure>) {
        match outcome {
            Ok(()) => {
                self.counters.job_finished(true);
                debug!(%ticket, "Job completed");
            }
            Err(failure) => {
                self.counters.job_finished(false);
                error!(
                    pool_id = %self.pool_id,
                    %ticket,
                    stage = %failure.stage,
                    message = %failure.message,
                    "Job panicked; ticket served so later jobs proceed"
                );
                // The receiver lives in the pool handle, which outlives the workers.
                let _ = self.failures.send(failure);
            }
        }
    }
}

/// Worker pool whose completion callbacks run in submission order.
///
/// Created with a fixed number of persistent worker threads and a bound on
/// the number of queued jobs. `submit` blocks while the queue is full. With
/// zero workers every job runs synchronously on the submitting thread, with
/// the same ordering and failure handling as the threaded mode.
///
/// The pool is not `Clone`: one handle owns the queue, the sequencer and the
/// workers. Share it by reference (`Arc`, scoped threads) to submit from
/// several threads.
///
/// Dropping the pool shuts it down: already admitted jobs are drained,
/// completions still run in order, and the drop blocks until every worker
/// has exited.
pub struct OrderedPool<R>
where
    R: Send + 'static,
{
    config: OrderedPoolConfig,
    shared: Arc<PoolShared<R>>,
    /// Joined on shutdown. The lock is held while joining so concurrent
    /// shutdown calls all return after the drain.
    workers: Mutex<Vec<JoinHandle<()>>>,
    failures: Receiver<JobFailure>,
}

impl<R> OrderedPool<R>
where
    R: Send + 'static,
{
    /// Create a pool with `num_workers` threads and at most `max_pending`
    /// queued jobs (0 = unbounded). Other settings use
    /// [`OrderedPoolConfig::default`].
    ///
    /// # Errors
    ///
    /// `PoolError::Spawn` if a worker thread cannot be started.
    pub fn new(num_workers: usize, max_pending: usize) -> Result<Self, PoolError> {
        Self::with_config(
            OrderedPoolConfig::new()
                .with_worker_count(num_workers)
                .with_max_pending(max_pending),
        )
    }

    /// Create a pool from a full configuration and start its workers.
    ///
    /// # Errors
    ///
    /// - `PoolError::InvalidConfig` if the configuration is invalid
    /// - `PoolError::Spawn` if a worker thread cannot be started; workers
    ///   started before the failure are stopped and joined first
    pub fn with_config(config: OrderedPoolConfig) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (failures_tx, failures_rx) = unbounded();
        let shared = Arc::new(PoolShared {
            pool_id: Uuid::new_v4(),
            queue: JobQueue::new(config.max_pending),
            sequencer: TicketSequencer::new(),
            counters: PoolCounters::default(),
            failures: failures_tx,
        });

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            match spawn_worker(worker_id, Arc::clone(&shared), &config) {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    error!(worker_id, error = %source, "Failed to spawn worker thread");
                    shared.queue.terminate();
                    for handle in workers {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn { worker_id, source });
                }
            }
        }

        info!(
            pool_id = %shared.pool_id,
            worker_count = config.worker_count,
            max_pending = config.max_pending,
            "OrderedPool started"
        );

        Ok(Self {
            config,
            shared,
            workers: Mutex::new(workers),
            failures: failures_rx,
        })
    }

    /// Submit a job: `complete(compute())`, with `compute` running on any
    /// worker and `complete` running after the completions of every earlier
    /// job.
    ///
    /// Blocks while `max_pending` jobs are already queued. Returns as soon as
    /// the job is admitted, with the ticket it was assigned. With zero
    /// workers the whole job runs before this returns.
    ///
    /// A panic in either closure does not escape; it is reported through
    /// [`take_failures`](Self::take_failures).
    ///
    /// # Errors
    ///
    /// `PoolError::PoolShutdown` if shutdown has begun, including when it
    /// begins while this call is waiting for capacity.
    pub fn submit<C, F>(&self, compute: C, complete: F) -> Result<Ticket, PoolError>
    where
        C: FnOnce() -> R + Send + 'static,
        F: FnOnce(R) + Send + 'static,
    {
        if self.config.worker_count == 0 {
            return self.run_inline(compute, complete);
        }

        let ticket = self.shared.queue.push(Box::new(compute), Box::new(complete))?;
        debug!(%ticket, "Job admitted");
        Ok(ticket)
    }

    /// Unthreaded mode: same ticket and sequencer path, on the caller's thread.
    fn run_inline<C, F>(&self, compute: C, complete: F) -> Result<Ticket, PoolError>
    where
        C: FnOnce() -> R + Send + 'static,
        F: FnOnce(R) + Send + 'static,
    {
        let ticket = self.shared.queue.reserve()?;
        self.shared.counters.job_started();

        let job = Job::new(ticket, Box::new(compute), Box::new(complete));
        let outcome = match InlineGuard::enter(self.shared.pool_id) {
            Some(_guard) => job.run(&self.shared.sequencer),
            None => {
                // The enclosing job holds an earlier, unserved ticket on this
                // same thread, so waiting for our turn would never return.
                debug!(%ticket, "Nested inline job runs immediately");
                self.shared.sequencer.skip(ticket);
                job.run_unsequenced()
            }
        };
        self.shared.record(ticket, outcome);
        Ok(ticket)
    }

    /// Begin shutdown and block until every worker has drained the queue and
    /// exited.
    ///
    /// Idempotent: later calls return once the first drain is finished.
    /// Jobs admitted before this call still run, in order. Calling it from
    /// inside a job's closure deadlocks, since the worker would wait for
    /// itself.
    pub fn shutdown(&self) {
        let first = self.shared.queue.terminate();
        if first {
            info!(
                pool_id = %self.shared.pool_id,
                queued_jobs = self.shared.queue.len(),
                "Shutting down OrderedPool, draining queued jobs"
            );
        }

        let mut workers = self.workers.lock();
        for (worker_id, handle) in workers.drain(..).enumerate() {
            if handle.join().is_err() {
                warn!(worker_id, "Worker thread panicked");
            }
        }

        if first {
            info!(pool_id = %self.shared.pool_id, "OrderedPool shut down complete");
        }
    }

    /// Shut down (see [`shutdown`](Self::shutdown)) and return failures not
    /// yet collected with [`take_failures`](Self::take_failures).
    #[must_use = "failures of jobs are only reported here"]
    pub fn close(self) -> Vec<JobFailure> {
        self.shutdown();
        self.take_failures()
    }

    /// Drain failures recorded since the last call.
    #[must_use]
    pub fn take_failures(&self) -> Vec<JobFailure> {
        self.failures.try_iter().collect()
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        PoolStats {
            worker_count: self.config.worker_count,
            max_pending: self.config.max_pending,
            submitted_jobs: self.shared.queue.issued(),
            queued_jobs: self.shared.queue.len(),
            active_jobs: counters.active.load(Ordering::Relaxed),
            completed_jobs: counters.completed.load(Ordering::Relaxed),
            failed_jobs: counters.failed.load(Ordering::Relaxed),
            next_ticket_to_serve: self.shared.sequencer.next_ticket().value(),
        }
    }

    /// Identifier attached to this pool's log events.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.pool_id
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Queue capacity; 0 means unbounded.
    #[must_use]
    pub fn max_pending(&self) -> usize {
        self.shared.queue.max_pending()
    }

    /// Whether shutdown has begun.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shared.queue.is_terminated()
    }
}

impl<R> Drop for OrderedPool<R>
where
    R: Send + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<R> std::fmt::Debug for OrderedPool<R>
where
    R: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedPool")
            .field("id", &self.shared.pool_id)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_stats_default() {
        let stats = PoolStats::default();
        assert_eq!(stats.worker_count, 0);
        assert_eq!(stats.submitted_jobs, 0);
        assert_eq!(stats.next_ticket_to_serve, 0);
    }

    #[test]
    fn test_counters_track_outcomes() {
        let counters = PoolCounters::default();
        for _ in 0..3 {
            counters.job_started();
        }
        counters.job_finished(true);
        counters.job_finished(false);

        assert_eq!(counters.active.load(Ordering::Relaxed), 1);
        assert_eq!(counters.completed.load(Ordering::Relaxed), 1);
        assert_eq!(counters.failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stats_after_close_reflect_all_jobs() {
        let pool = OrderedPool::new(3, 2).unwrap();
        for i in 0..20_u64 {
            pool.submit(move || i, |_| {}).unwrap();
        }
        pool.shutdown();

        let stats = pool.stats();
        assert_eq!(stats.worker_count, 3);
        assert_eq!(stats.max_pending, 2);
        assert_eq!(stats.submitted_jobs, 20);
        assert_eq!(stats.queued_jobs, 0);
        assert_eq!(stats.active_jobs, 0);
        assert_eq!(stats.completed_jobs, 20);
        assert_eq!(stats.next_ticket_to_serve, 20);
    }

    #[test]
    fn test_inline_guard_is_per_pool_and_released_on_drop() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let outer = InlineGuard::enter(first).unwrap();
        assert!(InlineGuard::enter(first).is_none());
        let other = InlineGuard::enter(second).unwrap();

        drop(outer);
        let again = InlineGuard::enter(first);
        assert!(again.is_some());
        drop(other);
        drop(again);
        assert!(INLINE_JOBS.with(|active| active.borrow().is_empty()));
    }

    #[test]
    fn test_submitted_counts_inline_jobs_before_they_finish() {
        let pool = Arc::new(OrderedPool::<u32>::new(0, 0).unwrap());
        let handle = Arc::downgrade(&pool);

        pool.submit(
            move || {
                let pool = handle.upgrade().unwrap();
                // Our own ticket is issued and counted before compute runs.
                assert_eq!(pool.stats().submitted_jobs, 1);
                pool.submit(|| 2, |_| {}).unwrap();
                assert_eq!(pool.stats().submitted_jobs, 2);
                1
            },
            |_| {},
        )
        .unwrap();

        let stats = pool.stats();
        assert_eq!(stats.submitted_jobs, 2);
        assert_eq!(stats.completed_jobs, 2);
        assert_eq!(stats.active_jobs, 0);
        assert_eq!(stats.next_ticket_to_serve, 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = OrderedPoolConfig::new().with_thread_name_prefix("");
        let err = OrderedPool::<()>::with_config(config).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfig(_)));
    }
}
