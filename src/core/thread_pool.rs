//! Fire-and-forget pool with no ordered payload.
//!
//! Wraps an [`OrderedPool<()>`] whose completion step is a no-op, so jobs run
//! in parallel with no ordering guarantee on their side effects.

use crate::config::OrderedPoolConfig;
use crate::core::error::{JobFailure, PoolError};
use crate::core::job::Ticket;
use crate::core::ordered_pool::{OrderedPool, PoolStats};

/// Queue capacity used by [`ThreadPool::with_workers`].
pub const DEFAULT_MAX_PENDING: usize = 1;

/// A plain worker pool for jobs that only have side effects.
///
/// ```
/// use ordered_pool::core::ThreadPool;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let hits = Arc::new(AtomicUsize::new(0));
/// let pool = ThreadPool::with_workers(4)?;
/// for _ in 0..10 {
///     let hits = Arc::clone(&hits);
///     pool.submit(move || {
///         hits.fetch_add(1, Ordering::Relaxed);
///     })?;
/// }
/// pool.shutdown();
/// assert_eq!(hits.load(Ordering::Relaxed), 10);
/// # Ok::<(), ordered_pool::core::PoolError>(())
/// ```
#[derive(Debug)]
pub struct ThreadPool {
    inner: OrderedPool<()>,
}

impl ThreadPool {
    /// Create a pool with `num_workers` threads and at most `max_pending`
    /// queued jobs (0 = unbounded).
    ///
    /// # Errors
    ///
    /// `PoolError::Spawn` if a worker thread cannot be started.
    pub fn new(num_workers: usize, max_pending: usize) -> Result<Self, PoolError> {
        OrderedPool::new(num_workers, max_pending).map(|inner| Self { inner })
    }

    /// Create a pool with `num_workers` threads and [`DEFAULT_MAX_PENDING`].
    ///
    /// # Errors
    ///
    /// `PoolError::Spawn` if a worker thread cannot be started.
    pub fn with_workers(num_workers: usize) -> Result<Self, PoolError> {
        Self::new(num_workers, DEFAULT_MAX_PENDING)
    }

    /// Create a pool from a full configuration.
    ///
    /// # Errors
    ///
    /// See [`OrderedPool::with_config`].
    pub fn with_config(config: OrderedPoolConfig) -> Result<Self, PoolError> {
        OrderedPool::with_config(config).map(|inner| Self { inner })
    }

    /// Run `job` on a worker. Blocks while the queue is full.
    ///
    /// # Errors
    ///
    /// `PoolError::PoolShutdown` if shutdown has begun.
    pub fn submit<F>(&self, job: F) -> Result<Ticket, PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.submit(job, |()| {})
    }

    /// See [`OrderedPool::shutdown`].
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// See [`OrderedPool::close`].
    #[must_use = "failures of jobs are only reported here"]
    pub fn close(self) -> Vec<JobFailure> {
        self.inner.close()
    }

    /// See [`OrderedPool::take_failures`].
    #[must_use]
    pub fn take_failures(&self) -> Vec<JobFailure> {
        self.inner.take_failures()
    }

    /// See [`OrderedPool::stats`].
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.inner.stats()
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn worker_count(&self) -> usize {
        self.inner.worker_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::JobStage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_with_workers_uses_default_capacity() {
        let pool = ThreadPool::with_workers(2).unwrap();
        assert_eq!(pool.worker_count(), 2);
        assert_eq!(pool.stats().max_pending, DEFAULT_MAX_PENDING);
    }

    #[test]
    fn test_unthreaded_runs_inline() {
        let pool = ThreadPool::new(0, 0).unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let hits = Arc::clone(&hits);
            pool.submit(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            // Already done by the time submit returns.
        }
        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_panicking_job_is_reported() {
        let pool = ThreadPool::new(2, 2).unwrap();
        let ticket = pool.submit(|| panic!("disk full")).unwrap();
        pool.submit(|| {}).unwrap();

        let failures = pool.close();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].ticket, ticket);
        assert_eq!(failures[0].stage, JobStage::Compute);
        assert_eq!(failures[0].message, "disk full");
    }
}
