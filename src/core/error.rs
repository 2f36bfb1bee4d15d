//! Error types for pool operations and per-job failures.

use std::any::Any;
use std::fmt;
use std::io;

use thiserror::Error;

use crate::core::job::Ticket;
use crate::util::panic_message;

/// Errors produced by pool construction and submission.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has begun shutting down and no longer accepts jobs.
    #[error("pool has been shut down")]
    PoolShutdown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A worker thread could not be started.
    #[error("failed to spawn worker {worker_id}: {source}")]
    Spawn {
        /// Index of the worker that failed to start.
        worker_id: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// The phase of a job in which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    /// The parallel, heavy part of the job.
    Compute,
    /// The ordered completion callback.
    Complete,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => f.write_str("compute"),
            Self::Complete => f.write_str("complete"),
        }
    }
}

/// A job that panicked. Its ticket was still served, so later jobs were not held up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {ticket} failed during {stage}: {message}")]
pub struct JobFailure {
    /// Ticket of the failed job.
    pub ticket: Ticket,
    /// Phase that panicked.
    pub stage: JobStage,
    /// Panic message, if one could be recovered.
    pub message: String,
}

impl JobFailure {
    pub(crate) fn from_panic(ticket: Ticket, stage: JobStage, payload: &(dyn Any + Send)) -> Self {
        Self {
            ticket,
            stage,
            message: panic_message(payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_error_display() {
        assert_eq!(PoolError::PoolShutdown.to_string(), "pool has been shut down");

        let err = PoolError::InvalidConfig("thread_name_prefix must not be empty".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: thread_name_prefix must not be empty"
        );

        let err = PoolError::Spawn {
            worker_id: 3,
            source: io::Error::new(io::ErrorKind::OutOfMemory, "no threads left"),
        };
        assert_eq!(err.to_string(), "failed to spawn worker 3: no threads left");
    }

    #[test]
    fn test_job_failure_from_panic() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        let failure = JobFailure::from_panic(Ticket::new(7), JobStage::Complete, payload.as_ref());

        assert_eq!(failure.ticket, Ticket::new(7));
        assert_eq!(failure.stage, JobStage::Complete);
        assert_eq!(failure.to_string(), "job #7 failed during complete: boom");
    }
}
