//! Job entity and ticket numbering.
//!
//! A job is one `compute` + `complete` pair submitted to a pool. Every job
//! receives a [`Ticket`] at admission time; tickets are handed out from a
//! counter starting at zero, so ticket order is submission order.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::core::error::{JobFailure, JobStage};
use crate::core::ordered_pool::TicketSequencer;

/// Position of a job in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    /// Wrap a raw ticket number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw ticket number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The heavy, parallelizable step of a job.
pub(crate) type ComputeFn<R> = Box<dyn FnOnce() -> R + Send>;

/// The cheap, order-sensitive step of a job.
pub(crate) type CompleteFn<R> = Box<dyn FnOnce(R) + Send>;

/// One admitted unit of work. Consumed exactly once by [`Job::run`].
pub(crate) struct Job<R> {
    ticket: Ticket,
    compute: ComputeFn<R>,
    complete: CompleteFn<R>,
}

impl<R> Job<R> {
    pub(crate) fn new(ticket: Ticket, compute: ComputeFn<R>, complete: CompleteFn<R>) -> Self {
        Self {
            ticket,
            compute,
            complete,
        }
    }

    pub(crate) const fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Run `compute` on the calling thread, then wait for this job's turn in
    /// `sequencer` and hand the result to `complete`.
    ///
    /// The ticket is served even when either step panics: a compute panic
    /// skips `complete`, a completion panic is caught inside the sequencer.
    pub(crate) fn run(self, sequencer: &TicketSequencer) -> Result<(), JobFailure> {
        let Self {
            ticket,
            compute,
            complete,
        } = self;

        // Parallel phase: no pool lock is held here.
        let computed = panic::catch_unwind(AssertUnwindSafe(compute));

        let served = sequencer.serve(ticket, move || match computed {
            Ok(value) => {
                complete(value);
                Ok(())
            }
            Err(payload) => Err(JobFailure::from_panic(
                ticket,
                JobStage::Compute,
                payload.as_ref(),
            )),
        });

        match served {
            Ok(outcome) => outcome,
            Err(payload) => Err(JobFailure::from_panic(
                ticket,
                JobStage::Complete,
                payload.as_ref(),
            )),
        }
    }

    /// Run `complete(compute())` immediately on the calling thread, without
    /// waiting for this job's turn. Panics are caught as in [`Job::run`].
    pub(crate) fn run_unsequenced(self) -> Result<(), JobFailure> {
        let Self {
            ticket,
            compute,
            complete,
        } = self;

        let value = panic::catch_unwind(AssertUnwindSafe(compute)).map_err(|payload| {
            JobFailure::from_panic(ticket, JobStage::Compute, payload.as_ref())
        })?;
        panic::catch_unwind(AssertUnwindSafe(move || complete(value))).map_err(|payload| {
            JobFailure::from_panic(ticket, JobStage::Complete, payload.as_ref())
        })
    }
}

impl<R> fmt::Debug for Job<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").field("ticket", &self.ticket).finish_non_exhaustive()
    }
}
