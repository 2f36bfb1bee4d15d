//! Job queue and admission gate.
//!
//! FIFO of admitted jobs. Tickets are issued under the same lock that appends
//! to the queue, so queue order and ticket order always coincide.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};

use crate::core::error::PoolError;
use crate::core::job::{CompleteFn, ComputeFn, Job, Ticket};

struct QueueState<R> {
    jobs: VecDeque<Job<R>>,
    /// Next ticket to hand out.
    next_ticket: u64,
    terminated: bool,
}

impl<R> QueueState<R> {
    fn issue_ticket(&mut self) -> Ticket {
        let ticket = Ticket::new(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }
}

/// Bounded FIFO with backpressure on `push` and blocking `pop` for workers.
///
/// `max_pending == 0` leaves the queue unbounded.
pub(crate) struct JobQueue<R> {
    state: Mutex<QueueState<R>>,
    /// Signalled when a job is appended or termination begins.
    job_added: Condvar,
    /// Signalled when a job is dequeued or termination begins.
    job_removed: Condvar,
    max_pending: usize,
}

impl<R> JobQueue<R> {
    pub(crate) fn new(max_pending: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                next_ticket: 0,
                terminated: false,
            }),
            job_added: Condvar::new(),
            job_removed: Condvar::new(),
            max_pending,
        }
    }

    /// Admit a job, blocking while the queue is at capacity.
    ///
    /// # Errors
    ///
    /// `PoolError::PoolShutdown` if termination began before the job was
    /// admitted, including while this call was waiting for capacity.
    pub(crate) fn push(
        &self,
        compute: ComputeFn<R>,
        complete: CompleteFn<R>,
    ) -> Result<Ticket, PoolError> {
        let max_pending = self.max_pending;
        let mut state = self.state.lock();
        self.job_removed.wait_while(&mut state, |state| {
            !state.terminated && max_pending > 0 && state.jobs.len() >= max_pending
        });
        if state.terminated {
            return Err(PoolError::PoolShutdown);
        }

        let ticket = state.issue_ticket();
        state.jobs.push_back(Job::new(ticket, compute, complete));
        drop(state);

        self.job_added.notify_one();
        Ok(ticket)
    }

    /// Issue a ticket without queueing anything; used when jobs run on the
    /// submitting thread.
    pub(crate) fn reserve(&self) -> Result<Ticket, PoolError> {
        let mut state = self.state.lock();
        if state.terminated {
            return Err(PoolError::PoolShutdown);
        }
        Ok(state.issue_ticket())
    }

    /// Block until a job is available and dequeue it.
    ///
    /// After termination the remaining jobs are still handed out; `None` is
    /// returned only once the queue is terminated and empty.
    pub(crate) fn pop(&self) -> Option<Job<R>> {
        let mut state = self.state.lock();
        self.job_added
            .wait_while(&mut state, |state| state.jobs.is_empty() && !state.terminated);

        let job = state.jobs.pop_front()?;
        drop(state);

        self.job_removed.notify_one();
        Some(job)
    }

    /// Begin termination and wake every waiter. Returns `false` if
    /// termination had already begun.
    pub(crate) fn terminate(&self) -> bool {
        let mut state = self.state.lock();
        let first = !state.terminated;
        state.terminated = true;
        drop(state);

        self.job_added.notify_all();
        self.job_removed.notify_all();
        first
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.state.lock().terminated
    }

    /// Tickets issued so far, queued or run inline. Counted under the queue
    /// lock, so it never trails a job's completion.
    pub(crate) fn issued(&self) -> u64 {
        self.state.lock().next_ticket
    }

    /// Jobs admitted but not yet dequeued.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub(crate) const fn max_pending(&self) -> usize {
        self.max_pending
    }
}
