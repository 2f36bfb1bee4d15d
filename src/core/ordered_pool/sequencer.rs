//! Ticket sequencer: releases completion callbacks strictly in ticket order.

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use parking_lot::{Condvar, Mutex};

use crate::core::job::Ticket;

/// Counter of the next ticket allowed to complete, plus a condvar broadcast
/// on every advance.
///
/// The `next` mutex guards both the counter and the execution of the
/// completion itself, so no two completions ever overlap. It is independent
/// of the job queue lock; computing and admitting continue while a
/// completion runs.
#[derive(Debug)]
pub(crate) struct TicketSequencer {
    next: Mutex<u64>,
    /// Tickets already served out of band, skipped when the counter reaches
    /// them. Always ahead of some unserved ticket. Lock order: `next`, then
    /// `skipped`.
    skipped: Mutex<BTreeSet<u64>>,
    turn: Condvar,
}

impl TicketSequencer {
    pub(crate) fn new() -> Self {
        Self {
            next: Mutex::new(0),
            skipped: Mutex::new(BTreeSet::new()),
            turn: Condvar::new(),
        }
    }

    /// Block until `ticket` is next, run `f` exclusively, then advance.
    ///
    /// The counter advances even if `f` panics; the panic payload is returned
    /// instead of unwinding through the caller.
    pub(crate) fn serve<T>(&self, ticket: Ticket, f: impl FnOnce() -> T) -> thread::Result<T> {
        let mut next = self.next.lock();
        self.turn.wait_while(&mut next, |next| *next != ticket.value());

        let outcome = panic::catch_unwind(AssertUnwindSafe(f));

        *next += 1;
        let mut skipped = self.skipped.lock();
        while skipped.remove(&*next) {
            *next += 1;
        }
        drop(skipped);

        self.turn.notify_all();
        outcome
    }

    /// Mark `ticket` as served without waiting for its turn.
    ///
    /// Only valid while an earlier ticket is still unserved, so the counter
    /// steps over `ticket` when that earlier ticket is served. Does not touch
    /// the `next` lock, so it may be called from inside a completion.
    pub(crate) fn skip(&self, ticket: Ticket) {
        self.skipped.lock().insert(ticket.value());
    }

    /// The ticket whose completion runs next.
    pub(crate) fn next_ticket(&self) -> Ticket {
        Ticket::new(*self.next.lock())
    }
}
