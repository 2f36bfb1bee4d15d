//! Worker threads.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::config::OrderedPoolConfig;

use super::PoolShared;

/// Spawn a persistent worker thread named `<prefix>-<worker_id>`.
pub(crate) fn spawn_worker<R>(
    worker_id: usize,
    shared: Arc<PoolShared<R>>,
    config: &OrderedPoolConfig,
) -> io::Result<JoinHandle<()>>
where
    R: Send + 'static,
{
    let mut builder =
        thread::Builder::new().name(format!("{}-{worker_id}", config.thread_name_prefix));
    if let Some(stack_size) = config.thread_stack_size {
        builder = builder.stack_size(stack_size);
    }
    builder.spawn(move || run_worker(worker_id, &shared))
}

/// Acquire, compute, sequence-and-complete, until the queue is terminated
/// and empty.
fn run_worker<R>(worker_id: usize, shared: &PoolShared<R>) {
    debug!(pool_id = %shared.pool_id, worker_id, "Worker thread started");

    // `pop` keeps returning jobs after termination until the queue is drained.
    while let Some(job) = shared.queue.pop() {
        let ticket = job.ticket();
        debug!(worker_id, %ticket, "Worker picked up job");

        shared.counters.job_started();
        let outcome = job.run(&shared.sequencer);
        shared.record(ticket, outcome);
    }

    debug!(pool_id = %shared.pool_id, worker_id, "Worker thread exiting");
}
