//! Core pool types: jobs, tickets, the ordered pool and its fire-and-forget wrapper.

pub mod error;
pub mod job;
pub mod ordered_pool;
pub mod thread_pool;

pub use error::{JobFailure, JobStage, PoolError};
pub use job::Ticket;
pub use ordered_pool::{OrderedPool, PoolStats};
pub use thread_pool::{ThreadPool, DEFAULT_MAX_PENDING};
