//! # Ordered Pool
//!
//! A bounded worker pool that runs the costly part of each job on any free
//! worker thread while running a cheap completion step strictly in the order
//! the jobs were submitted.
//!
//! ## Core Problem Solved
//!
//! Many pipelines have the shape
//!
//! ```text
//! while (...) { emit(heavy(input)) }
//! ```
//!
//! where `heavy` is expensive and independent per input, but `emit` (writing
//! to an output stream, appending to a log, sending a reply) must observe the
//! original order. A plain thread pool parallelizes `heavy` but scrambles
//! `emit`; running everything serially preserves order but wastes cores.
//!
//! ## Key Features
//!
//! - **Ordered completions**: every job gets a ticket at submission; a ticket
//!   sequencer releases completions one at a time, in ticket order
//! - **Backpressure**: `submit` blocks while `max_pending` jobs are queued, so
//!   a fast producer cannot outrun the pool by more than workers + capacity
//! - **Persistent workers**: threads are spawned once at construction
//! - **Drain on shutdown**: dropping the pool finishes every admitted job
//! - **Unthreaded mode**: zero workers runs each job on the caller's thread
//!   with identical ordering, handy for debugging
//! - **Panic isolation**: a panicking job is reported, its ticket is still
//!   served, later jobs are unaffected
//!
//! ## Example
//!
//! ```rust
//! use ordered_pool::core::OrderedPool;
//! use std::sync::{Arc, Mutex};
//!
//! let lines = Arc::new(Mutex::new(Vec::new()));
//! let pool = OrderedPool::new(8, 16)?;
//! for input in ["alpha", "beta", "gamma"] {
//!     let lines = Arc::clone(&lines);
//!     pool.submit(
//!         move || input.to_uppercase(),
//!         move |out| lines.lock().unwrap().push(out),
//!     )?;
//! }
//! drop(pool);
//! assert_eq!(*lines.lock().unwrap(), ["ALPHA", "BETA", "GAMMA"]);
//! # Ok::<(), ordered_pool::core::PoolError>(())
//! ```
//!
//! For fire-and-forget jobs with no ordered payload, use
//! [`core::ThreadPool`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct pools from configuration.
pub mod builders;
/// Configuration models for pools.
pub mod config;
/// Jobs, tickets, the ordered pool, and its fire-and-forget wrapper.
pub mod core;
/// Shared utilities.
pub mod util;
