//! Configuration models for ordered pools.

pub mod pool;

pub use pool::{
    OrderedPoolConfig, PoolSetConfig, ENV_MAX_PENDING, ENV_STACK_SIZE, ENV_THREAD_PREFIX,
    ENV_WORKERS,
};
