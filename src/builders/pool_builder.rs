//! Builders to construct ordered pools from configuration.

use std::collections::HashMap;

use tracing::debug;

use crate::config::{OrderedPoolConfig, PoolSetConfig};
use crate::core::{OrderedPool, PoolError};

/// Build a single pool from configuration.
///
/// # Errors
///
/// See [`OrderedPool::with_config`].
pub fn build_pool<R>(cfg: &OrderedPoolConfig) -> Result<OrderedPool<R>, PoolError>
where
    R: Send + 'static,
{
    OrderedPool::with_config(cfg.clone())
}

/// Build one pool per entry of a pool set.
///
/// Each pool gets its entry name as thread name prefix unless the entry
/// sets a prefix other than the default. Pools built before a failure are
/// shut down when the partial map is dropped.
///
/// # Errors
///
/// - `PoolError::InvalidConfig` if the set fails validation
/// - `PoolError::Spawn` if any worker thread cannot be started
pub fn build_pools<R>(cfg: &PoolSetConfig) -> Result<HashMap<String, OrderedPool<R>>, PoolError>
where
    R: Send + 'static,
{
    cfg.validate()
        .map_err(|e| PoolError::InvalidConfig(format!("config invalid: {e}")))?;

    let default_prefix = OrderedPoolConfig::default().thread_name_prefix;
    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let mut pool_cfg = pool_cfg.clone();
        if pool_cfg.thread_name_prefix == default_prefix {
            pool_cfg.thread_name_prefix.clone_from(name);
        }
        debug!(pool = %name, workers = pool_cfg.worker_count, "Building pool");
        pools.insert(name.clone(), OrderedPool::with_config(pool_cfg)?);
    }

    Ok(pools)
}
