//! Pool configuration structures.

use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environment variable for [`OrderedPoolConfig::worker_count`].
pub const ENV_WORKERS: &str = "ORDERED_POOL_WORKERS";
/// Environment variable for [`OrderedPoolConfig::max_pending`].
pub const ENV_MAX_PENDING: &str = "ORDERED_POOL_MAX_PENDING";
/// Environment variable for [`OrderedPoolConfig::thread_name_prefix`].
pub const ENV_THREAD_PREFIX: &str = "ORDERED_POOL_THREAD_PREFIX";
/// Environment variable for [`OrderedPoolConfig::thread_stack_size`].
pub const ENV_STACK_SIZE: &str = "ORDERED_POOL_STACK_SIZE";

/// Configuration for a single ordered pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderedPoolConfig {
    /// Number of worker threads. 0 runs every job on the submitting thread.
    pub worker_count: usize,
    /// Maximum jobs waiting in the queue before `submit` blocks.
    /// 0 means unbounded: a slow pool lets the queue grow without limit.
    pub max_pending: usize,
    /// Worker threads are named `<prefix>-<index>`.
    pub thread_name_prefix: String,
    /// Stack size for worker threads; the platform default if unset.
    pub thread_stack_size: Option<usize>,
}

impl Default for OrderedPoolConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            max_pending: 0,
            thread_name_prefix: "ordered-worker".to_string(),
            thread_stack_size: None,
        }
    }
}

impl OrderedPoolConfig {
    /// Default configuration: one worker per logical CPU, unbounded queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the queue capacity (0 = unbounded).
    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the worker thread stack size in bytes.
    #[must_use]
    pub fn with_thread_stack_size(mut self, stack_size: usize) -> Self {
        self.thread_stack_size = Some(stack_size);
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// A description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name_prefix.is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        if self.thread_stack_size == Some(0) {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their default values.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` if present, then build configuration from the
    /// `ORDERED_POOL_*` environment variables. Unset variables keep their
    /// default values.
    ///
    /// # Errors
    ///
    /// A variable that does not parse, or validation failure.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build configuration from a variable lookup (the core of
    /// [`from_env`](Self::from_env)).
    ///
    /// # Errors
    ///
    /// A variable that does not parse, or validation failure.
    pub fn from_vars<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(workers) = parse_var(&lookup, ENV_WORKERS)? {
            cfg.worker_count = workers;
        }
        if let Some(max_pending) = parse_var(&lookup, ENV_MAX_PENDING)? {
            cfg.max_pending = max_pending;
        }
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            cfg.thread_name_prefix = prefix;
        }
        if let Some(stack_size) = parse_var(&lookup, ENV_STACK_SIZE)? {
            cfg.thread_stack_size = Some(stack_size);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|e| format!("{key}={raw:?} is invalid: {e}"))
        })
        .transpose()
}

/// A set of named pools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSetConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, OrderedPoolConfig>,
}

impl PoolSetConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// A description naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse a pool set from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_is_unbounded() {
        let cfg = OrderedPoolConfig::default();
        assert_eq!(cfg.max_pending, 0);
        assert!(cfg.worker_count >= 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_stack_size_is_invalid() {
        let cfg = OrderedPoolConfig::new().with_thread_stack_size(0);
        assert_eq!(
            cfg.validate().unwrap_err(),
            "thread_stack_size must be greater than 0"
        );
    }

    #[test]
    fn test_from_vars_overrides_defaults() {
        let cfg = OrderedPoolConfig::from_vars(vars(&[
            (ENV_WORKERS, "6"),
            (ENV_MAX_PENDING, " 12 "),
            (ENV_THREAD_PREFIX, "encoder"),
        ]))
        .unwrap();

        assert_eq!(cfg.worker_count, 6);
        assert_eq!(cfg.max_pending, 12);
        assert_eq!(cfg.thread_name_prefix, "encoder");
        assert_eq!(cfg.thread_stack_size, None);
    }

    #[test]
    fn test_from_vars_rejects_garbage() {
        let err = OrderedPoolConfig::from_vars(vars(&[(ENV_WORKERS, "many")])).unwrap_err();
        assert!(err.starts_with("ORDERED_POOL_WORKERS=\"many\" is invalid"), "{err}");

        let err = OrderedPoolConfig::from_vars(vars(&[(ENV_THREAD_PREFIX, "")])).unwrap_err();
        assert_eq!(err, "thread_name_prefix must not be empty");
    }

    #[test]
    fn test_from_vars_empty_lookup_is_default() {
        let cfg = OrderedPoolConfig::from_vars(|_| None).unwrap();
        assert_eq!(cfg, OrderedPoolConfig::default());
    }
}
