//! Tests for configuration parsing and pool builders

use ordered_pool::builders::{build_pool, build_pools};
use ordered_pool::config::{OrderedPoolConfig, PoolSetConfig};
use ordered_pool::core::PoolError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[test]
fn test_pool_config_from_json() {
    let json = r#"{
        "worker_count": 4,
        "max_pending": 8,
        "thread_name_prefix": "encoder"
    }"#;

    let cfg = OrderedPoolConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.worker_count, 4);
    assert_eq!(cfg.max_pending, 8);
    assert_eq!(cfg.thread_name_prefix, "encoder");
    assert_eq!(cfg.thread_stack_size, None);
}

#[test]
fn test_pool_config_from_json_missing_fields_default() {
    let cfg = OrderedPoolConfig::from_json_str(r#"{ "max_pending": 3 }"#).unwrap();
    assert_eq!(cfg.max_pending, 3);
    assert_eq!(cfg.worker_count, OrderedPoolConfig::default().worker_count);
}

#[test]
fn test_pool_config_from_json_invalid() {
    let err = OrderedPoolConfig::from_json_str(r#"{ "thread_stack_size": 0 }"#).unwrap_err();
    assert_eq!(err, "thread_stack_size must be greater than 0");

    let err = OrderedPoolConfig::from_json_str("{ not json").unwrap_err();
    assert!(err.starts_with("parse error"), "{err}");
}

#[test]
fn test_pool_set_validation() {
    let empty = PoolSetConfig {
        pools: HashMap::new(),
    };
    assert!(empty.validate().is_err());

    let mut pools = HashMap::new();
    pools.insert(
        "bad".to_string(),
        OrderedPoolConfig::new().with_thread_name_prefix(""),
    );
    let err = PoolSetConfig { pools }.validate().unwrap_err();
    assert_eq!(err, "pool `bad` invalid: thread_name_prefix must not be empty");
}

#[test]
fn test_build_pool_from_config() {
    let cfg = OrderedPoolConfig::new()
        .with_worker_count(2)
        .with_max_pending(2)
        .with_thread_name_prefix("built");
    let pool = build_pool::<String>(&cfg).unwrap();

    let names = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..4 {
        let names = Arc::clone(&names);
        pool.submit(
            || std::thread::current().name().unwrap_or_default().to_string(),
            move |name| names.lock().unwrap().push(name),
        )
        .unwrap();
    }
    assert!(pool.close().is_empty());

    let names = names.lock().unwrap();
    assert_eq!(names.len(), 4);
    assert!(names.iter().all(|n| n.starts_with("built-")), "{names:?}");
}

#[test]
fn test_build_pools_from_json() {
    let json = r#"{
        "pools": {
            "decode": { "worker_count": 2, "max_pending": 4 },
            "inline": { "worker_count": 0 }
        }
    }"#;
    let cfg = PoolSetConfig::from_json_str(json).unwrap();
    let pools = build_pools::<u32>(&cfg).unwrap();

    assert_eq!(pools.len(), 2);
    assert_eq!(pools["decode"].worker_count(), 2);
    assert_eq!(pools["decode"].max_pending(), 4);
    assert_eq!(pools["inline"].worker_count(), 0);
}

#[test]
fn test_build_pools_rejects_empty_set() {
    let cfg = PoolSetConfig {
        pools: HashMap::new(),
    };
    let err = build_pools::<()>(&cfg).unwrap_err();
    assert!(matches!(err, PoolError::InvalidConfig(_)));
}
