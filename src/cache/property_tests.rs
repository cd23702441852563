//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the manager, codec and pattern matcher against
//! generated inputs.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::cache::{codec, CacheManager, GlobPattern};
use crate::config::Config;
use crate::memo::escape_glob;
use crate::remote::MemoryStore;

// == Test Configuration ==
const TEST_TTL: u64 = 300;

fn test_config() -> Config {
    Config::default()
}

// == Strategies ==
/// Generates valid cache keys (non-empty, namespaced like real callers)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}:[a-zA-Z0-9_]{1,16}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,128}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // For any sequence of operations, hits, misses, sets and deletes match
    // what the caller observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let manager = CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new()));
        let (mut hits, mut misses, mut sets, mut deletes) = (0u64, 0u64, 0u64, 0u64);

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    if manager.set(&key, value, TEST_TTL).unwrap() {
                        sets += 1;
                    }
                }
                CacheOp::Get { key } => match manager.get::<String>(&key).unwrap() {
                    Some(_) => hits += 1,
                    None => misses += 1,
                },
                CacheOp::Delete { key } => {
                    if manager.delete(&key).unwrap() {
                        deletes += 1;
                    }
                }
            }
        }

        let stats = manager.stats();
        prop_assert_eq!(stats.hits, hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, misses, "Misses mismatch");
        prop_assert_eq!(stats.sets, sets, "Sets mismatch");
        prop_assert_eq!(stats.deletes, deletes, "Deletes mismatch");
        prop_assert_eq!(stats.hits, stats.local_hits + stats.remote_hits);
        prop_assert!(stats.hit_rate >= 0.0 && stats.hit_rate <= 1.0);
    }

    // A value written then read back is the value written, whichever layer
    // answers.
    #[test]
    fn prop_roundtrip_through_either_layer(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        drop_local in any::<bool>()
    ) {
        let manager = CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new()));
        manager.set(&key, value.clone(), TEST_TTL).unwrap();
        if drop_local {
            manager.local().delete(&key);
        }
        prop_assert_eq!(manager.get::<String>(&key).unwrap(), Some(value));
    }

    // After a delete, neither layer answers for the key.
    #[test]
    fn prop_delete_removes_entry(key in valid_key_strategy(), value in valid_value_strategy()) {
        let manager = CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new()));
        manager.set(&key, value, TEST_TTL).unwrap();
        prop_assert!(manager.delete(&key).unwrap());
        prop_assert_eq!(manager.get::<String>(&key).unwrap(), None);
    }

    // Storing V1 then V2 under one key returns V2.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let manager = CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new()));
        manager.set(&key, value1, TEST_TTL).unwrap();
        manager.set(&key, value2.clone(), TEST_TTL).unwrap();

        prop_assert_eq!(manager.get::<String>(&key).unwrap(), Some(value2.clone()));
        manager.local().delete(&key);
        prop_assert_eq!(manager.get::<String>(&key).unwrap(), Some(value2));
    }

    // Clearing `prefix:*` removes exactly the keys with that prefix, each
    // counted once although both layers hold it.
    #[test]
    fn prop_pattern_invalidation_is_exact(
        keys in prop::collection::hash_set(valid_key_strategy(), 1..30),
        prefix in "[a-z]{1,8}"
    ) {
        let manager = CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new()));
        for key in &keys {
            manager.set(key, 1u8, TEST_TTL).unwrap();
        }

        let target = format!("{}:", prefix);
        let expected = keys.iter().filter(|k| k.starts_with(&target)).count();
        let removed = manager.clear_pattern(&format!("{}*", escape_glob(&target))).unwrap();
        prop_assert_eq!(removed, expected);

        for key in &keys {
            let present = manager.local().contains(key);
            prop_assert_eq!(present, !key.starts_with(&target), "key {}", key);
        }
    }

    // An escaped key used as a pattern matches that key and nothing else.
    #[test]
    fn prop_escaped_literal_matches_only_itself(
        key in "[a-z*?\\[\\]\\\\:]{1,20}",
        other in "[a-z*?\\[\\]\\\\:]{1,20}"
    ) {
        let pattern = GlobPattern::parse(&escape_glob(&key)).unwrap();
        prop_assert!(pattern.matches(&key));
        prop_assert_eq!(pattern.matches(&other), other == key);
    }

    // `*` after a prefix matches exactly the strings with that prefix.
    #[test]
    fn prop_star_suffix_is_prefix_match(prefix in "[a-z:]{0,10}", text in "[a-z:]{0,20}") {
        let pattern = GlobPattern::parse(&format!("{}*", prefix)).unwrap();
        prop_assert_eq!(pattern.matches(&text), text.starts_with(&prefix));
    }

    // Structured values survive the codec unchanged.
    #[test]
    fn prop_codec_roundtrip_structured(
        value in prop::collection::btree_map(
            "[a-z]{1,6}",
            prop::collection::vec((any::<i64>(), any::<u32>(), "[ -~]{0,12}"), 0..5),
            0..6
        )
    ) {
        let bytes = codec::encode(&value).unwrap();
        prop_assert_eq!(codec::format_of(&bytes), Some(codec::Format::Json));
        let back: BTreeMap<String, Vec<(i64, u32, String)>> = codec::decode(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }

    // Floats come back bit-identical, whichever format carried them.
    #[test]
    fn prop_codec_roundtrip_floats(values in prop::collection::vec(any::<f64>(), 0..10)) {
        let bytes = codec::encode(&values).unwrap();
        let back: Vec<f64> = codec::decode(&bytes).unwrap();
        prop_assert_eq!(back.len(), values.len());
        for (a, b) in values.iter().zip(back.iter()) {
            prop_assert_eq!(a.to_bits(), b.to_bits());
        }
        if values.iter().all(|v| v.is_finite()) {
            prop_assert_eq!(codec::format_of(&bytes), Some(codec::Format::Json));
        }
    }

    // Maps JSON cannot key still round-trip through the fallback format.
    #[test]
    fn prop_codec_roundtrip_non_string_keys(
        value in prop::collection::hash_map(any::<(u16, bool)>(), any::<i32>(), 1..10)
    ) {
        let bytes = codec::encode(&value).unwrap();
        prop_assert_eq!(codec::format_of(&bytes), Some(codec::Format::MessagePack));
        let back: HashMap<(u16, bool), i32> = codec::decode(&bytes).unwrap();
        prop_assert_eq!(back, value);
    }
}

// == Property Test for Error Response Format ==
// This tests the CacheError -> HTTP response conversion

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error variant renders as JSON with a descriptive "error" field.
    #[test]
    fn prop_error_response_format(
        error_msg in "[a-zA-Z0-9 _-]{1,100}"
    ) {
        use crate::error::CacheError;
        use axum::response::IntoResponse;
        use axum::body::to_bytes;

        let error_variants = vec![
            CacheError::InvalidKey(error_msg.clone()),
            CacheError::InvalidPattern { pattern: error_msg.clone(), reason: "bad".to_string() },
            CacheError::NotFound(error_msg.clone()),
            CacheError::InvalidRequest(error_msg.clone()),
            CacheError::Internal(error_msg.clone()),
        ];

        let rt = tokio::runtime::Runtime::new().unwrap();
        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = rt.block_on(async {
                to_bytes(response.into_body(), usize::MAX).await.unwrap()
            });
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}

// == Property Test for Concurrent Operation Correctness ==

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Concurrent readers only ever see complete values that some writer stored.
    #[test]
    fn prop_concurrent_operation_correctness(
        operations in prop::collection::vec(cache_op_strategy(), 10..60)
    ) {
        let manager = Arc::new(CacheManager::with_remote(&test_config(), Arc::new(MemoryStore::new())));
        let written: Arc<Vec<String>> = Arc::new(
            operations
                .iter()
                .filter_map(|op| match op {
                    CacheOp::Set { value, .. } => Some(value.clone()),
                    _ => None,
                })
                .collect(),
        );

        let handles: Vec<_> = operations
            .chunks(5)
            .map(|chunk| {
                let manager = Arc::clone(&manager);
                let written = Arc::clone(&written);
                let chunk = chunk.to_vec();
                std::thread::spawn(move || -> Result<(), String> {
                    for op in chunk {
                        match op {
                            CacheOp::Set { key, value } => {
                                manager.set(&key, value, TEST_TTL).map_err(|e| e.to_string())?;
                            }
                            CacheOp::Get { key } => {
                                if let Some(value) = manager.get::<String>(&key).map_err(|e| e.to_string())? {
                                    if !written.contains(&value) {
                                        return Err(format!("Read unknown value '{}' for '{}'", value, key));
                                    }
                                }
                            }
                            CacheOp::Delete { key } => {
                                manager.delete(&key).map_err(|e| e.to_string())?;
                            }
                        }
                    }
                    Ok(())
                })
            })
            .collect();

        for handle in handles {
            let result = handle.join().expect("Thread should not panic");
            prop_assert!(result.is_ok(), "Concurrent operation failed: {:?}", result);
        }

        let stats = manager.stats();
        prop_assert!(stats.hit_rate >= 0.0 && stats.hit_rate <= 1.0);
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_ttl_expiration_behavior() {
        let manager = CacheManager::local_only(&test_config());
        manager.set("session:1", "value".to_string(), 1).unwrap();
        assert_eq!(manager.get::<String>("session:1").unwrap().as_deref(), Some("value"));

        sleep(Duration::from_millis(1100));

        assert_eq!(manager.get::<String>("session:1").unwrap(), None);
    }

    #[test]
    fn test_watermark_bounds_expired_entries() {
        let config = Config {
            local_entry_watermark: 10,
            ..Config::default()
        };
        let manager = CacheManager::local_only(&config);
        for i in 0..10 {
            manager.local().set(&format!("stale:{}", i), i, 0);
        }
        manager.set("fresh:1", 1, 60).unwrap();

        // Crossing the watermark swept the ten expired entries
        assert_eq!(manager.stats().local_entry_count, 1);
    }
}
