//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check key normalization, the freshness policy and
//! store round trips over generated inputs.

use bytes::Bytes;
use proptest::prelude::*;
use std::time::Duration;

use crate::cache::{CacheStore, Freshness, FreshnessPolicy, ResourceKey};
use crate::error::ProxyError;

// == Strategies ==
/// Generates a single safe path segment
fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,16}(\\.[a-z]{2,4})?".prop_map(|s| s)
}

/// Generates a safe multi-segment path
fn path_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(segment_strategy(), 1..6)
}

/// Generates a noise separator that normalization must collapse
fn separator_strategy() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("/"), Just("//"), Just("/./"), Just("/.//")]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Redundant separators and `.` segments never change the key.
    #[test]
    fn prop_equivalent_paths_share_key(
        segments in path_strategy(),
        separators in prop::collection::vec(separator_strategy(), 6),
    ) {
        let plain = format!("/{}", segments.join("/"));
        let mut noisy = String::new();
        for (segment, sep) in segments.iter().zip(separators.iter()) {
            noisy.push_str(sep);
            noisy.push_str(segment);
        }

        let a = ResourceKey::from_request_path(&plain).unwrap();
        let b = ResourceKey::from_request_path(&noisy).unwrap();
        prop_assert_eq!(a.as_str(), plain.as_str());
        prop_assert_eq!(a, b);
    }

    // A `..` segment anywhere, encoded or not, is rejected.
    #[test]
    fn prop_parent_segment_always_rejected(
        prefix in path_strategy(),
        suffix in path_strategy(),
        dots in prop_oneof![Just(".."), Just("%2e%2e"), Just("%2E."), Just(".%2e")],
    ) {
        let path = format!("/{}/{}/{}", prefix.join("/"), dots, suffix.join("/"));
        let result = ResourceKey::from_request_path(&path);
        prop_assert!(matches!(result, Err(ProxyError::InvalidPath(_))));
    }

    // Accepted keys always resolve inside the cache root.
    #[test]
    fn prop_accepted_keys_stay_under_root(raw in "(/[a-zA-Z0-9._%-]{0,12}){1,6}") {
        if let Ok(key) = ResourceKey::from_request_path(&raw) {
            let root = std::path::Path::new("/cache-root");
            let joined = root.join(key.relative_path());
            prop_assert!(joined.starts_with(root));
            for component in key.relative_path().components() {
                prop_assert!(
                    matches!(component, std::path::Component::Normal(_)),
                    "unexpected component {:?} in {}",
                    component,
                    key
                );
            }
        }
    }

    // Classification is monotonic in age.
    #[test]
    fn prop_freshness_monotonic(
        expiry in 1u64..10_000,
        refresh_ratio in 0.0f64..=1.0,
        age_a in 0u64..20_000,
        age_b in 0u64..20_000,
    ) {
        let refresh = ((expiry as f64) * refresh_ratio) as u64;
        let policy = FreshnessPolicy::new(Duration::from_secs(expiry), Duration::from_secs(refresh));
        let rank = |f: Freshness| match f {
            Freshness::Miss => unreachable!(),
            Freshness::Fresh => 0,
            Freshness::RefreshDue => 1,
            Freshness::Stale => 2,
        };

        let (young, old) = if age_a <= age_b { (age_a, age_b) } else { (age_b, age_a) };
        let young = rank(policy.classify(Some(Duration::from_secs(young))));
        let old = rank(policy.classify(Some(Duration::from_secs(old))));
        prop_assert!(young <= old);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Content written and read back is byte-identical.
    #[test]
    fn prop_store_roundtrip(
        segments in path_strategy(),
        content in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let key = ResourceKey::from_request_path(&segments.join("/")).unwrap();

        let read_back = rt.block_on(async {
            store.write(&key, Bytes::from(content.clone())).await.unwrap();
            let entry = store.lookup(&key).await.unwrap();
            store.read(&entry).await.unwrap()
        });

        prop_assert_eq!(read_back.as_ref(), content.as_slice());
    }
}

// == Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Server-side failures never echo their cause back to the client.
    #[test]
    fn prop_error_response_hides_cause(cause in "[a-zA-Z0-9 _-]{1,100}") {
        use axum::body::to_bytes;
        use axum::http::StatusCode;
        use axum::response::IntoResponse;
        use crate::error::{FetchError, GENERIC_FAILURE_MESSAGE};

        let variants = vec![
            ProxyError::Storage(cause.clone()),
            ProxyError::Fetch(FetchError::Transport(cause.clone())),
            ProxyError::Internal(cause.clone()),
        ];

        let rt = tokio::runtime::Runtime::new().unwrap();
        for error in variants {
            let response = error.into_response();
            prop_assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = rt.block_on(async {
                to_bytes(response.into_body(), usize::MAX).await.unwrap()
            });
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");
            prop_assert_eq!(json["error"].as_str(), Some(GENERIC_FAILURE_MESSAGE));
        }
    }
}
