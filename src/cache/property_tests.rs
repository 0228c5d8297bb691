//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check store, key and classifier invariants over
//! generated inputs.

use proptest::prelude::*;
use std::collections::HashMap;

use axum::http::Method;
use url::Url;

use crate::cache::{CacheKey, CacheStorage, CachedEntry, StoredResponse};
use crate::config::Config;
use crate::routing::{RouteClass, RouteClassifier};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const ORIGIN: &str = "https://app.example";

// == Strategies ==
/// Generates same-origin request paths
fn path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("/".to_string()),
        "[a-z]{1,12}".prop_map(|s| format!("/static/{}.css", s)),
        "[a-z]{1,12}".prop_map(|s| format!("/{}", s)),
        ("[a-z]{1,8}", "[a-z0-9]{1,8}").prop_map(|(p, q)| format!("/{}?id={}", p, q)),
    ]
}

fn host_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("app.example".to_string()),
        Just("api.sleeper.app".to_string()),
        Just("keeptradecut.com".to_string()),
        Just("cdn.example".to_string()),
        "[a-z]{1,10}\\.example".prop_map(|s| s),
    ]
}

fn method_strategy() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::POST),
        Just(Method::PUT),
        Just(Method::DELETE),
        Just(Method::HEAD),
    ]
}

fn body_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..128)
}

fn url(host: &str, path: &str) -> Url {
    Url::parse(&format!("https://{}{}", host, path)).unwrap()
}

fn classifier() -> RouteClassifier {
    RouteClassifier::from_config(&Config {
        origin: ORIGIN.to_string(),
        ..Config::default()
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Classification is a pure function of method and URL
    #[test]
    fn prop_classification_is_deterministic(
        method in method_strategy(),
        host in host_strategy(),
        path in path_strategy(),
    ) {
        let target = url(&host, &path);
        let first = classifier().classify(&method, &target);
        let second = classifier().classify(&method, &target);
        prop_assert_eq!(first, second);
    }

    // Non-GET requests are always excluded and never produce a store key
    #[test]
    fn prop_non_get_never_cached(
        method in method_strategy(),
        host in host_strategy(),
        path in path_strategy(),
    ) {
        prop_assume!(method != Method::GET);
        let target = url(&host, &path);
        prop_assert_eq!(classifier().classify(&method, &target), RouteClass::Excluded);
        prop_assert!(CacheKey::for_request(&method, &target).is_none());
    }

    // Deny-listed hosts are excluded whatever the path
    #[test]
    fn prop_deny_listed_hosts_excluded(path in path_strategy()) {
        for host in ["api.sleeper.app", "keeptradecut.com", "www.borischen.co"] {
            prop_assert_eq!(
                classifier().classify(&Method::GET, &url(host, &path)),
                RouteClass::Excluded
            );
        }
    }

    // Storing two bodies under one key leaves exactly the second
    #[test]
    fn prop_overwrite_semantics(
        path in path_strategy(),
        body1 in body_strategy(),
        body2 in body_strategy(),
    ) {
        tokio_test::block_on(async {
            let storage = CacheStorage::new(TEST_MAX_ENTRIES);
            let key = CacheKey::get(&url("app.example", &path));

            storage
                .put("s", CachedEntry::new(key.clone(), StoredResponse::new(200).with_body(body1)))
                .await
                .unwrap();
            storage
                .put("s", CachedEntry::new(key.clone(), StoredResponse::new(200).with_body(body2.clone())))
                .await
                .unwrap();

            let found = storage.lookup("s", &key).await.unwrap();
            assert_eq!(&found.response.body[..], &body2[..]);
            assert_eq!(storage.entry_count("s").await, 1);
        });
    }

    // A store never holds more entries than its limit, and every surviving
    // entry holds the last body written for its key
    #[test]
    fn prop_capacity_and_last_write_wins(
        writes in prop::collection::vec((path_strategy(), body_strategy()), 1..60),
        max_entries in 1usize..20,
    ) {
        tokio_test::block_on(async {
            let storage = CacheStorage::new(max_entries);
            let mut accepted: HashMap<CacheKey, Vec<u8>> = HashMap::new();

            for (path, body) in writes {
                let key = CacheKey::get(&url("app.example", &path));
                let entry = CachedEntry::new(key.clone(), StoredResponse::new(200).with_body(body.clone()));
                if storage.put("s", entry).await.is_ok() {
                    accepted.insert(key, body);
                }
            }

            assert!(storage.entry_count("s").await <= max_entries);
            assert_eq!(storage.entry_count("s").await, accepted.len());
            for (key, body) in &accepted {
                let found = storage.lookup("s", key).await.unwrap();
                assert_eq!(&found.response.body[..], &body[..]);
            }
        });
    }
}
