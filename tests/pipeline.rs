//! Integration tests for task routing and the NSE download handlers.
//!
//! Every test builds a [`Pipeline`] over in-memory doubles: no network,
//! cache or bus is touched.
//!
//! # What is tested
//!
//! - Routing rejects empty and unknown kinds before any I/O
//! - All-indices and equity downloads: result strings, rotation, notification
//! - Option-chain walk over several expiries, with per-expiry failures
//! - Chain bodies that are valid JSON but irregular are still cached
//! - Expiry reference cache: same-day reuse, stale refresh, failed refresh

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Utc};
use serde_json::Value;

use nse_feed::expiry::ExpiryCache;
use nse_feed::store::{KeyValueStore, MemoryStore, SnapshotStore};
use nse_feed::{FeedError, Pipeline, PipelineBuilder, Task};

use common::{RecordingNotifier, StubFetch};

const CONTRACT_INFO: &str = r#"{"expiryDates":["27-Jan-2026","03-Feb-2026","10-Feb-2026"]}"#;
const EMPTY_CHAIN: &str = r#"{"records":{"underlyingValue":25010.5,"data":[]}}"#;

struct Harness {
    fetch: Arc<StubFetch>,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
    pipeline: Pipeline,
}

fn harness(fetch: StubFetch) -> Harness {
    let fetch = Arc::new(fetch);
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = PipelineBuilder::new(fetch.clone())
        .store(store.clone())
        .notifier(notifier.clone())
        .build();
    Harness {
        fetch,
        store,
        notifier,
        pipeline,
    }
}

fn task(json: &str) -> Task {
    serde_json::from_str(json).unwrap()
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unknown_kind_fails_without_io() {
    let h = harness(StubFetch::new().route("allIndices", 200, "a,b\n1,2"));

    let err = h.pipeline.handle(&Task::new("bhavcopy")).await.unwrap_err();
    assert!(matches!(err, FeedError::UnknownTaskKind(ref k) if k == "bhavcopy"));

    assert!(h.fetch.urls().is_empty());
    assert!(h.store.is_empty().await);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_empty_or_missing_kind_is_invalid() {
    let h = harness(StubFetch::new());

    for t in [Task::new("   "), Task::default()] {
        let err = h.pipeline.handle(&t).await.unwrap_err();
        assert!(matches!(err, FeedError::InvalidTask(_)), "got {err:?}");
    }
    assert!(h.fetch.urls().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_kind_is_normalized_before_routing() {
    let h = harness(StubFetch::new().route("allIndices", 200, "x"));

    let result = h.pipeline.handle(&Task::new("  AllIndices ")).await.unwrap();
    assert!(result.starts_with("OK: allIndices downloaded"), "{result}");
}

// =============================================================================
// All indices / equity
// =============================================================================

#[tokio::test]
async fn test_all_indices_rotates_and_notifies() {
    let h = harness(StubFetch::new().route("allIndices", 200, "a,b\n1,2"));

    let result = h
        .pipeline
        .handle(&task(r#"{"kind":"allindices","timeoutMs":5000}"#))
        .await
        .unwrap();
    assert_eq!(
        result,
        "OK: allIndices downloaded, length=7, \
         redisKeys=nse:allindices:current:data,nse:allindices:current:timestamp"
    );

    assert_eq!(h.fetch.timeouts(), vec![Duration::from_millis(5000)]);
    assert_eq!(
        h.store.get("nse:allindices:current:data").await.unwrap().as_deref(),
        Some("a,b\n1,2")
    );
    assert!(h.store.exists("nse:allindices:current:timestamp").await.unwrap());
    assert!(!h.store.exists("nse:allindices:previous:data").await.unwrap());

    let messages = h.notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].topic, "nse.data");
    assert_eq!(messages[0].key, "nse:allindices:current");
    let payload: Value = serde_json::from_str(&messages[0].payload).unwrap();
    assert_eq!(payload["taskName"], "allIndices");
    assert_eq!(
        payload["timestamp"],
        h.store
            .get("nse:allindices:current:timestamp")
            .await
            .unwrap()
            .unwrap()
    );
}

#[tokio::test]
async fn test_second_download_moves_current_to_previous() {
    let h = harness(StubFetch::new().route("allIndices", 200, "first"));
    h.pipeline.handle(&Task::new("allindices")).await.unwrap();

    h.fetch.set_route("allIndices", 200, "second");
    h.pipeline.handle(&Task::new("allindices")).await.unwrap();

    let snapshots = SnapshotStore::new(h.store.clone());
    let current = snapshots.current("nse:allindices").await.unwrap().unwrap();
    let previous = snapshots.previous("nse:allindices").await.unwrap().unwrap();
    assert_eq!(current.data, "second");
    assert_eq!(previous.data, "first");
    assert_eq!(h.notifier.messages().len(), 2);
}

#[tokio::test]
async fn test_http_error_is_reported_in_result_and_nothing_is_stored() {
    let h = harness(StubFetch::new().route("allIndices", 503, "busy"));

    let result = h.pipeline.handle(&Task::new("allindices")).await.unwrap();
    assert_eq!(result, "Error: allIndices HTTP 503");
    assert!(h.store.is_empty().await);
    assert!(h.notifier.messages().is_empty());
}

#[tokio::test]
async fn test_equity_uses_long_default_timeout() {
    let h = harness(StubFetch::new().route("live-analysis-variations", 200, "SYMBOL,LTP\nRELIANCE,1"));

    let result = h.pipeline.handle(&Task::new("equity")).await.unwrap();
    assert!(result.starts_with("OK: equityData downloaded, length=21"), "{result}");
    assert!(result.ends_with("redisKeys=nse:equitydata:current:data,nse:equitydata:current:timestamp"));
    assert_eq!(h.fetch.timeouts(), vec![Duration::from_millis(600_000)]);

    let payload: Value = serde_json::from_str(&h.notifier.messages()[0].payload).unwrap();
    assert_eq!(payload["taskName"], "equityData");
}

#[tokio::test]
async fn test_without_cache_sink_download_still_succeeds() {
    let fetch = Arc::new(StubFetch::new().route("allIndices", 200, "a,b"));
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = PipelineBuilder::new(fetch)
        .notifier(notifier.clone())
        .build();

    let result = pipeline.handle(&Task::new("allindices")).await.unwrap();
    assert_eq!(result, "OK: allIndices downloaded, length=3, redisKeys=none");

    // Consumers are still told a fresh snapshot was fetched.
    let messages = notifier.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].key, "nse:allindices:current");
    let payload: Value = serde_json::from_str(&messages[0].payload).unwrap();
    assert_eq!(payload["taskName"], "allIndices");
}

// =============================================================================
// Option chain
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_option_chain_walks_requested_expiries() {
    let h = harness(
        StubFetch::new()
            .route("option-chain-contract-info", 200, CONTRACT_INFO)
            .route("option-chain-v3", 200, EMPTY_CHAIN),
    );

    let started = tokio::time::Instant::now();
    let result = h
        .pipeline
        .handle(&task(
            r#"{"kind":"optionchain","symbol":"NIFTY","expiryCount":2,"delayMs":1500}"#,
        ))
        .await
        .unwrap();

    let outcomes: Vec<&str> = result.split(" | ").collect();
    assert_eq!(outcomes.len(), 2, "{result}");
    assert!(outcomes[0].starts_with("Expiry 27-Jan-2026: OK: optionChain downloaded for NIFTY expiry 27-Jan-2026"));
    assert!(outcomes[1].starts_with("Expiry 03-Feb-2026: OK: optionChain downloaded for NIFTY expiry 03-Feb-2026"));
    assert!(outcomes[1].contains(&format!("length={}", EMPTY_CHAIN.len())));

    // One pause, between the two expiries.
    assert!(started.elapsed() >= Duration::from_millis(1500));
    assert!(started.elapsed() < Duration::from_millis(3000));

    for expiry in ["27-Jan-2026", "03-Feb-2026"] {
        let key = format!("nse:optionchain:NIFTY:{expiry}:current:data");
        assert_eq!(h.store.get(&key).await.unwrap().as_deref(), Some(EMPTY_CHAIN));
    }
    assert!(!h.store.exists("nse:optionchain:NIFTY:10-Feb-2026:current:data").await.unwrap());

    let keys: Vec<String> = h.notifier.messages().into_iter().map(|m| m.key).collect();
    assert_eq!(
        keys,
        vec![
            "nse:optionchain:NIFTY:27-Jan-2026:current",
            "nse:optionchain:NIFTY:03-Feb-2026:current",
        ]
    );

    let chain_urls: Vec<String> = h
        .fetch
        .urls()
        .into_iter()
        .filter(|u| u.contains("option-chain-v3"))
        .collect();
    assert_eq!(chain_urls.len(), 2);
    assert!(chain_urls[0].contains("type=Indices"));
    assert!(chain_urls[0].contains("symbol=NIFTY"));
    assert!(chain_urls[0].ends_with("expiry=27-Jan-2026"));
}

#[tokio::test(start_paused = true)]
async fn test_compact_expiry_dates_are_normalized_only_in_the_url() {
    let h = harness(
        StubFetch::new()
            .route(
                "option-chain-contract-info",
                200,
                r#"{"data":{"expiryDates":["03FEB26","2026-02-10"]}}"#,
            )
            .route("option-chain-v3", 200, EMPTY_CHAIN),
    );

    let result = h
        .pipeline
        .handle(&task(r#"{"kind":"option-chain","symbol":"BANKNIFTY","expiryCount":5}"#))
        .await
        .unwrap();

    assert!(
        result.starts_with("Expiry 03FEB26: OK: optionChain downloaded for BANKNIFTY expiry 03FEB26"),
        "{result}"
    );
    assert!(result.contains(" | Expiry 2026-02-10: OK"), "{result}");
    assert!(h.store.exists("nse:optionchain:BANKNIFTY:03FEB26:current:data").await.unwrap());
    assert!(h.store.exists("nse:optionchain:BANKNIFTY:2026-02-10:current:data").await.unwrap());
    assert!(!h.store.exists("nse:optionchain:BANKNIFTY:03-Feb-2026:current:data").await.unwrap());

    let chain_urls: Vec<String> = h
        .fetch
        .urls()
        .into_iter()
        .filter(|u| u.contains("option-chain-v3"))
        .collect();
    assert!(chain_urls[0].ends_with("expiry=03-Feb-2026"), "{}", chain_urls[0]);
    assert!(chain_urls[1].ends_with("expiry=10-Feb-2026"), "{}", chain_urls[1]);
}

#[tokio::test(start_paused = true)]
async fn test_irregular_chain_bodies_are_still_stored_and_notified() {
    let bodies = [
        r#"{"records":{"data":null}}"#,
        r#"{"records":{"underlyingValue":"21500.5","data":[]}}"#,
        r#"{"records":{"underlyingValue":21500.5,"data":[
            {"strikePrice":21500,"CE":{"lastPrice":90.0,"bidprice":89.5,"buyPrice1":89.0}}
        ]}}"#,
        r#"{"records":{"data":"unavailable"}}"#,
    ];

    for body in bodies {
        let h = harness(
            StubFetch::new()
                .route("option-chain-contract-info", 200, CONTRACT_INFO)
                .route("expiry=03-Feb-2026", 200, body),
        );

        let result = h
            .pipeline
            .handle(&task(r#"{"kind":"optionchain","symbol":"NIFTY","expiryCount":2}"#))
            .await
            .unwrap();
        let outcomes: Vec<&str> = result.split(" | ").collect();
        assert!(
            outcomes[1].starts_with("Expiry 03-Feb-2026: OK: optionChain downloaded for NIFTY expiry 03-Feb-2026"),
            "{body} -> {result}"
        );

        assert_eq!(
            h.store
                .get("nse:optionchain:NIFTY:03-Feb-2026:current:data")
                .await
                .unwrap()
                .as_deref(),
            Some(body)
        );
        let keys: Vec<String> = h.notifier.messages().into_iter().map(|m| m.key).collect();
        assert_eq!(keys, vec!["nse:optionchain:NIFTY:03-Feb-2026:current"], "{body}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_one_failing_expiry_does_not_stop_the_others() {
    let h = harness(
        StubFetch::new()
            .route("option-chain-contract-info", 200, CONTRACT_INFO)
            .route("expiry=27-Jan-2026", 500, "oops")
            .route("expiry=03-Feb-2026", 200, "not json")
            .route("expiry=10-Feb-2026", 200, EMPTY_CHAIN),
    );

    let result = h
        .pipeline
        .handle(&task(r#"{"kind":"optionchain","symbol":"NIFTY","expiryCount":3}"#))
        .await
        .unwrap();

    let outcomes: Vec<&str> = result.split(" | ").collect();
    assert_eq!(outcomes.len(), 3, "{result}");
    assert!(outcomes[0].starts_with("Expiry 27-Jan-2026: Error: optionChain HTTP 500 from URL: https://"));
    assert!(outcomes[1].starts_with("Expiry 03-Feb-2026: Error: optionChain for expiry 03-Feb-2026 - "));
    assert!(outcomes[2].starts_with("Expiry 10-Feb-2026: OK"));

    assert_eq!(h.notifier.messages().len(), 1);
    assert!(!h.store.exists("nse:optionchain:NIFTY:27-Jan-2026:current:data").await.unwrap());
}

#[tokio::test]
async fn test_option_chain_without_expiry_dates_fails() {
    let h = harness(StubFetch::new().route("option-chain-contract-info", 200, r#"{"status":"ok"}"#));

    let err = h.pipeline.handle(&Task::new("optionchain")).await.unwrap_err();
    assert!(matches!(err, FeedError::NoExpiryDates(ref s) if s == "NIFTY"), "got {err:?}");
    assert_eq!(h.fetch.calls_matching("option-chain-v3"), 0);
}

#[tokio::test]
async fn test_option_chain_contract_info_http_error_fails() {
    let h = harness(StubFetch::new().route("option-chain-contract-info", 403, ""));

    let err = h.pipeline.handle(&Task::new("optionchain")).await.unwrap_err();
    assert!(matches!(err, FeedError::NonSuccessStatus { status: 403, .. }), "got {err:?}");
}

// =============================================================================
// Expiry reference cache
// =============================================================================

#[tokio::test]
async fn test_expiry_cache_is_reused_within_the_day() {
    let fetch = Arc::new(StubFetch::new().route("option-chain-contract-info", 200, CONTRACT_INFO));
    let store = Arc::new(MemoryStore::new());
    let cache = ExpiryCache::new(fetch.clone(), Some(SnapshotStore::new(store.clone())));

    let first = cache.get_expiries("NIFTY", Duration::from_secs(5)).await.unwrap();
    let second = cache.get_expiries("NIFTY", Duration::from_secs(5)).await.unwrap();

    assert_eq!(first, CONTRACT_INFO);
    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(fetch.calls_matching("option-chain-contract-info"), 1);
    assert!(fetch.urls()[0].ends_with("?symbol=NIFTY"));
    assert!(store.exists("nse:optionchain:NIFTY:expiries:timestamp").await.unwrap());
}

#[tokio::test]
async fn test_stale_expiry_cache_is_refreshed() {
    let fetch = Arc::new(StubFetch::new().route("option-chain-contract-info", 200, CONTRACT_INFO));
    let store = Arc::new(MemoryStore::new());
    let stale = Utc::now().checked_sub_days(Days::new(3)).unwrap().to_rfc3339();
    store
        .set("nse:optionchain:NIFTY:expiries:data", r#"{"expiryDates":["01-Jan-2026"]}"#)
        .await
        .unwrap();
    store
        .set("nse:optionchain:NIFTY:expiries:timestamp", &stale)
        .await
        .unwrap();

    let cache = ExpiryCache::new(fetch.clone(), Some(SnapshotStore::new(store.clone())));
    let json = cache.get_expiries("NIFTY", Duration::from_secs(5)).await.unwrap();

    assert_eq!(json, CONTRACT_INFO);
    assert_eq!(fetch.calls_matching("option-chain-contract-info"), 1);
    assert_eq!(
        store.get("nse:optionchain:NIFTY:expiries:data").await.unwrap().as_deref(),
        Some(CONTRACT_INFO)
    );
}

#[tokio::test]
async fn test_stale_expiry_cache_is_not_served_when_refresh_fails() {
    let fetch = Arc::new(StubFetch::new().route("option-chain-contract-info", 500, "busy"));
    let store = Arc::new(MemoryStore::new());
    let stale = Utc::now().checked_sub_days(Days::new(3)).unwrap().to_rfc3339();
    let old = r#"{"expiryDates":["01-Jan-2026"]}"#;
    store.set("nse:optionchain:NIFTY:expiries:data", old).await.unwrap();
    store
        .set("nse:optionchain:NIFTY:expiries:timestamp", &stale)
        .await
        .unwrap();

    let cache = ExpiryCache::new(fetch.clone(), Some(SnapshotStore::new(store.clone())));
    let err = cache
        .get_expiries("NIFTY", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, FeedError::NonSuccessStatus { status: 500, .. }), "got {err:?}");
    assert_eq!(fetch.calls_matching("option-chain-contract-info"), 1);
    // The stale entry is left untouched for the next attempt.
    assert_eq!(
        store.get("nse:optionchain:NIFTY:expiries:data").await.unwrap().as_deref(),
        Some(old)
    );
}

#[tokio::test]
async fn test_expiry_cache_without_store_always_fetches() {
    let fetch = Arc::new(StubFetch::new().route("option-chain-contract-info", 200, CONTRACT_INFO));
    let cache = ExpiryCache::new(fetch.clone(), None);

    cache.get_expiries("NIFTY", Duration::from_secs(5)).await.unwrap();
    cache.get_expiries("NIFTY", Duration::from_secs(5)).await.unwrap();
    assert_eq!(fetch.calls_matching("option-chain-contract-info"), 2);
}
