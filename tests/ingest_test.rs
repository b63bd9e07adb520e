use phishguard::ingest::IngestionPipeline;
use phishguard::store::Store;
use phishguard::types::{EntryStatus, Kind, NewBlockEntry};
use phishguard::version::{data_type, TrackedList};
use std::sync::Arc;

fn test_store() -> Arc<Store> {
    let store = Store::open_in_memory().expect("open in-memory store");
    store.init_schema().expect("init schema");
    Arc::new(store)
}

#[test]
fn test_duplicate_and_existing_are_counted_not_added() {
    let store = test_store();
    store
        .insert_block_single(
            Kind::Domain,
            &NewBlockEntry {
                value: "a.com".to_string(),
                reason: None,
                source: Some("feed-old".to_string()),
            },
        )
        .unwrap();

    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let summary = pipeline
        .ingest(Kind::Domain, "feed-a", ["a.com", "a.com"])
        .unwrap();

    assert_eq!(summary.added, 0);
    assert_eq!(summary.skipped_duplicate_in_file, 1);
    assert_eq!(summary.skipped_existing_in_store, 1);
    assert_eq!(summary.skipped_invalid, 0);
    assert_eq!(summary.errors, 0);
}

#[test]
fn test_mixed_formats_ingest() {
    let store = test_store();
    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");

    let lines = [
        "# plain section",
        "phishy.example.com",
        "https://scam.example.net/login",
        "! adblock section",
        "||bad-site.net^",
        "||tracker.example.org$third-party",
        "||*.wildcard.example^",
        "0.0.0.0 hosts-entry.example.com",
        "",
        "192.168.1.1",
    ];
    let summary = pipeline.ingest(Kind::Domain, "feed-mixed", lines).unwrap();

    assert_eq!(summary.added, 5);
    // The wildcard rule and the bare IP both fail extraction/normalization.
    assert_eq!(summary.skipped_invalid, 2);
    assert_eq!(summary.skipped_duplicate_in_file, 0);

    for value in [
        "phishy.example.com",
        "scam.example.net",
        "bad-site.net",
        "tracker.example.org",
        "hosts-entry.example.com",
    ] {
        assert!(
            store.find_active_block(Kind::Domain, value).unwrap().is_some(),
            "{} missing from store",
            value
        );
    }
}

#[test]
fn test_reimport_stores_at_most_one_row_per_value() {
    let store = test_store();
    let pipeline = IngestionPipeline::new(store.clone(), 2).expect("build pipeline");

    let lines = ["a1.example.com", "a2.example.com", "a3.example.com", "a4.example.com", "a5.example.com"];
    let first = pipeline.ingest(Kind::Domain, "feed-a", lines).unwrap();
    assert_eq!(first.added, 5);

    let second = pipeline.ingest(Kind::Domain, "feed-a", lines).unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.skipped_existing_in_store, 5);

    let (_, total) = store.list_active_blocks(Kind::Domain, 0, 1, 100).unwrap();
    assert_eq!(total, 5);
}

#[test]
fn test_reingestion_reactivates_inactive_entry() {
    let store = test_store();
    store
        .insert_block_single(
            Kind::Domain,
            &NewBlockEntry {
                value: "dormant.example.com".to_string(),
                reason: None,
                source: Some("feed-a".to_string()),
            },
        )
        .unwrap();
    store
        .set_block_status(Kind::Domain, "dormant.example.com", EntryStatus::Inactive)
        .unwrap();

    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let summary = pipeline
        .ingest(Kind::Domain, "feed-b", ["dormant.example.com"])
        .unwrap();

    assert_eq!(summary.added, 0);
    assert_eq!(summary.reactivated, 1);
    assert_eq!(summary.skipped_existing_in_store, 0);

    let entry = store
        .find_active_block(Kind::Domain, "dormant.example.com")
        .unwrap()
        .expect("reactivated");
    assert_eq!(entry.source.as_deref(), Some("feed-a,feed-b"));
}

#[test]
fn test_version_advances_only_on_change() {
    let store = test_store();
    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let dt = data_type(TrackedList::Blocklist, Kind::Domain);

    assert_eq!(store.current_version(dt).unwrap(), 0);

    pipeline
        .ingest(Kind::Domain, "feed-a", ["one.example.com"])
        .unwrap();
    let after_add = store.current_version(dt).unwrap();
    assert!(after_add > 0);

    // Re-importing the same value changes nothing and keeps the stamp.
    pipeline
        .ingest(Kind::Domain, "feed-a", ["one.example.com"])
        .unwrap();
    assert_eq!(store.current_version(dt).unwrap(), after_add);
}

#[test]
fn test_email_feed_ingest() {
    let store = test_store();
    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");

    let lines = ["Scammer@Fraud.example.com", "broken-address", "other@fraud.example.com"];
    let summary = pipeline.ingest(Kind::Email, "email-feed", lines).unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.skipped_invalid, 1);
    assert!(store
        .find_active_block(Kind::Email, "scammer@fraud.example.com")
        .unwrap()
        .is_some());
}

#[test]
fn test_stop_flag_ends_run_between_chunks() {
    let store = test_store();
    let pipeline = IngestionPipeline::new(store.clone(), 2).expect("build pipeline");
    pipeline
        .stop_handle()
        .store(true, std::sync::atomic::Ordering::Relaxed);

    let summary = pipeline
        .ingest(
            Kind::Domain,
            "feed-a",
            ["b1.example.com", "b2.example.com", "b3.example.com"],
        )
        .unwrap();
    assert_eq!(summary.added, 0);
}
