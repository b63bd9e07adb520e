use phishguard::error::Error;
use phishguard::resolver::{CheckOutcome, Resolver, Verdict};
use phishguard::store::Store;
use phishguard::types::{EntryStatus, Kind, NewBlockEntry};
use phishguard::version::{data_type, TrackedList};
use std::sync::Arc;

fn test_store() -> Arc<Store> {
    let store = Store::open_in_memory().expect("open in-memory store");
    store.init_schema().expect("init schema");
    Arc::new(store)
}

fn block(store: &Store, kind: Kind, value: &str) {
    let inserted = store
        .insert_block_single(
            kind,
            &NewBlockEntry {
                value: value.to_string(),
                reason: None,
                source: Some("test".to_string()),
            },
        )
        .unwrap();
    assert!(inserted);
}

#[test]
fn test_whitelist_wins_over_active_block() {
    let store = test_store();
    store
        .add_whitelisted(Kind::Domain, "example.com", Some("trusted"), Some("admin"))
        .unwrap();
    block(&store, Kind::Domain, "example.com");

    let resolver = Resolver::new(store);
    match resolver.check(Kind::Domain, "example.com").unwrap() {
        CheckOutcome::Whitelisted(entry) => assert_eq!(entry.value, "example.com"),
        other => panic!("expected whitelisted, got {:?}", other),
    }
}

#[test]
fn test_whitelist_add_bumps_version() {
    let store = test_store();
    let dt = data_type(TrackedList::Whitelist, Kind::Domain);
    assert_eq!(store.current_version(dt).unwrap(), 0);

    store
        .add_whitelisted(Kind::Domain, "example.com", None, Some("admin"))
        .unwrap();
    let after_add = store.current_version(dt).unwrap();
    assert!(after_add > 0);

    // A rejected duplicate changes nothing and keeps the stamp.
    let dup = store.add_whitelisted(Kind::Domain, "example.com", None, None);
    assert!(matches!(dup, Err(Error::Conflict)));
    assert_eq!(store.current_version(dt).unwrap(), after_add);

    // The other tracked lists are untouched.
    assert_eq!(
        store
            .current_version(data_type(TrackedList::Whitelist, Kind::Email))
            .unwrap(),
        0
    );
    assert_eq!(
        store
            .current_version(data_type(TrackedList::Blocklist, Kind::Domain))
            .unwrap(),
        0
    );
}

#[test]
fn test_blocked_when_active_only() {
    let store = test_store();
    block(&store, Kind::Domain, "phishy.example.net");

    let resolver = Resolver::new(store.clone());
    match resolver.resolve(Kind::Domain, "phishy.example.net").unwrap() {
        Verdict::Blocked(entry) => assert_eq!(entry.status, EntryStatus::Active),
        other => panic!("expected blocked, got {:?}", other),
    }

    // An inactive entry no longer blocks.
    store
        .set_block_status(Kind::Domain, "phishy.example.net", EntryStatus::Inactive)
        .unwrap();
    assert!(matches!(
        resolver.resolve(Kind::Domain, "phishy.example.net").unwrap(),
        Verdict::Safe
    ));
}

#[test]
fn test_check_normalizes_raw_input() {
    let store = test_store();
    block(&store, Kind::Domain, "bad-site.net");

    let resolver = Resolver::new(store);
    match resolver
        .check(Kind::Domain, "HTTPS://WWW.Bad-Site.net/login?x=1")
        .unwrap()
    {
        CheckOutcome::Blocked(entry) => assert_eq!(entry.value, "bad-site.net"),
        other => panic!("expected blocked, got {:?}", other),
    }
}

#[test]
fn test_unknown_value_is_safe() {
    let store = test_store();
    let resolver = Resolver::new(store);
    match resolver.check(Kind::Domain, "unknown.example.org").unwrap() {
        CheckOutcome::Safe { invalid_format } => assert!(!invalid_format),
        other => panic!("expected safe, got {:?}", other),
    }
}

#[test]
fn test_invalid_input_is_defined_safe_outcome() {
    let store = test_store();
    let resolver = Resolver::new(store);
    match resolver.check(Kind::Domain, "192.168.1.1").unwrap() {
        CheckOutcome::Safe { invalid_format } => assert!(invalid_format),
        other => panic!("expected safe/invalid_format, got {:?}", other),
    }
}

#[test]
fn test_email_resolution() {
    let store = test_store();
    block(&store, Kind::Email, "scammer@fraud.example.com");

    let resolver = Resolver::new(store);
    match resolver
        .check(Kind::Email, " Scammer@Fraud.Example.COM ")
        .unwrap()
    {
        CheckOutcome::Blocked(entry) => assert_eq!(entry.value, "scammer@fraud.example.com"),
        other => panic!("expected blocked, got {:?}", other),
    }

    // Kinds are isolated from each other.
    match resolver.check(Kind::Domain, "fraud.example.com").unwrap() {
        CheckOutcome::Safe { .. } => {}
        other => panic!("expected safe, got {:?}", other),
    }
}
