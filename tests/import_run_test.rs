use phishguard::ingest::IngestionPipeline;
use phishguard::store::Store;
use phishguard::types::Kind;
use std::fs;
use std::sync::Arc;

#[tokio::test]
async fn test_run_processes_files_and_counts_unreadable_sources() {
    let feed_path = "test_run_feed.txt";
    let _ = fs::remove_file(feed_path);
    fs::write(
        feed_path,
        "# comment\n||feed-one.example.com^\n0.0.0.0 feed-two.example.com\nfeed-three.example.com\n",
    )
    .expect("write feed file");

    let store = Arc::new(Store::open_in_memory().expect("open store"));
    store.init_schema().expect("init schema");

    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let feeds = vec![
        ("good".to_string(), feed_path.to_string()),
        ("missing".to_string(), "does_not_exist.txt".to_string()),
    ];
    let summary = pipeline.run(Kind::Domain, &feeds).await;

    // The missing file aborts only its own source.
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.added, 3);
    for value in [
        "feed-one.example.com",
        "feed-two.example.com",
        "feed-three.example.com",
    ] {
        assert!(store.find_active_block(Kind::Domain, value).unwrap().is_some());
    }

    let _ = fs::remove_file(feed_path);
}

#[tokio::test]
async fn test_truncated_remote_feed_counts_as_error() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // Announce a large body, send a fragment of it, then drop the
    // connection so the client sees the transfer fail mid-stream.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind feed server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        let response = "HTTP/1.1 200 OK\r\nContent-Length: 100000\r\n\r\n\
                        truncated-feed.example.com\n";
        let _ = socket.write_all(response.as_bytes()).await;
        drop(socket);
    });

    let store = Arc::new(Store::open_in_memory().expect("open store"));
    store.init_schema().expect("init schema");

    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let feeds = vec![(
        "truncated".to_string(),
        format!("http://{addr}/feed.txt"),
    )];
    let summary = pipeline.run(Kind::Domain, &feeds).await;

    // The partial list must not be ingested as a complete read.
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.added, 0);
    assert!(store
        .find_active_block(Kind::Domain, "truncated-feed.example.com")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_run_tags_provenance_per_feed() {
    let feed_path = "test_run_provenance.txt";
    let _ = fs::remove_file(feed_path);
    fs::write(feed_path, "tagged.example.com\n").expect("write feed file");

    let store = Arc::new(Store::open_in_memory().expect("open store"));
    store.init_schema().expect("init schema");

    let pipeline = IngestionPipeline::new(store.clone(), 500).expect("build pipeline");
    let feeds = vec![("community-feed".to_string(), feed_path.to_string())];
    let summary = pipeline.run(Kind::Domain, &feeds).await;
    assert_eq!(summary.added, 1);

    let entry = store
        .find_active_block(Kind::Domain, "tagged.example.com")
        .unwrap()
        .expect("inserted");
    assert_eq!(entry.source.as_deref(), Some("community-feed"));

    let _ = fs::remove_file(feed_path);
}
