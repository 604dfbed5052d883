use cyberset::CveDownloader;
use cyberset::models::PartitionOutcome;
use cyberset::sources::nvd::NvdClient;
use cyberset::sources::pacing::RatePolicy;
use cyberset::store::FileStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(year: i32, count: usize) -> serde_json::Value {
    let vulnerabilities: Vec<_> = (0..count)
        .map(|i| json!({ "cve": { "id": format!("CVE-{year}-{i:04}") } }))
        .collect();
    json!({
        "resultsPerPage": count,
        "startIndex": 0,
        "totalResults": count,
        "vulnerabilities": vulnerabilities,
    })
}

fn year_start(year: i32) -> String {
    format!("{year}-01-01T00:00:00.000")
}

fn client(server: &MockServer) -> Arc<NvdClient> {
    let policy = RatePolicy {
        request_delay: Duration::ZERO,
        throttle_cooldown: Duration::ZERO,
        max_throttle_retries: None,
    };
    Arc::new(
        NvdClient::new(None)
            .unwrap()
            .with_api_url(server.uri())
            .with_policy(policy),
    )
}

#[tokio::test]
async fn test_existing_partition_is_not_downloaded_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("pubStartDate", year_start(2024)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2024, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = CveDownloader::new(client(&server), Arc::new(FileStore::new(dir.path())));

    let first = downloader.download_year(2024).await.unwrap();
    assert!(matches!(first, PartitionOutcome::Downloaded(_)));

    let second = downloader.download_year(2024).await.unwrap();
    assert!(matches!(second, PartitionOutcome::AlreadyExists(_)));
    assert_eq!(second.cve_count(), Some(3));

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(dir.path().join("cve_2024.json")).unwrap()).unwrap();
    assert_eq!(saved["year"], 2024);
    assert_eq!(saved["total_cves"], 3);
    assert_eq!(saved["vulnerabilities"][2]["cve"]["id"], "CVE-2024-0002");
}

#[tokio::test]
async fn test_failing_year_is_isolated() {
    let server = MockServer::start().await;
    for year in [2023, 2025] {
        Mock::given(method("GET"))
            .and(query_param("pubStartDate", year_start(year)))
            .respond_with(ResponseTemplate::new(200).set_body_json(page(year, 2)))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(query_param("pubStartDate", year_start(2024)))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = CveDownloader::new(client(&server), Arc::new(FileStore::new(dir.path())));

    let report = downloader.run(&[2023, 2024, 2025], None).await;
    assert_eq!(report.partitions.len(), 3);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("year 2024"));
    assert!(report.errors[0].contains("HTTP 500"));
    assert_eq!(report.total_cves, 4);

    assert!(dir.path().join("cve_2023.json").exists());
    assert!(!dir.path().join("cve_2024.json").exists());
    assert!(dir.path().join("cve_2025.json").exists());

    let stats = report.save(dir.path()).await.unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.by_year.len(), 2);
}

#[tokio::test]
async fn test_throttled_run_completes_after_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(2025, 1)))
        .with_priority(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = CveDownloader::new(client(&server), Arc::new(FileStore::new(dir.path())));

    let outcome = downloader.download_recently_modified(30).await.unwrap();
    assert_eq!(outcome.cve_count(), Some(1));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);

    let saved: serde_json::Value = serde_json::from_slice(
        &std::fs::read(dir.path().join("cve_recent_modified.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(saved["date_range"], "30 days");
}

#[tokio::test]
async fn test_single_year_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let downloader = CveDownloader::new(client(&server), Arc::new(FileStore::new(dir.path())));

    let report = downloader.run(&[2024], None).await;
    assert_eq!(report.partitions.len(), 1);
    assert!(matches!(report.partitions[0], PartitionOutcome::Failed { .. }));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("year 2024"));
    assert_eq!(report.total_cves, 0);
    assert!(!dir.path().join("cve_2024.json").exists());
}
