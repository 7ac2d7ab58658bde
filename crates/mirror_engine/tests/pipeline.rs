use std::sync::Arc;
use std::time::Duration;

use mirror_core::{Content, PageRecord, SiteQuery, TimeMapEntry};
use mirror_engine::kv::{KeyValueStore, MemoryStore, SetOptions, SledStore};
use mirror_engine::loader::Provider;
use mirror_engine::{
    content_provider, time_map_provider, ArchiveSettings, ContentParser, ContentSink,
    ContentRepository, JsonLinesSink, MirrorRunner, ReqwestArchiveClient, ResolveError,
    RetryPolicy, RunSummary, SinkError, TimeMapRepository,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SITE: &str = "agile.egloos.com/";
const PATTERN: &str = "^https://agile.egloos.com/[0-9]+$";

fn query() -> SiteQuery {
    SiteQuery::new(SITE, PATTERN)
}

fn client_for(server: &MockServer) -> Arc<ReqwestArchiveClient> {
    Arc::new(
        ReqwestArchiveClient::new(ArchiveSettings {
            base_url: server.uri(),
            retry: RetryPolicy {
                max_attempts: 2,
                delay: Duration::from_millis(10),
            },
            ..ArchiveSettings::default()
        })
        .expect("client builds"),
    )
}

fn post_html(title: &str, created_at: &str) -> String {
    format!(
        r#"<html><body><div class="POST_TTL">{title}</div>
<a class="time">{created_at}</a>
<div class="POST_BODY"><p onclick="go()">Body of {title}</p><!-- counter --></div></body></html>"#
    )
}

async fn mount_snapshot(server: &MockServer, timestamp: &str, url: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(format!("/web/{timestamp}/{url}")))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(server)
        .await;
}

async fn mount_inventory(server: &MockServer, rows: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/web/timemap/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn time_map_is_fetched_once_then_served_from_store() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([["endtimestamp", "original"], ["20090101000000", "https://agile.egloos.com/1"]]),
    )
    .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let provider = time_map_provider(store.clone(), client_for(&server), SetOptions::default());

    let first = provider.load(&query()).await.unwrap();
    let second = provider.load(&query()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(
        TimeMapRepository::new(store).get().await.unwrap(),
        Some(vec![TimeMapEntry::new("20090101000000", "https://agile.egloos.com/1")])
    );
}

#[tokio::test]
async fn content_is_fetched_once_then_served_from_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/20090101000000/https://agile.egloos.com/1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            post_html("One", "2009/01/01"),
            "text/html; charset=utf-8",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let provider = content_provider(
        store.clone(),
        client_for(&server),
        Arc::new(ContentParser::default()),
        SetOptions::default(),
    );
    let target = TimeMapEntry::new("20090101000000", "https://agile.egloos.com/1");

    let first = provider.load(&target).await.unwrap();
    let second = provider.load(&target).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.title, "One");
    assert_eq!(
        ContentRepository::new(store)
            .get("https://agile.egloos.com/1")
            .await
            .unwrap(),
        Some(first)
    );
}

#[tokio::test]
async fn expired_inventory_is_listed_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/timemap/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["endtimestamp", "original"],
            ["20090101000000", "https://agile.egloos.com/1"]
        ])))
        .expect(2)
        .mount(&server)
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(SledStore::temporary().unwrap());
    let provider = time_map_provider(
        store,
        client_for(&server),
        SetOptions::expiring_in(Duration::from_millis(50)),
    );

    provider.load(&query()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let relisted = provider.load(&query()).await.unwrap();
    assert_eq!(relisted.len(), 1);
}

#[tokio::test]
async fn broken_capture_is_recovered_from_newest_alternate() {
    let server = MockServer::start().await;
    let url = "https://agile.egloos.com/2";
    mount_snapshot(&server, "20100101000000", url, "<html>robots.txt</html>".to_string()).await;
    mount_snapshot(&server, "20120101000000", url, post_html("Recovered", "2010/05/05")).await;
    mount_snapshot(&server, "20090101000000", url, post_html("Stale", "2010/05/05")).await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            ["original", "timestamp"],
            [url, "20090101000000"],
            [url, "20100101000000"],
            [url, "20120101000000"],
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let provider = content_provider(
        store.clone(),
        client_for(&server),
        Arc::default(),
        SetOptions::default(),
    );

    let content = provider
        .load(&TimeMapEntry::new("20100101000000", url))
        .await
        .unwrap();
    assert_eq!(content.title, "Recovered");
    assert_eq!(
        ContentRepository::new(store).get(url).await.unwrap().map(|c| c.title),
        Some("Recovered".to_string())
    );
}

#[tokio::test]
async fn unrecoverable_page_is_exhausted_and_not_stored() {
    let server = MockServer::start().await;
    let url = "https://agile.egloos.com/3";
    mount_snapshot(&server, "20100101000000", url, "<html>gone</html>".to_string()).await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([["original", "timestamp"]])))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let provider = content_provider(
        store.clone(),
        client_for(&server),
        Arc::default(),
        SetOptions::default(),
    );

    let err = provider
        .load(&TimeMapEntry::new("20100101000000", url))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Exhausted { .. }));
    assert!(err.to_string().contains(url));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn archive_failure_propagates_without_trying_alternates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/web/20100101000000/https://agile.egloos.com/4"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdx/search/cdx"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider = content_provider(
        Arc::new(MemoryStore::new()),
        client_for(&server),
        Arc::default(),
        SetOptions::default(),
    );
    let err = provider
        .load(&TimeMapEntry::new("20100101000000", "https://agile.egloos.com/4"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Archive(_)));
}

fn runner_for(server: &MockServer) -> MirrorRunner {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let client = client_for(server);
    MirrorRunner::new(
        query(),
        Arc::new(time_map_provider(store.clone(), client.clone(), SetOptions::default())),
        Arc::new(content_provider(store, client, Arc::default(), SetOptions::default())),
    )
    .with_concurrency(2)
    .with_archive_base_url("https://web.archive.org")
}

async fn mount_two_posts(server: &MockServer) {
    mount_inventory(
        server,
        json!([
            ["endtimestamp", "original"],
            ["20090101000000", "https://agile.egloos.com/10"],
            ["20090101000000", "https://agile.egloos.com/11"],
        ]),
    )
    .await;
    // Newer post listed first in the inventory.
    mount_snapshot(
        server,
        "20090101000000",
        "https://agile.egloos.com/10",
        post_html("Later", "2008/12/01"),
    )
    .await;
    mount_snapshot(
        server,
        "20090101000000",
        "https://agile.egloos.com/11",
        post_html("Earlier", "2008/01/01"),
    )
    .await;
}

#[tokio::test]
async fn dump_file_writes_cleaned_posts_oldest_first() {
    let server = MockServer::start().await;
    mount_two_posts(&server).await;
    let runner = runner_for(&server);
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("out").join("posts.json");

    let summary = runner.dump_file(&out).await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            pages: 2,
            resolved: 2,
            failed: 0
        }
    );

    let written: Vec<Content> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    let titles: Vec<&str> = written.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Earlier", "Later"]);
    assert_eq!(written[0].body, "<p >Body of Earlier</p>");
}

#[derive(Default)]
struct CollectingSink {
    records: Mutex<Vec<PageRecord>>,
}

#[async_trait::async_trait]
impl ContentSink for CollectingSink {
    async fn store(&self, records: &[PageRecord]) -> Result<(), SinkError> {
        self.records.lock().await.extend_from_slice(records);
        Ok(())
    }
}

#[tokio::test]
async fn dump_records_keeps_inventory_order() {
    let server = MockServer::start().await;
    mount_two_posts(&server).await;
    let runner = runner_for(&server);
    let sink = CollectingSink::default();

    runner.dump_records(&sink).await.unwrap();
    let records = sink.records.lock().await;
    let ids: Vec<Option<u64>> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![Some(10), Some(11)]);
    assert_eq!(
        records[0].archive_url,
        "https://web.archive.org/web/20090101000000/https://agile.egloos.com/10"
    );
    assert_eq!(records[0].plain_text, "Body of Later");
}

#[tokio::test]
async fn json_lines_sink_writes_one_record_per_line() {
    let server = MockServer::start().await;
    mount_two_posts(&server).await;
    let runner = runner_for(&server);
    let temp = TempDir::new().unwrap();
    let sink = JsonLinesSink::new(temp.path().join("records.jsonl"));

    runner.dump_records(&sink).await.unwrap();
    let text = std::fs::read_to_string(sink.path()).unwrap();
    let records: Vec<PageRecord> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].title, "Earlier");
}

#[tokio::test]
async fn download_counts_failures_and_keeps_going() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([
            ["endtimestamp", "original"],
            ["20090101000000", "https://agile.egloos.com/20"],
            ["20090101000000", "https://agile.egloos.com/21"],
        ]),
    )
    .await;
    mount_snapshot(
        &server,
        "20090101000000",
        "https://agile.egloos.com/21",
        post_html("Fine", "2009/01/01"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/web/20090101000000/https://agile.egloos.com/20"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let summary = runner_for(&server).download().await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            pages: 2,
            resolved: 1,
            failed: 1
        }
    );
}

#[tokio::test]
async fn dump_fails_when_any_page_fails() {
    let server = MockServer::start().await;
    mount_inventory(
        &server,
        json!([["endtimestamp", "original"], ["20090101000000", "https://agile.egloos.com/30"]]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/web/20090101000000/https://agile.egloos.com/30"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("posts.json");

    assert!(runner_for(&server).dump_file(&out).await.is_err());
    assert!(!out.exists());
}
