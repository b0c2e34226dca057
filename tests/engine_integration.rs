//! Integration tests for the fetch scheduler: ordering, retries, concurrency
//! and cancellation, against a local HTTP server and in-process sources.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use vidmeta_core::fetch::Endpoints;
use vidmeta_core::{
    ChannelSink, EngineEvent, FailureKind, FetchError, FetchScheduler, HttpClient,
    MetadataSource, NullSink, RecordStatus, RunConfig, RunContext, VideoId,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use support::metadata_page;
use support::socket_guard::start_mock_server_or_skip;

fn context(concurrency: usize, attempts: u32) -> RunContext {
    RunContext::new(RunConfig {
        concurrency_limit: concurrency,
        max_retry_attempts: attempts,
        request_timeout: Duration::from_secs(5),
        backoff_base: Duration::from_millis(1),
        backoff_max: Duration::from_millis(4),
        backoff_jitter: Duration::ZERO,
    })
    .unwrap()
}

fn desktop_link(id: &str) -> String {
    format!("https://www.kuaishou.com/short-video/{id}")
}

fn page_for(id: &VideoId) -> String {
    metadata_page(&format!("u-{id}"), "caption")
}

/// Counts fetches and fails every one with a connection error.
#[derive(Default)]
struct AlwaysUnreachable {
    fetches: AtomicUsize,
}

#[async_trait]
impl MetadataSource for AlwaysUnreachable {
    async fn resolve_redirect(&self, url: &Url, _: Duration) -> Result<Url, FetchError> {
        Ok(url.clone())
    }

    async fn fetch(&self, id: &VideoId, _: Duration) -> Result<String, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::connection(id.as_str(), "connection refused"))
    }
}

/// Records the highest number of fetches in flight at once.
#[derive(Default)]
struct InFlightCounter {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl MetadataSource for InFlightCounter {
    async fn resolve_redirect(&self, url: &Url, _: Duration) -> Result<Url, FetchError> {
        Ok(url.clone())
    }

    async fn fetch(&self, id: &VideoId, _: Duration) -> Result<String, FetchError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(page_for(id))
    }
}

/// Answers ids starting with "fast" at once and stalls on everything else.
struct StallingSource;

#[async_trait]
impl MetadataSource for StallingSource {
    async fn resolve_redirect(&self, url: &Url, _: Duration) -> Result<Url, FetchError> {
        Ok(url.clone())
    }

    async fn fetch(&self, id: &VideoId, _: Duration) -> Result<String, FetchError> {
        if !id.as_str().starts_with("fast") {
            tokio::time::sleep(Duration::from_secs(300)).await;
        }
        Ok(page_for(id))
    }
}

/// Never answers a short link; metadata fetches succeed at once.
struct StallingRedirects;

#[async_trait]
impl MetadataSource for StallingRedirects {
    async fn resolve_redirect(&self, _: &Url, _: Duration) -> Result<Url, FetchError> {
        tokio::time::sleep(Duration::from_secs(300)).await;
        Err(FetchError::connection("short link", "stalled"))
    }

    async fn fetch(&self, id: &VideoId, _: Duration) -> Result<String, FetchError> {
        Ok(page_for(id))
    }
}

#[tokio::test]
async fn test_mixed_batch_against_http_server() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/abc123"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/short-video/abc123"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/short-video/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(metadata_page("3xauthor", "hello")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/short-video/xyz789"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = Endpoints::new(&format!("{}/short-video/", server.uri()))
        .unwrap()
        .with_redirect_base(&server.uri())
        .unwrap();
    let client = HttpClient::new(endpoints, &[]).unwrap();
    let scheduler = FetchScheduler::new(Arc::new(client));

    let links = vec![
        "https://v.kuaishou.com/abc123".to_string(),
        "not-a-link".to_string(),
        desktop_link("xyz789"),
    ];
    let result = scheduler
        .run(links, &context(3, 3), &NullSink)
        .await
        .unwrap();

    let records = &result.records;
    assert_eq!(records.len(), 3);

    assert_eq!(records[0].status, RecordStatus::Success);
    assert_eq!(records[0].video_id, "abc123");
    assert_eq!(records[0].author_id, "3xauthor");
    assert_eq!(records[0].title, "hello");
    assert_eq!(records[0].like_count, 15_000);
    assert_eq!(records[0].fan_count, 7);
    assert_eq!(records[0].publish_time, "2024-01-01 08:00:00");
    assert_eq!(
        records[0].canonical_url,
        "https://www.kuaishou.com/short-video/abc123"
    );

    assert_eq!(records[1].status, RecordStatus::Failed);
    assert_eq!(records[1].failure_kind, Some(FailureKind::InvalidLink));
    assert_eq!(
        records[1].error_reason.as_deref(),
        Some("invalid link: unrecognized format")
    );

    assert_eq!(records[2].failure_kind, Some(FailureKind::HttpStatus(404)));
    assert_eq!(records[2].error_reason.as_deref(), Some("HTTP status 404"));
    assert_eq!(records[2].video_id, "xyz789");

    assert_eq!(result.summary.succeeded, 1);
    assert_eq!(result.summary.failed, 2);
    assert!(!result.summary.cancelled);
}

#[tokio::test]
async fn test_server_errors_are_retried_until_attempts_run_out() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/short-video/busy1"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let endpoints = Endpoints::new(&format!("{}/short-video/", server.uri())).unwrap();
    let client = HttpClient::new(endpoints, &[]).unwrap();
    let scheduler = FetchScheduler::new(Arc::new(client));

    let result = scheduler
        .run(vec![desktop_link("busy1")], &context(1, 2), &NullSink)
        .await
        .unwrap();

    assert_eq!(result.records[0].failure_kind, Some(FailureKind::HttpStatus(503)));
    assert_eq!(result.records[0].retries, 1);
    assert_eq!(result.summary.retried, 1);
}

#[tokio::test]
async fn test_connection_errors_stop_after_max_attempts() {
    let source = Arc::new(AlwaysUnreachable::default());
    let scheduler = FetchScheduler::new(Arc::clone(&source) as Arc<dyn MetadataSource>);

    let result = scheduler
        .run(vec![desktop_link("abc123")], &context(1, 3), &NullSink)
        .await
        .unwrap();

    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
    let record = &result.records[0];
    assert_eq!(record.failure_kind, Some(FailureKind::ConnectionError));
    assert_eq!(record.error_reason.as_deref(), Some("connection error"));
    assert_eq!(record.retries, 2);
    assert_eq!(result.summary.retried, 2);
}

#[tokio::test]
async fn test_concurrency_limit_is_respected() {
    let counter = Arc::new(InFlightCounter::default());
    let scheduler = FetchScheduler::new(Arc::clone(&counter) as Arc<dyn MetadataSource>);
    let links: Vec<String> = (0..12).map(|i| desktop_link(&format!("vid{i}"))).collect();

    let result = scheduler
        .run(links, &context(3, 1), &NullSink)
        .await
        .unwrap();

    assert_eq!(result.summary.succeeded, 12);
    assert_eq!(counter.peak.load(Ordering::SeqCst), 3);
    for (position, record) in result.records.iter().enumerate() {
        assert_eq!(record.index, position);
        assert_eq!(record.video_id, format!("vid{position}"));
    }
}

#[tokio::test]
async fn test_cancellation_mid_run_settles_every_item() {
    let scheduler = FetchScheduler::new(Arc::new(StallingSource));
    let ctx = context(2, 3);
    let links = vec![
        desktop_link("fast1"),
        desktop_link("slow1"),
        desktop_link("slow2"),
        desktop_link("slow3"),
        desktop_link("slow4"),
    ];

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        scheduler.run(links, &ctx, &NullSink),
    )
    .await
    .expect("run should finish promptly after cancellation")
    .unwrap();

    assert_eq!(result.records.len(), 5);
    assert!(result.records[0].is_success());
    for record in &result.records[1..] {
        assert_eq!(record.failure_kind, Some(FailureKind::Cancelled));
        assert_eq!(record.error_reason.as_deref(), Some("cancelled"));
    }
    assert!(result.summary.cancelled);
    assert_eq!(result.summary.by_failure_kind[&FailureKind::Cancelled], 4);
}

#[tokio::test]
async fn test_repeated_runs_produce_identical_records() {
    let scheduler = FetchScheduler::new(Arc::new(InFlightCounter::default()));
    let links = vec![
        desktop_link("a1"),
        "nonsense".to_string(),
        "https://m.gifshow.com/fw/photo/3xphoto99".to_string(),
    ];

    let first = scheduler
        .run(links.clone(), &context(2, 1), &NullSink)
        .await
        .unwrap();
    let second = scheduler
        .run(links, &context(2, 1), &NullSink)
        .await
        .unwrap();

    assert_eq!(first.records, second.records);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test]
async fn test_channel_sink_streams_items_then_finish() {
    let scheduler = FetchScheduler::new(Arc::new(InFlightCounter::default()));
    let (sink, mut rx) = ChannelSink::new();

    let result = scheduler
        .run(
            vec![desktop_link("a1"), "bad".to_string(), desktop_link("b2")],
            &context(2, 1),
            &sink,
        )
        .await
        .unwrap();
    drop(sink);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.len(), 7);
    let mut last_completed = 0;
    for pair in events[..6].chunks(2) {
        let (EngineEvent::Item(record), EngineEvent::Progress(progress)) = (&pair[0], &pair[1])
        else {
            panic!("expected item followed by progress, got {pair:?}");
        };
        assert_eq!(record.index, progress.last_index);
        assert_eq!(record.status, progress.last_status);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.completed, last_completed + 1);
        last_completed = progress.completed;
    }
    assert_eq!(events[6], EngineEvent::Finished(result));
}

#[tokio::test]
async fn test_cancellation_during_redirect_is_cancelled_not_invalid() {
    let scheduler = FetchScheduler::new(Arc::new(StallingRedirects));
    let ctx = context(2, 3);
    let links = vec![
        desktop_link("fast1"),
        "https://v.kuaishou.com/abc123".to_string(),
    ];

    let cancel = ctx.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        scheduler.run(links, &ctx, &NullSink),
    )
    .await
    .expect("run should finish promptly after cancellation")
    .unwrap();

    assert!(result.records[0].is_success());
    let short = &result.records[1];
    assert_eq!(short.failure_kind, Some(FailureKind::Cancelled));
    assert_eq!(short.error_reason.as_deref(), Some("cancelled"));
    assert_eq!(short.video_id, "");
    assert!(result.summary.cancelled);
}

#[tokio::test]
async fn test_short_link_rejected_by_server_keeps_http_cause() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/gone42"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let endpoints = Endpoints::new(&format!("{}/short-video/", server.uri()))
        .unwrap()
        .with_redirect_base(&server.uri())
        .unwrap();
    let client = HttpClient::new(endpoints, &[]).unwrap();
    let scheduler = FetchScheduler::new(Arc::new(client));

    let result = scheduler
        .run(
            vec!["https://v.kuaishou.com/gone42".to_string()],
            &context(1, 3),
            &NullSink,
        )
        .await
        .unwrap();

    let record = &result.records[0];
    assert_eq!(record.failure_kind, Some(FailureKind::InvalidLink));
    assert_eq!(
        record.error_reason.as_deref(),
        Some("invalid link: redirect failed (HTTP status 404)")
    );
    assert_eq!(record.retries, 0);
    assert!(!result.summary.cancelled);
}
