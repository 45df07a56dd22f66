//! Event orchestrator behaviour against in-memory collaborators.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use relay_core::{Destination, Event, EventPhase, RoutingTable};
use relay_dedup::{DedupError, DedupStore, ExpiringCache, MemoryCache};
use relay_media::{BlobSource, CreatedEvent, DetectionService, MediaError, MediaFetcher};
use relay_telegram::{DeliveryRouter, Notifier, TelegramError};
use tokio::time::Instant;

use crate::orchestrator::{ClipOutcome, Disposition, EventOrchestrator, OrchestratorConfig};

/// Memory cache that records every call.
#[derive(Default)]
struct RecordingCache {
    inner: MemoryCache,
    exists_calls: AtomicUsize,
    set_keys: Mutex<Vec<String>>,
    down: bool,
    writes_fail: bool,
    latency: Duration,
}

impl RecordingCache {
    fn down() -> Self {
        Self {
            down: true,
            ..Default::default()
        }
    }

    /// Reads succeed, writes fail.
    fn read_only() -> Self {
        Self {
            writes_fail: true,
            ..Default::default()
        }
    }

    /// Every call suspends like a network round trip.
    fn slow() -> Self {
        Self {
            latency: Duration::from_millis(1),
            ..Default::default()
        }
    }

    async fn round_trip(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn record_write(&self, key: &str) -> relay_dedup::Result<()> {
        self.set_keys.lock().unwrap().push(key.to_string());
        if self.writes_fail {
            return Err(DedupError::Backend("READONLY replica".to_string()));
        }
        Ok(())
    }

    fn calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst) + self.set_keys.lock().unwrap().len()
    }
}

#[async_trait]
impl ExpiringCache for RecordingCache {
    async fn ping(&self) -> relay_dedup::Result<()> {
        Ok(())
    }

    async fn exists(&self, key: &str) -> relay_dedup::Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.round_trip().await;
        if self.down {
            return Err(DedupError::Backend("connection refused".to_string()));
        }
        self.inner.exists(key).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> relay_dedup::Result<()> {
        self.round_trip().await;
        self.record_write(key)?;
        self.inner.set_with_ttl(key, value, ttl).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> relay_dedup::Result<bool> {
        self.round_trip().await;
        self.record_write(key)?;
        self.inner.set_if_absent(key, value, ttl).await
    }

    async fn ttl(&self, key: &str) -> relay_dedup::Result<Option<Duration>> {
        self.round_trip().await;
        self.inner.ttl(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> relay_dedup::Result<u64> {
        self.inner.delete_prefix(prefix).await
    }
}

/// Frigate stand-in serving snapshots and clips.
#[derive(Default)]
struct MockFrigate {
    snapshot_calls: AtomicUsize,
    snapshot_fails: bool,
    clip_responses: Mutex<VecDeque<relay_media::Result<Vec<u8>>>>,
    clip_calls: AtomicUsize,
    clip_latency: Duration,
}

#[async_trait]
impl DetectionService for MockFrigate {
    fn clip_url(&self, event_id: &str) -> String {
        format!("http://frigate/api/events/{}/clip.mp4", event_id)
    }

    async fn event_snapshot(&self, _event_id: &str) -> relay_media::Result<Vec<u8>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.snapshot_fails {
            return Err(MediaError::Http("connection reset".to_string()));
        }
        Ok(vec![0xff, 0xd8, 0xff])
    }

    async fn latest_snapshot(&self, _camera: &str) -> relay_media::Result<Vec<u8>> {
        Ok(vec![0xff, 0xd8])
    }

    async fn create_event(
        &self,
        _camera: &str,
        _duration_secs: u32,
    ) -> relay_media::Result<CreatedEvent> {
        Err(MediaError::Api("not supported".to_string()))
    }
}

#[async_trait]
impl BlobSource for MockFrigate {
    async fn get(&self, _url: &str) -> relay_media::Result<Vec<u8>> {
        self.clip_calls.fetch_add(1, Ordering::SeqCst);
        if !self.clip_latency.is_zero() {
            tokio::time::sleep(self.clip_latency).await;
        }
        let next = self.clip_responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(MediaError::Status {
            status: 404,
            body: "clip not ready".to_string(),
        }))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Photo(Destination, String),
    Video(Destination, usize),
}

/// Notifier that routes through a real [`DeliveryRouter`] and records sends.
struct MockNotifier {
    router: DeliveryRouter,
    sent: Mutex<Vec<Sent>>,
    fail: bool,
}

impl MockNotifier {
    fn new(fail: bool) -> Self {
        let routing = RoutingTable::from_entries(-100123, ["front|42", "back|7"]);
        Self {
            router: DeliveryRouter::new(Arc::new(routing), true),
            sent: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    fn destination_for(&self, source: &str) -> Destination {
        self.router.resolve(source)
    }

    async fn send_text_to(&self, _dest: Destination, _text: &str) -> relay_telegram::Result<()> {
        Ok(())
    }

    async fn send_photo_to(
        &self,
        dest: Destination,
        _photo: Vec<u8>,
        caption: &str,
    ) -> relay_telegram::Result<()> {
        if self.fail {
            return Err(TelegramError::Request("Bad Request".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Photo(dest, caption.to_string()));
        Ok(())
    }

    async fn send_video_to(
        &self,
        dest: Destination,
        video: Vec<u8>,
        _caption: &str,
    ) -> relay_telegram::Result<()> {
        if self.fail {
            return Err(TelegramError::Request("Bad Request".to_string()));
        }
        self.sent.lock().unwrap().push(Sent::Video(dest, video.len()));
        Ok(())
    }
}

struct Harness {
    orchestrator: EventOrchestrator,
    cache: Arc<RecordingCache>,
    frigate: Arc<MockFrigate>,
    notifier: Arc<MockNotifier>,
    dedup: DedupStore,
}

fn harness_with(cache: RecordingCache, frigate: MockFrigate, notifier: MockNotifier) -> Harness {
    harness_with_config(cache, frigate, notifier, OrchestratorConfig::default())
}

fn harness_with_config(
    cache: RecordingCache,
    frigate: MockFrigate,
    notifier: MockNotifier,
    config: OrchestratorConfig,
) -> Harness {
    let cache = Arc::new(cache);
    let frigate = Arc::new(frigate);
    let notifier = Arc::new(notifier);
    let dedup = DedupStore::new(cache.clone(), Duration::from_secs(7200));
    let fetcher = MediaFetcher::new(frigate.clone());

    Harness {
        orchestrator: EventOrchestrator::new(
            dedup.clone(),
            frigate.clone(),
            fetcher,
            notifier.clone(),
            config,
        ),
        cache,
        frigate,
        notifier,
        dedup,
    }
}

fn harness() -> Harness {
    harness_with(
        RecordingCache::default(),
        MockFrigate::default(),
        MockNotifier::new(false),
    )
}

fn event(id: &str, phase: EventPhase, has_snapshot: bool, has_clip: bool) -> Event {
    Event {
        id: id.to_string(),
        phase,
        label: "person".to_string(),
        source: "front".to_string(),
        start_time: 1_700_000_000.5,
        has_snapshot,
        has_clip,
    }
}

fn front_topic() -> Destination {
    Destination {
        chat_id: -100123,
        thread_id: Some(42),
    }
}

#[tokio::test]
async fn test_unhandled_combinations_are_ignored() {
    let h = harness();

    for event in [
        event("a", EventPhase::New, false, false),
        event("b", EventPhase::New, false, true),
        event("c", EventPhase::Update, false, true),
        event("d", EventPhase::End, true, false),
        event("e", EventPhase::End, false, false),
    ] {
        assert!(matches!(
            h.orchestrator.handle_event(event).await,
            Disposition::Ignored
        ));
    }

    assert_eq!(h.cache.calls(), 0);
    assert_eq!(h.frigate.snapshot_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_new_snapshot_routed_to_camera_topic() {
    let h = harness();

    let disposition = h
        .orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;

    assert!(matches!(disposition, Disposition::Delivered));
    assert_eq!(h.frigate.snapshot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.notifier.sent(),
        vec![Sent::Photo(
            front_topic(),
            "🎯 person\n📷 front\n🕒 14/11/2023 22:13:20".to_string()
        )]
    );
    assert_eq!(
        *h.cache.set_keys.lock().unwrap(),
        vec!["frigate:event:new:abc".to_string()]
    );
}

#[tokio::test]
async fn test_resubmitted_event_is_skipped() {
    let h = harness();
    let e = event("abc", EventPhase::New, true, false);

    h.orchestrator.handle_event(e.clone()).await;
    let second = h.orchestrator.handle_event(e).await;

    assert!(matches!(second, Disposition::Skipped));
    assert_eq!(h.frigate.snapshot_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_phases_are_deduplicated_independently() {
    let h = harness();

    h.orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;
    let update = h
        .orchestrator
        .handle_event(event("abc", EventPhase::Update, true, false))
        .await;

    assert!(matches!(update, Disposition::Delivered));
    assert_eq!(h.notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_snapshot_fetch_failure_leaves_event_unmarked() {
    let h = harness_with(
        RecordingCache::default(),
        MockFrigate {
            snapshot_fails: true,
            ..Default::default()
        },
        MockNotifier::new(false),
    );

    let disposition = h
        .orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;

    assert!(matches!(disposition, Disposition::Failed));
    assert!(h.notifier.sent().is_empty());
    assert!(!h.dedup.is_handled("abc", EventPhase::New).await.unwrap());
}

#[tokio::test]
async fn test_snapshot_send_failure_leaves_event_unmarked() {
    let h = harness_with(
        RecordingCache::default(),
        MockFrigate::default(),
        MockNotifier::new(true),
    );

    let disposition = h
        .orchestrator
        .handle_event(event("abc", EventPhase::Update, true, false))
        .await;

    assert!(matches!(disposition, Disposition::Failed));
    assert!(h.cache.set_keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_dedup_failure_skips_event() {
    let h = harness_with(
        RecordingCache::down(),
        MockFrigate::default(),
        MockNotifier::new(false),
    );

    let snapshot = h
        .orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;
    let clip = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, false, true))
        .await;

    assert!(matches!(snapshot, Disposition::DedupUnavailable));
    assert!(matches!(clip, Disposition::DedupUnavailable));
    assert_eq!(h.frigate.snapshot_calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 0);
    assert!(h.cache.set_keys.lock().unwrap().is_empty());
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_clip_marked_before_delivery() {
    let frigate = MockFrigate::default();
    frigate.clip_responses.lock().unwrap().extend([
        Err(MediaError::Status {
            status: 404,
            body: "not ready".to_string(),
        }),
        Ok(vec![0; 2048]),
    ]);
    let h = harness_with(RecordingCache::default(), frigate, MockNotifier::new(false));

    let disposition = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, true, true))
        .await;

    assert!(h.dedup.is_handled("abc", EventPhase::End).await.unwrap());
    let Disposition::ClipDispatched(task) = disposition else {
        panic!("expected clip dispatch");
    };
    assert_eq!(task.join().await, Some(ClipOutcome::Sent));
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.notifier.sent(), vec![Sent::Video(front_topic(), 2048)]);

    let again = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, true, true))
        .await;
    assert!(matches!(again, Disposition::Skipped));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_copies_send_one_clip() {
    let frigate = MockFrigate::default();
    frigate
        .clip_responses
        .lock()
        .unwrap()
        .extend([Ok(vec![0; 512]), Ok(vec![0; 512])]);
    let h = harness_with(RecordingCache::slow(), frigate, MockNotifier::new(false));
    let payload = br#"{
        "type": "end",
        "after": {
            "id": "abc",
            "label": "person",
            "camera": "front",
            "start_time": 1700000000.0,
            "has_snapshot": false,
            "has_clip": true
        }
    }"#;

    let (first, second) = tokio::join!(
        h.orchestrator.handle_payload(payload),
        h.orchestrator.handle_payload(payload)
    );

    let mut tasks = Vec::new();
    let mut skipped = 0;
    for disposition in [first.unwrap(), second.unwrap()] {
        match disposition {
            Disposition::ClipDispatched(task) => tasks.push(task),
            Disposition::Skipped => skipped += 1,
            other => panic!("unexpected disposition {:?}", other),
        }
    }
    assert_eq!(tasks.len(), 1);
    assert_eq!(skipped, 1);

    for task in tasks {
        assert_eq!(task.join().await, Some(ClipOutcome::Sent));
    }
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.notifier.sent(), vec![Sent::Video(front_topic(), 512)]);
}

#[tokio::test(start_paused = true)]
async fn test_clip_dispatched_when_mark_fails() {
    let frigate = MockFrigate::default();
    frigate.clip_responses.lock().unwrap().push_back(Ok(vec![0; 1024]));
    let h = harness_with(RecordingCache::read_only(), frigate, MockNotifier::new(false));

    let Disposition::ClipDispatched(task) = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, false, true))
        .await
    else {
        panic!("expected clip dispatch");
    };

    assert_eq!(task.join().await, Some(ClipOutcome::Sent));
    assert_eq!(h.notifier.sent(), vec![Sent::Video(front_topic(), 1024)]);
    assert!(!h.dedup.is_handled("abc", EventPhase::End).await.unwrap());
}

#[tokio::test]
async fn test_snapshot_delivered_when_mark_fails() {
    let h = harness_with(
        RecordingCache::read_only(),
        MockFrigate::default(),
        MockNotifier::new(false),
    );

    let disposition = h
        .orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;

    assert!(matches!(disposition, Disposition::Delivered));
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(
        *h.cache.set_keys.lock().unwrap(),
        vec!["frigate:event:new:abc".to_string()]
    );
    assert!(!h.dedup.is_handled("abc", EventPhase::New).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_clip_attempts_exhausted() {
    let h = harness();

    let Disposition::ClipDispatched(task) = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, false, true))
        .await
    else {
        panic!("expected clip dispatch");
    };

    assert_eq!(task.join().await, Some(ClipOutcome::FetchFailed));
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 9);
    assert!(h.notifier.sent().is_empty());
    assert!(h.dedup.is_handled("abc", EventPhase::End).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_clip_deadline_abandons_download() {
    let h = harness_with(
        RecordingCache::default(),
        MockFrigate {
            clip_latency: Duration::from_secs(300),
            ..Default::default()
        },
        MockNotifier::new(false),
    );
    let start = Instant::now();

    let Disposition::ClipDispatched(task) = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, false, true))
        .await
    else {
        panic!("expected clip dispatch");
    };

    assert_eq!(task.join().await, Some(ClipOutcome::TimedOut));
    assert_eq!(start.elapsed(), Duration::from_secs(120));
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 1);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_payload_is_an_error() {
    let h = harness();
    assert!(h.orchestrator.handle_payload(b"not json").await.is_err());
    assert_eq!(h.cache.calls(), 0);
}

#[tokio::test]
async fn test_payload_decoded_and_handled() {
    let h = harness();
    let payload = br#"{
        "type": "new",
        "after": {
            "id": "abc",
            "label": "car",
            "camera": "back",
            "start_time": 1700000000.0,
            "has_snapshot": true,
            "has_clip": false
        }
    }"#;

    let disposition = h.orchestrator.handle_payload(payload).await.unwrap();

    assert!(matches!(disposition, Disposition::Delivered));
    let sent = h.notifier.sent();
    assert!(matches!(
        &sent[..],
        [Sent::Photo(Destination { thread_id: Some(7), .. }, _)]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_clip_settings_respected() {
    let h = harness_with_config(
        RecordingCache::default(),
        MockFrigate::default(),
        MockNotifier::new(false),
        OrchestratorConfig::default()
            .with_clip_max_attempts(3)
            .with_clip_timeout(Duration::from_secs(60)),
    );

    let Disposition::ClipDispatched(task) = h
        .orchestrator
        .handle_event(event("abc", EventPhase::End, false, true))
        .await
    else {
        panic!("expected clip dispatch");
    };

    assert_eq!(task.join().await, Some(ClipOutcome::FetchFailed));
    assert_eq!(h.frigate.clip_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_caption_uses_timezone_adjust() {
    let h = harness_with_config(
        RecordingCache::default(),
        MockFrigate::default(),
        MockNotifier::new(false),
        OrchestratorConfig::default().with_timezone_adjust(2),
    );

    h.orchestrator
        .handle_event(event("abc", EventPhase::New, true, false))
        .await;

    assert_eq!(
        h.notifier.sent(),
        vec![Sent::Photo(
            front_topic(),
            "🎯 person\n📷 front\n🕒 15/11/2023 00:13:20".to_string()
        )]
    );
}
