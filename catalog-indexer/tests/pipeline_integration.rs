//! Integration tests for the change pipeline.
//!
//! These run the real Orchestrator, workers, listeners and retry escalation
//! against an in-memory broker, an in-memory search index and scripted
//! enrichment lookups.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, timeout};

use catalog_indexer::consumer::{Consumer, InboundRecord, RecordOffset, StreamMessage};
use catalog_indexer::dlt::{DeadLetterRecord, DeadLetterSink, KafkaDeadLetterSink};
use catalog_indexer::errors::IngestError;
use catalog_indexer::listener::{
    EntityListener, FailureClass, HandlerError, MessageHandler, Outcome,
};
use catalog_indexer::orchestrator::{Orchestrator, OrchestratorConfig, Worker};
use catalog_indexer::producer::{OutboundRecord, Publisher};
use catalog_indexer::retry::{
    RetryEscalator, RetryTopology, Stage, ATTEMPT, EXCEPTION_CLASS, ORIGINAL_OFFSET,
    ORIGINAL_TOPIC,
};
use catalog_indexer_client::{ClientConfig, ClientError, EntityClient, MockFetcher, ResilientClient};
use catalog_indexer_repository::{InMemoryProvider, SearchIndexGateway};
use catalog_indexer_shared::{Category, CategoryDocument, EntityKind};

const SOURCE: &str = "adm_videos_mysql.adm_videos.categories";

// In-memory broker: every produced record is logged and handed to the
// consumer subscribed to its topic, or buffered until one subscribes.
#[derive(Default)]
struct Broker {
    state: Mutex<BrokerState>,
}

#[derive(Default)]
struct BrokerState {
    log: Vec<InboundRecord>,
    offsets: HashMap<String, i64>,
    subscribers: HashMap<String, mpsc::UnboundedSender<InboundRecord>>,
    backlog: HashMap<String, Vec<InboundRecord>>,
    commits: Vec<RecordOffset>,
}

impl Broker {
    fn produce(&self, topic: &str, key: Option<Vec<u8>>, payload: Option<Vec<u8>>, headers: Vec<(String, String)>) {
        let mut state = self.state.lock().unwrap();
        let offset = {
            let next = state.offsets.entry(topic.to_string()).or_insert(0);
            let offset = *next;
            *next += 1;
            offset
        };

        let mut record = InboundRecord::new(topic, 0, offset);
        record.key = key;
        record.payload = payload;
        record.headers = headers;
        state.log.push(record.clone());

        let delivered = match state.subscribers.get(topic) {
            Some(subscriber) => subscriber.send(record.clone()).is_ok(),
            None => false,
        };
        if !delivered {
            state.backlog.entry(topic.to_string()).or_default().push(record);
        }
    }

    fn send(&self, topic: &str, payload: &[u8]) {
        self.produce(topic, Some(b"key".to_vec()), Some(payload.to_vec()), Vec::new());
    }

    fn subscribe(&self, topic: &str, subscriber: mpsc::UnboundedSender<InboundRecord>) {
        let mut state = self.state.lock().unwrap();
        for record in state.backlog.remove(topic).unwrap_or_default() {
            let _ = subscriber.send(record);
        }
        state.subscribers.insert(topic.to_string(), subscriber);
    }

    fn commit(&self, offset: RecordOffset) {
        self.state.lock().unwrap().commits.push(offset);
    }

    fn topics_in_order(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .map(|record| record.topic.clone())
            .collect()
    }

    fn records_on(&self, topic: &str) -> Vec<InboundRecord> {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|record| record.topic == topic)
            .cloned()
            .collect()
    }

    fn commits(&self) -> Vec<RecordOffset> {
        self.state.lock().unwrap().commits.clone()
    }
}

struct MockConsumer {
    broker: Arc<Broker>,
    topics: Vec<String>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<InboundRecord>>>,
}

impl MockConsumer {
    fn new(broker: Arc<Broker>, topics: Vec<String>) -> Self {
        Self {
            broker,
            topics,
            receiver: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Consumer for MockConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let (tx, rx) = mpsc::unbounded_channel();
        for topic in &self.topics {
            self.broker.subscribe(topic, tx.clone());
        }
        *self.receiver.lock().unwrap() = Some(rx);
        Ok(())
    }

    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| IngestError::kafka("run before subscribe"))?;

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                Some(ack) = ack_receiver.recv() => {
                    if let StreamMessage::Acknowledgment { offset, success: true, .. } = ack {
                        self.broker.commit(offset);
                    }
                }
                record = receiver.recv() => match record {
                    Some(record) => {
                        if sender.send(StreamMessage::Record(record)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        Ok(())
    }
}

// Fails the first `failures_left` publications, as a broker rejecting them.
struct BrokerPublisher {
    broker: Arc<Broker>,
    failures_left: AtomicUsize,
}

#[async_trait]
impl Publisher for BrokerPublisher {
    async fn publish(&self, record: OutboundRecord) -> Result<(), IngestError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(IngestError::publish(format!("{}: broker unavailable", record.topic)));
        }

        self.broker
            .produce(&record.topic, record.key, record.payload, record.headers);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingDeadLetters {
    records: Mutex<Vec<DeadLetterRecord>>,
}

#[async_trait]
impl DeadLetterSink for RecordingDeadLetters {
    async fn record(&self, record: &DeadLetterRecord) {
        self.records.lock().unwrap().push(record.clone());
    }
}

struct CountingHandler {
    inner: Arc<dyn MessageHandler>,
    calls: AtomicUsize,
}

#[async_trait]
impl MessageHandler for CountingHandler {
    fn kind(&self) -> EntityKind {
        self.inner.kind()
    }

    async fn handle(&self, payload: Option<&[u8]>) -> Result<Outcome, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.handle(payload).await
    }
}

// The categories service answering 503 to every lookup.
struct UnavailableService;

#[async_trait]
impl EntityClient<Category> for UnavailableService {
    async fn fetch(&self, id: &str) -> Result<Option<Category>, ClientError> {
        Err(ClientError::ServerError {
            namespace: "categories",
            id: id.to_string(),
            status: 503,
        })
    }
}

struct Pipeline {
    broker: Arc<Broker>,
    gateway: SearchIndexGateway<CategoryDocument>,
    handler: Arc<CountingHandler>,
    orchestrator: Orchestrator,
}

fn pipeline(client: Arc<dyn EntityClient<Category>>, dead_letters: Option<Arc<dyn DeadLetterSink>>) -> Pipeline {
    pipeline_with(client, dead_letters, 0)
}

fn pipeline_with(
    client: Arc<dyn EntityClient<Category>>,
    dead_letters: Option<Arc<dyn DeadLetterSink>>,
    publish_failures: usize,
) -> Pipeline {
    let broker = Arc::new(Broker::default());
    let gateway = SearchIndexGateway::<CategoryDocument>::new(Arc::new(InMemoryProvider::new()));
    let listener = EntityListener::new(client, Arc::new(gateway.clone()), Arc::new(gateway.clone()));
    let handler = Arc::new(CountingHandler {
        inner: Arc::new(listener),
        calls: AtomicUsize::new(0),
    });

    let publisher: Arc<dyn Publisher> = Arc::new(BrokerPublisher {
        broker: broker.clone(),
        failures_left: AtomicUsize::new(publish_failures),
    });
    let dead_letters: Arc<dyn DeadLetterSink> = match dead_letters {
        Some(sink) => sink,
        None => Arc::new(KafkaDeadLetterSink::new(publisher.clone())),
    };
    let topology = RetryTopology::new(4, Duration::from_millis(20), 2);
    let escalator = Arc::new(RetryEscalator::new(topology.clone(), publisher, dead_letters));

    let workers = topology
        .stages()
        .into_iter()
        .map(|stage| {
            let topics = topology.topics_for(stage, &[SOURCE.to_string()]);
            Worker::new(
                format!("categories-{}", stage),
                stage,
                Arc::new(MockConsumer::new(broker.clone(), topics)),
                handler.clone(),
                escalator.clone(),
            )
            .with_redelivery_backoff(Duration::from_millis(20))
        })
        .collect();

    let orchestrator = Orchestrator::with_config(
        workers,
        OrchestratorConfig {
            channel_buffer_size: 10,
            progress_interval: Duration::from_millis(100),
        },
    );

    Pipeline {
        broker,
        gateway,
        handler,
        orchestrator,
    }
}

/// Runs the orchestrator until `done` holds, then shuts it down.
async fn run_until(orchestrator: Orchestrator, done: impl Fn() -> bool) {
    let shutdown = orchestrator.shutdown_sender();
    let handle = tokio::spawn(async move {
        let mut orchestrator = orchestrator;
        orchestrator.run().await
    });

    timeout(Duration::from_secs(5), async {
        while !done() {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline did not reach the expected state");

    let _ = shutdown.send(());
    let result = timeout(Duration::from_secs(5), handle)
        .await
        .expect("orchestrator did not stop")
        .unwrap();
    assert!(result.is_ok());
}

fn upsert_event(id: &str) -> Vec<u8> {
    format!(
        r#"{{"payload": {{"before": null, "after": {{"id": "{}", "name": "Movies"}}, "source": {{"table": "categories"}}, "op": "c"}}}}"#,
        id
    )
    .into_bytes()
}

fn delete_event(id: &str) -> Vec<u8> {
    format!(
        r#"{{"payload": {{"before": {{"id": "{}", "name": "Movies"}}, "after": null, "op": "d"}}}}"#,
        id
    )
    .into_bytes()
}

fn category(id: &str) -> Category {
    Category {
        id: id.to_string(),
        name: "Movies".to_string(),
        description: Some("Feature films".to_string()),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        deleted_at: None,
    }
}

fn resilient(fetcher: Arc<MockFetcher<Category>>) -> Arc<dyn EntityClient<Category>> {
    Arc::new(ResilientClient::new(
        fetcher,
        &ClientConfig::new("http://categories.test/api/categories"),
    ))
}

#[tokio::test]
async fn test_applies_upserts_and_deletes() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.register("c1", category("c1"));
    let pipeline = pipeline(resilient(fetcher.clone()), None);
    pipeline
        .gateway
        .upsert(&CategoryDocument::from(category("c2")))
        .await
        .unwrap();

    pipeline.broker.send(SOURCE, &upsert_event("c1"));
    pipeline.broker.send(SOURCE, &delete_event("c2"));

    let stats = pipeline.orchestrator.stats();
    let watched = stats.clone();
    let broker = pipeline.broker.clone();
    run_until(pipeline.orchestrator, move || {
        watched.snapshot().applied == 2 && broker.commits().len() == 2
    })
    .await;

    let stored = pipeline.gateway.find_by_id("c1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Movies");
    assert!(stored.active);
    assert!(pipeline.gateway.find_by_id("c2").await.unwrap().is_none());

    // Deletes never reach the enrichment service.
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        pipeline.broker.topics_in_order(),
        vec![SOURCE.to_string(), SOURCE.to_string()]
    );
    assert_eq!(fetcher.calls(), 4);

    let committed: Vec<i64> = pipeline.broker.commits().iter().map(|c| c.offset).collect();
    assert_eq!(committed, vec![0, 1]);
    assert_eq!(stats.snapshot().received, 2);
}

#[tokio::test]
async fn test_unknown_entity_is_skipped() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = pipeline(resilient(fetcher.clone()), None);

    pipeline.broker.send(SOURCE, &upsert_event("c9"));

    let stats = pipeline.orchestrator.stats();
    let watched = stats.clone();
    let broker = pipeline.broker.clone();
    run_until(pipeline.orchestrator, move || {
        watched.snapshot().skipped == 1 && broker.commits().len() == 1
    })
    .await;

    assert!(pipeline.gateway.find_by_id("c9").await.unwrap().is_none());
    assert_eq!(fetcher.calls(), 1);
    assert_eq!(pipeline.broker.topics_in_order(), vec![SOURCE]);
    assert_eq!(stats.snapshot().applied, 0);
    assert_eq!(pipeline.broker.commits().len(), 1);
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged_without_work() {
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = pipeline(resilient(fetcher.clone()), None);

    pipeline.broker.produce(SOURCE, None, None, Vec::new());

    let stats = pipeline.orchestrator.stats();
    let watched = stats.clone();
    let broker = pipeline.broker.clone();
    run_until(pipeline.orchestrator, move || broker.commits().len() == 1).await;

    assert_eq!(fetcher.calls(), 0);
    assert_eq!(stats.snapshot().skipped, 1);
}

#[tokio::test]
async fn test_transient_failure_recovers_on_first_retry_stage() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.register("c1", category("c1"));
    // Both in-process attempts of the first pass fail.
    for _ in 0..2 {
        fetcher.push_result(
            "c1",
            Err(ClientError::ServerError {
                namespace: "categories",
                id: "c1".to_string(),
                status: 502,
            }),
        );
    }
    let pipeline = pipeline(resilient(fetcher.clone()), None);

    pipeline.broker.send(SOURCE, &upsert_event("c1"));

    let stats = pipeline.orchestrator.stats();
    let watched = stats.clone();
    run_until(pipeline.orchestrator, move || watched.snapshot().applied == 1).await;

    let retry_topic = format!("{}-retry-0", SOURCE);
    assert_eq!(
        pipeline.broker.topics_in_order(),
        vec![SOURCE.to_string(), retry_topic.clone()]
    );
    let retried = pipeline.broker.records_on(&retry_topic);
    assert_eq!(retried[0].header(ATTEMPT), Some("2"));
    assert_eq!(retried[0].header(EXCEPTION_CLASS), Some("transient"));
    assert_eq!(retried[0].key.as_deref(), Some(&b"key"[..]));

    assert!(pipeline.gateway.find_by_id("c1").await.unwrap().is_some());
    assert_eq!(pipeline.handler.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(stats.snapshot().escalated, 1);
}

#[tokio::test]
async fn test_exhausted_retries_reach_dead_letter_topic() {
    let pipeline = pipeline(Arc::new(UnavailableService), None);
    let payload = upsert_event("c1");

    pipeline.broker.send(SOURCE, &payload);

    let broker = pipeline.broker.clone();
    let dlt = format!("{}-dlt", SOURCE);
    let watched_dlt = dlt.clone();
    let stats = pipeline.orchestrator.stats();
    run_until(pipeline.orchestrator, move || {
        !broker.records_on(&watched_dlt).is_empty()
    })
    .await;

    assert_eq!(
        pipeline.broker.topics_in_order(),
        vec![
            SOURCE.to_string(),
            format!("{}-retry-0", SOURCE),
            format!("{}-retry-1", SOURCE),
            format!("{}-retry-2", SOURCE),
            dlt.clone(),
        ]
    );
    assert_eq!(pipeline.handler.calls.load(Ordering::SeqCst), 4);

    let dead = pipeline.broker.records_on(&dlt);
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].payload.as_deref(), Some(payload.as_slice()));
    assert_eq!(dead[0].header(ORIGINAL_TOPIC), Some(SOURCE));
    assert_eq!(dead[0].header(ORIGINAL_OFFSET), Some("0"));
    assert_eq!(dead[0].header(ATTEMPT), Some("4"));
    assert_eq!(dead[0].header(EXCEPTION_CLASS), Some("transient"));
    assert_eq!(dead[0].header("catalog-failed-stage"), Some("retry-2"));

    let totals = stats.snapshot();
    assert_eq!(totals.received, 4);
    assert_eq!(totals.escalated, 3);
    assert_eq!(totals.dead_lettered, 1);
    assert_eq!(totals.failed, 0);
    assert!(pipeline.gateway.find_by_id("c1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_malformed_event_is_dead_lettered_immediately() {
    let fetcher = Arc::new(MockFetcher::new());
    let dead_letters = Arc::new(RecordingDeadLetters::default());
    let sink: Arc<dyn DeadLetterSink> = dead_letters.clone();
    let pipeline = pipeline(resilient(fetcher.clone()), Some(sink));

    pipeline.broker.send(SOURCE, b"{not json");

    let watched = dead_letters.clone();
    let broker = pipeline.broker.clone();
    run_until(pipeline.orchestrator, move || {
        !watched.records.lock().unwrap().is_empty() && broker.commits().len() == 1
    })
    .await;

    let records = dead_letters.records.lock().unwrap().clone();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].stage, Stage::Main);
    assert_eq!(records[0].attempts, 1);
    assert_eq!(records[0].error_class, FailureClass::Permanent);
    assert_eq!(records[0].replay_target(), SOURCE);

    assert_eq!(pipeline.broker.topics_in_order(), vec![SOURCE]);
    assert_eq!(pipeline.handler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.calls(), 0);
    // The record is acknowledged once it is parked.
    assert_eq!(pipeline.broker.commits().len(), 1);
}

#[tokio::test]
async fn test_failed_escalation_is_handled_again_before_later_records() {
    let fetcher = Arc::new(MockFetcher::new());
    fetcher.register("c1", category("c1"));
    fetcher.register("c2", category("c2"));
    for _ in 0..2 {
        fetcher.push_result(
            "c1",
            Err(ClientError::ServerError {
                namespace: "categories",
                id: "c1".to_string(),
                status: 502,
            }),
        );
    }
    // The retry-0 publication of c1 is rejected.
    let pipeline = pipeline_with(resilient(fetcher.clone()), None, 1);

    pipeline.broker.send(SOURCE, &upsert_event("c1"));
    pipeline.broker.send(SOURCE, &upsert_event("c2"));

    let stats = pipeline.orchestrator.stats();
    let watched = stats.clone();
    let broker = pipeline.broker.clone();
    run_until(pipeline.orchestrator, move || {
        watched.snapshot().applied == 2 && broker.commits().len() == 2
    })
    .await;

    assert!(pipeline.gateway.find_by_id("c1").await.unwrap().is_some());
    assert!(pipeline.gateway.find_by_id("c2").await.unwrap().is_some());

    // c1 settles before c2 is touched, so no commit ever skips it.
    let committed: Vec<i64> = pipeline.broker.commits().iter().map(|c| c.offset).collect();
    assert_eq!(committed, vec![0, 1]);
    assert_eq!(pipeline.handler.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        pipeline.broker.topics_in_order(),
        vec![SOURCE.to_string(), SOURCE.to_string()]
    );
    assert_eq!(fetcher.calls(), 4);

    let totals = stats.snapshot();
    assert_eq!(totals.failed, 1);
    assert_eq!(totals.escalated, 0);
    assert_eq!(totals.received, 2);
}
