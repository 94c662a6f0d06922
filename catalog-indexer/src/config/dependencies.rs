//! Dependency initialization and wiring for the catalog indexer.

use catalog_indexer_client::{ResilientClient, Resource};
use catalog_indexer_repository::opensearch::IndexConfig;
use catalog_indexer_repository::{
    InMemoryProvider, OpenSearchProvider, SearchIndexGateway, SearchIndexProvider,
};
use catalog_indexer_shared::{
    CastMember, CastMemberDocument, Category, CategoryDocument, EntityKind, Genre, GenreDocument,
    SearchDocument, Video, VideoDocument,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{ConnectionMode, DeadLetterMode, EntitySettings, IndexBackend, IndexerConfig};
use crate::consumer::KafkaConsumer;
use crate::dlt::{DeadLetterSink, KafkaDeadLetterSink, LoggingDeadLetterSink};
use crate::listener::{EntityListener, MessageHandler};
use crate::orchestrator::{Orchestrator, Worker};
use crate::producer::{KafkaPublisher, Publisher};
use crate::retry::RetryEscalator;
use crate::IndexingError;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Builds the search backend, the producer and one worker per stage and
    /// concurrency slot of every enabled entity kind.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails (only in fail-fast mode for OpenSearch)
    pub async fn new(config: IndexerConfig) -> Result<Self, IndexingError> {
        info!(
            kafka_broker = %config.kafka.consumer.brokers,
            kafka_group_id = %config.kafka.group_id,
            index_backend = ?config.index.backend,
            opensearch_url = %config.index.url,
            connection_mode = ?config.index.connection_mode,
            dead_letter_mode = ?config.dead_letter,
            "Initializing dependencies"
        );

        let provider = Self::search_provider(&config).await?;
        for kind in EntityKind::ALL {
            provider.ensure_index_exists(kind).await.map_err(|e| {
                IndexingError::config(format!("Failed to ensure {} index exists: {}", kind, e))
            })?;
        }

        let publisher: Arc<dyn Publisher> = Arc::new(
            KafkaPublisher::new(
                &config
                    .kafka
                    .producer_config(format!("catalog-indexer-producer-{}", Uuid::new_v4())),
            )
            .map_err(|e| IndexingError::config(format!("Failed to create Kafka producer: {}", e)))?,
        );

        let dead_letters: Arc<dyn DeadLetterSink> = match config.dead_letter {
            DeadLetterMode::Kafka => Arc::new(KafkaDeadLetterSink::new(publisher.clone())),
            DeadLetterMode::Log => Arc::new(LoggingDeadLetterSink),
        };

        let mut workers = Vec::new();
        for settings in &config.entities {
            if !settings.listener.enabled {
                info!(kind = %settings.kind, "Listener disabled");
                continue;
            }

            let handler = match settings.kind {
                EntityKind::Category => {
                    Self::listener::<Category, CategoryDocument>(settings, &provider)?
                }
                EntityKind::CastMember => {
                    Self::listener::<CastMember, CastMemberDocument>(settings, &provider)?
                }
                EntityKind::Genre => Self::listener::<Genre, GenreDocument>(settings, &provider)?,
                EntityKind::Video => Self::listener::<Video, VideoDocument>(settings, &provider)?,
            };

            let escalator = Arc::new(RetryEscalator::new(
                settings.listener.topology.clone(),
                publisher.clone(),
                dead_letters.clone(),
            ));

            workers.extend(Self::workers(&config, settings, handler, escalator)?);
        }

        if workers.is_empty() {
            return Err(IndexingError::config("No listener is enabled"));
        }

        info!(workers = workers.len(), "Kafka consumers created");

        let orchestrator = Orchestrator::with_config(workers, config.orchestrator.clone());

        Ok(Self { orchestrator })
    }

    fn listener<E, D>(
        settings: &EntitySettings,
        provider: &Arc<dyn SearchIndexProvider>,
    ) -> Result<Arc<dyn MessageHandler>, IndexingError>
    where
        E: Resource,
        D: SearchDocument + From<E> + 'static,
    {
        let client = ResilientClient::<E>::http(&settings.client).map_err(|e| {
            IndexingError::config(format!("Failed to create {} client: {}", settings.kind, e))
        })?;
        let gateway = Arc::new(SearchIndexGateway::<D>::new(provider.clone()));

        info!(
            kind = %settings.kind,
            base_url = %settings.client.base_url,
            "Enrichment client created"
        );

        Ok(Arc::new(EntityListener::new(
            Arc::new(client),
            gateway.clone(),
            gateway,
        )))
    }

    fn workers(
        config: &IndexerConfig,
        settings: &EntitySettings,
        handler: Arc<dyn MessageHandler>,
        escalator: Arc<RetryEscalator>,
    ) -> Result<Vec<Worker>, IndexingError> {
        let topology = &settings.listener.topology;
        let mut workers = Vec::new();

        for stage in topology.stages() {
            let topics = topology.topics_for(stage, &settings.listener.topics);
            let group_id = topology.group_id(&config.kafka.group_id, stage);

            for slot in 0..settings.listener.concurrency {
                let name = format!("{}-{}-{}", settings.kind, stage, slot);
                let client_id = format!("catalog-indexer-{}-{}", name, Uuid::new_v4());
                let consumer =
                    KafkaConsumer::new(&config.kafka.consumer, &group_id, &client_id, topics.clone())
                        .map_err(|e| {
                            IndexingError::config(format!(
                                "Failed to create Kafka consumer {}: {}",
                                name, e
                            ))
                        })?;

                workers.push(
                    Worker::new(
                        name,
                        stage,
                        Arc::new(consumer),
                        handler.clone(),
                        escalator.clone(),
                    )
                    .with_redelivery_backoff(settings.listener.redelivery_backoff),
                );
            }
        }

        Ok(workers)
    }

    async fn search_provider(
        config: &IndexerConfig,
    ) -> Result<Arc<dyn SearchIndexProvider>, IndexingError> {
        match config.index.backend {
            IndexBackend::Memory => {
                warn!("Using the in-memory search index, documents are not persisted");
                Ok(Arc::new(InMemoryProvider::new()))
            }
            IndexBackend::OpenSearch => {
                let indexes: Vec<IndexConfig> = EntityKind::ALL
                    .iter()
                    .map(|kind| IndexConfig::for_kind(*kind, config.index.version))
                    .collect();
                let provider = Self::connect_to_opensearch(
                    &config.index.url,
                    indexes,
                    config.index.connection_mode,
                    config.index.retry_interval,
                )
                .await?;
                info!("OpenSearch connection established");
                Ok(Arc::new(provider))
            }
        }
    }

    /// Connect to OpenSearch with retry logic based on connection mode.
    async fn connect_to_opensearch(
        url: &str,
        indexes: Vec<IndexConfig>,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, IndexingError> {
        loop {
            match OpenSearchProvider::new(url, indexes.clone()).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(IndexingError::config(format!(
                            "Failed to connect to OpenSearch: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            opensearch_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to OpenSearch, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
