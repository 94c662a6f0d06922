//! Process configuration, read once from the environment at startup.

use catalog_indexer_client::{
    BulkheadConfig, CacheConfig, CircuitBreakerConfig, ClientConfig, RetryConfig,
};
use catalog_indexer_shared::EntityKind;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::consumer::KafkaConsumerConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::producer::ProducerConfig;
use crate::retry::RetryTopology;

pub const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";
pub const DEFAULT_KAFKA_GROUP_ID: &str = "catalog-indexer";
pub const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";
pub const DEFAULT_TOPIC_PREFIX: &str = "adm_videos_mysql.adm_videos";
pub const DEFAULT_ENRICHMENT_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_REDELIVERY_BACKOFF_MS: u64 = 1000;

/// Connection mode for OpenSearch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Ok(Self::FailFast),
            "retry" => Ok(Self::Retry),
            other => Err(format!("unknown connection mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexBackend {
    OpenSearch,
    /// Process-local index, for development.
    Memory,
}

impl FromStr for IndexBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opensearch" => Ok(Self::OpenSearch),
            "memory" | "in-memory" => Ok(Self::Memory),
            other => Err(format!("unknown index backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterMode {
    Log,
    Kafka,
}

impl FromStr for DeadLetterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "kafka" => Ok(Self::Kafka),
            other => Err(format!("unknown dead-letter mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KafkaSettings {
    pub consumer: KafkaConsumerConfig,
    pub group_id: String,
}

impl KafkaSettings {
    pub fn producer_config(&self, client_id: impl Into<String>) -> ProducerConfig {
        let mut config = ProducerConfig::new(self.consumer.brokers.clone(), client_id);
        config.username = self.consumer.username.clone();
        config.password = self.consumer.password.clone();
        config.ssl_ca_pem = self.consumer.ssl_ca_pem.clone();
        config
    }
}

#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub backend: IndexBackend,
    pub url: String,
    pub connection_mode: ConnectionMode,
    pub retry_interval: Duration,
    pub version: u32,
}

#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub enabled: bool,
    pub topics: Vec<String>,
    /// Listener instances per stage.
    pub concurrency: usize,
    pub topology: RetryTopology,
    /// Pause before a record whose escalation failed is handled again.
    pub redelivery_backoff: Duration,
}

#[derive(Debug, Clone)]
pub struct EntitySettings {
    pub kind: EntityKind,
    pub listener: ListenerSettings,
    pub client: ClientConfig,
}

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub kafka: KafkaSettings,
    pub index: IndexSettings,
    pub dead_letter: DeadLetterMode,
    pub orchestrator: OrchestratorConfig,
    pub entities: Vec<EntitySettings>,
}

impl IndexerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `KAFKA_BROKER`, `KAFKA_GROUP_ID`, `KAFKA_AUTO_OFFSET_RESET`,
    ///   `KAFKA_AUTO_CREATE_TOPICS`, `KAFKA_SESSION_TIMEOUT_MS`
    /// - `KAFKA_USERNAME`, `KAFKA_PASSWORD`, `KAFKA_SSL_CA_PEM`: enable SASL/SSL
    /// - `INDEX_BACKEND`: `opensearch` (default) or `memory`
    /// - `OPENSEARCH_URL`, `OPENSEARCH_CONNECTION_MODE`, `OPENSEARCH_RETRY_INTERVAL_SECS`, `INDEX_VERSION`
    /// - `DEAD_LETTER_MODE`: `kafka` (default) or `log`
    /// - `CHANNEL_BUFFER_SIZE`, `PROGRESS_INTERVAL_SECS`
    /// - `ENRICHMENT_BASE_URL`: default root of the per-kind base URLs
    /// - Per kind, prefixed with `CATEGORIES_`, `CAST_MEMBERS_`, `GENRES_` or `VIDEOS_`:
    ///   `ENABLED`, `TOPICS`, `CONCURRENCY`, `MAX_ATTEMPTS`, `BACKOFF_DELAY_MS`,
    ///   `BACKOFF_MULTIPLIER`, `BASE_URL`, `READ_TIMEOUT_MS`, `BEARER_TOKEN`,
    ///   `CACHE_MAX_ENTRIES`, `CACHE_TTL_SECS`, `RETRY_MAX_ATTEMPTS`, `RETRY_WAIT_MS`,
    ///   `BULKHEAD_MAX_CONCURRENT_CALLS`, `CB_SLIDING_WINDOW_SIZE`, `CB_MINIMUM_CALLS`,
    ///   `CB_FAILURE_RATE_THRESHOLD`, `CB_WAIT_OPEN_SECS`, `CB_HALF_OPEN_CALLS`,
    ///   `REDELIVERY_BACKOFF_MS`
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        let mut consumer = KafkaConsumerConfig::new(env.string("KAFKA_BROKER", DEFAULT_KAFKA_BROKER));
        consumer.auto_offset_reset = env.string("KAFKA_AUTO_OFFSET_RESET", "earliest");
        consumer.allow_auto_create_topics = env.parse("KAFKA_AUTO_CREATE_TOPICS", false);
        consumer.session_timeout_ms = env.parse("KAFKA_SESSION_TIMEOUT_MS", 6000);
        consumer.username = env.optional("KAFKA_USERNAME");
        consumer.password = env.optional("KAFKA_PASSWORD");
        consumer.ssl_ca_pem = env.optional("KAFKA_SSL_CA_PEM");

        let kafka = KafkaSettings {
            consumer,
            group_id: env.string("KAFKA_GROUP_ID", DEFAULT_KAFKA_GROUP_ID),
        };

        let index = IndexSettings {
            backend: env.parse("INDEX_BACKEND", IndexBackend::OpenSearch),
            url: env.string("OPENSEARCH_URL", DEFAULT_OPENSEARCH_URL),
            connection_mode: env.parse("OPENSEARCH_CONNECTION_MODE", ConnectionMode::Retry),
            retry_interval: Duration::from_secs(
                env.parse("OPENSEARCH_RETRY_INTERVAL_SECS", DEFAULT_RETRY_INTERVAL_SECS),
            ),
            version: env.parse("INDEX_VERSION", 0),
        };

        let orchestrator_defaults = OrchestratorConfig::default();
        let orchestrator = OrchestratorConfig {
            channel_buffer_size: env
                .parse("CHANNEL_BUFFER_SIZE", orchestrator_defaults.channel_buffer_size)
                .max(1),
            progress_interval: Duration::from_secs(
                env.parse(
                    "PROGRESS_INTERVAL_SECS",
                    orchestrator_defaults.progress_interval.as_secs(),
                )
                .max(1),
            ),
        };

        let enrichment_root = env.string("ENRICHMENT_BASE_URL", DEFAULT_ENRICHMENT_URL);
        let entities = EntityKind::ALL
            .iter()
            .map(|kind| entity_settings(&env, *kind, &enrichment_root))
            .collect();

        Self {
            kafka,
            index,
            dead_letter: env.parse("DEAD_LETTER_MODE", DeadLetterMode::Kafka),
            orchestrator,
            entities,
        }
    }

    pub fn entity(&self, kind: EntityKind) -> Option<&EntitySettings> {
        self.entities.iter().find(|settings| settings.kind == kind)
    }
}

fn entity_settings<F>(env: &EnvReader<F>, kind: EntityKind, enrichment_root: &str) -> EntitySettings
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = kind.env_prefix();
    let key = |suffix: &str| format!("{}_{}", prefix, suffix);

    let topology = RetryTopology::new(
        env.parse(&key("MAX_ATTEMPTS"), 4),
        Duration::from_millis(env.parse(&key("BACKOFF_DELAY_MS"), 1000)),
        env.parse(&key("BACKOFF_MULTIPLIER"), 2),
    );

    let listener = ListenerSettings {
        enabled: env.parse(&key("ENABLED"), true),
        topics: env.list(
            &key("TOPICS"),
            vec![format!("{}.{}", DEFAULT_TOPIC_PREFIX, kind.namespace())],
        ),
        concurrency: env.parse(&key("CONCURRENCY"), 1usize).max(1),
        topology,
        redelivery_backoff: Duration::from_millis(
            env.parse(&key("REDELIVERY_BACKOFF_MS"), DEFAULT_REDELIVERY_BACKOFF_MS).max(1),
        ),
    };

    let breaker_defaults = CircuitBreakerConfig::default();
    let circuit_breaker = CircuitBreakerConfig::default()
        .with_sliding_window_size(
            env.parse(&key("CB_SLIDING_WINDOW_SIZE"), breaker_defaults.sliding_window_size),
        )
        .with_minimum_number_of_calls(
            env.parse(&key("CB_MINIMUM_CALLS"), breaker_defaults.minimum_number_of_calls),
        )
        .with_failure_rate_threshold(
            env.parse(&key("CB_FAILURE_RATE_THRESHOLD"), breaker_defaults.failure_rate_threshold),
        )
        .with_wait_duration_in_open_state(Duration::from_secs(env.parse(
            &key("CB_WAIT_OPEN_SECS"),
            breaker_defaults.wait_duration_in_open_state.as_secs(),
        )))
        .with_permitted_calls_in_half_open_state(env.parse(
            &key("CB_HALF_OPEN_CALLS"),
            breaker_defaults.permitted_calls_in_half_open_state,
        ));
    if circuit_breaker.minimum_number_of_calls > circuit_breaker.sliding_window_size {
        warn!(
            kind = %kind,
            minimum_number_of_calls = circuit_breaker.minimum_number_of_calls,
            sliding_window_size = circuit_breaker.sliding_window_size,
            "Circuit breaker minimum calls exceeds the window, using the window size"
        );
    }
    let circuit_breaker = circuit_breaker.normalized();

    let bulkhead_size = env.parse(
        &key("BULKHEAD_MAX_CONCURRENT_CALLS"),
        BulkheadConfig::default().max_concurrent_calls,
    );
    if bulkhead_size == 0 {
        warn!(kind = %kind, "Bulkhead size of 0 would reject every call, using 1");
    }

    let cache_defaults = CacheConfig::default();
    let retry_defaults = RetryConfig::default();

    let mut client = ClientConfig::new(env.string(
        &key("BASE_URL"),
        &format!("{}/{}", enrichment_root.trim_end_matches('/'), kind.namespace()),
    ))
    .with_read_timeout(Duration::from_millis(env.parse(&key("READ_TIMEOUT_MS"), 1000)))
    .with_cache(CacheConfig {
        max_entries: env.parse(&key("CACHE_MAX_ENTRIES"), cache_defaults.max_entries),
        ttl: Duration::from_secs(env.parse(&key("CACHE_TTL_SECS"), cache_defaults.ttl.as_secs())),
    })
    .with_retry(RetryConfig {
        max_attempts: env.parse(&key("RETRY_MAX_ATTEMPTS"), retry_defaults.max_attempts),
        wait: Duration::from_millis(env.parse(
            &key("RETRY_WAIT_MS"),
            retry_defaults.wait.as_millis() as u64,
        )),
    })
    .with_bulkhead(BulkheadConfig {
        max_concurrent_calls: bulkhead_size.max(1),
    })
    .with_circuit_breaker(circuit_breaker);

    if let Some(token) = env.optional(&key("BEARER_TOKEN")) {
        client = client.with_bearer_token(token);
    }

    EntitySettings {
        kind,
        listener,
        client,
    }
}

struct EnvReader<F: Fn(&str) -> Option<String>> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    /// Set and not blank.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.optional(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, name: &str, default: T) -> T
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(name) {
            None => default,
            Some(raw) => match raw.parse::<T>() {
                Ok(value) => value,
                Err(e) => {
                    warn!(variable = name, value = %raw, error = %e, "Invalid value, using default");
                    default
                }
            },
        }
    }

    /// Comma-separated list.
    fn list(&self, name: &str, default: Vec<String>) -> Vec<String> {
        let values: Vec<String> = self
            .optional(name)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if values.is_empty() {
            default
        } else {
            values
        }
    }
}
