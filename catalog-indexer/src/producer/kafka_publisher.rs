//! Kafka publisher built on rdkafka's `FutureProducer`.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::message::{Header, OwnedHeaders, OwnedMessage};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, info};

use crate::errors::IngestError;
use crate::producer::{OutboundRecord, Publisher};

/// Configuration for creating a Kafka producer.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub broker: String,
    pub client_id: String,
    /// SASL username (enables SASL/SSL if set)
    pub username: Option<String>,
    pub password: Option<String>,
    /// Custom CA certificate in PEM format
    pub ssl_ca_pem: Option<String>,
    /// Upper bound on waiting for delivery of one record.
    pub delivery_timeout: Duration,
}

impl ProducerConfig {
    pub fn new(broker: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            broker: broker.into(),
            client_id: client_id.into(),
            username: None,
            password: None,
            ssl_ca_pem: None,
            delivery_timeout: Duration::from_secs(5),
        }
    }
}

/// Publishes records one at a time and waits for the delivery report of each.
///
/// A record only counts as published once the broker acknowledged it; a
/// report carrying an error (timeout, authorization, unknown topic) fails the
/// publication.
pub struct KafkaPublisher {
    producer: FutureProducer,
    delivery_timeout: Duration,
}

impl KafkaPublisher {
    pub fn new(config: &ProducerConfig) -> Result<Self, IngestError> {
        let mut client_config = ClientConfig::new();

        client_config
            .set("bootstrap.servers", &config.broker)
            .set("client.id", &config.client_id)
            .set("compression.type", "zstd")
            .set("message.timeout.ms", config.delivery_timeout.as_millis().to_string());

        // SASL/SSL for managed Kafka, plaintext otherwise
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            client_config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", username)
                .set("sasl.password", password);

            if let Some(ca_pem) = &config.ssl_ca_pem {
                client_config.set("ssl.ca.pem", ca_pem);
            }
        }

        let producer: FutureProducer = client_config.create()?;

        info!(broker = %config.broker, client_id = %config.client_id, "Created Kafka producer");

        Ok(Self {
            producer,
            delivery_timeout: config.delivery_timeout,
        })
    }
}

fn owned_headers(headers: &[(String, String)]) -> OwnedHeaders {
    headers
        .iter()
        .fold(OwnedHeaders::new_with_capacity(headers.len()), |acc, (key, value)| {
            acc.insert(Header {
                key: key.as_str(),
                value: Some(value.as_bytes()),
            })
        })
}

type DeliveryReport = Result<(i32, i64), (KafkaError, OwnedMessage)>;

fn delivered(topic: &str, report: DeliveryReport) -> Result<(i32, i64), IngestError> {
    report.map_err(|(e, _)| IngestError::publish(format!("{}: {}", topic, e)))
}

#[async_trait]
impl Publisher for KafkaPublisher {
    async fn publish(&self, record: OutboundRecord) -> Result<(), IngestError> {
        let mut future_record = FutureRecord::<[u8], [u8]>::to(&record.topic)
            .headers(owned_headers(&record.headers));
        if let Some(key) = record.key.as_deref() {
            future_record = future_record.key(key);
        }
        if let Some(payload) = record.payload.as_deref() {
            future_record = future_record.payload(payload);
        }

        let report = self
            .producer
            .send(future_record, Timeout::After(self.delivery_timeout))
            .await;
        let (partition, offset) = delivered(&record.topic, report)?;

        debug!(topic = %record.topic, partition, offset, "Record delivered");
        Ok(())
    }
}
