//! Kafka consumer implementation for the catalog indexer.
//!
//! One instance backs one listener slot: it subscribes to the topics of a
//! single stage and commits manually, after the worker acknowledges.

use async_trait::async_trait;
use futures::StreamExt;
use rdkafka::{
    config::ClientConfig,
    consumer::{CommitMode, Consumer as _, StreamConsumer},
    message::{BorrowedMessage, Headers, Message as KafkaMessage},
    Offset, TopicPartitionList,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument};

use crate::consumer::{Consumer, InboundRecord, RecordOffset, StreamMessage};
use crate::errors::IngestError;

/// Connection settings shared by every consumer of the process.
#[derive(Debug, Clone)]
pub struct KafkaConsumerConfig {
    pub brokers: String,
    pub auto_offset_reset: String,
    pub allow_auto_create_topics: bool,
    pub session_timeout_ms: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub ssl_ca_pem: Option<String>,
}

impl KafkaConsumerConfig {
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            auto_offset_reset: "earliest".to_string(),
            allow_auto_create_topics: false,
            session_timeout_ms: 6000,
            username: None,
            password: None,
            ssl_ca_pem: None,
        }
    }
}

/// Kafka consumer for change records.
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    topics: Vec<String>,
}

impl KafkaConsumer {
    pub fn new(
        config: &KafkaConsumerConfig,
        group_id: &str,
        client_id: &str,
        topics: Vec<String>,
    ) -> Result<Self, IngestError> {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", group_id)
            .set("client.id", client_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set(
                "allow.auto.create.topics",
                config.allow_auto_create_topics.to_string(),
            )
            .set("session.timeout.ms", config.session_timeout_ms.to_string());

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

        let consumer: StreamConsumer = client_config
            .create()
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(
            brokers = %config.brokers,
            group_id = %group_id,
            client_id = %client_id,
            topics = ?topics,
            "Created Kafka consumer"
        );

        Ok(Self { consumer, topics })
    }

    fn commit(&self, offset: &RecordOffset) -> Result<(), IngestError> {
        let mut tpl = TopicPartitionList::new();
        tpl.add_partition_offset(&offset.topic, offset.partition, Offset::Offset(offset.offset + 1))?;
        self.consumer.commit(&tpl, CommitMode::Async)?;
        Ok(())
    }
}

fn to_record(msg: &BorrowedMessage<'_>) -> InboundRecord {
    let headers = msg
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|header| {
                    let value = header
                        .value
                        .map(|v| String::from_utf8_lossy(v).into_owned())
                        .unwrap_or_default();
                    (header.key.to_string(), value)
                })
                .collect()
        })
        .unwrap_or_default();

    InboundRecord {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(<[u8]>::to_vec),
        payload: msg.payload().map(<[u8]>::to_vec),
        headers,
    }
}

#[async_trait]
impl Consumer for KafkaConsumer {
    fn subscribe(&self) -> Result<(), IngestError> {
        let topics: Vec<&str> = self.topics.iter().map(|s| s.as_str()).collect();
        self.consumer
            .subscribe(&topics)
            .map_err(|e| IngestError::kafka(e.to_string()))?;

        info!(topics = ?self.topics, "Subscribed to Kafka topics");
        Ok(())
    }

    #[instrument(skip(self, sender, ack_receiver, shutdown), fields(topics = ?self.topics))]
    async fn run(
        &self,
        sender: mpsc::Sender<StreamMessage>,
        mut ack_receiver: mpsc::Receiver<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), IngestError> {
        let mut message_stream = self.consumer.stream();

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    // Uncommitted records are re-read from the last committed offset on restart.
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                ack_msg = ack_receiver.recv() => {
                    match ack_msg {
                        Some(StreamMessage::Acknowledgment { offset, success, error }) => {
                            if success {
                                if let Err(e) = self.commit(&offset) {
                                    error!(error = %e, topic = %offset.topic, offset = offset.offset, "Failed to commit offset");
                                } else {
                                    debug!(topic = %offset.topic, partition = offset.partition, offset = offset.offset, "Committed offset");
                                }
                            } else {
                                // Stop before a later ack commits past this offset; the
                                // group resumes from the last committed one.
                                error!(
                                    topic = %offset.topic,
                                    partition = offset.partition,
                                    offset = offset.offset,
                                    error = error.as_deref().unwrap_or("Unknown error"),
                                    "Record not settled, stopping consumer"
                                );
                                return Err(IngestError::kafka(format!(
                                    "record {}/{}@{} was not settled",
                                    offset.topic, offset.partition, offset.offset
                                )));
                            }
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Acknowledgment channel closed");
                            break;
                        }
                        _ => {}
                    }
                }
                message = message_stream.next() => {
                    match message {
                        Some(Ok(msg)) => {
                            debug!(
                                topic = %msg.topic(),
                                partition = msg.partition(),
                                offset = msg.offset(),
                                "Received message from Kafka"
                            );
                            let record = to_record(&msg);
                            sender
                                .send(StreamMessage::Record(record))
                                .await
                                .map_err(|e| IngestError::ChannelError(e.to_string()))?;
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Kafka error");
                            let _ = sender.send(StreamMessage::Error(e.to_string())).await;
                        }
                        None => {
                            info!("Kafka stream ended");
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}
