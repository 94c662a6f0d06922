//! Message types exchanged between a consumer and its worker.

/// Position of a record in its partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// A record as read from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    /// `None` for tombstones.
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

impl InboundRecord {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            key: None,
            payload: None,
            headers: Vec::new(),
        }
    }

    pub fn with_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Last value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn position(&self) -> RecordOffset {
        RecordOffset {
            topic: self.topic.clone(),
            partition: self.partition,
            offset: self.offset,
        }
    }
}

/// Messages that flow between a consumer and its worker.
#[derive(Debug)]
pub enum StreamMessage {
    Record(InboundRecord),
    /// Sent back by the worker once a record has been dealt with.
    Acknowledgment {
        offset: RecordOffset,
        success: bool,
        error: Option<String>,
    },
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_takes_last_value() {
        let record = InboundRecord::new("adm_videos_mysql.adm_videos.genres", 0, 7)
            .with_header("catalog-attempt", "2")
            .with_header("catalog-attempt", "3");

        assert_eq!(record.header("catalog-attempt"), Some("3"));
        assert_eq!(record.header("missing"), None);
        assert_eq!(record.position().offset, 7);
    }
}
