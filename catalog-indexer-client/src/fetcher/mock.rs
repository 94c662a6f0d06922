//! Mock fetcher for testing without network access.
//!
//! Entities registered with [`MockFetcher::register`] are returned on every
//! lookup; anything else is "not found". Scripted results queued with
//! [`MockFetcher::push_result`] take precedence and are consumed once each.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use crate::errors::ClientError;
use crate::fetcher::EntityFetcher;

pub struct MockFetcher<E> {
    entities: RwLock<HashMap<String, E>>,
    scripted: RwLock<HashMap<String, VecDeque<Result<Option<E>, ClientError>>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl<E: Clone + Send + Sync + 'static> MockFetcher<E> {
    pub fn new() -> Self {
        Self {
            entities: RwLock::new(HashMap::new()),
            scripted: RwLock::new(HashMap::new()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entities(entities: impl IntoIterator<Item = (String, E)>) -> Self {
        let fetcher = Self::new();
        for (id, entity) in entities {
            fetcher.register(&id, entity);
        }
        fetcher
    }

    /// Every lookup sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn register(&self, id: &str, entity: E) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), entity);
    }

    pub fn remove(&self, id: &str) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Queues a one-shot result for `id`.
    pub fn push_result(&self, id: &str, result: Result<Option<E>, ClientError>) {
        self.scripted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Number of lookups served so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<E: Clone + Send + Sync + 'static> Default for MockFetcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Clone + Send + Sync + 'static> EntityFetcher<E> for MockFetcher<E> {
    async fn fetch(&self, id: &str) -> Result<Option<E>, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(id)
            .and_then(VecDeque::pop_front);
        if let Some(result) = scripted {
            return result;
        }

        Ok(self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned())
    }
}
