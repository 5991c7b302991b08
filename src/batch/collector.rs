//! Batch collector.

use crate::transport::HttpMethod;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::oneshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_batch_size: usize,
    /// Window opened by the first enqueue; the batch is dispatched when it closes.
    pub batch_delay: Duration,
}
impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            batch_delay: Duration::from_millis(50),
        }
    }
}
impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_batch_size(mut self, s: usize) -> Self {
        self.max_batch_size = s.max(1);
        self
    }
    pub fn with_batch_delay(mut self, d: Duration) -> Self {
        self.batch_delay = d;
        self
    }
}

/// One request waiting in a batch window, as sent to the batch endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub method: HttpMethod,
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl BatchItem {
    pub fn new(id: impl Into<String>, method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method,
            endpoint: endpoint.into(),
            body: None,
            headers: HashMap::new(),
        }
    }
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

pub(crate) struct Pending {
    pub item: BatchItem,
    pub tx: oneshot::Sender<Result<Value>>,
}

/// Queue of pending items for the current window.
pub(crate) struct BatchCollector {
    config: BatchConfig,
    items: VecDeque<Pending>,
}

impl BatchCollector {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            items: VecDeque::new(),
        }
    }

    pub fn add(&mut self, pending: Pending) -> BatchAddResult {
        self.items.push_back(pending);
        let count = self.items.len();
        if count >= self.config.max_batch_size {
            BatchAddResult::ShouldFlush { count }
        } else {
            BatchAddResult::Added { count }
        }
    }

    /// Take up to one full batch from the front of the queue.
    pub fn take_batch(&mut self) -> Vec<Pending> {
        let n = self.items.len().min(self.config.max_batch_size);
        self.items.drain(..n).collect()
    }

    /// Take everything, split into batches of at most `max_batch_size`.
    pub fn drain_chunks(&mut self) -> Vec<Vec<Pending>> {
        let mut chunks = Vec::new();
        while !self.items.is_empty() {
            chunks.push(self.take_batch());
        }
        chunks
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchAddResult { Added { count: usize }, ShouldFlush { count: usize } }
impl BatchAddResult { pub fn should_flush(&self) -> bool { matches!(self, BatchAddResult::ShouldFlush { .. }) } pub fn count(&self) -> usize { match self { BatchAddResult::Added { count } | BatchAddResult::ShouldFlush { count } => *count } } }
