//! Clients for the indexing runtime: the source of per-chain sync facts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use chainstatus_core::StatusError;

use crate::facts::RuntimeIndexingFacts;

/// Anything that can report the indexing runtime's current sync facts.
#[async_trait]
pub trait IndexingRuntime: Send + Sync {
    async fn fetch_facts(&self) -> Result<RuntimeIndexingFacts, StatusError>;

    /// Where facts come from, for logs.
    fn url(&self) -> &str;
}

// ─── HTTP ─────────────────────────────────────────────────────────────────────

/// Configuration for [`HttpIndexingRuntime`].
#[derive(Debug, Clone)]
pub struct HttpRuntimeConfig {
    pub url: String,
    pub request_timeout: Duration,
}

impl HttpRuntimeConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Fetches facts as one JSON document with `GET {url}`.
pub struct HttpIndexingRuntime {
    url: String,
    http: reqwest::Client,
}

impl HttpIndexingRuntime {
    pub fn new(config: HttpRuntimeConfig) -> Result<Self, StatusError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StatusError::Runtime(format!("failed to build http client: {e}")))?;
        Ok(Self {
            url: config.url,
            http,
        })
    }
}

#[async_trait]
impl IndexingRuntime for HttpIndexingRuntime {
    async fn fetch_facts(&self) -> Result<RuntimeIndexingFacts, StatusError> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| StatusError::Runtime(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StatusError::Runtime(format!("HTTP {status}: {body}")));
        }

        resp.json::<RuntimeIndexingFacts>()
            .await
            .map_err(|e| StatusError::Decode(e.to_string()))
    }

    fn url(&self) -> &str {
        &self.url
    }
}

// ─── In-memory ────────────────────────────────────────────────────────────────

/// Runtime that serves whatever was last set. Useful for tests and local
/// development.
#[derive(Default)]
pub struct MemoryIndexingRuntime {
    next: Mutex<Option<Result<RuntimeIndexingFacts, StatusError>>>,
    calls: AtomicUsize,
}

impl MemoryIndexingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_facts(facts: RuntimeIndexingFacts) -> Self {
        let runtime = Self::new();
        runtime.set_facts(facts);
        runtime
    }

    pub fn set_facts(&self, facts: RuntimeIndexingFacts) {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner) = Some(Ok(facts));
    }

    pub fn set_error(&self, error: StatusError) {
        *self.next.lock().unwrap_or_else(PoisonError::into_inner) = Some(Err(error));
    }

    /// Number of fetches served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexingRuntime for MemoryIndexingRuntime {
    async fn fetch_facts(&self) -> Result<RuntimeIndexingFacts, StatusError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_else(|| Err(StatusError::Runtime("no facts available".into())))
    }

    fn url(&self) -> &str {
        "memory://"
    }
}
