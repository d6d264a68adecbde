//! Best-effort event reporting.
//!
//! Events go to an external backend keyed by battle id. Reporting never blocks
//! the caller and never fails it: the HTTP reporter spawns a task per event
//! and only logs delivery failures. Deliveries are chained so the backend sees
//! events in the order they were reported, and [`EventReporter::flush`] waits
//! for whatever is still in flight.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::ConfigError;

/// Default timeout for one event delivery.
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(10);
/// Markdown bodies longer than this are truncated before sending.
pub const MAX_MARKDOWN_CHARS: usize = 10_000;

/// One reported event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    pub is_result: bool,
    pub message: String,
    pub reported_by: String,
    /// RFC 3339 UTC timestamp with a `Z` suffix.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown_content: Option<String>,
}

impl RunEvent {
    /// A progress event stamped with the current time.
    pub fn new(reported_by: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            is_result: false,
            message: message.into(),
            reported_by: reported_by.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            detail: None,
            markdown_content: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Attaches a markdown body, truncated to [`MAX_MARKDOWN_CHARS`].
    pub fn with_markdown(mut self, markdown: impl Into<String>) -> Self {
        let markdown = markdown.into();
        let markdown = match markdown.char_indices().nth(MAX_MARKDOWN_CHARS) {
            Some((cut, _)) => markdown[..cut].to_string(),
            None => markdown,
        };
        self.markdown_content = Some(markdown);
        self
    }

    /// Marks the event as the final result of a run.
    pub fn as_result(mut self) -> Self {
        self.is_result = true;
        self
    }
}

/// Sink for run events.
#[async_trait]
pub trait EventReporter: Send + Sync {
    /// Records an event for `battle_id`. Without a battle id nothing is sent.
    ///
    /// Implementations return promptly and swallow delivery failures.
    async fn report(&self, battle_id: Option<&str>, event: RunEvent);

    /// Waits up to `timeout` for reported events to be delivered.
    async fn flush(&self, _timeout: Duration) {}
}

/// Reporter posting events to `{backend}/battles/{battle_id}`.
pub struct HttpEventReporter {
    backend_url: String,
    http_client: Client,
    /// Most recently spawned delivery; each new one waits for it first.
    last_delivery: Mutex<Option<JoinHandle<()>>>,
}

impl HttpEventReporter {
    pub fn new(backend_url: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self {
            backend_url: backend_url.into().trim_end_matches('/').to_string(),
            http_client,
            last_delivery: Mutex::new(None),
        })
    }

    fn event_url(&self, battle_id: &str) -> String {
        format!("{}/battles/{}", self.backend_url, urlencoding::encode(battle_id))
    }

    /// Spawns the POST for `event` behind the previous delivery.
    fn spawn_delivery(&self, url: String, event: RunEvent) {
        let client = self.http_client.clone();
        let mut last = self.last_delivery.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = last.take();
        *last = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                // Only ordering matters here; a panicked delivery is skipped.
                let _ = previous.await;
            }
            deliver(client, url, event).await;
        }));
    }
}

async fn deliver(client: Client, url: String, event: RunEvent) {
    match client.post(&url).json(&event).send().await {
        Ok(response) if !response.status().is_success() => {
            debug!(url = %url, status = %response.status(), "Event rejected by backend");
        }
        Ok(_) => {}
        Err(e) => debug!(url = %url, error = %e, "Failed to report event"),
    }
}

#[async_trait]
impl EventReporter for HttpEventReporter {
    async fn report(&self, battle_id: Option<&str>, event: RunEvent) {
        let Some(battle_id) = battle_id else {
            return;
        };
        self.spawn_delivery(self.event_url(battle_id), event);
    }

    async fn flush(&self, timeout: Duration) {
        let pending = self
            .last_delivery
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(pending) = pending else {
            return;
        };
        if tokio::time::timeout(timeout, pending).await.is_err() {
            debug!(timeout_ms = timeout.as_millis() as u64, "Gave up waiting for event delivery");
        }
    }
}

/// Reporter that keeps events in memory, for inspection in tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<(Option<String>, RunEvent)>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded `(battle_id, event)` pairs.
    pub fn events(&self) -> Vec<(Option<String>, RunEvent)> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Messages of the recorded events, in order.
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|(_, event)| event.message).collect()
    }
}

#[async_trait]
impl EventReporter for RecordingReporter {
    async fn report(&self, battle_id: Option<&str>, event: RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push((battle_id.map(str::to_string), event));
        }
    }
}
