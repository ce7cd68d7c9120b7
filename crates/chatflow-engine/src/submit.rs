use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, warn};

use chatflow_spec::AnswerRecord;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("webhook responded with status {0}")]
    Status(StatusCode),
}

/// Receives a snapshot of the answer record at every checkpoint.
///
/// `dispatch` must return without waiting on the outcome of the delivery.
pub trait Submitter: Send + Sync {
    fn dispatch(&self, snapshot: AnswerRecord);
}

/// Posts snapshots as JSON to a fixed endpoint on a background task.
///
/// Failures are logged and dropped. There is no retry.
pub struct WebhookSubmitter {
    client: Client,
    url: String,
    runtime: Handle,
}

impl WebhookSubmitter {
    pub fn new(
        url: impl Into<String>,
        timeout: Duration,
        runtime: Handle,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Submitter for WebhookSubmitter {
    fn dispatch(&self, snapshot: AnswerRecord) {
        let client = self.client.clone();
        let url = self.url.clone();
        self.runtime.spawn(async move {
            match post_answers(&client, &url, &snapshot).await {
                Ok(()) => info!(url = %url, fields = snapshot.len(), "answers submitted"),
                Err(err) => warn!(url = %url, error = %err, "answer submission failed"),
            }
        });
    }
}

/// Sends one snapshot and checks the response status.
pub async fn post_answers(
    client: &Client,
    url: &str,
    snapshot: &AnswerRecord,
) -> Result<(), SubmitError> {
    let response = client.post(url).json(snapshot).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SubmitError::Status(status));
    }
    Ok(())
}

/// Keeps every snapshot in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySubmitter {
    snapshots: Mutex<Vec<AnswerRecord>>,
}

impl MemorySubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<AnswerRecord> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Submitter for MemorySubmitter {
    fn dispatch(&self, snapshot: AnswerRecord) {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(snapshot);
    }
}

/// Writes snapshots to the log when no endpoint is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubmitter;

impl Submitter for LogSubmitter {
    fn dispatch(&self, snapshot: AnswerRecord) {
        match serde_json::to_string(&snapshot) {
            Ok(payload) => info!(
                fields = snapshot.len(),
                %payload,
                "no webhook configured; answers logged"
            ),
            Err(err) => warn!(error = %err, "failed to encode answers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_submitter_keeps_snapshots_in_order() {
        let submitter = MemorySubmitter::new();
        submitter.dispatch([("2_1", "Dana")].into_iter().collect());
        submitter.dispatch([("2_1", "Dana"), ("8_49", "")].into_iter().collect());

        let snapshots = submitter.snapshots();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1].len(), 2);
    }

    #[tokio::test]
    async fn webhook_dispatch_returns_before_delivery() {
        // Port 9 on localhost has nothing listening; the request fails in the background.
        let submitter = WebhookSubmitter::new(
            "http://127.0.0.1:9/answers",
            Duration::from_secs(2),
            Handle::current(),
        )
        .expect("client");
        let started = std::time::Instant::now();
        submitter.dispatch([("2_1", "Dana")].into_iter().collect());
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(submitter.url(), "http://127.0.0.1:9/answers");
    }
}
