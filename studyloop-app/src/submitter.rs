use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use studyloop_core::{BatchRequest, SubmitError, Submitter};
use tracing::debug;

/// POSTs review batches as JSON to a fixed endpoint.
pub struct HttpSubmitter {
    client: Client,
    endpoint: String,
}

impl HttpSubmitter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

fn classify(e: reqwest::Error) -> SubmitError {
    if e.is_timeout() {
        SubmitError::Timeout
    } else if let Some(status) = e.status() {
        SubmitError::Status(status.as_u16())
    } else {
        SubmitError::Transport(e.to_string())
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, batch: &BatchRequest) -> Result<(), SubmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Idempotency-Key", &batch.idempotency_key)
            .json(batch)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), body = %body, "batch rejected");
            return Err(SubmitError::Status(status.as_u16()));
        }
        Ok(())
    }
}
