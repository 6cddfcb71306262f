// SPDX-License-Identifier: Apache-2.0

//! Delivery side of the cloud sink. Spans and logs live in separate bounded
//! buffers and flush sequentially, spans first, never interleaved. Each
//! publish is all-or-nothing: any failure requeues the whole sub-batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use graphql_ax_core::{BoundedBuffer, ExportError, SinkConfig};
use serde::Serialize;
use tracing::{debug, error};

use crate::credentials::CredentialFactory;
use crate::model::{LogEntry, Span};

pub const DEFAULT_TRACE_ENDPOINT: &str = "https://cloudtrace.googleapis.com";
pub const DEFAULT_LOGGING_ENDPOINT: &str = "https://logging.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct StackdriverFlusher {
    config: SinkConfig,
    project_id: String,
    credentials: CredentialFactory,
    trace_endpoint: String,
    logging_endpoint: String,
    spans: Arc<Mutex<BoundedBuffer<Span>>>,
    logs: Arc<Mutex<BoundedBuffer<LogEntry>>>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct BatchWriteRequest<'a> {
    spans: &'a [Span],
}

#[derive(Serialize)]
struct WriteEntriesRequest<'a> {
    entries: &'a [LogEntry],
}

impl StackdriverFlusher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SinkConfig,
        project_id: String,
        credentials: CredentialFactory,
        trace_endpoint: String,
        logging_endpoint: String,
        spans: Arc<Mutex<BoundedBuffer<Span>>>,
        logs: Arc<Mutex<BoundedBuffer<LogEntry>>>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("unable to build cloud sink HTTP client: {e}, using defaults");
                reqwest::Client::new()
            });
        StackdriverFlusher {
            config,
            project_id,
            credentials,
            trace_endpoint,
            logging_endpoint,
            spans,
            logs,
            client,
        }
    }

    /// One flush tick: spans fully, then logs, sequentially.
    pub async fn flush(&self) {
        self.flush_spans().await;
        self.flush_logs().await;
    }

    async fn flush_spans(&self) {
        let batch = {
            #[allow(clippy::expect_used)]
            let mut spans = self.spans.lock().expect("span buffer lock poisoned");
            spans.take_up_to(self.config.batch_size)
        };
        if batch.is_empty() {
            return;
        }
        debug!("flushing {} spans", batch.len());

        if let Err(e) = self.publish_spans(&batch).await {
            error!("failed to publish {} spans: {e}", batch.len());
            #[allow(clippy::expect_used)]
            let mut spans = self.spans.lock().expect("span buffer lock poisoned");
            spans.push(batch);
        }
    }

    async fn flush_logs(&self) {
        let batch = {
            #[allow(clippy::expect_used)]
            let mut logs = self.logs.lock().expect("log buffer lock poisoned");
            logs.take_up_to(self.config.batch_size)
        };
        if batch.is_empty() {
            return;
        }
        debug!("flushing {} log entries", batch.len());

        if let Err(e) = self.publish_logs(&batch).await {
            error!("failed to publish {} log entries: {e}", batch.len());
            #[allow(clippy::expect_used)]
            let mut logs = self.logs.lock().expect("log buffer lock poisoned");
            logs.push(batch);
        }
    }

    async fn publish_spans(&self, spans: &[Span]) -> Result<(), ExportError> {
        let token = self.credentials.bearer_token(&self.client).await?;
        let url = format!(
            "{}/v2/projects/{}/traces:batchWrite",
            self.trace_endpoint, self.project_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&BatchWriteRequest { spans })
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Transport(format!(
                "trace batchWrite returned {status}: {body}"
            )));
        }
        Ok(())
    }

    async fn publish_logs(&self, entries: &[LogEntry]) -> Result<(), ExportError> {
        let token = self.credentials.bearer_token(&self.client).await?;
        let url = format!("{}/v2/entries:write", self.logging_endpoint);
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&WriteEntriesRequest { entries })
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Transport(format!(
                "entries:write returned {status}: {body}"
            )));
        }
        Ok(())
    }
}
