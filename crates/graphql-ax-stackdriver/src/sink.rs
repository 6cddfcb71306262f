// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use graphql_ax_core::model::{CaptureContext, Response};
use graphql_ax_core::scheduler::spawn_flush_loop;
use graphql_ax_core::{BoundedBuffer, ExportError, SinkConfig, SinkOptions, TelemetrySink};
use tokio_util::sync::CancellationToken;

use crate::credentials::{CredentialFactory, CredentialSource};
use crate::extractor;
use crate::flusher::{StackdriverFlusher, DEFAULT_LOGGING_ENDPOINT, DEFAULT_TRACE_ENDPOINT};
use crate::model::{LogEntry, Span};

/// Construction options. `project_id` and one of
/// `service_account_json`/`service_account_file` are required; endpoint
/// overrides exist for tests and private API fronts.
#[derive(Debug, Clone, Default)]
pub struct StackdriverSinkOptions {
    pub project_id: Option<String>,
    /// Raw JSON or base64-encoded JSON key material.
    pub service_account_json: Option<String>,
    /// Path to a JSON key file. `service_account_json` wins when both are set.
    pub service_account_file: Option<PathBuf>,
    pub buffering: SinkOptions,
    pub trace_endpoint: Option<String>,
    pub logging_endpoint: Option<String>,
}

/// Cloud trace/log sink instance: two bounded buffers (spans, logs), one
/// flusher, one flush-loop stop hook.
pub struct StackdriverSink {
    config: SinkConfig,
    project_id: String,
    spans: Arc<Mutex<BoundedBuffer<Span>>>,
    logs: Arc<Mutex<BoundedBuffer<LogEntry>>>,
    flusher: Arc<StackdriverFlusher>,
    shutdown: CancellationToken,
}

impl StackdriverSink {
    /// Validates configuration and builds the sink. Credential *presence* is
    /// checked here, synchronously; parsing the material is deferred to the
    /// first publish. No background work starts here.
    pub fn new(options: StackdriverSinkOptions) -> Result<Self, ExportError> {
        let source = match (&options.service_account_json, &options.service_account_file) {
            (Some(json), _) => CredentialSource::Json(json.clone()),
            (None, Some(path)) => CredentialSource::File(path.clone()),
            (None, None) => {
                return Err(ExportError::Config(
                    "service account JSON text, base64 or file path is required".to_string(),
                ))
            }
        };
        Self::with_credentials(options, CredentialFactory::from_source(source))
    }

    /// Same as `new`, with the credential factory supplied by the caller
    /// (fixed tokens in tests, metadata-server tokens in managed runtimes).
    pub fn with_credentials(
        options: StackdriverSinkOptions,
        credentials: CredentialFactory,
    ) -> Result<Self, ExportError> {
        let project_id = options
            .project_id
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ExportError::Config("GCP project id is required".to_string()))?;

        let config = SinkConfig::resolve(&options.buffering);
        let spans = Arc::new(Mutex::new(BoundedBuffer::new(config.buffer_capacity)));
        let logs = Arc::new(Mutex::new(BoundedBuffer::new(config.buffer_capacity)));

        let flusher = Arc::new(StackdriverFlusher::new(
            config,
            project_id.clone(),
            credentials,
            options
                .trace_endpoint
                .unwrap_or_else(|| DEFAULT_TRACE_ENDPOINT.to_string()),
            options
                .logging_endpoint
                .unwrap_or_else(|| DEFAULT_LOGGING_ENDPOINT.to_string()),
            Arc::clone(&spans),
            Arc::clone(&logs),
        ));

        Ok(StackdriverSink {
            config,
            project_id,
            spans,
            logs,
            flusher,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawns the periodic flush loop. Requires a tokio runtime; call once.
    pub fn start(&self) {
        let flusher = Arc::clone(&self.flusher);
        spawn_flush_loop(self.config.flush_interval, self.shutdown.clone(), move || {
            let flusher = Arc::clone(&flusher);
            async move { flusher.flush().await }
        });
    }

    /// Stops the flush loop. Buffered records are dropped, by design.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Runs one flush tick immediately, outside the schedule.
    pub async fn flush(&self) {
        self.flusher.flush().await;
    }

    pub fn buffered_spans(&self) -> usize {
        #[allow(clippy::expect_used)]
        let spans = self.spans.lock().expect("span buffer lock poisoned");
        spans.len()
    }

    pub fn buffered_logs(&self) -> usize {
        #[allow(clippy::expect_used)]
        let logs = self.logs.lock().expect("log buffer lock poisoned");
        logs.len()
    }
}

impl TelemetrySink for StackdriverSink {
    fn capture(&self, response: &Response, context: &CaptureContext) {
        let batch = extractor::extract(&self.project_id, response, context);
        if !batch.spans.is_empty() {
            #[allow(clippy::expect_used)]
            let mut spans = self.spans.lock().expect("span buffer lock poisoned");
            spans.push(batch.spans);
        }
        if !batch.logs.is_empty() {
            #[allow(clippy::expect_used)]
            let mut logs = self.logs.lock().expect("log buffer lock poisoned");
            logs.push(batch.logs);
        }
    }
}

impl Drop for StackdriverSink {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
