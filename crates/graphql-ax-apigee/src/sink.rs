// SPDX-License-Identifier: Apache-2.0

use std::sync::{Arc, Mutex};

use graphql_ax_core::model::{CaptureContext, Response};
use graphql_ax_core::scheduler::spawn_flush_loop;
use graphql_ax_core::{BoundedBuffer, ExportError, SinkConfig, SinkOptions, TelemetrySink};
use tokio_util::sync::CancellationToken;

use crate::extractor;
use crate::flusher::ApigeeFlusher;
use crate::record::AnalyticsItem;

/// Construction options. `key`/`secret` are the Edge Microgateway
/// credentials and are required; buffering knobs fall back to defaults.
#[derive(Debug, Clone, Default)]
pub struct ApigeeSinkOptions {
    pub key: Option<String>,
    pub secret: Option<String>,
    pub buffering: SinkOptions,
}

/// Analytics sink instance: owns the bounded buffer, the flusher and the
/// flush-loop stop hook.
pub struct ApigeeSink {
    config: SinkConfig,
    buffer: Arc<Mutex<BoundedBuffer<AnalyticsItem>>>,
    flusher: Arc<ApigeeFlusher>,
    shutdown: CancellationToken,
}

impl ApigeeSink {
    /// Validates credentials and builds the sink. Fails synchronously on
    /// missing credentials; no background work starts here.
    pub fn new(options: ApigeeSinkOptions) -> Result<Self, ExportError> {
        let key = options
            .key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ExportError::Config("Edge Microgateway key is required".to_string()))?;
        let secret = options.secret.filter(|s| !s.is_empty()).ok_or_else(|| {
            ExportError::Config("Edge Microgateway secret is required".to_string())
        })?;

        let config = SinkConfig::resolve(&options.buffering);
        let buffer = Arc::new(Mutex::new(BoundedBuffer::new(config.buffer_capacity)));
        let flusher = Arc::new(ApigeeFlusher::new(
            config,
            key,
            secret,
            Arc::clone(&buffer),
        ));

        Ok(ApigeeSink {
            config,
            buffer,
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

    pub fn buffered(&self) -> usize {
        #[allow(clippy::expect_used)]
        let buffer = self.buffer.lock().expect("analytics buffer lock poisoned");
        buffer.len()
    }
}

impl TelemetrySink for ApigeeSink {
    fn capture(&self, response: &Response, context: &CaptureContext) {
        let items = extractor::extract(response, context);
        if items.is_empty() {
            return;
        }
        #[allow(clippy::expect_used)]
        let mut buffer = self.buffer.lock().expect("analytics buffer lock poisoned");
        buffer.push(items);
    }
}

impl Drop for ApigeeSink {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
