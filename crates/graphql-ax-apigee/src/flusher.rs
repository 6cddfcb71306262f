// SPDX-License-Identifier: Apache-2.0

//! Delivery side of the analytics sink: drains the bounded buffer, regroups
//! the batch by destination and publishes one compressed POST per distinct
//! destination. Failed or rejected records go back into the buffer, capacity
//! permitting.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graphql_ax_core::{BoundedBuffer, ExportError, SinkConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::record::{AnalyticsItem, AnalyticsRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct ApigeeFlusher {
    config: SinkConfig,
    key: String,
    secret: String,
    buffer: Arc<Mutex<BoundedBuffer<AnalyticsItem>>>,
    client: reqwest::Client,
    compression: flate2::Compression,
}

#[derive(Serialize)]
struct Envelope<'a> {
    records: Vec<&'a AnalyticsRecord>,
}

/// Analytics acknowledgment. An empty or non-JSON body counts as full
/// acceptance.
#[derive(Debug, Default, Deserialize)]
struct PublishAck {
    #[serde(default)]
    rejected: usize,
}

impl ApigeeFlusher {
    pub fn new(
        config: SinkConfig,
        key: String,
        secret: String,
        buffer: Arc<Mutex<BoundedBuffer<AnalyticsItem>>>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                error!("unable to build analytics HTTP client: {e}, using defaults");
                reqwest::Client::new()
            });
        ApigeeFlusher {
            config,
            key,
            secret,
            buffer,
            client,
            compression: flate2::Compression::default(),
        }
    }

    /// One flush tick: drain up to a batch, publish per destination, requeue
    /// what the backend did not accept. Holds the buffer lock only around
    /// drain and requeue, never across network I/O.
    pub async fn flush(&self) {
        let batch = {
            #[allow(clippy::expect_used)]
            let mut buffer = self.buffer.lock().expect("analytics buffer lock poisoned");
            buffer.take_up_to(self.config.batch_size)
        };
        if batch.is_empty() {
            return;
        }
        debug!("flushing {} analytics records", batch.len());

        for (destination_url, mut items) in group_by_destination(batch) {
            let requeue = match self.publish(&destination_url, &items).await {
                Ok(()) => continue,
                Err(ExportError::PartialRejection(rejected)) => {
                    // The backend reports a count, not item identities; the
                    // rejected records are assumed to be the batch suffix.
                    let rejected = rejected.min(items.len());
                    error!(
                        "analytics endpoint {destination_url} rejected {rejected} of {} records",
                        items.len()
                    );
                    items.split_off(items.len() - rejected)
                }
                Err(e) => {
                    error!("failed to publish analytics batch to {destination_url}: {e}");
                    items
                }
            };

            #[allow(clippy::expect_used)]
            let mut buffer = self.buffer.lock().expect("analytics buffer lock poisoned");
            buffer.push(requeue);
        }
    }

    async fn publish(&self, destination_url: &str, items: &[AnalyticsItem]) -> Result<(), ExportError> {
        let envelope = Envelope {
            records: items.iter().map(|item| &item.record).collect(),
        };
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| ExportError::Transport(format!("serialize analytics batch: {e}")))?;
        let compressed = gzip(&payload, self.compression)?;

        let response = self
            .client
            .post(destination_url)
            .basic_auth(&self.key, Some(&self.secret))
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("content-encoding", "gzip")
            .body(compressed)
            .send()
            .await
            .map_err(|e| ExportError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Transport(format!(
                "analytics endpoint returned {status}: {body}"
            )));
        }

        let ack: PublishAck = response.json().await.unwrap_or_default();
        if ack.rejected > 0 {
            return Err(ExportError::PartialRejection(ack.rejected));
        }
        debug!("analytics endpoint accepted {} records", items.len());
        Ok(())
    }
}

/// Splits a drained batch into per-destination groups, preserving the order
/// records were drained in, both across and within groups.
fn group_by_destination(batch: Vec<AnalyticsItem>) -> Vec<(String, Vec<AnalyticsItem>)> {
    let mut groups: Vec<(String, Vec<AnalyticsItem>)> = Vec::new();
    for item in batch {
        match groups.iter_mut().find(|(url, _)| *url == item.destination_url) {
            Some((_, items)) => items.push(item),
            None => groups.push((item.destination_url.clone(), vec![item])),
        }
    }
    groups
}

fn gzip(payload: &[u8], level: flate2::Compression) -> Result<Vec<u8>, ExportError> {
    let mut encoder = flate2::read::GzEncoder::new(payload, level);
    let mut compressed = Vec::new();
    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| ExportError::Transport(format!("gzip analytics batch: {e}")))?;
    Ok(compressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, path: &str) -> AnalyticsItem {
        AnalyticsItem {
            destination_url: url.to_string(),
            record: AnalyticsRecord {
                client_received_start_timestamp: 0.0,
                client_received_end_timestamp: 1.0,
                record_type: "APIAnalytics",
                apiproxy: None,
                request_uri: "graphql://Query/0".to_string(),
                request_path: path.to_string(),
                request_verb: "POST".to_string(),
                client_ip: "127.0.0.1".to_string(),
                useragent: None,
                apiproxy_revision: None,
                response_status_code: 200,
                client_sent_start_timestamp: 0.0,
                client_sent_end_timestamp: 1.0,
                developer_email: None,
                developer_app: None,
                client_id: None,
            },
        }
    }

    #[test]
    fn grouping_preserves_drain_order() {
        let groups = group_by_destination(vec![
            item("https://a.example", "one"),
            item("https://b.example", "two"),
            item("https://a.example", "three"),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "https://a.example");
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1].record.request_path, "three");
        assert_eq!(groups[1].1.len(), 1);
    }

    #[test]
    fn envelope_wraps_records() {
        let items = vec![item("https://a.example", "one")];
        let envelope = Envelope {
            records: items.iter().map(|i| &i.record).collect(),
        };
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["records"].as_array().expect("array").len(), 1);
    }

    #[test]
    fn ack_defaults_to_no_rejections() {
        let ack: PublishAck = serde_json::from_str("{}").expect("parse");
        assert_eq!(ack.rejected, 0);
        let ack: PublishAck = serde_json::from_str(r#"{"rejected":4}"#).expect("parse");
        assert_eq!(ack.rejected, 4);
    }
}
