// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;

/// One analytics fact per resolver span, in the fixed schema the Apigee
/// analytics endpoint ingests. Field names are part of the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsRecord {
    /// Resolver start, epoch milliseconds (fractional: source offsets are
    /// nanoseconds).
    pub client_received_start_timestamp: f64,
    pub client_received_end_timestamp: f64,
    #[serde(rename = "recordType")]
    pub record_type: &'static str,
    pub apiproxy: Option<String>,
    pub request_uri: String,
    pub request_path: String,
    pub request_verb: String,
    pub client_ip: String,
    pub useragent: Option<String>,
    pub apiproxy_revision: Option<String>,
    pub response_status_code: u16,
    pub client_sent_start_timestamp: f64,
    pub client_sent_end_timestamp: f64,
    pub developer_email: Option<String>,
    pub developer_app: Option<String>,
    pub client_id: Option<String>,
}

/// A record plus the destination it was captured for. Lives in the bounded
/// buffer until delivered, requeued or dropped on overflow.
#[derive(Debug, Clone)]
pub struct AnalyticsItem {
    pub destination_url: String,
    pub record: AnalyticsRecord,
}
