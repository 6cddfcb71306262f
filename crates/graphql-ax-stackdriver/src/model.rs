// SPDX-License-Identifier: Apache-2.0

//! JSON wire shapes for the Cloud Trace v2 `traces:batchWrite` and Cloud
//! Logging v2 `entries:write` calls.

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// `projects/{project}/traces/{trace_id}/spans/{span_id}`
    pub name: String,
    pub span_id: String,
    /// Empty for the main span.
    pub parent_span_id: String,
    pub display_name: TruncatableString,
    pub start_time: String,
    pub end_time: String,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    pub attribute_map: BTreeMap<String, AttributeValue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeValue {
    pub string_value: TruncatableString,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue {
            string_value: TruncatableString::new(value),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TruncatableString {
    pub value: String,
    pub truncated_byte_count: u32,
}

impl TruncatableString {
    pub fn new(value: impl Into<String>) -> Self {
        TruncatableString {
            value: value.into(),
            truncated_byte_count: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// `projects/{project}/logs/{trace_id}`
    pub log_name: String,
    pub resource: MonitoredResource,
    pub timestamp: String,
    pub insert_id: String,
    /// `projects/{project}/traces/{trace_id}`
    pub trace: String,
    pub span_id: String,
    pub text_payload: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    pub labels: BTreeMap<String, String>,
}
