// SPDX-License-Identifier: Apache-2.0

//! Capture-time construction of spans and log entries. One randomly
//! identified trace per request: a main span covering the full request, a
//! child span per resolver, and one log entry carrying the raw query text.

use std::collections::BTreeMap;

use graphql_ax_core::model::{
    correlation_id, CaptureContext, ExecutionTrace, RequestInfo, Response,
};
use rand::RngCore;

use crate::model::{AttributeValue, Attributes, LogEntry, MonitoredResource, Span, TruncatableString};
use crate::timestamp::nano_timestamp;

pub const REQUEST_VERB_HEADER: &str = "apigee-request-verb";
pub const PROXY_REV_HEADER: &str = "apigee-proxy-rev";

/// Everything one request contributes to the two buffers.
#[derive(Debug, Default)]
pub struct TraceBatch {
    pub spans: Vec<Span>,
    pub logs: Vec<LogEntry>,
}

pub fn extract(project_id: &str, response: &Response, context: &CaptureContext) -> TraceBatch {
    let Some(trace) = response.execution_trace() else {
        return TraceBatch::default();
    };
    let Some(request) = context.request.as_ref() else {
        return TraceBatch::default();
    };
    let Some(root_type) = trace.resolvers.first().map(|r| r.parent_type.as_str()) else {
        return TraceBatch::default();
    };

    // Content-independent: retried requests get distinct traces.
    let trace_id = random_hex(16);

    let query_id = correlation_id(&request.body);
    let url = format!("graphql://{root_type}/{query_id}");

    let main_span = make_main_span(project_id, &trace_id, &url, &query_id, trace, request);
    let main_span_id = main_span.span_id.clone();

    let mut spans = Vec::with_capacity(trace.resolvers.len() + 1);
    spans.push(main_span);
    for resolver in &trace.resolvers {
        spans.push(make_span(
            project_id,
            &trace_id,
            &main_span_id,
            trace.start_time,
            resolver.start_offset,
            resolver.duration,
            resolver.display_path(),
            Attributes::default(),
        ));
    }

    let logs = vec![make_log(project_id, &trace_id, &main_span_id, trace, request)];

    TraceBatch { spans, logs }
}

fn make_main_span(
    project_id: &str,
    trace_id: &str,
    url: &str,
    query_id: &str,
    trace: &ExecutionTrace,
    request: &RequestInfo,
) -> Span {
    let operation_name = request.body.operation_name.clone().unwrap_or_default();
    let attributes = Attributes {
        attribute_map: BTreeMap::from([
            ("/graphql/hash".to_string(), AttributeValue::string(query_id)),
            (
                "/graphql/operation".to_string(),
                AttributeValue::string(operation_name),
            ),
            (
                "/graphql/query".to_string(),
                AttributeValue::string(request.body.query.clone()),
            ),
            (
                "/http/method".to_string(),
                AttributeValue::string(request_method(request)),
            ),
            ("/http/url".to_string(), AttributeValue::string(url)),
        ]),
    };

    make_span(
        project_id,
        trace_id,
        "",
        trace.start_time,
        0,
        trace.duration,
        url.to_string(),
        attributes,
    )
}

#[allow(clippy::too_many_arguments)]
fn make_span(
    project_id: &str,
    trace_id: &str,
    parent_span_id: &str,
    start_time: chrono::DateTime<chrono::Utc>,
    start_offset: i64,
    duration: i64,
    display_name: String,
    attributes: Attributes,
) -> Span {
    let span_id = random_hex(8);
    Span {
        name: format!("projects/{project_id}/traces/{trace_id}/spans/{span_id}"),
        span_id,
        parent_span_id: parent_span_id.to_string(),
        display_name: TruncatableString::new(display_name),
        start_time: nano_timestamp(start_time, start_offset),
        end_time: nano_timestamp(start_time, start_offset + duration),
        attributes,
    }
}

fn make_log(
    project_id: &str,
    trace_id: &str,
    main_span_id: &str,
    trace: &ExecutionTrace,
    request: &RequestInfo,
) -> LogEntry {
    LogEntry {
        log_name: format!("projects/{project_id}/logs/{trace_id}"),
        resource: MonitoredResource {
            resource_type: "consumed_api".to_string(),
            labels: BTreeMap::from([
                ("project_id".to_string(), project_id.to_string()),
                ("service".to_string(), "graphql".to_string()),
                ("method".to_string(), request_method(request)),
                (
                    "version".to_string(),
                    request.header(PROXY_REV_HEADER).unwrap_or("1").to_string(),
                ),
                ("location".to_string(), "global".to_string()),
            ]),
        },
        timestamp: nano_timestamp(trace.start_time, 0),
        insert_id: trace_id.to_string(),
        trace: format!("projects/{project_id}/traces/{trace_id}"),
        span_id: main_span_id.to_string(),
        text_payload: request.body.query.clone(),
    }
}

fn request_method(request: &RequestInfo) -> String {
    request
        .header(REQUEST_VERB_HEADER)
        .unwrap_or("POST")
        .to_uppercase()
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    let mut out = String::with_capacity(bytes * 2);
    for byte in buf {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
