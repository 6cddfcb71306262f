// SPDX-License-Identifier: Apache-2.0

//! Pure capture-time transformation from an execution trace to analytics
//! items. Never touches the network and never mutates the response.

use graphql_ax_core::model::{
    correlation_id, CaptureContext, ExecutionTrace, RequestInfo, ResolverSpan, Response,
};
use tracing::debug;

use crate::record::{AnalyticsItem, AnalyticsRecord};

/// Per-request destination for analytics batches. No header, no record: there
/// is no implicit default destination.
pub const ANALYTICS_URL_HEADER: &str = "apigee-analytics-url";

pub const PROXY_NAME_HEADER: &str = "apigee-proxy-name";
pub const PROXY_REV_HEADER: &str = "apigee-proxy-rev";
pub const REQUEST_VERB_HEADER: &str = "apigee-request-verb";
pub const DEVELOPER_EMAIL_HEADER: &str = "apigee-developer-email";
pub const DEVELOPER_APP_HEADER: &str = "apigee-developer-app-name";
pub const CLIENT_ID_HEADER: &str = "apigee-client-id";

const RECORD_TYPE: &str = "APIAnalytics";

pub fn extract(response: &Response, context: &CaptureContext) -> Vec<AnalyticsItem> {
    let Some(trace) = response.execution_trace() else {
        return Vec::new();
    };
    let Some(request) = context.request.as_ref() else {
        return Vec::new();
    };
    let Some(destination_url) = request.header(ANALYTICS_URL_HEADER) else {
        debug!("request carries no {ANALYTICS_URL_HEADER} header, skipping analytics capture");
        return Vec::new();
    };
    let Some(root_type) = trace.resolvers.first().map(|r| r.parent_type.clone()) else {
        return Vec::new();
    };

    let query_id = correlation_id(&request.body);

    trace
        .resolvers
        .iter()
        .map(|resolver| AnalyticsItem {
            destination_url: destination_url.to_string(),
            record: make_record(&query_id, &root_type, trace, request, resolver),
        })
        .collect()
}

fn make_record(
    query_id: &str,
    root_type: &str,
    trace: &ExecutionTrace,
    request: &RequestInfo,
    resolver: &ResolverSpan,
) -> AnalyticsRecord {
    let request_start_ms = trace.start_time.timestamp_millis() as f64;
    let received_start = request_start_ms + resolver.start_offset as f64 / 1e6;
    let sent_start = received_start + resolver.duration as f64 / 1e6;

    AnalyticsRecord {
        client_received_start_timestamp: received_start,
        // The analytics backend rejects zero-length intervals, so end stamps
        // sit 1ms after their start.
        client_received_end_timestamp: received_start + 1.0,
        record_type: RECORD_TYPE,
        apiproxy: request.header(PROXY_NAME_HEADER).map(str::to_string),
        request_uri: format!("graphql://{root_type}/{query_id}"),
        request_path: resolver.generalized_path(),
        request_verb: request
            .header(REQUEST_VERB_HEADER)
            .unwrap_or("POST")
            .to_uppercase(),
        client_ip: request.client_ip(),
        useragent: request.header("user-agent").map(str::to_string),
        apiproxy_revision: request.header(PROXY_REV_HEADER).map(str::to_string),
        response_status_code: 200,
        client_sent_start_timestamp: sent_start,
        client_sent_end_timestamp: sent_start + 1.0,
        developer_email: request.header(DEVELOPER_EMAIL_HEADER).map(str::to_string),
        developer_app: request.header(DEVELOPER_APP_HEADER).map(str::to_string),
        client_id: request.header(CLIENT_ID_HEADER).map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use graphql_ax_core::model::{Extensions, PathSegment, RequestBody};
    use std::collections::HashMap;

    fn trace() -> ExecutionTrace {
        ExecutionTrace {
            start_time: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            duration: 5_000_000,
            resolvers: vec![
                ResolverSpan {
                    parent_type: "Query".to_string(),
                    path: vec![PathSegment::Field("orders".to_string())],
                    start_offset: 1_500_000,
                    duration: 2_000_000,
                },
                ResolverSpan {
                    parent_type: "Order".to_string(),
                    path: vec![
                        PathSegment::Field("orders".to_string()),
                        PathSegment::Index(0),
                        PathSegment::Field("status".to_string()),
                    ],
                    start_offset: 3_500_000,
                    duration: 1_000_000,
                },
            ],
        }
    }

    fn response() -> Response {
        Response {
            extensions: Some(Extensions {
                tracing: Some(trace()),
            }),
        }
    }

    fn context(headers: &[(&str, &str)]) -> CaptureContext {
        CaptureContext {
            request: Some(RequestInfo {
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: RequestBody {
                    query: "{ orders { status } }".to_string(),
                    operation_name: Some("Orders".to_string()),
                },
                remote_address: "192.0.2.4".to_string(),
            }),
        }
    }

    #[test]
    fn one_record_per_resolver() {
        let items = extract(
            &response(),
            &context(&[(ANALYTICS_URL_HEADER, "https://ax.example/records")]),
        );
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|item| item.destination_url == "https://ax.example/records"));
    }

    #[test]
    fn missing_destination_header_yields_nothing() {
        assert!(extract(&response(), &context(&[])).is_empty());
    }

    #[test]
    fn missing_trace_or_request_yields_nothing() {
        let ctx = context(&[(ANALYTICS_URL_HEADER, "https://ax.example")]);
        assert!(extract(&Response::default(), &ctx).is_empty());
        assert!(extract(&response(), &CaptureContext::default()).is_empty());
    }

    #[test]
    fn record_fields_follow_the_trace_and_headers() {
        let items = extract(
            &response(),
            &context(&[
                (ANALYTICS_URL_HEADER, "https://ax.example"),
                (PROXY_NAME_HEADER, "orders-proxy"),
                (REQUEST_VERB_HEADER, "get"),
                ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
            ]),
        );
        let record = &items[1].record;

        // 2020-01-01T00:00:00Z + 3.5ms
        assert_eq!(record.client_received_start_timestamp, 1_577_836_800_003.5);
        assert_eq!(record.client_received_end_timestamp, 1_577_836_800_004.5);
        assert_eq!(record.client_sent_start_timestamp, 1_577_836_800_004.5);
        assert_eq!(record.request_path, "orders/status");
        assert_eq!(record.request_verb, "GET");
        assert_eq!(record.client_ip, "203.0.113.9");
        assert_eq!(record.apiproxy.as_deref(), Some("orders-proxy"));
        // Root parent type comes from the first resolver for every record.
        assert!(record.request_uri.starts_with("graphql://Query/"));
        assert_eq!(record.request_uri, items[0].record.request_uri);
    }
}
