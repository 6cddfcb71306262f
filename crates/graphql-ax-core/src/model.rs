// SPDX-License-Identifier: Apache-2.0

//! Read-only view of what the serving layer hands to the capture path: the
//! per-request execution trace and the request context. The exporter never
//! mutates either; stripping the trace extension from the outgoing response
//! is the response formatter's job, after every sink has seen it.

use std::collections::HashMap;
use std::hash::Hasher;

use chrono::{DateTime, Utc};
use fnv::FnvHasher;

/// Per-request resolver-level timing emitted by the serving layer.
#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    /// Absolute request start, millisecond precision.
    pub start_time: DateTime<Utc>,
    /// Total request duration in nanoseconds.
    pub duration: i64,
    /// Resolver spans in execution order.
    pub resolvers: Vec<ResolverSpan>,
}

/// One field-resolution step within the response tree.
#[derive(Debug, Clone)]
pub struct ResolverSpan {
    pub parent_type: String,
    pub path: Vec<PathSegment>,
    /// Nanoseconds relative to the trace start.
    pub start_offset: i64,
    /// Nanoseconds.
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl ResolverSpan {
    /// Full path including list indexes, `/`-joined.
    pub fn display_path(&self) -> String {
        let segments: Vec<String> = self
            .path
            .iter()
            .map(|segment| match segment {
                PathSegment::Field(name) => name.clone(),
                PathSegment::Index(index) => index.to_string(),
            })
            .collect();
        segments.join("/")
    }

    /// Path with list indexes dropped, so repeated elements collapse onto one
    /// analytics dimension.
    pub fn generalized_path(&self) -> String {
        let segments: Vec<&str> = self
            .path
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Field(name) => Some(name.as_str()),
                PathSegment::Index(_) => None,
            })
            .collect();
        segments.join("/")
    }
}

/// Minimal view of the serving layer's response. Only the trace extension is
/// of interest here.
#[derive(Debug, Clone, Default)]
pub struct Response {
    pub extensions: Option<Extensions>,
}

#[derive(Debug, Clone, Default)]
pub struct Extensions {
    pub tracing: Option<ExecutionTrace>,
}

impl Response {
    pub fn execution_trace(&self) -> Option<&ExecutionTrace> {
        self.extensions.as_ref()?.tracing.as_ref()
    }
}

/// Capture-time request context. `request` is `None` outside the serving
/// flow (introspection, warm-up), in which case capture is a no-op.
#[derive(Debug, Clone, Default)]
pub struct CaptureContext {
    pub request: Option<RequestInfo>,
}

#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Lower-cased header names to values.
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
    pub remote_address: String,
}

#[derive(Debug, Clone)]
pub struct RequestBody {
    pub query: String,
    pub operation_name: Option<String>,
}

impl RequestInfo {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// First hop of `x-forwarded-for`, falling back to the peer address.
    pub fn client_ip(&self) -> String {
        let raw = self
            .header("x-forwarded-for")
            .unwrap_or(self.remote_address.as_str());
        raw.split(',').next().unwrap_or(raw).trim().to_string()
    }
}

/// Stable per-request correlation id: FNV-1a over the query text and the
/// operation name. The same query always maps to the same id, so records
/// from retried deliveries stay correlated.
pub fn correlation_id(body: &RequestBody) -> String {
    let mut hasher = FnvHasher::default();
    hasher.write(body.query.as_bytes());
    hasher.write(body.operation_name.as_deref().unwrap_or("").as_bytes());
    format!("{:016x}", hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(query: &str, operation_name: Option<&str>) -> RequestBody {
        RequestBody {
            query: query.to_string(),
            operation_name: operation_name.map(str::to_string),
        }
    }

    #[test]
    fn correlation_id_is_stable() {
        let a = correlation_id(&body("{ products { id } }", Some("Products")));
        let b = correlation_id(&body("{ products { id } }", Some("Products")));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn correlation_id_distinguishes_operation_name() {
        let named = correlation_id(&body("{ products { id } }", Some("Products")));
        let anonymous = correlation_id(&body("{ products { id } }", None));
        assert_ne!(named, anonymous);
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let request = RequestInfo {
            headers: HashMap::from([(
                "x-forwarded-for".to_string(),
                "203.0.113.9, 10.0.0.1".to_string(),
            )]),
            body: body("{ ping }", None),
            remote_address: "127.0.0.1".to_string(),
        };
        assert_eq!(request.client_ip(), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_to_remote_address() {
        let request = RequestInfo {
            headers: HashMap::new(),
            body: body("{ ping }", None),
            remote_address: "192.0.2.4".to_string(),
        };
        assert_eq!(request.client_ip(), "192.0.2.4");
    }

    #[test]
    fn paths_generalize_by_dropping_indexes() {
        let span = ResolverSpan {
            parent_type: "Query".to_string(),
            path: vec![
                PathSegment::Field("products".to_string()),
                PathSegment::Index(3),
                PathSegment::Field("name".to_string()),
            ],
            start_offset: 0,
            duration: 0,
        };
        assert_eq!(span.display_path(), "products/3/name");
        assert_eq!(span.generalized_path(), "products/name");
    }
}
