// SPDX-License-Identifier: Apache-2.0

//! Shared engine for buffered GraphQL telemetry export: the execution-trace
//! data model, the capacity-bounded record buffer, the periodic flush loop
//! and the sink configuration/error types. Sink adapters build on this crate
//! and own their wire formats.

pub mod buffer;
pub mod config;
pub mod error;
pub mod model;
pub mod scheduler;
pub mod sink;

pub use buffer::BoundedBuffer;
pub use config::{SinkConfig, SinkOptions};
pub use error::ExportError;
pub use model::{
    correlation_id, CaptureContext, ExecutionTrace, Extensions, PathSegment, RequestBody,
    RequestInfo, ResolverSpan, Response,
};
pub use sink::TelemetrySink;
