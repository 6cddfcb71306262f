// SPDX-License-Identifier: Apache-2.0

//! Apigee analytics sink: turns execution traces into per-resolver
//! `AnalyticsRecord`s keyed by the destination URL the request carried, and
//! ships them in gzip-compressed, basic-authenticated batches with
//! partial-rejection retry.

pub mod extractor;
pub mod flusher;
pub mod record;
pub mod sink;

pub use flusher::ApigeeFlusher;
pub use record::{AnalyticsItem, AnalyticsRecord};
pub use sink::{ApigeeSink, ApigeeSinkOptions};
