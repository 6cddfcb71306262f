// SPDX-License-Identifier: Apache-2.0

//! Google Cloud trace/log sink: builds one main span per request plus a
//! child span per resolver and one log entry per request, buffers spans and
//! logs independently, and flushes them sequentially (spans first) against
//! the Cloud Trace v2 and Cloud Logging v2 REST surfaces with a lazily
//! resolved, scoped service-account credential.

pub mod credentials;
pub mod extractor;
pub mod flusher;
pub mod model;
pub mod sink;
pub mod timestamp;

pub use credentials::{CredentialFactory, CredentialSource, ServiceAccountKey};
pub use flusher::StackdriverFlusher;
pub use sink::{StackdriverSink, StackdriverSinkOptions};
