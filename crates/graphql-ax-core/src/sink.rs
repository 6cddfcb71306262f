// SPDX-License-Identifier: Apache-2.0

use crate::model::{CaptureContext, Response};

/// Capture-side contract shared by every sink adapter.
///
/// `capture` runs inline with response handling: it extracts sink-specific
/// records and pushes them into the adapter's bounded buffer. It performs no
/// network I/O and never blocks on delivery; publishing happens on the
/// adapter's own flush loop.
pub trait TelemetrySink: Send + Sync {
    fn capture(&self, response: &Response, context: &CaptureContext);
}
