// SPDX-License-Identifier: Apache-2.0

//! Nanosecond-offset to absolute-timestamp arithmetic. The trace start has
//! millisecond precision while resolver offsets are nanoseconds, so the
//! millisecond remainder joins the offset before carrying whole seconds.

use chrono::{DateTime, SecondsFormat, Utc};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Renders `start + offset_ns` as RFC3339 UTC with a fixed 9-digit
/// zero-padded fractional second, the form the Cloud Trace and Logging APIs
/// expect.
pub fn nano_timestamp(start: DateTime<Utc>, offset_ns: i64) -> String {
    let start_ms = start.timestamp_millis();
    let mut seconds = start_ms.div_euclid(1_000);
    let mut nanos = offset_ns + start_ms.rem_euclid(1_000) * NANOS_PER_MILLI;

    let carry = nanos.div_euclid(NANOS_PER_SECOND);
    seconds += carry;
    nanos -= carry * NANOS_PER_SECOND;

    match DateTime::<Utc>::from_timestamp(seconds, 0) {
        Some(whole) => format!("{}.{:09}Z", whole.format("%Y-%m-%dT%H:%M:%S"), nanos),
        // Offsets large enough to leave the representable range do not occur
        // in practice; render the start instead of panicking.
        None => start.to_rfc3339_opts(SecondsFormat::Nanos, true),
    }
}
