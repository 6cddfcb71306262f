// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

pub const DEFAULT_BUFFER_CAPACITY: usize = 10_000;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Raw, string-typed tuning knobs as they arrive from the environment or a
/// deployment manifest. Anything non-numeric or non-positive falls back to
/// the default at resolution time.
#[derive(Debug, Clone, Default)]
pub struct SinkOptions {
    pub buffer_capacity: Option<String>,
    pub flush_interval_ms: Option<String>,
    pub batch_size: Option<String>,
}

/// Resolved buffering parameters, immutable after construction.
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub buffer_capacity: usize,
    pub flush_interval: Duration,
    pub batch_size: usize,
}

impl SinkConfig {
    pub fn resolve(options: &SinkOptions) -> Self {
        SinkConfig {
            buffer_capacity: parse_positive(options.buffer_capacity.as_deref())
                .unwrap_or(DEFAULT_BUFFER_CAPACITY),
            flush_interval: Duration::from_millis(
                parse_positive(options.flush_interval_ms.as_deref())
                    .map(|ms| ms as u64)
                    .unwrap_or(DEFAULT_FLUSH_INTERVAL_MS),
            ),
            batch_size: parse_positive(options.batch_size.as_deref()).unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::resolve(&SinkOptions::default())
    }
}

fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw?.trim()
        .parse::<i64>()
        .ok()
        .filter(|value| *value > 0)
        .map(|value| value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = SinkConfig::resolve(&SinkOptions::default());
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.flush_interval, Duration::from_millis(5_000));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn explicit_values_are_honored() {
        let config = SinkConfig::resolve(&SinkOptions {
            buffer_capacity: Some("50".to_string()),
            flush_interval_ms: Some("250".to_string()),
            batch_size: Some("8".to_string()),
        });
        assert_eq!(config.buffer_capacity, 50);
        assert_eq!(config.flush_interval, Duration::from_millis(250));
        assert_eq!(config.batch_size, 8);
    }

    #[test]
    fn non_numeric_and_non_positive_fall_back() {
        let config = SinkConfig::resolve(&SinkOptions {
            buffer_capacity: Some("lots".to_string()),
            flush_interval_ms: Some("-5".to_string()),
            batch_size: Some("0".to_string()),
        });
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.flush_interval, Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS));
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
    }
}
