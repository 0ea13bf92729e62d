//! Retry utilities for transient endpoint failures.
//!
//! Provides classification of retryable errors and exponential backoff.

use crate::error::PipelineError;
use std::time::Duration;

/// Determine whether a candidate-level error is worth retrying.
///
/// Retryable errors: timeouts, rate limits (429), server errors (5xx),
/// connection failures. Non-retryable: client errors, bad responses,
/// unreadable images.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Remote {
            status_code,
            message,
            ..
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            // Non-HTTP failures (connection refused, DNS)
            message.contains("timed out") || message.contains("connect")
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn remote(status_code: Option<u16>, message: &str) -> PipelineError {
        PipelineError::Remote {
            endpoint: "clip-endpoint-1".to_string(),
            path: PathBuf::from("a.jpg"),
            message: message.to_string(),
            status_code,
        }
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = PipelineError::Timeout {
            path: PathBuf::from("a.jpg"),
            stage: "remote".to_string(),
            timeout_ms: 30000,
        };
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_status_classification() {
        assert!(is_retryable(&remote(Some(429), "throttled")));
        assert!(is_retryable(&remote(Some(503), "unavailable")));
        assert!(!is_retryable(&remote(Some(400), "bad payload")));
        assert!(!is_retryable(&remote(Some(404), "no such endpoint")));
    }

    #[test]
    fn test_message_classification_without_status() {
        assert!(is_retryable(&remote(None, "connection refused")));
        assert!(!is_retryable(&remote(None, "Failed to parse response: 500 bytes")));
        assert!(!is_retryable(&remote(None, "Endpoint returned no similarity")));
    }

    #[test]
    fn test_decode_error_not_retryable() {
        let err = PipelineError::Decode {
            path: PathBuf::from("a.jpg"),
            message: "invalid header".to_string(),
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_backoff_exponential() {
        assert_eq!(backoff_duration(0, 500), Duration::from_millis(500));
        assert_eq!(backoff_duration(1, 500), Duration::from_millis(1000));
        assert_eq!(backoff_duration(3, 500), Duration::from_millis(4000));
    }

    #[test]
    fn test_backoff_capped_at_30s() {
        assert_eq!(backoff_duration(10, 1000), Duration::from_millis(30_000));
    }
}
