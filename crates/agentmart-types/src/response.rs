//! Response types
//!
//! Exactly one `ResponseRecord` per terminal request, created at the terminal
//! transition. Holds the agent's output (or error) and the processing
//! duration.

use crate::{RequestId, ResponseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The stored outcome of one agent invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    /// Unique response ID
    pub id: ResponseId,
    /// Owning request (one-to-one)
    pub request: RequestId,
    /// Whether the external system confirmed success
    pub success: bool,
    /// Agent-specific result payload
    pub payload: serde_json::Value,
    /// Error message when `success` is false
    pub error: Option<String>,
    /// Processing duration in milliseconds
    pub duration_ms: u64,
    /// When created
    pub created_at: DateTime<Utc>,
}

impl ResponseRecord {
    /// Record a confirmed success
    pub fn success(request: RequestId, payload: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            id: ResponseId::new(),
            request,
            success: true,
            payload,
            error: None,
            duration_ms,
            created_at: Utc::now(),
        }
    }

    /// Record a failure
    pub fn failure(request: RequestId, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            id: ResponseId::new(),
            request,
            success: false,
            payload: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_response() {
        let request = RequestId::new();
        let resp = ResponseRecord::success(request.clone(), serde_json::json!({"text": "done"}), 120);

        assert!(resp.success);
        assert!(resp.error.is_none());
        assert_eq!(resp.request, request);
    }

    #[test]
    fn test_failure_response() {
        let resp = ResponseRecord::failure(RequestId::new(), "upstream timed out", 30_000);

        assert!(!resp.success);
        assert_eq!(resp.error.as_deref(), Some("upstream timed out"));
        assert!(resp.payload.is_null());
    }
}
