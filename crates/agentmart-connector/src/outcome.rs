//! Boundary interpretation of external replies
//!
//! External systems return arbitrary JSON. The contract is narrow: a boolean
//! `success` field, a `result` payload when successful, and optionally an
//! `error` message when not. Everything else is agent-specific and passed
//! through untouched inside the payload.

use agentmart_types::{MartError, Result};
use serde::{Deserialize, Serialize};

/// A validated external reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentOutcome {
    /// Whether the external system confirmed success
    pub success: bool,
    /// Agent-specific result payload (null on failure)
    pub payload: serde_json::Value,
    /// Error message reported by the external system
    pub error: Option<String>,
}

impl AgentOutcome {
    /// Interpret a raw external reply
    ///
    /// Missing or non-boolean `success`, and a successful reply without a
    /// `result` payload, are `MalformedReply` - the caller treats that as a
    /// processing failure, never a crash.
    pub fn interpret(raw: &serde_json::Value) -> Result<Self> {
        let success = raw
            .get("success")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| MartError::malformed("reply has no boolean 'success' field"))?;

        if success {
            let payload = raw
                .get("result")
                .cloned()
                .ok_or_else(|| MartError::malformed("successful reply has no 'result' field"))?;
            Ok(Self {
                success: true,
                payload,
                error: None,
            })
        } else {
            let error = raw
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("external system reported failure")
                .to_string();
            Ok(Self {
                success: false,
                payload: serde_json::Value::Null,
                error: Some(error),
            })
        }
    }
}
