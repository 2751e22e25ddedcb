//! Request lifecycle types
//!
//! One `RequestRecord` per user invocation of an agent. Status moves only
//! through the static transition table; records are never deleted by normal
//! operation (kept for audit and history).

use crate::{AccountId, AgentListing, Amount, AgentSlug, ListingId, MartError, RequestId, Result, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a request
///
/// Transition table: `Pending -> Processing -> {Completed, Failed}`.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Created, external system not yet contacted
    Pending,
    /// External system contacted, result not yet recorded
    Processing,
    /// Terminal: external system returned a confirmed success
    Completed,
    /// Terminal: external error, malformed reply, or internal failure
    Failed,
}

impl RequestStatus {
    /// Whether this status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the transition table allows moving to `next`
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Failed)
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Role of a turn in a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
    System,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::System => write!(f, "system"),
        }
    }
}

/// One turn in a multi-turn conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Agent, text)
    }
}

/// One user invocation of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unique request ID
    pub id: RequestId,
    /// Owning account
    pub account: AccountId,
    /// Slug of the invoked agent
    pub slug: AgentSlug,
    /// Listing the request was created against
    pub listing: ListingId,
    /// Price snapshot taken at creation; immutable afterwards so later
    /// catalog price changes never affect in-flight requests
    pub cost: Amount,
    /// Lifecycle status
    pub status: RequestStatus,
    /// Agent-specific input payload
    pub input: serde_json::Value,
    /// Session identifier for conversational agents
    pub session: Option<SessionId>,
    /// Ordered turn sequence for conversational agents
    pub turns: Vec<Turn>,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When the terminal transition happened
    pub completed_at: Option<DateTime<Utc>>,
}

impl RequestRecord {
    /// Create a pending request against a listing, snapshotting its price
    pub fn new(account: AccountId, listing: &AgentListing, input: serde_json::Value) -> Self {
        Self {
            id: RequestId::new(),
            account,
            slug: listing.slug.clone(),
            listing: listing.id.clone(),
            cost: listing.price,
            status: RequestStatus::Pending,
            input,
            session: None,
            turns: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Create a pending conversational request bound to a session
    pub fn new_session(account: AccountId, listing: &AgentListing, session: SessionId) -> Self {
        let mut record = Self::new(account, listing, serde_json::Value::Null);
        record.session = Some(session);
        record
    }

    /// Move to `next` through the transition table
    ///
    /// Sets `completed_at` when the transition is terminal. Illegal moves are
    /// rejected, never applied.
    pub fn transition(&mut self, next: RequestStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(MartError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Append a turn to the ordered conversation sequence
    pub fn append_turn(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Whether this record is still open for chat (turns may be appended)
    pub fn open_for_chat(&self) -> bool {
        self.session.is_some() && self.status == RequestStatus::Pending
    }
}
