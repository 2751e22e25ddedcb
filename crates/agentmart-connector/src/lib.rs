//! Agentmart Connector - the external API/webhook collaborator
//!
//! Connectors carry an agent-specific payload to the external system and
//! bring back its raw reply. The only standardized part of a reply is the
//! boundary interpretation in [`AgentOutcome`]: a `success` indicator and a
//! result payload, with absent or invalid fields treated as failure rather
//! than a crash.
//!
//! No retry policy lives here; connectors apply a bounded timeout around the
//! external call and report transient failures as `ExternalService` errors.

pub mod connectors;
pub mod outcome;
pub mod router;

pub use connectors::*;
pub use outcome::*;
pub use router::*;
