//! Agentmart Types - Canonical domain types for the agent marketplace core
//!
//! This crate contains all foundational types for agentmart with zero
//! dependencies on other agentmart crates. It defines:
//!
//! - Identity types (AccountId, RequestId, SessionId, etc.)
//! - Currency and amount types with fixed-point arithmetic
//! - Catalog listing types (slug, price, connector kind)
//! - Request lifecycle types (status machine, conversation turns)
//! - Response types
//!
//! # Lifecycle Invariants
//!
//! 1. A response exists if and only if the request is terminal
//! 2. Request cost is a snapshot of the listing price, immutable after creation
//! 3. A wallet debit happens at most once per request, and only on `Completed`
//! 4. Status moves only through the static transition table:
//!    `Pending -> Processing -> {Completed, Failed}`

pub mod identity;
pub mod amount;
pub mod listing;
pub mod request;
pub mod response;
pub mod error;

pub use identity::*;
pub use amount::*;
pub use listing::*;
pub use request::*;
pub use response::*;
pub use error::*;

/// Version of the agentmart types schema
pub const TYPES_VERSION: &str = "0.1.0";
