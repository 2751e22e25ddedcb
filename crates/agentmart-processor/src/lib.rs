//! Agentmart Processor - the request lifecycle driver
//!
//! A stateless orchestrator over three collaborators: the catalog (price
//! lookup), the wallet (balance check and debit), and the connector router
//! (external call). It drives every request through
//! `Pending -> Processing -> {Completed, Failed}` and applies the billing
//! contract:
//!
//! - the debit happens strictly after the response is stored, and only on a
//!   confirmed success
//! - no failure path ever debits
//! - no path leaves a request stuck in `Pending` or `Processing`

pub mod processor;
pub mod store;

pub use processor::*;
pub use store::*;
