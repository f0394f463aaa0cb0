//! Shared types and domain logic for the Granel inventory platform
//!
//! This crate contains the data model and the pure batch-costing engine
//! used by the backend. Nothing in here touches the network or the
//! database, so the whole stock policy is testable in isolation.

pub mod ledger;
pub mod models;
pub mod profit;
pub mod validation;

pub use ledger::*;
pub use models::*;
pub use validation::*;
