//! Database models for the Granel backend
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
