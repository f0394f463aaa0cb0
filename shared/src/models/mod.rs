//! Domain models for the Granel inventory platform

pub mod price_history;
pub mod product;
pub mod purchase;
pub mod sale;

pub use price_history::*;
pub use product::*;
pub use purchase::*;
pub use sale::*;
