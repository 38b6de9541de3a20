//! # MailCheck Domain
//!
//! Domain types and models shared across the MailCheck client SDK.
//!
//! This crate contains:
//! - Wire-facing data types (job overviews, entries, credit balances)
//! - The SDK error taxonomy and `Result` alias
//! - Constant tables (statuses, classifications, quality levels)
//!
//! ## Architecture
//! - No dependencies on other MailCheck crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
