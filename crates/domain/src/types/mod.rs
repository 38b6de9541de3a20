//! Domain data types for the MailCheck client SDK.

pub mod credits;
pub mod job;
pub mod listing;
pub mod problem;

pub use credits::*;
pub use job::*;
pub use listing::*;
pub use problem::*;
