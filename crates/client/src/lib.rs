//! # MailCheck Client
//!
//! Async Rust client for the MailCheck email verification API.
//!
//! The SDK wraps the remote REST API behind typed operations: submit an
//! email-validation job, poll it to completion with an adaptive long-poll
//! waiter, page lazily through jobs and credit usage, and query credit
//! balances. One logical call is multiplexed across a set of equivalent
//! API endpoints with automatic failover; every failure the caller can
//! act on surfaces as a typed [`mailcheck_domain::MailCheckError`].
//!
//! ```no_run
//! use mailcheck_client::{MailCheckClient, WaitOptions};
//!
//! # async fn example() -> mailcheck_domain::Result<()> {
//! let client = MailCheckClient::builder()
//!     .basic_auth("browser-app", "secret")?
//!     .build()?;
//!
//! let job = client
//!     .email_validations()
//!     .submit("alice@example.com", WaitOptions::default(), None)
//!     .await?;
//!
//! if let Some(job) = job {
//!     for entry in &job.entries {
//!         println!("{} -> {:?}", entry.input_data, entry.classification);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cancellation;
pub mod config;
pub mod credits;
pub mod email_validations;
mod invoker;
mod listing;
pub mod waiter;

// Re-export commonly used items
pub use cancellation::{CancellationToken, Registration};
pub use config::{MailCheckClient, MailCheckClientBuilder, DEFAULT_BASE_URLS};
pub use credits::Credits;
pub use email_validations::{EmailValidations, ExportFormat};
pub use invoker::{MultipartPayload, RequestBody, RequestSpec, RestInvoker, RestResponse};
pub use mailcheck_domain as domain;
pub use waiter::{ProgressCallback, WaitOptions};
