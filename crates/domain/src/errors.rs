//! Error taxonomy for the MailCheck client SDK.
//!
//! Callers never see a raw transport error: every failure surfaced by the
//! SDK is one of these typed variants. Per-endpoint transport and 5xx
//! failures are retried internally and only reach the caller aggregated
//! inside [`MailCheckError::ServiceUnreachable`].

use std::fmt;

use thiserror::Error;

/// One recorded failure against a single API endpoint.
#[derive(Debug, Clone)]
pub struct EndpointFailure {
    /// Base URL of the endpoint that failed.
    pub endpoint: String,
    /// Human-readable description of the failure (transport error or HTTP
    /// status).
    pub message: String,
}

impl fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.message)
    }
}

/// Typed failures surfaced by the MailCheck client.
#[derive(Debug, Error)]
pub enum MailCheckError {
    /// A pending wait or in-flight call was aborted through a cancellation
    /// token. Always wins over any other concurrently-detected condition.
    #[error("Operation canceled")]
    Canceled,

    /// Every configured endpoint failed for one logical call. Carries the
    /// per-endpoint failures in attempt order.
    #[error("All API endpoints are unreachable ({} attempted)", failures.len())]
    ServiceUnreachable { failures: Vec<EndpointFailure> },

    /// HTTP 401 with no CAPTCHA marker in the problem body.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// HTTP 401 whose problem `type` names the CAPTCHA validation failure.
    #[error("CAPTCHA validation failed: {0}")]
    CaptchaValidation(String),

    /// HTTP 403 that the authenticator's recovery hook could not resolve.
    #[error("Authorization denied: {0}")]
    Authorization(String),

    /// HTTP 402.
    #[error("Insufficient credit: {0}")]
    InsufficientCredit(String),

    /// HTTP 429.
    #[error("Request throttled: {0}")]
    Throttled(String),

    /// A status code the calling wrapper did not expect for the operation.
    #[error("Unexpected response (HTTP {status}): {message}")]
    UnexpectedResponse { status: u16, message: String },

    /// The caller-supplied wait deadline elapsed before the job reached a
    /// terminal state.
    #[error("Wait deadline elapsed before the job completed")]
    WaitTimeout,

    /// Programmer error: a required argument was null/empty/out of range.
    /// Raised synchronously, before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal condition (e.g. a response body that does not
    /// match the documented wire shape).
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for MailCheck operations
pub type Result<T> = std::result::Result<T, MailCheckError>;
