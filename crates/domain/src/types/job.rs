//! Email-validation job types.
//!
//! A job is a server-side task identified by an opaque id, moving through
//! `InProgress` into one of the terminal states. The lightweight
//! [`ValidationOverview`] is re-fetched while polling; the materialized
//! [`ValidationJob`] carries the full entry list and is only handed to the
//! caller once every pagination segment has been consumed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{MailCheckError, Result};

/// Lifecycle state of an email-validation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationStatus {
    /// The job has been accepted and is being processed.
    InProgress,
    /// The job finished and its entries can be retrieved.
    Completed,
    /// The job was deleted before completion.
    Deleted,
    /// The job results expired and were purged.
    Expired,
}

impl ValidationStatus {
    /// Whether the job can still change state on the server.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ValidationStatus::InProgress)
    }
}

/// Server-reported progress of an in-flight job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationProgress {
    /// Completion percentage in the `[0, 1]` range.
    pub percentage: Option<f64>,
    /// Estimated time remaining, encoded as `[days.]HH:MM:SS[.fraction]`.
    pub estimated_time_remaining: Option<String>,
}

/// Quality level a job was (or should be) processed with.
///
/// The service ships `Standard`, `High` and `Extreme` but accounts may
/// carry custom levels, so this is an open string rather than a closed
/// enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QualityLevel(pub String);

impl QualityLevel {
    pub fn standard() -> Self {
        QualityLevel("Standard".into())
    }

    pub fn high() -> Self {
        QualityLevel("High".into())
    }

    pub fn extreme() -> Self {
        QualityLevel("Extreme".into())
    }
}

/// Duplicate-detection behavior applied while processing a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeduplicationMode {
    /// No duplicate detection.
    Off,
    /// Mark duplicates only when the algorithm is certain.
    Safe,
    /// Aggressive duplicate detection.
    Relaxed,
}

/// Lightweight, frequently re-fetched summary of a job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOverview {
    /// Opaque server-issued job identifier.
    pub id: String,
    pub status: ValidationStatus,
    /// Number of entries the job was submitted with.
    #[serde(default)]
    pub no_of_entries: u64,
    pub submitted_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub quality: Option<QualityLevel>,
    pub deduplication: Option<DeduplicationMode>,
    /// Present only while the job is in progress.
    pub progress: Option<ValidationProgress>,
}

/// Final classification of a validated entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryClassification {
    Deliverable,
    Risky,
    Undeliverable,
    Unknown,
}

/// Detailed status code of a validated entry.
///
/// Mirrors the service's published code table; codes added server-side
/// after this SDK release deserialize as [`EntryStatus::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    Success,
    AtSignNotFound,
    CatchAllConnectionFailure,
    CatchAllValidationTimeout,
    DnsConnectionFailure,
    DnsQueryTimeout,
    DomainDoesNotExist,
    DomainHasNullMx,
    DomainIsMisconfigured,
    DomainIsWellKnownDea,
    DomainPartCompliancyFailure,
    DoubleDotSequence,
    Duplicate,
    InvalidAddressLength,
    InvalidCharacterInSequence,
    InvalidEmptyQuotedWord,
    InvalidFolderWord,
    InvalidLocalPartLength,
    InvalidWordBoundaryStart,
    IspSpecificSyntaxFailure,
    LocalEndPointRejected,
    LocalPartIsWellKnownRoleAccount,
    LocalSenderAddressRejected,
    MailboxConnectionFailure,
    MailboxDoesNotExist,
    MailboxIsDea,
    MailboxTemporarilyUnavailable,
    MailboxValidationTimeout,
    MailExchangerIsHoneypot,
    MailExchangerIsParked,
    MailExchangerIsWellKnownDea,
    ServerDoesNotSupportInternationalMailboxes,
    ServerIsCatchAll,
    ServerTemporaryUnavailable,
    SmtpConnectionFailure,
    SmtpConnectionTimeout,
    SmtpDialogError,
    UnacceptableDomainLiteral,
    UnbalancedCommentParenthesis,
    UnexpectedQuotedPairSequence,
    UnhandledException,
    UnmatchedQuotedPair,
    #[serde(other)]
    Unknown,
}

/// One validated item of a completed job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    /// Zero-based position within the job.
    #[serde(default)]
    pub index: u32,
    /// The string the caller originally submitted.
    pub input_data: String,
    pub classification: Option<EntryClassification>,
    pub status: Option<EntryStatus>,
    /// Normalized form of the validated address.
    pub email_address: Option<String>,
    pub email_address_local_part: Option<String>,
    pub email_address_domain_part: Option<String>,
    pub suggestions: Option<Vec<String>>,
    /// Index of the entry this one duplicates, when deduplication marked it.
    pub duplicate_of: Option<u32>,
    pub completed_on: Option<DateTime<Utc>>,
    /// Caller-defined opaque string echoed back by the service.
    pub custom: Option<String>,
}

/// Fully materialized job: overview plus every entry, in server order.
#[derive(Debug, Clone)]
pub struct ValidationJob {
    pub overview: ValidationOverview,
    pub entries: Vec<ValidationEntry>,
}

/// One input item of a submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequestEntry {
    pub input_data: String,
    /// Opaque caller-defined string echoed back on the validated entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
}

impl ValidationRequestEntry {
    pub fn new(input_data: impl Into<String>) -> Self {
        Self { input_data: input_data.into(), custom: None }
    }

    pub fn with_custom(input_data: impl Into<String>, custom: impl Into<String>) -> Self {
        Self { input_data: input_data.into(), custom: Some(custom.into()) }
    }
}

/// Processing options attached to a submission.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduplication: Option<DeduplicationMode>,
    /// Relative processing priority, `0` (lowest) to `255` (highest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Optional display name for the job.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// How long the results are retained, as `[days.]HH:MM:SS`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention: Option<String>,
}

/// A submission built from entries plus explicit processing settings.
#[derive(Debug, Clone)]
pub struct FullValidationRequest {
    pub entries: Vec<ValidationRequestEntry>,
    pub settings: ValidationSettings,
}

/// A submission carried by an uploaded file (CSV, TSV, spreadsheet) plus
/// processing settings; shipped as a multipart form.
#[derive(Debug, Clone)]
pub struct FileValidationRequest {
    pub contents: Vec<u8>,
    pub file_name: String,
    /// MIME type of `contents` (e.g. `text/csv`).
    pub content_type: String,
    pub settings: ValidationSettings,
}

/// Accepted shapes of a submission, one variant per input shape the API
/// boundary resolves; no runtime type sniffing happens past this point.
#[derive(Debug, Clone)]
pub enum ValidationRequest {
    EmailAddress(String),
    EmailAddresses(Vec<String>),
    Entry(ValidationRequestEntry),
    Entries(Vec<ValidationRequestEntry>),
    Full(FullValidationRequest),
    File(FileValidationRequest),
}

impl ValidationRequest {
    /// Fail-fast argument validation, performed before any I/O.
    pub fn validate(&self) -> Result<()> {
        match self {
            ValidationRequest::EmailAddress(address) if address.trim().is_empty() => {
                Err(MailCheckError::InvalidInput("email address must not be empty".into()))
            }
            ValidationRequest::EmailAddresses(addresses) if addresses.is_empty() => {
                Err(MailCheckError::InvalidInput("at least one email address is required".into()))
            }
            ValidationRequest::Entry(entry) if entry.input_data.trim().is_empty() => {
                Err(MailCheckError::InvalidInput("entry input data must not be empty".into()))
            }
            ValidationRequest::Entries(entries) | ValidationRequest::Full(FullValidationRequest { entries, .. })
                if entries.is_empty() =>
            {
                Err(MailCheckError::InvalidInput("at least one entry is required".into()))
            }
            ValidationRequest::File(file) if file.contents.is_empty() => {
                Err(MailCheckError::InvalidInput("file contents must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

impl From<&str> for ValidationRequest {
    fn from(address: &str) -> Self {
        ValidationRequest::EmailAddress(address.to_string())
    }
}

impl From<String> for ValidationRequest {
    fn from(address: String) -> Self {
        ValidationRequest::EmailAddress(address)
    }
}

impl From<Vec<String>> for ValidationRequest {
    fn from(addresses: Vec<String>) -> Self {
        ValidationRequest::EmailAddresses(addresses)
    }
}

impl From<&[&str]> for ValidationRequest {
    fn from(addresses: &[&str]) -> Self {
        ValidationRequest::EmailAddresses(addresses.iter().map(|a| a.to_string()).collect())
    }
}

impl From<ValidationRequestEntry> for ValidationRequest {
    fn from(entry: ValidationRequestEntry) -> Self {
        ValidationRequest::Entry(entry)
    }
}

impl From<Vec<ValidationRequestEntry>> for ValidationRequest {
    fn from(entries: Vec<ValidationRequestEntry>) -> Self {
        ValidationRequest::Entries(entries)
    }
}

impl From<FullValidationRequest> for ValidationRequest {
    fn from(request: FullValidationRequest) -> Self {
        ValidationRequest::Full(request)
    }
}

impl From<FileValidationRequest> for ValidationRequest {
    fn from(request: FileValidationRequest) -> Self {
        ValidationRequest::File(request)
    }
}
