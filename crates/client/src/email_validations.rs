//! Email-validation job operations: submit, fetch, poll to completion,
//! delete, list, and export.

use std::sync::Arc;

use futures::stream::Stream;
use mailcheck_domain::{
    ListSegment, MailCheckError, Result, ValidationEntry, ValidationJob, ValidationListingOptions,
    ValidationOverview, ValidationRequest, ValidationRequestEntry, ValidationSettings,
    ValidationStatus,
};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cancellation::CancellationToken;
use crate::invoker::{MultipartPayload, RequestSpec, RestInvoker, RestResponse};
use crate::listing::paginate;
use crate::waiter::{self, WaitOptions};

/// Export formats accepted by the entries endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl ExportFormat {
    fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Tsv => "text/tab-separated-values",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Wire shape of a job response: overview plus the first entries segment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationJobPayload {
    overview: ValidationOverview,
    entries: Option<ListSegment<ValidationEntry>>,
}

/// JSON submission body: entries plus flattened processing settings.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionBody<'a> {
    entries: &'a [ValidationRequestEntry],
    #[serde(flatten)]
    settings: &'a ValidationSettings,
}

/// Entry point for the `/email-validations` resource.
pub struct EmailValidations {
    invoker: Arc<RestInvoker>,
}

impl EmailValidations {
    pub(crate) fn new(invoker: Arc<RestInvoker>) -> Self {
        Self { invoker }
    }

    /// Submit entries for validation and, depending on the wait policy,
    /// poll until the job completes.
    ///
    /// Returns `Ok(None)` when the service reports the job as gone
    /// (404/410) — an expired job is a valid terminal outcome, not an
    /// error.
    pub async fn submit(
        &self,
        request: impl Into<ValidationRequest>,
        options: WaitOptions,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<ValidationJob>> {
        let request = request.into();
        request.validate()?;

        let spec = self
            .submission_spec(&request)?
            .query_pair("waitTime", options.submission_wait.as_secs().to_string());

        let response = self.invoker.invoke(spec, cancellation).await?;
        self.complete(response, options, cancellation).await
    }

    /// Fetch a job by id and, depending on the wait policy, poll until it
    /// completes. `Ok(None)` means the job never existed, expired, or was
    /// deleted.
    pub async fn get(
        &self,
        id: &str,
        options: WaitOptions,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<ValidationJob>> {
        ensure_job_id(id)?;
        let response = self.fetch_job(id, &options, cancellation).await?;
        self.complete(response, options, cancellation).await
    }

    /// Delete a job. Deleting a job that is already gone (410) succeeds.
    pub async fn delete(&self, id: &str, cancellation: Option<&CancellationToken>) -> Result<()> {
        ensure_job_id(id)?;
        let spec = RequestSpec::new(Method::DELETE, format!("email-validations/{id}"));
        let response = self.invoker.invoke(spec, cancellation).await?;
        match response.status() {
            StatusCode::OK | StatusCode::GONE => Ok(()),
            status => Err(MailCheckError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("unexpected status while deleting job {id}"),
            }),
        }
    }

    /// Lazily list job overviews, newest-first by default, following the
    /// server's pagination cursors.
    pub fn list(
        &self,
        options: ValidationListingOptions,
        cancellation: Option<&CancellationToken>,
    ) -> impl Stream<Item = Result<ValidationOverview>> + Send {
        paginate(
            self.invoker.clone(),
            "email-validations",
            options.query_fragments(),
            options.direction,
            options.limit,
            cancellation,
        )
    }

    /// Download the entries of a completed job in an export format instead
    /// of JSON; returns the raw exported stream.
    pub async fn export_entries(
        &self,
        id: &str,
        format: ExportFormat,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Vec<u8>> {
        ensure_job_id(id)?;
        let spec = RequestSpec::new(Method::GET, format!("email-validations/{id}/entries"))
            .header(ACCEPT, HeaderValue::from_static(format.mime()));

        let response = self.invoker.invoke(spec, cancellation).await?;
        match response.status() {
            StatusCode::OK => Ok(response.into_bytes()),
            status => Err(MailCheckError::UnexpectedResponse {
                status: status.as_u16(),
                message: format!("unexpected status while exporting entries of job {id}"),
            }),
        }
    }

    fn submission_spec(&self, request: &ValidationRequest) -> Result<RequestSpec> {
        let spec = RequestSpec::new(Method::POST, "email-validations");

        let owned_entries;
        let (entries, settings) = match request {
            ValidationRequest::EmailAddress(address) => {
                owned_entries = vec![ValidationRequestEntry::new(address.clone())];
                (&owned_entries[..], None)
            }
            ValidationRequest::EmailAddresses(addresses) => {
                owned_entries =
                    addresses.iter().map(|a| ValidationRequestEntry::new(a.clone())).collect();
                (&owned_entries[..], None)
            }
            ValidationRequest::Entry(entry) => {
                owned_entries = vec![entry.clone()];
                (&owned_entries[..], None)
            }
            ValidationRequest::Entries(entries) => (&entries[..], None),
            ValidationRequest::Full(full) => (&full.entries[..], Some(&full.settings)),
            ValidationRequest::File(file) => {
                let settings = serde_json::to_value(&file.settings).map_err(|err| {
                    MailCheckError::Internal(format!("settings serialization failed: {err}"))
                })?;
                return Ok(spec.multipart(MultipartPayload {
                    file_name: file.file_name.clone(),
                    content_type: file.content_type.clone(),
                    contents: file.contents.clone(),
                    settings,
                }));
            }
        };

        let default_settings = ValidationSettings::default();
        let body = SubmissionBody {
            entries,
            settings: settings.unwrap_or(&default_settings),
        };
        let body = serde_json::to_value(&body).map_err(|err| {
            MailCheckError::Internal(format!("submission serialization failed: {err}"))
        })?;
        Ok(spec.json(body))
    }

    async fn fetch_job(
        &self,
        id: &str,
        options: &WaitOptions,
        cancellation: Option<&CancellationToken>,
    ) -> Result<RestResponse> {
        let spec = RequestSpec::new(Method::GET, format!("email-validations/{id}"))
            .query_pair("waitTime", options.poll_wait.as_secs().to_string());
        self.invoker.invoke(spec, cancellation).await
    }

    /// Drive a submission/fetch response to its final outcome: absent,
    /// immediately materialized, or polled until a terminal state.
    async fn complete(
        &self,
        response: RestResponse,
        options: WaitOptions,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Option<ValidationJob>> {
        let Some(payload) = decode_job(response)? else {
            return Ok(None);
        };
        let mut overview = payload.overview;
        let mut first_segment = payload.entries;

        if options.is_no_wait() || overview.status == ValidationStatus::Completed {
            let job = self.materialize(overview, first_segment, cancellation).await?;
            return Ok(Some(job));
        }

        let deadline = options.max_wait.map(|max| tokio::time::Instant::now() + max);

        while !overview.status.is_terminal() {
            if let Some(callback) = &options.progress {
                callback(&overview);
            }

            if let Some(deadline) = deadline {
                if tokio::time::Instant::now() >= deadline {
                    return Err(MailCheckError::WaitTimeout);
                }
            }

            // The waiter clamps the sleep to whatever budget remains.
            waiter::wait_for_next_poll(&overview, deadline, cancellation).await?;

            let response = self.fetch_job(&overview.id, &options, cancellation).await?;
            let Some(payload) = decode_job(response)? else {
                // The job vanished between polls: a valid terminal outcome.
                debug!(job_id = %overview.id, "job disappeared while polling");
                return Ok(None);
            };
            overview = payload.overview;
            first_segment = payload.entries;
        }

        info!(job_id = %overview.id, status = ?overview.status, "job reached a terminal state");
        let job = self.materialize(overview, first_segment, cancellation).await?;
        Ok(Some(job))
    }

    /// Concatenate every entries segment into the final result; the job is
    /// never handed to the caller partially materialized.
    async fn materialize(
        &self,
        overview: ValidationOverview,
        first_segment: Option<ListSegment<ValidationEntry>>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<ValidationJob> {
        let mut entries = Vec::with_capacity(overview.no_of_entries as usize);
        let mut segment = first_segment;

        while let Some(current) = segment {
            entries.extend(current.data);
            if !current.meta.is_truncated {
                break;
            }
            let cursor = current.meta.cursor.ok_or_else(|| {
                MailCheckError::Internal(
                    "truncated entries segment arrived without a pagination cursor".into(),
                )
            })?;

            if let Some(token) = cancellation {
                token.ensure_not_canceled()?;
            }

            let spec =
                RequestSpec::new(Method::GET, format!("email-validations/{}/entries", overview.id))
                    .query_pair("cursor", cursor);
            let response = self.invoker.invoke(spec, cancellation).await?;
            if response.status() != StatusCode::OK {
                return Err(MailCheckError::UnexpectedResponse {
                    status: response.status().as_u16(),
                    message: format!("unexpected status while fetching entries of job {}", overview.id),
                });
            }
            segment = Some(response.deserialize::<ListSegment<ValidationEntry>>()?);
        }

        Ok(ValidationJob { overview, entries })
    }
}

/// Decode a job response; 404/410 yield `None` ("absent"), never an error.
fn decode_job(response: RestResponse) -> Result<Option<ValidationJobPayload>> {
    match response.status() {
        StatusCode::NOT_FOUND | StatusCode::GONE => Ok(None),
        StatusCode::OK | StatusCode::ACCEPTED => Ok(Some(response.deserialize()?)),
        status => Err(MailCheckError::UnexpectedResponse {
            status: status.as_u16(),
            message: "unexpected status for a validation job request".into(),
        }),
    }
}

fn ensure_job_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(MailCheckError::InvalidInput("job id must not be empty".into()));
    }
    Ok(())
}
