//! Multiplexed REST invoker.
//!
//! Executes one logical request against a set of equivalent API endpoints:
//! round-robin selection, at most one attempt per endpoint, pluggable
//! authentication, and typed classification of every response. Transport
//! errors and 5xx answers move on to the next endpoint; everything the
//! caller must act on surfaces as a typed [`MailCheckError`].

use std::sync::atomic::{AtomicUsize, Ordering};

use mailcheck_domain::constants::PROBLEM_JSON_CONTENT_TYPE;
use mailcheck_domain::{EndpointFailure, MailCheckError, ProblemDetails, Result};
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::cancellation::CancellationToken;

/// Default `Accept` header: plain JSON plus the structured problem variant.
pub(crate) const DEFAULT_ACCEPT: &str = "application/json, application/problem+json";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Body of an outgoing request.
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartPayload),
}

/// Multipart form data, kept as raw material so the form can be rebuilt on
/// every endpoint attempt (`reqwest` forms are single-use).
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    pub file_name: String,
    pub content_type: String,
    pub contents: Vec<u8>,
    /// JSON `settings` part accompanying the file.
    pub settings: serde_json::Value,
}

/// One logical request, independent of the endpoint it will be sent to.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    /// Resource path relative to the endpoint base, e.g. `email-validations`.
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    /// Header overrides, merged last so they win over the defaults.
    headers: Vec<(HeaderName, HeaderValue)>,
    /// Skip authenticator decoration; used by the authenticators' own
    /// token-acquisition calls to avoid infinite recursion.
    bypass_auth: bool,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: Vec::new(),
            bypass_auth: false,
        }
    }

    pub fn query_pair(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, payload: MultipartPayload) -> Self {
        self.body = RequestBody::Multipart(payload);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }

    pub fn bypass_auth(mut self) -> Self {
        self.bypass_auth = true;
        self
    }
}

/// Success envelope: buffered response plus a lazy JSON accessor. The
/// caller interprets status semantics (404/410 become "absent" in the
/// resource wrappers, not here).
#[derive(Debug)]
pub struct RestResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl RestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Deserialize the buffered body as JSON.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            MailCheckError::Internal(format!("response body did not match the expected shape: {err}"))
        })
    }

    /// Raw body bytes, e.g. for entry exports.
    pub fn into_bytes(self) -> Vec<u8> {
        self.body
    }
}

enum AttemptOutcome {
    Response(RestResponse),
    EndpointFailed(EndpointFailure),
}

/// REST invoker multiplexing over a fixed, pre-shuffled endpoint set.
pub struct RestInvoker {
    endpoints: Vec<Url>,
    /// Monotonically increasing attempt counter; `counter % endpoints.len()`
    /// picks the endpoint, so consecutive invocations rotate through the
    /// whole set.
    attempt_cursor: AtomicUsize,
    http: reqwest::Client,
    authenticator: std::sync::Arc<dyn Authenticator>,
}

impl RestInvoker {
    /// Preconditions enforced by the client builder: `endpoints` is
    /// non-empty and already shuffled.
    pub(crate) fn new(
        endpoints: Vec<Url>,
        http: reqwest::Client,
        authenticator: std::sync::Arc<dyn Authenticator>,
    ) -> Self {
        debug_assert!(!endpoints.is_empty());
        Self { endpoints, attempt_cursor: AtomicUsize::new(0), http, authenticator }
    }

    /// Execute one logical request with endpoint failover.
    ///
    /// Attempts each configured endpoint at most once. Transport errors and
    /// 5xx responses are recorded and the next endpoint is tried; once all
    /// endpoints are exhausted the recorded failures surface aggregated as
    /// [`MailCheckError::ServiceUnreachable`]. Cancellation is honored
    /// before every attempt and while a call is in flight, and always wins
    /// over any other classification.
    pub async fn invoke(
        &self,
        spec: RequestSpec,
        cancellation: Option<&CancellationToken>,
    ) -> Result<RestResponse> {
        let mut failures: Vec<EndpointFailure> = Vec::new();

        for _ in 0..self.endpoints.len() {
            if let Some(token) = cancellation {
                token.ensure_not_canceled()?;
            }

            let index = self.attempt_cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
            let endpoint = &self.endpoints[index];

            match self.attempt(endpoint, &spec, cancellation).await? {
                AttemptOutcome::Response(response) => return Ok(response),
                AttemptOutcome::EndpointFailed(failure) => {
                    warn!(endpoint = %failure.endpoint, reason = %failure.message, "endpoint attempt failed");
                    failures.push(failure);
                }
            }
        }

        Err(MailCheckError::ServiceUnreachable { failures })
    }

    /// One attempt against one endpoint. Hard failures (401/402/403/429,
    /// cancellation) propagate as `Err`; retryable conditions come back as
    /// `Ok(EndpointFailed)` so the caller moves on to the next endpoint.
    async fn attempt(
        &self,
        endpoint: &Url,
        spec: &RequestSpec,
        cancellation: Option<&CancellationToken>,
    ) -> Result<AttemptOutcome> {
        let url = resource_url(endpoint, spec)?;
        let mut replayed = false;

        loop {
            let request = self.build_request(&url, spec).await?;

            debug!(method = %spec.method, %url, "sending API request");
            let sent = match cancellation {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => return Err(MailCheckError::Canceled),
                        outcome = request.send() => outcome,
                    }
                }
                None => request.send().await,
            };

            let response = match sent {
                Ok(response) => response,
                Err(err) => {
                    return Ok(AttemptOutcome::EndpointFailed(EndpointFailure {
                        endpoint: endpoint.to_string(),
                        message: err.to_string(),
                    }));
                }
            };

            let status = response.status();
            debug!(method = %spec.method, %url, %status, "received API response");

            if status.is_server_error() {
                return Ok(AttemptOutcome::EndpointFailed(EndpointFailure {
                    endpoint: endpoint.to_string(),
                    message: format!("HTTP {status}"),
                }));
            }

            match status {
                StatusCode::UNAUTHORIZED => {
                    let (problem, message) = read_problem(response).await;
                    if problem.as_ref().is_some_and(ProblemDetails::is_captcha_failure) {
                        return Err(MailCheckError::CaptchaValidation(message));
                    }
                    return Err(MailCheckError::Authentication(message));
                }
                StatusCode::PAYMENT_REQUIRED => {
                    let (_, message) = read_problem(response).await;
                    return Err(MailCheckError::InsufficientCredit(message));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    let (_, message) = read_problem(response).await;
                    return Err(MailCheckError::Throttled(message));
                }
                StatusCode::FORBIDDEN => {
                    let (problem, message) = read_problem(response).await;
                    if replayed {
                        return Err(MailCheckError::Authorization(message));
                    }
                    // Recovery hook: some authenticators can re-issue a
                    // token; a recovered request is replayed once against
                    // the same endpoint.
                    self.authenticator.handle_forbidden(self, problem.as_ref()).await?;
                    debug!(%url, "authenticator recovered a forbidden response, replaying request");
                    replayed = true;
                }
                _ => {
                    let body = match response.bytes().await {
                        Ok(bytes) => bytes.to_vec(),
                        Err(err) => {
                            return Ok(AttemptOutcome::EndpointFailed(EndpointFailure {
                                endpoint: endpoint.to_string(),
                                message: format!("failed reading response body: {err}"),
                            }));
                        }
                    };
                    return Ok(AttemptOutcome::Response(RestResponse { status, body }));
                }
            }
        }
    }

    async fn build_request(&self, url: &Url, spec: &RequestSpec) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.http.request(spec.method.clone(), url.clone());

        builder = builder.header(ACCEPT, DEFAULT_ACCEPT);
        builder = match &spec.body {
            RequestBody::Empty => builder.header(CONTENT_TYPE, JSON_CONTENT_TYPE),
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(payload) => builder.multipart(multipart_form(payload)?),
        };

        // Caller-supplied overrides win over the defaults above.
        let mut overrides = reqwest::header::HeaderMap::new();
        for (name, value) in &spec.headers {
            overrides.insert(name.clone(), value.clone());
        }
        if !overrides.is_empty() {
            builder = builder.headers(overrides);
        }

        if spec.bypass_auth {
            Ok(builder)
        } else {
            self.authenticator.decorate(self, builder).await
        }
    }
}

/// Build the full resource URL, serializing query parameters as
/// percent-encoded `key=value` fragments. Parameter names (which may
/// legitimately contain `:`, as in `cursor:prev`) are emitted verbatim.
fn resource_url(endpoint: &Url, spec: &RequestSpec) -> Result<Url> {
    let mut url = endpoint.join(&spec.path).map_err(|err| {
        MailCheckError::InvalidInput(format!("invalid resource path {:?}: {err}", spec.path))
    })?;

    if !spec.query.is_empty() {
        let query = spec
            .query
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }

    Ok(url)
}

/// Rebuild the multipart form for a single attempt: the uploaded file plus
/// a JSON `settings` part.
fn multipart_form(payload: &MultipartPayload) -> Result<reqwest::multipart::Form> {
    let file = reqwest::multipart::Part::bytes(payload.contents.clone())
        .file_name(payload.file_name.clone())
        .mime_str(&payload.content_type)
        .map_err(|err| {
            MailCheckError::InvalidInput(format!(
                "invalid file content type {:?}: {err}",
                payload.content_type
            ))
        })?;

    let settings = reqwest::multipart::Part::text(payload.settings.to_string())
        .mime_str(JSON_CONTENT_TYPE)
        .map_err(|err| MailCheckError::Internal(format!("invalid settings part: {err}")))?;

    Ok(reqwest::multipart::Form::new().part("inputFile", file).part("settings", settings))
}

/// Extract the structured problem body, when the response carries one, and
/// derive the human-readable error message.
async fn read_problem(response: reqwest::Response) -> (Option<ProblemDetails>, String) {
    let status = response.status().as_u16();
    let is_problem = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(PROBLEM_JSON_CONTENT_TYPE));

    let problem = if is_problem {
        match response.bytes().await {
            Ok(bytes) => serde_json::from_slice::<ProblemDetails>(&bytes).ok(),
            Err(_) => None,
        }
    } else {
        None
    };

    let message = problem
        .as_ref()
        .map(|details| details.message(status))
        .unwrap_or_else(|| format!("The service answered with HTTP {status}"));

    (problem, message)
}
