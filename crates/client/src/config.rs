//! Client construction and configuration.

use std::sync::Arc;
use std::time::Duration;

use mailcheck_domain::{MailCheckError, Result};
use rand::seq::SliceRandom;
use reqwest::Url;
use tracing::debug;

use crate::auth::{Authenticator, BasicAuthenticator, BearerAuthenticator};
use crate::credits::Credits;
use crate::email_validations::EmailValidations;
use crate::invoker::RestInvoker;

/// Default API endpoints; equivalent replicas the invoker multiplexes
/// across.
pub const DEFAULT_BASE_URLS: &[&str] = &[
    "https://api-1.mailcheck.io/v2/",
    "https://api-2.mailcheck.io/v2/",
    "https://api-3.mailcheck.io/v2/",
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Client for the MailCheck email verification API.
///
/// One instance owns the shuffled endpoint order, the round-robin counter
/// and the underlying HTTP transport; clones of the resource entry points
/// share all of them.
#[derive(Clone)]
pub struct MailCheckClient {
    invoker: Arc<RestInvoker>,
}

impl MailCheckClient {
    /// Start building a client.
    pub fn builder() -> MailCheckClientBuilder {
        MailCheckClientBuilder::default()
    }

    /// Email-validation job operations.
    pub fn email_validations(&self) -> EmailValidations {
        EmailValidations::new(self.invoker.clone())
    }

    /// Account credit operations.
    pub fn credits(&self) -> Credits {
        Credits::new(self.invoker.clone())
    }
}

/// Builder for [`MailCheckClient`].
pub struct MailCheckClientBuilder {
    authenticator: Option<Arc<dyn Authenticator>>,
    base_urls: Vec<String>,
    user_agent: String,
    timeout: Duration,
}

impl Default for MailCheckClientBuilder {
    fn default() -> Self {
        Self {
            authenticator: None,
            base_urls: DEFAULT_BASE_URLS.iter().map(|url| url.to_string()).collect(),
            user_agent: format!("mailcheck-rust/{}", env!("CARGO_PKG_VERSION")),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl MailCheckClientBuilder {
    /// Authenticate with HTTP Basic credentials.
    pub fn basic_auth(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let authenticator = BasicAuthenticator::new(username, password)?;
        Ok(self.authenticator(Arc::new(authenticator)))
    }

    /// Authenticate with a bearer token acquired from the credentials.
    pub fn bearer_auth(
        self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let authenticator = BearerAuthenticator::new(username, password)?;
        Ok(self.authenticator(Arc::new(authenticator)))
    }

    /// Use a custom credential strategy.
    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Override the API endpoints, e.g. to pin a region or target a mock
    /// server in tests.
    pub fn base_urls<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-attempt HTTP timeout (each endpoint attempt gets its own).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<MailCheckClient> {
        let authenticator = self.authenticator.ok_or_else(|| {
            MailCheckError::InvalidInput("credentials are required to build a client".into())
        })?;

        if self.base_urls.is_empty() {
            return Err(MailCheckError::InvalidInput(
                "at least one base URL is required".into(),
            ));
        }

        let mut endpoints = Vec::with_capacity(self.base_urls.len());
        for raw in &self.base_urls {
            let mut url = Url::parse(raw).map_err(|err| {
                MailCheckError::InvalidInput(format!("invalid base URL {raw:?}: {err}"))
            })?;
            if url.cannot_be_a_base() {
                return Err(MailCheckError::InvalidInput(format!(
                    "base URL {raw:?} cannot be used as a base"
                )));
            }
            // Keep the version segment when joining resource paths.
            if !url.path().ends_with('/') {
                url.set_path(&format!("{}/", url.path()));
            }
            endpoints.push(url);
        }

        // Shuffle once to spread load across replicas; the order is fixed
        // for the lifetime of the client, only the rotation point advances.
        endpoints.shuffle(&mut rand::thread_rng());
        debug!(endpoints = endpoints.len(), "building MailCheck client");

        let mut http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent);
        http = authenticator.configure_transport(http);
        let http = http.build().map_err(|err| {
            MailCheckError::Internal(format!("failed building the HTTP transport: {err}"))
        })?;

        Ok(MailCheckClient { invoker: Arc::new(RestInvoker::new(endpoints, http, authenticator)) })
    }
}
