//! Bearer-token credential strategy with optional TOTP second factor.
//!
//! Tokens are acquired lazily through `POST /auth/tokens` (with the
//! invoker's auth-bypass flag, so acquisition cannot recurse into itself),
//! cached, and re-acquired when the service answers 403.

use async_trait::async_trait;
use mailcheck_domain::{MailCheckError, ProblemDetails, Result};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::Authenticator;
use crate::invoker::{RequestSpec, RestInvoker};

/// Supplies the current one-time password when the account has
/// multi-factor authentication enabled.
#[async_trait]
pub trait TotpTokenProvider: Send + Sync {
    async fn totp_token(&self) -> Result<String>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    access_token: String,
}

/// Username/password credentials exchanged for a cached bearer token.
pub struct BearerAuthenticator {
    username: String,
    password: String,
    totp_provider: Option<Box<dyn TotpTokenProvider>>,
    access_token: RwLock<Option<String>>,
}

impl BearerAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(MailCheckError::InvalidInput("username must not be empty".into()));
        }
        Ok(Self {
            username,
            password: password.into(),
            totp_provider: None,
            access_token: RwLock::new(None),
        })
    }

    /// Attach a provider for the TOTP second factor.
    pub fn with_totp_provider(mut self, provider: impl TotpTokenProvider + 'static) -> Self {
        self.totp_provider = Some(Box::new(provider));
        self
    }

    /// Acquire a bearer token, verifying the TOTP factor when a provider is
    /// configured. Called on first use and again after a 403 recovery.
    async fn acquire_token(&self, invoker: &RestInvoker) -> Result<String> {
        debug!(username = %self.username, "acquiring bearer token");
        let spec = RequestSpec::new(Method::POST, "auth/tokens")
            .json(serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .bypass_auth();

        let response = invoker.invoke(spec, None).await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(MailCheckError::Authentication(format!(
                "token acquisition failed with HTTP {}",
                response.status()
            )));
        }
        let token = response.deserialize::<TokenResponse>()?.access_token;

        let token = match &self.totp_provider {
            Some(provider) => self.verify_totp(invoker, token, provider.as_ref()).await?,
            None => token,
        };

        *self.access_token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Exchange a first-factor token for a fully authenticated one by
    /// verifying the current one-time password.
    async fn verify_totp(
        &self,
        invoker: &RestInvoker,
        first_factor_token: String,
        provider: &dyn TotpTokenProvider,
    ) -> Result<String> {
        let pass_code = provider.totp_token().await?;
        let bearer = HeaderValue::from_str(&format!("Bearer {first_factor_token}"))
            .map_err(|err| MailCheckError::Internal(format!("malformed bearer token: {err}")))?;

        let spec = RequestSpec::new(Method::POST, "auth/totp/verifications")
            .json(serde_json::json!({ "passCode": pass_code }))
            .header(AUTHORIZATION, bearer)
            .bypass_auth();

        let response = invoker.invoke(spec, None).await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(MailCheckError::Authentication(format!(
                "TOTP verification failed with HTTP {}",
                response.status()
            )));
        }
        Ok(response.deserialize::<TokenResponse>()?.access_token)
    }
}

#[async_trait]
impl Authenticator for BearerAuthenticator {
    async fn decorate(
        &self,
        invoker: &RestInvoker,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        let cached = self.access_token.read().await.clone();
        let token = match cached {
            Some(token) => token,
            None => self.acquire_token(invoker).await?,
        };
        Ok(request.bearer_auth(token))
    }

    /// A forbidden response may only mean the cached token went stale:
    /// drop it so the replay re-acquires, and let the invoker retry once.
    async fn handle_forbidden(
        &self,
        _invoker: &RestInvoker,
        _problem: Option<&ProblemDetails>,
    ) -> Result<()> {
        debug!("discarding cached bearer token after forbidden response");
        *self.access_token.write().await = None;
        Ok(())
    }
}
