//! Pluggable credential strategies.
//!
//! The invoker depends only on the [`Authenticator`] capability: decorate
//! an outgoing request, optionally recover from a forbidden response, and
//! optionally install transport-level material (client certificates) on
//! the HTTP client at build time.

use async_trait::async_trait;
use mailcheck_domain::{MailCheckError, ProblemDetails, Result};

use crate::invoker::RestInvoker;

mod basic;
mod bearer;
mod certificate;

pub use basic::BasicAuthenticator;
pub use bearer::{BearerAuthenticator, TotpTokenProvider};
pub use certificate::CertificateAuthenticator;

/// Credential strategy consumed by the REST invoker.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Decorate an outgoing request with credentials (e.g. inject an
    /// `Authorization` header). Receives the invoker so strategies that
    /// acquire tokens over the same API can call back into it with the
    /// auth-bypass flag set.
    async fn decorate(
        &self,
        invoker: &RestInvoker,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder>;

    /// Hook invoked on HTTP 403 before the failure is surfaced. Returning
    /// `Ok(())` signals the request may be replayed once; the default
    /// cannot recover and fails with the authorization error.
    async fn handle_forbidden(
        &self,
        _invoker: &RestInvoker,
        problem: Option<&ProblemDetails>,
    ) -> Result<()> {
        let message = problem
            .map(|details| details.message(403))
            .unwrap_or_else(|| "The service answered with HTTP 403".to_string());
        Err(MailCheckError::Authorization(message))
    }

    /// Install transport-level credentials on the HTTP client builder.
    /// Only certificate-based strategies need this.
    fn configure_transport(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        builder
    }
}
