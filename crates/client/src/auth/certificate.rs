//! Client-certificate credential strategy.
//!
//! The credential lives in the TLS handshake, so decoration is a no-op;
//! the identity is installed on the HTTP client when it is built.

use async_trait::async_trait;
use mailcheck_domain::{MailCheckError, Result};

use super::Authenticator;
use crate::invoker::RestInvoker;

/// Mutual-TLS credentials bound to the underlying transport.
pub struct CertificateAuthenticator {
    identity: reqwest::Identity,
}

impl CertificateAuthenticator {
    /// Load the client identity from a PEM bundle holding the certificate
    /// and its private key.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let identity = reqwest::Identity::from_pem(pem).map_err(|err| {
            MailCheckError::InvalidInput(format!("invalid client certificate: {err}"))
        })?;
        Ok(Self { identity })
    }
}

#[async_trait]
impl Authenticator for CertificateAuthenticator {
    async fn decorate(
        &self,
        _invoker: &RestInvoker,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        // The TLS layer carries the credential.
        Ok(request)
    }

    fn configure_transport(&self, builder: reqwest::ClientBuilder) -> reqwest::ClientBuilder {
        builder.identity(self.identity.clone())
    }
}
