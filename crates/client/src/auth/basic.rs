//! HTTP Basic credential strategy.

use async_trait::async_trait;
use mailcheck_domain::{MailCheckError, Result};

use super::Authenticator;
use crate::invoker::RestInvoker;

/// Username/password credentials sent as an HTTP Basic `Authorization`
/// header on every request.
pub struct BasicAuthenticator {
    username: String,
    password: String,
}

impl BasicAuthenticator {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(MailCheckError::InvalidInput("username must not be empty".into()));
        }
        Ok(Self { username, password: password.into() })
    }
}

#[async_trait]
impl Authenticator for BasicAuthenticator {
    async fn decorate(
        &self,
        _invoker: &RestInvoker,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        Ok(request.basic_auth(&self.username, Some(&self.password)))
    }
}
