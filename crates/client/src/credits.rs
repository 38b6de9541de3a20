//! Account credit operations.

use std::sync::Arc;

use futures::stream::Stream;
use mailcheck_domain::{Balance, DailyUsage, DailyUsageListingOptions, MailCheckError, Result};
use reqwest::{Method, StatusCode};

use crate::cancellation::CancellationToken;
use crate::invoker::{RequestSpec, RestInvoker};
use crate::listing::paginate;

/// Entry point for the `/credits` resource.
pub struct Credits {
    invoker: Arc<RestInvoker>,
}

impl Credits {
    pub(crate) fn new(invoker: Arc<RestInvoker>) -> Self {
        Self { invoker }
    }

    /// Current credit balance of the account.
    pub async fn balance(&self, cancellation: Option<&CancellationToken>) -> Result<Balance> {
        let spec = RequestSpec::new(Method::GET, "credits/balance");
        let response = self.invoker.invoke(spec, cancellation).await?;
        match response.status() {
            StatusCode::OK => response.deserialize(),
            status => Err(MailCheckError::UnexpectedResponse {
                status: status.as_u16(),
                message: "unexpected status while fetching the credit balance".into(),
            }),
        }
    }

    /// Lazily list the account's daily credit usage, following the
    /// server's pagination cursors.
    pub fn daily_usage(
        &self,
        options: DailyUsageListingOptions,
        cancellation: Option<&CancellationToken>,
    ) -> impl Stream<Item = Result<DailyUsage>> + Send {
        paginate(
            self.invoker.clone(),
            "credits/daily-usage",
            options.query_fragments(),
            options.direction,
            options.limit,
            cancellation,
        )
    }
}
