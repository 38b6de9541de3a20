//! Structured problem bodies (`application/problem+json`).

use serde::Deserialize;

use crate::constants::CAPTCHA_PROBLEM_TYPE_SUFFIX;

/// Problem-shaped error body attached to failed responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub status: Option<u16>,
}

impl ProblemDetails {
    /// Human-readable message for this problem, falling back to a generated
    /// one when the body carries neither `detail` nor `title`.
    pub fn message(&self, status: u16) -> String {
        self.detail
            .clone()
            .or_else(|| self.title.clone())
            .unwrap_or_else(|| format!("The service answered with HTTP {status}"))
    }

    /// Whether the problem `type` names the CAPTCHA validation failure.
    pub fn is_captcha_failure(&self) -> bool {
        self.problem_type
            .as_deref()
            .is_some_and(|kind| kind.ends_with(CAPTCHA_PROBLEM_TYPE_SUFFIX))
    }
}
