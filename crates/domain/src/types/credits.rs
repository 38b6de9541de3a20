//! Account credit types.

use chrono::NaiveDate;
use serde::Deserialize;

/// Current credit balance of the account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    /// Purchased, non-expiring credits.
    pub credit_packs: f64,
    /// Daily free credits still available, when the plan includes them.
    pub free_credits: Option<f64>,
    /// Time until the free credits reset, as `[days.]HH:MM:SS`.
    pub free_credits_reset_in: Option<String>,
}

/// Credits consumed on a single day.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUsage {
    pub date: NaiveDate,
    pub credit_packs: f64,
    pub free_credits: Option<f64>,
}
