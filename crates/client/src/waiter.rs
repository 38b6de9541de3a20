//! Long-poll waiter: decides how long to sleep between polls of an
//! in-progress job, honoring cancellation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use mailcheck_domain::{MailCheckError, Result, ValidationOverview};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::cancellation::CancellationToken;

/// Hard floor of the inter-poll delay.
const MIN_POLL_DELAY: Duration = Duration::from_millis(500);

/// Hard ceiling of the inter-poll delay.
const MAX_POLL_DELAY: Duration = Duration::from_secs(30);

/// Default server-side wait hint, in line with the service's own cap.
const DEFAULT_WAIT_HINT: Duration = Duration::from_secs(30);

/// `[days.]HH:MM:SS[.fraction]`; the days and fraction groups are accepted
/// but ignored.
static ETA_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d+\.)?(\d{1,2}):(\d{2}):(\d{2})(?:\.\d+)?$").expect("valid ETA pattern")
});

/// Callback invoked with the freshest overview on every non-terminal poll
/// observation.
pub type ProgressCallback = Arc<dyn Fn(&ValidationOverview) + Send + Sync>;

/// Client-side wait policy for submit/get operations.
///
/// The completion short-circuit compares the two wait durations **by
/// value**: a policy whose submission and poll waits are both zero never
/// enters the poll loop, regardless of how it was constructed.
#[derive(Clone)]
pub struct WaitOptions {
    /// Wait hint forwarded to the service on submission (`waitTime`).
    pub submission_wait: Duration,
    /// Wait hint forwarded to the service on each poll (`waitTime`).
    pub poll_wait: Duration,
    /// Optional cap on the total time spent polling; `None` reproduces the
    /// service's original unbounded behavior.
    pub max_wait: Option<Duration>,
    /// Invoked once per non-terminal observation of the job.
    pub progress: Option<ProgressCallback>,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            submission_wait: DEFAULT_WAIT_HINT,
            poll_wait: DEFAULT_WAIT_HINT,
            max_wait: None,
            progress: None,
        }
    }
}

impl WaitOptions {
    /// Policy that returns the job as soon as the service answers, without
    /// ever polling.
    pub fn no_wait() -> Self {
        Self {
            submission_wait: Duration::ZERO,
            poll_wait: Duration::ZERO,
            max_wait: None,
            progress: None,
        }
    }

    /// Whether this policy requests no completion waiting at all.
    pub fn is_no_wait(&self) -> bool {
        self.submission_wait.is_zero() && self.poll_wait.is_zero()
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }

    pub fn on_progress(mut self, callback: impl Fn(&ValidationOverview) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for WaitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitOptions")
            .field("submission_wait", &self.submission_wait)
            .field("poll_wait", &self.poll_wait)
            .field("max_wait", &self.max_wait)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

/// Compute the delay before the next poll of `overview`.
///
/// The default scales with the job size as `2^(log10(entries) - 1)`
/// seconds; a parseable server ETA overrides the formula. Either way the
/// result is clamped to `[0.5s, 30s]`. Malformed ETA strings silently fall
/// back to the formula.
pub(crate) fn poll_delay(overview: &ValidationOverview) -> Duration {
    let eta = overview
        .progress
        .as_ref()
        .and_then(|progress| progress.estimated_time_remaining.as_deref())
        .and_then(parse_eta);

    let delay = eta.unwrap_or_else(|| {
        let entries = overview.no_of_entries.max(1) as f64;
        Duration::from_secs_f64(2f64.powf(entries.log10() - 1.0))
    });

    delay.clamp(MIN_POLL_DELAY, MAX_POLL_DELAY)
}

/// Parse an `[days.]HH:MM:SS[.fraction]` ETA into a duration, keeping only
/// the hours/minutes/seconds groups.
fn parse_eta(eta: &str) -> Option<Duration> {
    let captures = ETA_PATTERN.captures(eta)?;
    let group = |index: usize| captures.get(index).and_then(|m| m.as_str().parse::<u64>().ok());
    let (hours, minutes, seconds) = (group(1)?, group(2)?, group(3)?);
    Some(Duration::from_secs(hours * 3600 + minutes * 60 + seconds))
}

/// Sleep until the next poll of `overview` is due.
///
/// The sleep never runs past `deadline`: when the computed delay would,
/// it is clamped to the remaining budget and the wait fails with
/// [`MailCheckError::WaitTimeout`] once that budget is spent. Fails with
/// [`MailCheckError::Canceled`] immediately when the token is already
/// canceled, and abandons the sleep if the token fires before the delay
/// elapses. Normal expiry drops the cancellation future, so nothing leaks
/// and nothing double-fires.
pub(crate) async fn wait_for_next_poll(
    overview: &ValidationOverview,
    deadline: Option<tokio::time::Instant>,
    cancellation: Option<&CancellationToken>,
) -> Result<()> {
    if let Some(token) = cancellation {
        token.ensure_not_canceled()?;
    }

    let delay = poll_delay(overview);
    debug!(job_id = %overview.id, delay_secs = delay.as_secs_f64(), "waiting before next poll");

    if let Some(deadline) = deadline {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining < delay {
            sleep_cancellable(remaining, cancellation).await?;
            return Err(MailCheckError::WaitTimeout);
        }
    }
    sleep_cancellable(delay, cancellation).await
}

/// Cancellable sleep: the token firing first turns the wait into
/// [`MailCheckError::Canceled`] instead of a normal expiry.
pub(crate) async fn sleep_cancellable(
    delay: Duration,
    cancellation: Option<&CancellationToken>,
) -> Result<()> {
    match cancellation {
        Some(token) => {
            tokio::select! {
                _ = token.cancelled() => Err(MailCheckError::Canceled),
                _ = tokio::time::sleep(delay) => Ok(()),
            }
        }
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
