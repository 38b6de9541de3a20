//! Wire-level constants shared across the SDK.

/// Media type advertised alongside plain JSON so the service can answer
/// failures with a structured problem body.
pub const PROBLEM_JSON_CONTENT_TYPE: &str = "application/problem+json";

/// Problem `type` marker the service uses for CAPTCHA validation failures
/// on HTTP 401 responses.
pub const CAPTCHA_PROBLEM_TYPE_SUFFIX: &str = "captcha-validation-failed";
