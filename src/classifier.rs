//! Three-way classification of generative service failures.
//!
//! This is the only place that looks inside a [`GeminiError`]. Everything
//! else in the crate works with [`ErrorClass`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gemini::GeminiError;

/// How a failed call should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorClass {
    /// The credential is malformed, expired or lacks permission. Never retried.
    AuthInvalid,
    /// Quota or request-rate exhaustion. Transient, retried with backoff.
    RateLimited,
    /// Network failure, malformed payload, empty result.
    Other,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorClass::AuthInvalid => write!(f, "auth_invalid"),
            ErrorClass::RateLimited => write!(f, "rate_limited"),
            ErrorClass::Other => write!(f, "other"),
        }
    }
}

const RATE_LIMIT_STATUS: u16 = 429;
const RATE_LIMIT_CODES: &[&str] = &["RESOURCE_EXHAUSTED"];
const RATE_LIMIT_KEYWORDS: &[&str] = &["429", "quota", "exhausted", "too many requests", "rate limit"];

const AUTH_STATUSES: &[u16] = &[401, 403];
const AUTH_CODES: &[&str] = &["UNAUTHENTICATED", "PERMISSION_DENIED", "API_KEY_INVALID"];
const AUTH_KEYWORDS: &[&str] = &["api key", "api_key", "key not valid", "key expired"];

/// Classify a failed call.
///
/// Rate limiting wins over auth when both match: a 429 whose message
/// mentions the API key is still a quota problem.
pub fn classify(error: &GeminiError) -> ErrorClass {
    match error {
        GeminiError::MissingCredential => ErrorClass::AuthInvalid,
        GeminiError::ApiError {
            status,
            code,
            message,
        } => classify_parts(*status, code.as_deref(), message),
        GeminiError::NetworkError(e) => {
            classify_parts(e.status().map(|s| s.as_u16()), None, &e.to_string())
        }
        GeminiError::ParseError(_) | GeminiError::EmptyResult(_) => ErrorClass::Other,
    }
}

fn classify_parts(status: Option<u16>, code: Option<&str>, message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    let code = code.map(str::to_ascii_uppercase);
    let code = code.as_deref();

    let rate_limited = status == Some(RATE_LIMIT_STATUS)
        || code.is_some_and(|c| RATE_LIMIT_CODES.contains(&c))
        || RATE_LIMIT_KEYWORDS.iter().any(|k| lower.contains(k));
    if rate_limited {
        return ErrorClass::RateLimited;
    }

    let auth_invalid = status.is_some_and(|s| AUTH_STATUSES.contains(&s))
        || code.is_some_and(|c| AUTH_CODES.contains(&c))
        || AUTH_KEYWORDS.iter().any(|k| lower.contains(k));
    if auth_invalid {
        return ErrorClass::AuthInvalid;
    }

    ErrorClass::Other
}
