//! Error normalization for provider adapters.
//!
//! Every HTTP failure and transport error is mapped into the domain
//! [`ProviderError`] here, so adapters differ only in wire formats and
//! the retry wrapper sees one classification everywhere.

use da_domain::error::{ProviderError, ProviderErrorKind, ProviderType};

/// Convert a [`reqwest::Error`] into a normalized provider error.
pub fn from_reqwest(provider: ProviderType, e: reqwest::Error) -> ProviderError {
    let kind = if e.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::NetworkError
    };
    ProviderError::new(provider, kind, e.to_string())
}

/// Classify a non-success HTTP response.
///
/// `retry_after_ms` should carry the parsed `Retry-After` header when
/// the response had one; otherwise the body is scanned for a vendor
/// "retry after N seconds" hint.
pub fn from_http_status(
    provider: ProviderType,
    status: u16,
    body: &str,
    retry_after_ms: Option<u64>,
) -> ProviderError {
    let kind = match status {
        429 => ProviderErrorKind::RateLimit,
        401 | 403 => ProviderErrorKind::AuthError,
        413 => ProviderErrorKind::ContextLength,
        400 | 422 => classify_bad_request(body),
        500..=599 => ProviderErrorKind::ServerError,
        _ => ProviderErrorKind::Unknown,
    };

    let mut err = ProviderError::new(
        provider,
        kind,
        format!("HTTP {status} - {}", truncate(body, 300)),
    )
    .with_status(status);

    if kind == ProviderErrorKind::RateLimit {
        if let Some(ms) = retry_after_ms.or_else(|| parse_retry_after_body(body)) {
            err = err.with_retry_after_ms(ms);
        }
    }

    err
}

/// A 400 can mean several different things; the body text disambiguates.
fn classify_bad_request(body: &str) -> ProviderErrorKind {
    let lower = body.to_lowercase();
    if lower.contains("context_length")
        || lower.contains("context length")
        || lower.contains("maximum context")
        || lower.contains("too many tokens")
    {
        ProviderErrorKind::ContextLength
    } else if lower.contains("content_filter")
        || lower.contains("content policy")
        || lower.contains("content management policy")
    {
        ProviderErrorKind::ContentFilter
    } else {
        ProviderErrorKind::InvalidRequest
    }
}

/// Scan an error body for a "retry after N" hint (seconds).
///
/// Some vendors only surface the delay inside the error message text.
fn parse_retry_after_body(body: &str) -> Option<u64> {
    let lower = body.to_lowercase();
    let idx = lower.find("retry after ")?;
    let rest = &lower[idx + "retry after ".len()..];
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let secs: u64 = digits.parse().ok()?;
    Some(secs * 1_000)
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
