use paceload_core::WriteOutcome;
use reqwest::StatusCode;

/// Classify a completed HTTP exchange.
///
/// 408, 425, 429 and every 5xx mean "try again later"; other non-2xx
/// statuses mean the request itself is wrong.
pub fn classify_status(status: StatusCode, body: &str) -> WriteOutcome {
    if status.is_success() {
        return WriteOutcome::Succeeded;
    }

    let reason = if body.trim().is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, truncate(body.trim(), 200))
    };

    let retryable = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 425;

    if retryable {
        WriteOutcome::FailedTransient(reason)
    } else {
        WriteOutcome::FailedPermanent(reason)
    }
}

/// Classify a request that never produced a response.
pub fn classify_error(err: &reqwest::Error) -> WriteOutcome {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        WriteOutcome::transient(err.to_string())
    } else {
        WriteOutcome::permanent(err.to_string())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
