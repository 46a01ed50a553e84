use lendrelay_core::errors::BankError;
use serde_json::Value;

const MAX_MESSAGE_CHARS: usize = 200;

/// Maps a non-success HTTP status onto a typed bank error.
pub fn classify_status(status: u16, body: &str) -> BankError {
    match status {
        401 => BankError::Unauthorized,
        403 => BankError::Forbidden,
        429 => BankError::RateLimited,
        400..=499 => BankError::BusinessRejection(error_message(body, status)),
        _ => BankError::Server { status, message: error_message(body, status) },
    }
}

pub(crate) fn transport_error(error: &reqwest::Error, timeout_secs: u64) -> BankError {
    if error.is_timeout() {
        BankError::Timeout(timeout_secs)
    } else if error.is_decode() {
        BankError::Decode(error.to_string())
    } else {
        BankError::Transport(error.to_string())
    }
}

/// Prefers the `message`, `error` or `detail` field of a JSON body, then the raw text.
fn error_message(body: &str, status: u16) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|value| {
        ["message", "error", "detail"]
            .iter()
            .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
    });
    let message = from_json.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return format!("http status {status}");
    }
    message.chars().take(MAX_MESSAGE_CHARS).collect()
}
