//! Maps transport failures to stable synthetic status codes.

use std::error::Error as StdError;
use std::io;

use stressapi_common::status::{
    BROKEN_PIPE, CLOSED_WITHOUT_RESPONSE, CONNECTION_REFUSED, CONNECTION_RESET,
    CONNECTION_TIMEOUT, TOO_MANY_REDIRECTS, UNKNOWN_ERROR,
};

use crate::TransportError;

/// Longest error message kept for reporting, placeholder included.
pub const MAX_MESSAGE_WIDTH: usize = 128;

const PLACEHOLDER: &str = "(..)";

/// Text patterns checked in priority order.
const PATTERNS: [(&str, u16); 4] = [
    ("connection refused", CONNECTION_REFUSED),
    ("timed out", CONNECTION_TIMEOUT),
    ("reset by peer", CONNECTION_RESET),
    ("closed connection", CLOSED_WITHOUT_RESPONSE),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub code: u16,
    pub message: String,
}

/// Classify an error message: known patterns first, then the first embedded
/// integer, then [`UNKNOWN_ERROR`].
pub fn classify(message: &str) -> Classified {
    Classified { code: code_for_text(message), message: shorten_message(message, MAX_MESSAGE_WIDTH) }
}

/// Classify a transport error, using the error's structure before its text.
pub fn classify_error(err: &TransportError) -> Classified {
    let text = error_chain_text(err);
    let code = match err {
        TransportError::Http(e) => code_for_reqwest(e).unwrap_or_else(|| code_for_text(&text)),
        TransportError::Message(_) => code_for_text(&text),
    };
    Classified { code, message: shorten_message(&text, MAX_MESSAGE_WIDTH) }
}

/// Truncate `message` to at most `max_width` characters, marking the cut.
pub fn shorten_message(message: &str, max_width: usize) -> String {
    let placeholder_len = PLACEHOLDER.chars().count();
    if message.chars().count() < max_width + placeholder_len {
        return message.to_string();
    }
    let kept: String = message.chars().take(max_width.saturating_sub(placeholder_len)).collect();
    format!("{kept}{PLACEHOLDER}")
}

fn code_for_text(message: &str) -> u16 {
    let lower = message.to_lowercase();
    PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, code)| *code)
        .or_else(|| first_integer(message))
        .unwrap_or(UNKNOWN_ERROR)
}

/// First run of ASCII digits, as long as it fits a status code. A first run
/// too large for one yields `None` rather than falling through to a later run.
fn first_integer(message: &str) -> Option<u16> {
    let start = message.find(|c: char| c.is_ascii_digit())?;
    let digits: String = message[start..].chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn code_for_reqwest(err: &reqwest::Error) -> Option<u16> {
    if err.is_timeout() {
        return Some(CONNECTION_TIMEOUT);
    }
    if err.is_redirect() {
        return Some(TOO_MANY_REDIRECTS);
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            let code = match io_err.kind() {
                io::ErrorKind::ConnectionRefused => Some(CONNECTION_REFUSED),
                io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted => {
                    Some(CONNECTION_RESET)
                }
                io::ErrorKind::TimedOut => Some(CONNECTION_TIMEOUT),
                io::ErrorKind::BrokenPipe => Some(BROKEN_PIPE),
                io::ErrorKind::UnexpectedEof => Some(CLOSED_WITHOUT_RESPONSE),
                _ => None,
            };
            if code.is_some() {
                return code;
            }
        }
        // hyper reports an early close as a plain message, not an io::Error.
        if cause.to_string().contains("connection closed before message completed") {
            return Some(CLOSED_WITHOUT_RESPONSE);
        }
        source = cause.source();
    }
    None
}

/// Error text with the cause chain appended. The request URL is left out so
/// that digits from the host, port or path never pass for an error code.
fn error_chain_text(err: &TransportError) -> String {
    let mut text = match err {
        TransportError::Http(e) => without_url(e),
        TransportError::Message(_) => err.to_string(),
    };
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}

fn without_url(err: &reqwest::Error) -> String {
    let text = err.to_string();
    match err.url() {
        Some(url) => text.replace(&format!(" for url ({url})"), "").replace(url.as_str(), ""),
        None => text,
    }
}
