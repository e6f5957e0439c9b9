//! Status-code descriptions, including the synthetic codes used for
//! transport failures that never produced an HTTP status.

pub const CONNECTION_REFUSED: u16 = 900;
pub const CONNECTION_TIMEOUT: u16 = 901;
pub const CONNECTION_RESET: u16 = 902;
pub const CLOSED_WITHOUT_RESPONSE: u16 = 903;
pub const TOO_MANY_REDIRECTS: u16 = 904;
pub const UNKNOWN_ERROR: u16 = 999;
pub const BROKEN_PIPE: u16 = 32;

/// Codes a fresh status tally starts with, all at zero.
pub const SEEDED_CODES: [u16; 15] =
    [200, 201, 202, 204, 400, 401, 403, 404, 405, 429, 500, 501, 502, 503, 504];

pub fn describe(code: u16) -> Option<&'static str> {
    let text = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Requested Range Not Satisfiable",
        417 => "Expectation Failed",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        511 => "Network Authentication Required",
        CONNECTION_REFUSED => "Connection Refused",
        CONNECTION_TIMEOUT => "Connection Timeout",
        CONNECTION_RESET => "Connection reset by peer",
        CLOSED_WITHOUT_RESPONSE => "Remote end closed connection without response",
        TOO_MANY_REDIRECTS => "Exceeded maximum redirects",
        UNKNOWN_ERROR => "Unknown Error",
        BROKEN_PIPE => "Broken Pipe",
        _ => return None,
    };
    Some(text)
}

/// Synthetic codes are the ones whose decimal form starts with `9`.
pub fn is_synthetic(code: u16) -> bool {
    code.to_string().starts_with('9')
}

/// Numeric form shown to operators: synthetic codes are masked as `###`.
pub fn display_code(code: u16) -> String {
    if is_synthetic(code) {
        "###".to_string()
    } else {
        code.to_string()
    }
}

/// `"<code> <description>"` with masking applied, e.g. `"### Unknown Error"`.
pub fn label(code: u16) -> String {
    match describe(code) {
        Some(text) => format!("{} {}", display_code(code), text),
        None => display_code(code),
    }
}
