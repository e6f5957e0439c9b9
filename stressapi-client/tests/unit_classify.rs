use stressapi_client::{classify, classify_error, shorten_message, TransportError, MAX_MESSAGE_WIDTH};

#[test]
fn test_known_patterns() {
    assert_eq!(classify("<urlopen error connection refused>").code, 900);
    assert_eq!(classify("timed out").code, 901);
    assert_eq!(classify("<urlopen error timed out urlopen error>").code, 901);
    assert_eq!(classify("reset by peer").code, 902);
    assert_eq!(classify("<urlopen error closed connection>").code, 903);
}

#[test]
fn test_patterns_are_case_insensitive() {
    assert_eq!(classify("[Errno 111] Connection Refused").code, 900);
    assert_eq!(classify("Connection RESET BY PEER").code, 902);
}

#[test]
fn test_pattern_priority_beats_embedded_integer() {
    // "connection refused" wins over the errno that precedes it.
    assert_eq!(classify("[Errno 111] connection refused").code, 900);
}

#[test]
fn test_first_embedded_integer_wins() {
    assert_eq!(classify("<another 111 unknown 222 message 333>").code, 111);
    assert_eq!(classify("HTTP Error 418: I'm a teapot").code, 418);
}

#[test]
fn test_oversized_first_integer_is_unknown() {
    // The first digit run decides even when it cannot be a status code.
    assert_eq!(classify("<error 70000 then 404>").code, 999);
}

#[test]
fn test_no_integer_is_unknown() {
    assert_eq!(classify("<unknown message without code>").code, 999);
    assert_eq!(classify("").code, 999);
}

#[test]
fn test_classify_error_from_message_variant() {
    let err = TransportError::Message("remote closed connection".to_string());
    let classified = classify_error(&err);
    assert_eq!(classified.code, 903);
    assert_eq!(classified.message, "remote closed connection");
}

#[test]
fn test_short_messages_are_kept() {
    assert_eq!(shorten_message("short", 128), "short");
    let exact = "x".repeat(MAX_MESSAGE_WIDTH);
    assert_eq!(shorten_message(&exact, MAX_MESSAGE_WIDTH), exact);
}

#[test]
fn test_long_messages_are_truncated_with_marker() {
    let long = "y".repeat(500);
    let short = shorten_message(&long, MAX_MESSAGE_WIDTH);
    assert_eq!(short.chars().count(), MAX_MESSAGE_WIDTH);
    assert!(short.ends_with("(..)"));
    assert!(short.starts_with("yyyy"));

    assert_eq!(classify(&long).message, short);
}

#[test]
fn test_truncation_respects_multibyte_characters() {
    let long = "é".repeat(300);
    let short = shorten_message(&long, 10);
    assert_eq!(short, format!("{}(..)", "é".repeat(6)));
}
