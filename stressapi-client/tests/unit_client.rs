use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use stressapi_client::{
    classify_error, is_valid_header, HttpClient, Reply, RequestClient, RequestParts,
};
use stressapi_common::status::{CONNECTION_REFUSED, CONNECTION_TIMEOUT, UNKNOWN_ERROR};
use stressapi_common::Method;

// Helper: a request against `url` with no headers and no body.
fn outgoing<'a>(method: Method, url: &'a str, headers: &'a [(String, String)], body: &'a [u8]) -> RequestParts<'a> {
    RequestParts { method, url, headers, body, timeout: Duration::from_secs(2) }
}

#[test]
fn test_get_returns_status_and_first_body_line() {
    let mut server = mockito::Server::new();
    let mock = server.mock("GET", "/api/ping")
        .with_status(200)
        .with_body("pong\nsecond line")
        .create();

    let client = HttpClient::new().unwrap();
    let url = format!("{}/api/ping", server.url());
    let reply = client.send(&outgoing(Method::Get, &url, &[], &[])).unwrap();

    assert_eq!(reply, Reply { status: 200, body: "pong".to_string() });
    mock.assert();
}

#[test]
fn test_non_success_status_is_a_reply_not_an_error() {
    let mut server = mockito::Server::new();
    server.mock("GET", "/missing").with_status(404).with_body("not here").create();

    let client = HttpClient::new().unwrap();
    let url = format!("{}/missing", server.url());
    let reply = client.send(&outgoing(Method::Get, &url, &[], &[])).unwrap();

    assert_eq!(reply.status, 404);
    assert_eq!(reply.body, "not here");
}

#[test]
fn test_accepted_and_no_content_skip_the_body() {
    let mut server = mockito::Server::new();
    server.mock("DELETE", "/item").with_status(202).with_body("ignored").create();
    server.mock("PATCH", "/item").with_status(204).create();

    let client = HttpClient::new().unwrap();
    let url = format!("{}/item", server.url());

    let deleted = client.send(&outgoing(Method::Delete, &url, &[], &[])).unwrap();
    assert_eq!(deleted, Reply { status: 202, body: String::new() });

    let patched = client.send(&outgoing(Method::Patch, &url, &[], &[])).unwrap();
    assert_eq!(patched, Reply { status: 204, body: String::new() });
}

#[test]
fn test_post_sends_headers_and_body() {
    let mut server = mockito::Server::new();
    let mock = server.mock("POST", "/orders")
        .match_header("content-type", "application/json")
        .match_header("x-real-ip", "1.2.3.4")
        .match_body(r#"{"id":"42"}"#)
        .with_status(201)
        .with_body("created")
        .create();

    let headers = vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("X-Real-IP".to_string(), "1.2.3.4".to_string()),
    ];
    let client = HttpClient::new().unwrap();
    let url = format!("{}/orders", server.url());
    let reply = client
        .send(&outgoing(Method::Post, &url, &headers, br#"{"id":"42"}"#))
        .unwrap();

    assert_eq!(reply.status, 201);
    mock.assert();
}

#[test]
fn test_connection_refused_is_classified_900() {
    // Bind then drop to obtain a port with nothing listening on it.
    let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
    let url = format!("http://127.0.0.1:{port}/");

    let client = HttpClient::new().unwrap();
    let err = client.send(&outgoing(Method::Get, &url, &[], &[])).unwrap_err();

    assert_eq!(classify_error(&err).code, CONNECTION_REFUSED);
}

#[test]
fn test_unanswered_request_times_out_as_901() {
    // The listener accepts at the kernel level but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/slow", listener.local_addr().unwrap());

    let client = HttpClient::new().unwrap();
    let request = RequestParts {
        method: Method::Get,
        url: &url,
        headers: &[],
        body: &[],
        timeout: Duration::from_millis(200),
    };
    let err = client.send(&request).unwrap_err();

    assert_eq!(classify_error(&err).code, CONNECTION_TIMEOUT);
    drop(listener);
}

#[test]
fn test_non_http_reply_is_unknown_and_ignores_url_digits() {
    // The peer answers with a line that is not an HTTP status line.
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let peer = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        let _ = stream.write_all(b"garbage not http\r\n\r\n");
    });
    let url = format!("http://{addr}/api/v1/foo_action");

    let client = HttpClient::new().unwrap();
    let err = client.send(&outgoing(Method::Get, &url, &[], &[])).unwrap_err();
    peer.join().unwrap();

    let classified = classify_error(&err);
    assert_eq!(classified.code, UNKNOWN_ERROR);
    assert!(!classified.message.contains("127.0.0.1"));
    assert!(!classified.message.contains(&addr.port().to_string()));
}

#[test]
fn test_is_valid_header() {
    assert!(is_valid_header("X-Forwarded-For", "1.2.3.4"));
    assert!(!is_valid_header("bad header", "value"));
    assert!(!is_valid_header("X-Ok", "line\nbreak"));
}
