use canned::http::parser::ParseFailure;
use canned::http::request::{HeaderSet, ParsedRequest, Version};
use canned::http::writer::{RenderError, ResponseWriter};
use canned::rules::ResponseDescriptor;

fn request(method: &str, version: Version) -> ParsedRequest {
    ParsedRequest {
        method: method.to_string(),
        target: "/".to_string(),
        version,
        request_line: format!("{} / {}", method, version),
        headers: HeaderSet::new(),
        keep_alive: false,
    }
}

fn get() -> ParsedRequest {
    request("GET", Version::HTTP_11)
}

fn render(descriptor: &ResponseDescriptor, req: &ParsedRequest) -> String {
    let writer = ResponseWriter::for_rule(descriptor, req, Version::HTTP_10).unwrap();
    String::from_utf8_lossy(writer.as_bytes()).into_owned()
}

fn render_failure(failure: &ParseFailure) -> String {
    let writer = ResponseWriter::for_failure(failure, None, Version::HTTP_10).unwrap();
    String::from_utf8_lossy(writer.as_bytes()).into_owned()
}

fn split(response: &str) -> (&str, &str) {
    response.split_once("\r\n\r\n").expect("response has a head")
}

#[test]
fn test_success_response() {
    let out = render(
        &ResponseDescriptor::new(200)
            .header("Content-Type", "text/plain")
            .header("X-Trace", "abc")
            .body("ok"),
        &get(),
    );
    let (head, body) = split(&out);
    let lines: Vec<&str> = head.split("\r\n").collect();

    assert_eq!(lines[0], "HTTP/1.0 200 OK");
    assert!(lines[1].starts_with("Server: canned/"));
    assert!(lines[2].starts_with("Date: "));
    assert!(lines[2].ends_with(" GMT"));
    assert_eq!(&lines[3..], ["Content-Type: text/plain", "X-Trace: abc", "Content-Length: 2"]);
    assert_eq!(body, "ok");
}

#[test]
fn test_custom_reason_phrase() {
    let out = render(&ResponseDescriptor::new(200).reason("Fine By Me"), &get());
    assert!(out.starts_with("HTTP/1.0 200 Fine By Me\r\n"));
}

#[test]
fn test_unknown_success_code_has_empty_reason() {
    let out = render(&ResponseDescriptor::new(299), &get());
    assert!(out.starts_with("HTTP/1.0 299 \r\n"));
}

#[test]
fn test_no_body_means_no_content_length() {
    let out = render(&ResponseDescriptor::new(204), &get());
    let (head, body) = split(&out);

    assert!(!head.contains("Content-Length"));
    assert!(body.is_empty());
}

#[test]
fn test_content_length_counts_bytes() {
    let out = render(&ResponseDescriptor::new(200).body("h\u{e9}llo"), &get());
    assert!(out.contains("Content-Length: 6\r\n"));
}

#[test]
fn test_server_version_on_status_line() {
    let writer = ResponseWriter::for_rule(&ResponseDescriptor::new(200), &get(), Version::HTTP_11).unwrap();
    assert!(writer.as_bytes().starts_with(b"HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_head_gets_no_body() {
    let out = render(&ResponseDescriptor::new(200).body("ok"), &request("HEAD", Version::HTTP_11));
    let (head, body) = split(&out);

    assert!(head.contains("Content-Length: 2"));
    assert!(body.is_empty());
}

#[test]
fn test_http09_gets_body_only() {
    let out = render(
        &ResponseDescriptor::new(200).header("X-Ignored", "1").body("plain"),
        &request("GET", Version::HTTP_09),
    );
    assert_eq!(out, "plain");
}

#[test]
fn test_connection_header_overrides_keep_alive() {
    let mut req = get();

    let writer = ResponseWriter::for_rule(
        &ResponseDescriptor::new(200).header("Connection", "keep-alive"),
        &req,
        Version::HTTP_10,
    )
    .unwrap();
    assert!(writer.keep_alive());

    req.keep_alive = true;
    let writer = ResponseWriter::for_rule(
        &ResponseDescriptor::new(200).header("connection", "Close"),
        &req,
        Version::HTTP_10,
    )
    .unwrap();
    assert!(!writer.keep_alive());

    let writer = ResponseWriter::for_rule(&ResponseDescriptor::new(200), &req, Version::HTTP_10).unwrap();
    assert!(writer.keep_alive());
}

#[test]
fn test_rule_error_uses_default_page() {
    let mut req = get();
    req.keep_alive = true;

    let writer = ResponseWriter::for_rule(&ResponseDescriptor::new(404), &req, Version::HTTP_10).unwrap();
    let out = String::from_utf8_lossy(writer.as_bytes()).into_owned();
    let (head, body) = split(&out);

    assert!(head.starts_with("HTTP/1.0 404 Not Found\r\n"));
    assert!(head.contains("\r\nConnection: close\r\n"));
    assert!(head.contains("\r\nContent-Type: text/html;charset=utf-8\r\n"));
    assert!(head.contains(&format!("\r\nContent-Length: {}", body.len())));
    assert!(body.contains("<p>Error code: 404</p>"));
    assert!(body.contains("<p>Message: Not Found.</p>"));
    assert!(body.contains("<p>Error code explanation: 404 - Nothing matches the given URI.</p>"));
    assert!(!writer.keep_alive());
    assert_eq!(writer.status(), 404);
}

#[test]
fn test_rule_error_with_own_body_and_headers() {
    let out = render(
        &ResponseDescriptor::new(503)
            .reason("Down For Maintenance")
            .header("Retry-After", "120")
            .body("later"),
        &get(),
    );
    let (head, body) = split(&out);
    let lines: Vec<&str> = head.split("\r\n").collect();

    assert_eq!(lines[0], "HTTP/1.0 503 Down For Maintenance");
    assert_eq!(&lines[3..], ["Connection: close", "Retry-After: 120", "Content-Length: 5"]);
    assert_eq!(body, "later");
}

#[test]
fn test_bad_request_page() {
    let out = render_failure(&ParseFailure::bad_request());
    let (head, body) = split(&out);

    assert!(head.starts_with("HTTP/1.0 400 The request requires at least the command and path\r\n"));
    assert!(body.contains("Error code: 400"));
    assert!(body.contains("Bad request syntax or unsupported method"));
}

#[test]
fn test_no_rule_status_line() {
    let out = render_failure(&ParseFailure::no_rule());
    assert!(out.starts_with("HTTP/1.0 501 No rules found for the given Request/URI\r\n"));
}

#[test]
fn test_header_failure_explanation() {
    let out = render_failure(&ParseFailure::too_many_headers());
    assert!(out.starts_with("HTTP/1.0 431 Too many headers\r\n"));
    assert!(out.contains("Error code explanation: 431 - got more than 100 headers."));
}

#[test]
fn test_unknown_error_code() {
    let out = render_failure(&ParseFailure::new(499));
    assert!(out.starts_with("HTTP/1.0 499 ???\r\n"));
}

#[test]
fn test_bodiless_error_status() {
    let out = render_failure(&ParseFailure::new(304));
    let (head, body) = split(&out);

    assert!(!head.contains("Content-Type"));
    assert!(!head.contains("Content-Length"));
    assert!(body.is_empty());
}

#[test]
fn test_error_page_is_escaped() {
    let out = render_failure(&ParseFailure::new(400).with_explain("<script>&"));
    assert!(out.contains("400 - &lt;script&gt;&amp;."));
}

#[test]
fn test_error_for_head_keeps_length_drops_body() {
    let req = request("HEAD", Version::HTTP_11);
    let writer = ResponseWriter::for_failure(&ParseFailure::no_rule(), Some(&req), Version::HTTP_10).unwrap();
    let out = String::from_utf8_lossy(writer.as_bytes()).into_owned();
    let (head, body) = split(&out);

    assert!(head.contains("Content-Length: "));
    assert!(body.is_empty());
}

#[test]
fn test_non_latin1_header_rejected() {
    let result = ResponseWriter::for_rule(
        &ResponseDescriptor::new(200).header("X-Name", "\u{4e16}\u{754c}"),
        &get(),
        Version::HTTP_10,
    );
    assert!(matches!(result, Err(RenderError::NotLatin1 { what: "header value", .. })));
}

#[test]
fn test_latin1_header_encoded_as_single_bytes() {
    let writer = ResponseWriter::for_rule(
        &ResponseDescriptor::new(200).header("X-Name", "caf\u{e9}"),
        &get(),
        Version::HTTP_10,
    )
    .unwrap();

    let bytes = writer.as_bytes();
    assert!(bytes.windows(6).any(|w| w == b"caf\xe9\r\n"));
}

#[tokio::test]
async fn test_write_to_stream() {
    let mut writer = ResponseWriter::for_rule(&ResponseDescriptor::new(200).body("ok"), &get(), Version::HTTP_10).unwrap();
    let expected = writer.as_bytes().to_vec();

    let mut sink = Vec::new();
    writer.write_to_stream(&mut sink).await.unwrap();

    assert_eq!(sink, expected);
    assert_eq!(writer.len(), expected.len());
}
