use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::request::{HeaderSet, ParsedRequest, Version};

/// Longest request line or header line accepted, in bytes.
pub const MAX_LINE: usize = 65536;

/// Most header lines accepted in one request.
pub const MAX_HEADERS: usize = 100;

/// A request that could not be served, with the status to answer it with.
///
/// `message` becomes the reason phrase of the status line and `explain` the
/// explanation paragraph of the error page; either falls back to the status
/// table when absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub status: u16,
    pub message: Option<String>,
    pub explain: Option<String>,
}

impl ParseFailure {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            message: None,
            explain: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_explain(mut self, explain: impl Into<String>) -> Self {
        self.explain = Some(explain.into());
        self
    }

    pub fn bad_request() -> Self {
        Self::new(400).with_message("The request requires at least the command and path")
    }

    pub fn uri_too_long() -> Self {
        Self::new(414)
    }

    pub fn timeout() -> Self {
        Self::new(408)
    }

    pub fn version_not_supported(token: &str) -> Self {
        Self::new(505).with_message(format!("Version {} is not supported", token))
    }

    pub fn header_line_too_long() -> Self {
        Self::new(431)
            .with_message("Line too long")
            .with_explain(format!("got more than {} bytes when reading header line", MAX_LINE))
    }

    pub fn too_many_headers() -> Self {
        Self::new(431)
            .with_message("Too many headers")
            .with_explain(format!("got more than {} headers", MAX_HEADERS))
    }

    /// A well-formed request that no rule answers.
    pub fn no_rule() -> Self {
        Self::new(501).with_message("No rules found for the given Request/URI")
    }
}

/// What one call to [`RequestParser::parse`] produced.
#[derive(Debug)]
pub enum ParseOutcome {
    Request(ParsedRequest),
    /// The peer closed the connection before sending anything.
    Closed,
    Failed(ParseFailure),
}

/// Method, target and effective version split out of a request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: Version,
    /// Set when a version token was present but could not be understood.
    pub ignored_version: Option<String>,
}

/// Splits and validates a decoded request line.
///
/// With three or more tokens the last one is taken as the version. A
/// candidate that does not parse is ignored and the default version (1.0)
/// applies; a parseable version of 2.0 or later is rejected with 505.
pub fn parse_request_line(line: &str) -> Result<RequestLine, ParseFailure> {
    let words: Vec<&str> = line.split_whitespace().collect();

    if words.len() < 2 {
        return Err(ParseFailure::bad_request());
    }

    let mut version = Version::default();
    let mut ignored_version = None;

    if words.len() >= 3 {
        let token = words[words.len() - 1];
        match Version::parse(token) {
            Some(v) if !v.is_supported() => {
                return Err(ParseFailure::version_not_supported(token));
            }
            Some(v) => version = v,
            None => ignored_version = Some(token.to_string()),
        }
    }

    Ok(RequestLine {
        method: words[0].to_string(),
        target: words[1].to_string(),
        version,
        ignored_version,
    })
}

/// Reads one request head (request line plus headers) off a stream.
///
/// The parser only ever writes to the stream to send the interim
/// `100 Continue` response; every other outcome is left to the caller.
#[derive(Debug, Clone, Copy)]
pub struct RequestParser {
    server_version: Version,
}

impl RequestParser {
    pub fn new(server_version: Version) -> Self {
        Self { server_version }
    }

    pub async fn parse<S>(&self, stream: &mut S) -> io::Result<ParseOutcome>
    where
        S: AsyncBufRead + AsyncWrite + Unpin,
    {
        let raw = read_line(stream, MAX_LINE).await?;

        if raw.len() > MAX_LINE {
            return Ok(ParseOutcome::Failed(ParseFailure::uri_too_long()));
        }
        if raw.is_empty() {
            return Ok(ParseOutcome::Closed);
        }

        let request_line = decode_latin1(&raw).trim_end_matches(['\r', '\n']).to_string();

        let line = match parse_request_line(&request_line) {
            Ok(line) => line,
            Err(failure) => return Ok(ParseOutcome::Failed(failure)),
        };

        if let Some(token) = &line.ignored_version {
            tracing::debug!(
                request_line = %request_line,
                version = %token,
                "could not parse the protocol version, ignoring"
            );
        }

        let headers = match read_headers(stream).await? {
            Ok(headers) => headers,
            Err(failure) => return Ok(ParseOutcome::Failed(failure)),
        };

        let keep_alive = self.keep_alive(&headers);

        let expects_continue = headers
            .get("Expect")
            .is_some_and(|v| v.eq_ignore_ascii_case("100-continue"));

        if expects_continue
            && self.server_version >= Version::HTTP_11
            && line.version >= Version::HTTP_11
        {
            let interim = format!("{} 100 Continue\r\n\r\n", self.server_version);
            stream.write_all(interim.as_bytes()).await?;
            stream.flush().await?;
        }

        Ok(ParseOutcome::Request(ParsedRequest {
            method: line.method,
            target: line.target,
            version: line.version,
            request_line,
            headers,
            keep_alive,
        }))
    }

    /// Connections close after the response unless the client asks for
    /// keep-alive and the server speaks HTTP/1.1 or later.
    fn keep_alive(&self, headers: &HeaderSet) -> bool {
        match headers.get("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => {
                self.server_version >= Version::HTTP_11
            }
            _ => false,
        }
    }
}

/// Reads header lines up to the blank line (or end of stream).
async fn read_headers<S>(stream: &mut S) -> io::Result<Result<HeaderSet, ParseFailure>>
where
    S: AsyncBufRead + Unpin,
{
    let mut headers = HeaderSet::new();
    let mut count = 0;

    loop {
        let raw = read_line(stream, MAX_LINE).await?;
        if raw.len() > MAX_LINE {
            return Ok(Err(ParseFailure::header_line_too_long()));
        }
        if raw.is_empty() || raw == b"\r\n" || raw == b"\n" {
            break;
        }

        count += 1;
        if count > MAX_HEADERS {
            return Ok(Err(ParseFailure::too_many_headers()));
        }

        let line = decode_latin1(&raw);
        let line = line.trim_end_matches(['\r', '\n']);

        if line.starts_with([' ', '\t']) {
            if !headers.continue_last(line.trim()) {
                tracing::debug!(line = %line, "continuation line without a header, skipping");
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) => headers.push(name.trim(), value.trim()),
            None => tracing::debug!(line = %line, "malformed header line, skipping"),
        }
    }

    Ok(Ok(headers))
}

/// Reads through the next `\n`, stopping early once more than `limit`
/// bytes have been collected. An empty result means end of stream.
pub(crate) async fn read_line<R>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();

    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }

        let room = limit + 1 - line.len();
        let window = &available[..available.len().min(room)];

        let (taken, done) = match window.iter().position(|&b| b == b'\n') {
            Some(i) => (i + 1, true),
            None => (window.len(), false),
        };
        line.extend_from_slice(&window[..taken]);
        reader.consume(taken);

        if done || line.len() > limit {
            break;
        }
    }

    Ok(line)
}

/// Single-byte decoding so any byte value survives.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
