use std::time::SystemTime;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::parser::ParseFailure;
use crate::http::request::{ParsedRequest, Version};
use crate::http::response::{self, ERROR_CONTENT_TYPE, SERVER_NAME};
use crate::rules::ResponseDescriptor;

/// A response head that cannot be put on the wire.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{what} {value:?} cannot be encoded as ISO-8859-1")]
    NotLatin1 { what: &'static str, value: String },
}

/// Serializes the status line and headers, tracking whether a head is
/// written at all (HTTP/0.9 clients only get the body).
struct Encoder {
    buf: BytesMut,
    with_head: bool,
}

impl Encoder {
    fn new(with_head: bool) -> Self {
        Self {
            buf: BytesMut::with_capacity(512),
            with_head,
        }
    }

    fn status_line(&mut self, version: Version, code: u16, reason: &str) -> Result<(), RenderError> {
        if !self.with_head {
            return Ok(());
        }
        self.buf.put_slice(format!("{} {} ", version, code).as_bytes());
        put_latin1(&mut self.buf, "reason phrase", reason)?;
        self.buf.put_slice(b"\r\n");
        self.header("Server", SERVER_NAME)?;
        self.header("Date", &httpdate::fmt_http_date(SystemTime::now()))
    }

    fn header(&mut self, name: &str, value: &str) -> Result<(), RenderError> {
        if !self.with_head {
            return Ok(());
        }
        put_latin1(&mut self.buf, "header name", name)?;
        self.buf.put_slice(b": ");
        put_latin1(&mut self.buf, "header value", value)?;
        self.buf.put_slice(b"\r\n");
        Ok(())
    }

    fn end_headers(&mut self) {
        if self.with_head {
            self.buf.put_slice(b"\r\n");
        }
    }

    fn body(&mut self, body: &[u8]) {
        self.buf.put_slice(body);
    }
}

fn put_latin1(buf: &mut BytesMut, what: &'static str, text: &str) -> Result<(), RenderError> {
    for c in text.chars() {
        match u8::try_from(u32::from(c)) {
            Ok(b) => buf.put_u8(b),
            Err(_) => {
                return Err(RenderError::NotLatin1 {
                    what,
                    value: text.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// A fully serialized response plus what the connection should do after it.
pub struct ResponseWriter {
    buffer: BytesMut,
    written: usize,
    status: u16,
    keep_alive: bool,
}

impl ResponseWriter {
    /// Renders the response a matched rule describes.
    ///
    /// Statuses of 400 and above take the error path. Below that the status
    /// line is followed by the rule's headers in order, a `Content-Length`
    /// when there is a body, and the body itself. A `Connection` header in
    /// the rule overrides the request's keep-alive decision.
    pub fn for_rule(
        descriptor: &ResponseDescriptor,
        request: &ParsedRequest,
        server_version: Version,
    ) -> Result<Self, RenderError> {
        if descriptor.is_error() {
            return Self::error(
                descriptor.code,
                descriptor.reason.as_deref(),
                None,
                descriptor,
                Some(request),
                server_version,
            );
        }

        let mut enc = Encoder::new(request.version != Version::HTTP_09);
        let reason = descriptor
            .reason
            .as_deref()
            .unwrap_or_else(|| response::reason_phrase(descriptor.code));
        enc.status_line(server_version, descriptor.code, reason)?;

        let mut keep_alive = request.keep_alive;
        for (name, value) in &descriptor.headers {
            if name.eq_ignore_ascii_case("Connection") {
                if value.eq_ignore_ascii_case("close") {
                    keep_alive = false;
                } else if value.eq_ignore_ascii_case("keep-alive") {
                    keep_alive = true;
                }
            }
            enc.header(name, value)?;
        }

        if let Some(body) = &descriptor.body {
            enc.header("Content-Length", &body.len().to_string())?;
        }
        enc.end_headers();

        if let Some(body) = &descriptor.body {
            if !request.is_head() {
                enc.body(body.as_bytes());
            }
        }

        Ok(Self::from_encoder(enc, descriptor.code, keep_alive))
    }

    /// Renders the error response for a request that could not be served.
    ///
    /// `request` is present when the request line was understood; it decides
    /// HEAD and HTTP/0.9 handling.
    pub fn for_failure(
        failure: &ParseFailure,
        request: Option<&ParsedRequest>,
        server_version: Version,
    ) -> Result<Self, RenderError> {
        Self::error(
            failure.status,
            failure.message.as_deref(),
            failure.explain.as_deref(),
            &ResponseDescriptor::new(failure.status),
            request,
            server_version,
        )
    }

    /// Status line, a forced `Connection: close`, the descriptor's headers,
    /// then either the descriptor's body or the default error page.
    fn error(
        code: u16,
        message: Option<&str>,
        explain: Option<&str>,
        extra: &ResponseDescriptor,
        request: Option<&ParsedRequest>,
        server_version: Version,
    ) -> Result<Self, RenderError> {
        let (short, long) = response::status_text(code).unwrap_or(("???", "???"));
        let message = message.unwrap_or(short);
        let explain = explain.unwrap_or(long);

        let with_head = request.is_none_or(|r| r.version != Version::HTTP_09);
        let is_head = request.is_some_and(ParsedRequest::is_head);

        let mut enc = Encoder::new(with_head);
        enc.status_line(server_version, code, message)?;
        enc.header("Connection", "close")?;
        for (name, value) in &extra.headers {
            enc.header(name, value)?;
        }

        let body = match &extra.body {
            Some(body) => Some(body.clone()),
            None if response::forbids_body(code) => None,
            None => {
                enc.header("Content-Type", ERROR_CONTENT_TYPE)?;
                Some(response::error_page(code, message, explain))
            }
        };

        if let Some(body) = &body {
            enc.header("Content-Length", &body.len().to_string())?;
        }
        enc.end_headers();

        if let Some(body) = &body {
            if !is_head {
                enc.body(body.as_bytes());
            }
        }

        Ok(Self::from_encoder(enc, code, false))
    }

    fn from_encoder(enc: Encoder, status: u16, keep_alive: bool) -> Self {
        Self {
            buffer: enc.buf,
            written: 0,
            status,
            keep_alive,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Whether the connection may serve another request after this one.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        Ok(())
    }
}
