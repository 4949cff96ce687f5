use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};

use crate::http::parser::{ParseFailure, ParseOutcome, RequestParser};
use crate::http::request::ParsedRequest;
use crate::http::writer::ResponseWriter;
use crate::rules::match_rule;
use crate::server::{ServerContext, Shutdown};

pub struct Connection<S> {
    stream: BufStream<S>,
    peer: SocketAddr,
    context: Arc<ServerContext>,
    shutdown: Shutdown,
    state: ConnectionState,
    timed_out: bool,
}

pub enum ConnectionState {
    AwaitingRequest,
    Parsing,
    Responding(Exchange),
    Closed,
}

/// What the parser handed over for the response step.
pub enum Exchange {
    Request(ParsedRequest),
    Failure(ParseFailure),
}

/// How waiting for the next request ended.
enum Arrival {
    Data,
    PeerClosed,
    TimedOut,
    Shutdown,
    Failed(io::Error),
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: SocketAddr, context: Arc<ServerContext>, shutdown: Shutdown) -> Self {
        Self {
            stream: BufStream::new(stream),
            peer,
            context,
            shutdown,
            state: ConnectionState::AwaitingRequest,
            timed_out: false,
        }
    }

    /// Serves requests until the connection closes.
    ///
    /// The socket is shut down on the way out whether or not an error
    /// ended the loop.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "Socket shutdown failed");
        }

        result
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitingRequest => {
                    self.state = self.await_request().await?;
                }

                ConnectionState::Parsing => {
                    self.state = self.parse().await?;
                }

                ConnectionState::Responding(exchange) => {
                    self.state = self.respond(exchange).await?;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Waits for the first byte of the next request.
    ///
    /// An idle connection gives way to shutdown; one with bytes pending
    /// goes on to parse them.
    async fn await_request(&mut self) -> anyhow::Result<ConnectionState> {
        let timeout = self.context.read_timeout;

        let arrival = {
            let stream = &mut self.stream;
            let shutdown = &self.shutdown;

            tokio::select! {
                biased;

                ready = with_deadline(timeout, async { stream.fill_buf().await.map(|buf| buf.is_empty()) }) => {
                    match ready {
                        Some(Ok(false)) => Arrival::Data,
                        Some(Ok(true)) => Arrival::PeerClosed,
                        Some(Err(e)) => Arrival::Failed(e),
                        None => Arrival::TimedOut,
                    }
                }

                _ = shutdown.wait() => Arrival::Shutdown,
            }
        };

        match arrival {
            Arrival::Data => Ok(ConnectionState::Parsing),
            Arrival::PeerClosed => {
                tracing::debug!(peer = %self.peer, "Peer closed connection");
                Ok(ConnectionState::Closed)
            }
            Arrival::TimedOut => Ok(self.on_timeout()),
            Arrival::Shutdown => {
                tracing::debug!(peer = %self.peer, "Closing idle connection for shutdown");
                Ok(ConnectionState::Closed)
            }
            Arrival::Failed(e) => Err(e.into()),
        }
    }

    async fn parse(&mut self) -> anyhow::Result<ConnectionState> {
        let parser = RequestParser::new(self.context.server_version);

        let Some(outcome) = with_deadline(self.context.read_timeout, parser.parse(&mut self.stream)).await
        else {
            return Ok(self.on_timeout());
        };

        match outcome? {
            ParseOutcome::Request(request) => {
                tracing::info!(
                    peer = %self.peer,
                    request_line = %request.request_line,
                    "Request received"
                );
                Ok(ConnectionState::Responding(Exchange::Request(request)))
            }
            ParseOutcome::Closed => Ok(ConnectionState::Closed),
            ParseOutcome::Failed(failure) => {
                tracing::error!(
                    peer = %self.peer,
                    status = failure.status,
                    reason = failure.message.as_deref().unwrap_or(""),
                    "Request rejected"
                );
                Ok(ConnectionState::Responding(Exchange::Failure(failure)))
            }
        }
    }

    fn on_timeout(&mut self) -> ConnectionState {
        tracing::error!(peer = %self.peer, "Request timed out");
        self.timed_out = true;
        ConnectionState::Responding(Exchange::Failure(ParseFailure::timeout()))
    }

    async fn respond(&mut self, exchange: Exchange) -> anyhow::Result<ConnectionState> {
        let server_version = self.context.server_version;

        let (mut writer, request_line) = match &exchange {
            Exchange::Request(request) => {
                if !self.discard_body(request).await? {
                    return Ok(self.on_timeout());
                }

                let writer = match match_rule(&request.method, &request.target, &self.context.rules) {
                    Some(rule) => {
                        tracing::debug!(
                            peer = %self.peer,
                            rule = %rule.key,
                            code = rule.response.code,
                            "Rule matched"
                        );
                        ResponseWriter::for_rule(&rule.response, request, server_version)?
                    }
                    None => {
                        tracing::error!(
                            peer = %self.peer,
                            request_line = %request.request_line,
                            "No rules found for request"
                        );
                        ResponseWriter::for_failure(&ParseFailure::no_rule(), Some(request), server_version)?
                    }
                };
                (writer, request.request_line.as_str())
            }
            Exchange::Failure(failure) => {
                (ResponseWriter::for_failure(failure, None, server_version)?, "")
            }
        };

        let sent = async {
            writer.write_to_stream(&mut self.stream).await?;
            self.stream.flush().await?;
            anyhow::Ok(())
        }
        .await;

        if let Err(e) = sent {
            if self.timed_out {
                tracing::debug!(peer = %self.peer, error = %e, "Could not deliver timeout response");
                return Ok(ConnectionState::Closed);
            }
            return Err(e);
        }

        tracing::info!(
            peer = %self.peer,
            status = writer.status(),
            request_line = %request_line,
            bytes = writer.len(),
            "Response sent"
        );

        let keep_alive = writer.keep_alive() && !self.timed_out;

        if keep_alive && !self.shutdown.is_triggered() {
            Ok(ConnectionState::AwaitingRequest)
        } else {
            Ok(ConnectionState::Closed)
        }
    }

    /// Reads and drops a `Content-Length` request body so the next request
    /// on this connection starts at the right byte.
    ///
    /// Returns `false` when the read timeout ran out first.
    async fn discard_body(&mut self, request: &ParsedRequest) -> anyhow::Result<bool> {
        let length = request.content_length();
        if length == 0 {
            return Ok(true);
        }

        let mut body = (&mut self.stream).take(length);
        let Some(copied) = with_deadline(
            self.context.read_timeout,
            tokio::io::copy(&mut body, &mut tokio::io::sink()),
        )
        .await
        else {
            return Ok(false);
        };
        let copied = copied?;

        tracing::debug!(peer = %self.peer, bytes = copied, "Discarded request body");
        Ok(true)
    }
}

/// Runs `fut` under an optional time limit; `None` means it ran out.
async fn with_deadline<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
        None => Some(fut.await),
    }
}
