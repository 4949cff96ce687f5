//! Protocol adapters, selected by name.
//!
//! Each adapter pairs a request parser with a response writer behind the
//! same contract: raw bytes in, response bytes out, one connection at a time.
//! The name also picks the rule file (`http` reads `http.json`).

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::connection::Connection;
use crate::rules::RulesError;
use crate::server::{ServerContext, Shutdown};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// HTTP/0.9 through HTTP/1.x request/response framing
    Http,
}

/// Every adapter the server can run, keyed by name.
const PROTOCOLS: &[(&str, Protocol)] = &[("http", Protocol::Http)];

impl Protocol {
    pub fn from_name(name: &str) -> Option<Self> {
        PROTOCOLS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, p)| *p)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Http => "http",
        }
    }

    /// Serves one accepted connection until it closes.
    pub async fn serve<S>(
        self,
        stream: S,
        peer: SocketAddr,
        context: Arc<ServerContext>,
        shutdown: Shutdown,
    ) -> anyhow::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self {
            Protocol::Http => Connection::new(stream, peer, context, shutdown).run().await,
        }
    }
}

impl FromStr for Protocol {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| RulesError::UnknownProtocol(s.to_string()))
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
