use std::time::Duration;

use crate::config::Config;
use crate::http::request::Version;
use crate::protocol::Protocol;
use crate::rules::RuleTable;

/// Everything a connection needs to answer requests.
///
/// Built once at startup and shared read-only (behind an `Arc`) by every
/// connection task.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub protocol: Protocol,
    pub rules: RuleTable,
    /// Version on the status line; 1.1 or later also enables keep-alive
    /// and `Expect: 100-continue`.
    pub server_version: Version,
    /// `None` waits for the client forever.
    pub read_timeout: Option<Duration>,
}

impl ServerContext {
    pub fn new(protocol: Protocol, rules: RuleTable) -> Self {
        Self {
            protocol,
            rules,
            server_version: Version::HTTP_10,
            read_timeout: Some(Duration::from_secs(crate::config::DEFAULT_READ_TIMEOUT_SECS)),
        }
    }

    pub fn from_config(config: &Config, rules: RuleTable) -> anyhow::Result<Self> {
        Ok(Self {
            protocol: config.protocol()?,
            rules,
            server_version: config.server_version()?,
            read_timeout: config.read_timeout(),
        })
    }

    pub fn with_server_version(mut self, version: Version) -> Self {
        self.server_version = version;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }
}
