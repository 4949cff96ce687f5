use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::request::Version;
use crate::protocol::Protocol;

pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Protocol adapter name; also the rule file's base name
    pub protocol: String,
    pub rules_dir: PathBuf,
    /// Version the server speaks, e.g. `HTTP/1.0`
    pub protocol_version: String,
    /// Seconds to wait on a silent client; 0 waits forever
    pub read_timeout_secs: u64,
    /// Release the listener without waiting for open connections
    pub nonblocking_teardown: bool,
    pub stdin_shutdown: bool,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            protocol: "http".to_string(),
            rules_dir: PathBuf::from("./"),
            protocol_version: Version::HTTP_10.to_string(),
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            nonblocking_teardown: false,
            stdin_shutdown: false,
            verbose: false,
        }
    }
}

impl Config {
    /// Defaults overridden by `CANNED_*` environment variables.
    ///
    /// Values that do not parse keep their default.
    pub fn load() -> Self {
        let defaults = Self::default();

        Self {
            host: env_or("CANNED_HOST", defaults.host),
            port: env_parsed("CANNED_PORT").unwrap_or(defaults.port),
            protocol: env_or("CANNED_PROTOCOL", defaults.protocol),
            rules_dir: std::env::var_os("CANNED_RULES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_dir),
            protocol_version: env_or("CANNED_PROTOCOL_VERSION", defaults.protocol_version),
            read_timeout_secs: env_parsed("CANNED_READ_TIMEOUT").unwrap_or(defaults.read_timeout_secs),
            nonblocking_teardown: env_flag("CANNED_NONBLOCKING_TEARDOWN")
                .unwrap_or(defaults.nonblocking_teardown),
            stdin_shutdown: defaults.stdin_shutdown,
            verbose: defaults.verbose,
        }
    }

    /// Reads settings from a YAML file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn protocol(&self) -> anyhow::Result<Protocol> {
        Ok(self.protocol.parse()?)
    }

    /// The configured protocol version, which must be 0.x or 1.x.
    pub fn server_version(&self) -> anyhow::Result<Version> {
        match Version::parse(&self.protocol_version) {
            Some(v) if v.is_supported() => Ok(v),
            Some(v) => anyhow::bail!("protocol version {} is not supported", v),
            None => anyhow::bail!("invalid protocol version {:?}", self.protocol_version),
        }
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

fn env_flag(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
