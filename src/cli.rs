use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

/// Mock HTTP endpoint that answers from a rule file.
#[derive(Debug, Parser)]
#[command(name = "canned", version, about)]
pub struct Cli {
    /// YAML config file; replaces the CANNED_* environment variables
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host/address to listen on
    #[arg(short = 'a', long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Protocol to serve (http only)
    #[arg(short = 'x', long = "proto")]
    pub protocol: Option<String>,

    /// Directory holding the rule file (<proto>.json or <proto>.yaml)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    pub rules_dir: Option<PathBuf>,

    /// Protocol version the server speaks, e.g. HTTP/1.1
    #[arg(long, value_name = "VERSION")]
    pub protocol_version: Option<String>,

    /// Seconds to wait on a silent client (0 = forever)
    #[arg(long, value_name = "SECS")]
    pub read_timeout: Option<u64>,

    /// On shutdown, release the port without waiting for open connections
    #[arg(long)]
    pub nonblocking_teardown: bool,

    /// Shut down when a line is entered on stdin
    #[arg(long)]
    pub stdin_shutdown: bool,

    /// Log debug detail
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Resolves the effective configuration: file or environment first,
    /// then any flags given on the command line.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::load(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(protocol) = &self.protocol {
            config.protocol = protocol.clone();
        }
        if let Some(dir) = &self.rules_dir {
            config.rules_dir = dir.clone();
        }
        if let Some(version) = &self.protocol_version {
            config.protocol_version = version.clone();
        }
        if let Some(secs) = self.read_timeout {
            config.read_timeout_secs = secs;
        }
        config.nonblocking_teardown |= self.nonblocking_teardown;
        config.stdin_shutdown |= self.stdin_shutdown;
        config.verbose |= self.verbose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "canned", "-a", "0.0.0.0", "-p", "9000", "-d", "/tmp/rules", "-v",
            "--protocol-version", "HTTP/1.1", "--nonblocking-teardown",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        assert_eq!(config.rules_dir, PathBuf::from("/tmp/rules"));
        assert_eq!(config.protocol_version, "HTTP/1.1");
        assert!(config.verbose);
        assert!(config.nonblocking_teardown);
        assert!(!config.stdin_shutdown);
        assert_eq!(config.protocol, "http");
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
