//! External shutdown triggers.
//!
//! Handlers only ever call [`Shutdown::trigger`]; a repeated signal is a
//! no-op.

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::server::Shutdown;

/// Triggers shutdown on ctrl-c, and on SIGTERM where available.
pub fn listen(shutdown: Shutdown) {
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                return;
            }
            if !on_interrupt.trigger() {
                tracing::debug!("Shutdown already in progress");
            }
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                return;
            }
        };
        while terminate.recv().await.is_some() {
            if !shutdown.trigger() {
                tracing::debug!("Shutdown already in progress");
            }
        }
    });
}

/// Triggers shutdown when a non-empty line arrives on stdin.
///
/// End of input is ignored so a detached process keeps running.
pub fn listen_stdin(shutdown: Shutdown) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if !line.trim().is_empty() => {
                    shutdown.trigger();
                    return;
                }
                Ok(Some(_)) => continue,
                Ok(None) => return,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read stdin");
                    return;
                }
            }
        }
    });
}
