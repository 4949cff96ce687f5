use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tracing::info;

use crate::server::{Listener, ServerContext, Shutdown};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Drives the accept loop for one [`Listener`].
///
/// Every accepted connection runs in its own task. Once [`Shutdown`] is
/// triggered the loop stops accepting and releases the listener, then
/// either waits for the connection tasks to finish (graceful) or leaves
/// them running detached (non-blocking teardown).
pub struct Lifecycle {
    listener: Listener,
    context: Arc<ServerContext>,
    shutdown: Shutdown,
    nonblocking_teardown: bool,
}

impl Lifecycle {
    pub fn new(listener: Listener, context: Arc<ServerContext>, shutdown: Shutdown) -> Self {
        Self {
            listener,
            context,
            shutdown,
            nonblocking_teardown: false,
        }
    }

    pub fn nonblocking_teardown(mut self, enabled: bool) -> Self {
        self.nonblocking_teardown = enabled;
        self
    }

    /// Spawns the accept loop in its own task.
    pub fn start(self) -> RunningServer {
        let local_addr = self.listener.local_addr();
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run());

        RunningServer {
            local_addr,
            shutdown,
            task,
        }
    }

    async fn run(self) -> anyhow::Result<()> {
        let Lifecycle {
            listener,
            context,
            shutdown,
            nonblocking_teardown,
        } = self;

        info!(
            address = %listener.local_addr(),
            protocol = %context.protocol,
            rules = context.rules.len(),
            "Listening for connections"
        );

        let mut connections = JoinSet::new();
        let mut accept_failures = 0u32;

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => break,

                // Reap finished connections so the set does not grow unbounded.
                Some(_) = connections.join_next(), if !connections.is_empty() => {}

                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(accepted) => {
                            accept_failures = 0;
                            accepted
                        }
                        Err(e) => {
                            let delay = accept_backoff(accept_failures);
                            accept_failures = accept_failures.saturating_add(1);
                            tracing::error!(
                                error = %e,
                                retry_in_ms = delay.as_millis() as u64,
                                "Failed to accept connection"
                            );
                            tokio::select! {
                                _ = tokio::time::sleep(delay) => continue,
                                _ = shutdown.wait() => break,
                            }
                        }
                    };
                    tracing::debug!(peer = %peer, "Accepted connection");

                    let context = Arc::clone(&context);
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        if let Err(e) = context.protocol.serve(socket, peer, Arc::clone(&context), shutdown).await {
                            tracing::error!(peer = %peer, error = %e, "Connection error");
                        }
                    });
                }
            }
        }

        let address = listener.local_addr();
        drop(listener);
        info!(address = %address, "Listener closed");

        if nonblocking_teardown {
            if !connections.is_empty() {
                info!(in_flight = connections.len(), "Leaving connections to finish on their own");
            }
            connections.detach_all();
        } else {
            while !connections.is_empty() {
                info!(in_flight = connections.len(), "Waiting for connections to finish");
                connections.join_next().await;
            }
        }

        info!("Server stopped");
        Ok(())
    }
}

/// Handle to a started server.
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<anyhow::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shutdown handle shared with the accept loop.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Resolves once the server has fully stopped.
    pub async fn wait(self) -> anyhow::Result<()> {
        self.task.await?
    }
}

/// Delay before the next accept after `failures` consecutive errors (EMFILE
/// and the like), doubling up to [`ACCEPT_BACKOFF_MAX`].
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << failures.min(16))
        .min(ACCEPT_BACKOFF_MAX)
}
