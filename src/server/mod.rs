//! Listening socket, accept loop and shutdown.
//!
//! ```text
//!   signals / stdin ──trigger──▶ Shutdown ◀──wait── Lifecycle (accept loop task)
//!                                   │                   │ accept
//!                                   │                   ▼
//!                                   └──────wait──── connection tasks
//! ```
//!
//! The [`Listener`] owns the socket; the [`Lifecycle`] owns the listener and
//! runs the accept loop in its own task, spawning one task per connection.

pub mod context;
pub mod lifecycle;
pub mod listener;
pub mod shutdown;
pub mod signals;

pub use context::ServerContext;
pub use lifecycle::{Lifecycle, RunningServer};
pub use listener::Listener;
pub use shutdown::Shutdown;
