//! HTTP/1.x protocol adapter.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection state machine
//! - **`parser`**: reads a request line and headers off the stream
//! - **`request`**: version, header and parsed-request types
//! - **`response`**: status table and the default error page
//! - **`writer`**: serializes rule responses and error responses
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Wait for the first byte (timeout, shutdown)
//!        └──────┬───────────┘
//!               │ Data arrived          (peer closed / shutdown → Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │     Parsing      │ ← Request line + headers, or a ParseFailure
//!        └──────┬───────────┘
//!               │ Request or failure     (timeout → 408)
//!               ▼
//!        ┌──────────────────┐
//!        │    Responding    │ ← Match a rule, write, flush
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → AwaitingRequest (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use canned::http::connection::Connection;
//!
//! let (socket, peer) = listener.accept().await?;
//! tokio::spawn(async move {
//!     let mut conn = Connection::new(socket, peer, context, shutdown);
//!     if let Err(e) = conn.run().await {
//!         tracing::error!("Connection error: {}", e);
//!     }
//! });
//! ```

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
