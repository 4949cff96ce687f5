//! canned - configurable mock HTTP endpoint
//!
//! Accepts raw TCP connections, parses HTTP/1.x requests and answers each
//! one from a declarative rule table.

pub mod cli;
pub mod config;
pub mod http;
pub mod protocol;
pub mod rules;
pub mod server;
