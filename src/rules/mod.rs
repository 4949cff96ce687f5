//! Declarative response rules.
//!
//! A rule file maps rule keys to canned responses:
//!
//! ```json
//! {
//!     "GET /health": { "code": 200, "body": "ok" },
//!     "GET /api/*": { "code": 200, "Content-Type": "application/json", "body": "[]" },
//!     "*logout": { "code": 204 },
//!     "*": { "code": 404, "reason": "Not Mocked" }
//! }
//! ```
//!
//! Keys are matched against `"<METHOD> <TARGET>"` of each request. A key
//! ending in `*` matches by prefix, one starting with `*` matches by suffix,
//! anything else must be equal. The first matching key in file order wins;
//! `*` alone answers whatever nothing else matched.
//!
//! Within a response, `code` is required, `reason` and `body` are optional,
//! and every other field is sent as a header.

pub mod loader;
pub mod matcher;
pub mod table;

use std::path::PathBuf;

pub use loader::load_rules;
pub use matcher::match_rule;
pub use table::{ResponseDescriptor, Rule, RulePattern, RuleTable, WILDCARD};

#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("no rule file for protocol `{protocol}` in {}", dir.display())]
    NotFound { protocol: String, dir: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("unknown protocol `{0}`")]
    UnknownProtocol(String),
}
