use std::fmt;

/// HTTP protocol version as a `(major, minor)` pair.
///
/// Ordering is numeric, so `Version::HTTP_11 > Version::HTTP_10` and
/// `HTTP/1.10` sorts after `HTTP/1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const HTTP_09: Version = Version { major: 0, minor: 9 };
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    /// Parses a version token of the form `HTTP/<major>.<minor>`.
    ///
    /// Only the first two numeric components are used, so `HTTP/1.1.5`
    /// parses as 1.1. A component too large for `u32` saturates, so huge
    /// versions still compare as unsupported. Returns `None` when the token
    /// does not start with `HTTP/` or either component is not a number.
    ///
    /// # Example
    ///
    /// ```
    /// # use canned::http::request::Version;
    /// assert_eq!(Version::parse("HTTP/1.1"), Some(Version::HTTP_11));
    /// assert_eq!(Version::parse("HTTP/x.1"), None);
    /// assert_eq!(Version::parse("SPDY/3.1"), None);
    /// assert!(!Version::parse("HTTP/4294967296.0").unwrap().is_supported());
    /// ```
    pub fn parse(token: &str) -> Option<Self> {
        let number = token.strip_prefix("HTTP/")?;
        let mut parts = number.split('.');
        let major = component(parts.next()?)?;
        let minor = component(parts.next()?)?;
        Some(Self { major, minor })
    }

    /// Whether the server accepts requests at this version (0.x and 1.x).
    pub fn is_supported(&self) -> bool {
        self.major < 2
    }
}

fn component(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text.strip_prefix('+').unwrap_or(text);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}

impl Default for Version {
    fn default() -> Self {
        Version::HTTP_10
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// Ordered multi-map of request headers.
///
/// Names keep the case the client sent; lookups are case-insensitive and
/// return the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Retrieves the first value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for `name`, in arrival order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Appends folded continuation text to the most recent header.
    ///
    /// Returns `false` when there is no header to continue.
    pub(crate) fn continue_last(&mut self, text: &str) -> bool {
        match self.entries.last_mut() {
            Some((_, value)) => {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(text);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A request line plus headers, as read off the wire.
///
/// Built fresh for every request and dropped once its response is written.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// Method token exactly as sent (any token is accepted)
    pub method: String,
    /// Request target exactly as sent, not URL-decoded
    pub target: String,
    /// Effective request version (1.0 when the client sent none)
    pub version: Version,
    /// The request line without its line terminator, for logging
    pub request_line: String,
    pub headers: HeaderSet,
    /// Whether the connection stays open after this request's response
    pub keep_alive: bool,
}

impl ParsedRequest {
    /// The `"<method> <target>"` string rules are matched against.
    pub fn match_key(&self) -> String {
        format!("{} {}", self.method, self.target)
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }

    /// Parses the Content-Length header.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> u64 {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }
}
