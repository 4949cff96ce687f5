use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;

use crate::http::response::is_latin1;

/// Rule key that answers any request no other rule matched.
pub const WILDCARD: &str = "*";

/// The canned response a rule produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub code: u16,
    pub reason: Option<String>,
    /// Header name/value pairs in the order the rule lists them
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl ResponseDescriptor {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            reason: None,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether this response goes out through the error path.
    pub fn is_error(&self) -> bool {
        self.code >= 400
    }
}

/// How a rule key is compared against a request's match key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePattern {
    /// Key without `*`: the match key must be equal.
    Exact(String),
    /// Key starting with `*`: the match key must end with the rest.
    EndsWith(String),
    /// Key with a `*` elsewhere: the match key must start with the text
    /// before the first `*`.
    StartsWith(String),
    /// The bare `*` key.
    Wildcard,
}

impl RulePattern {
    pub fn classify(key: &str) -> Self {
        if key == WILDCARD {
            return RulePattern::Wildcard;
        }
        match key.find('*') {
            None => RulePattern::Exact(key.to_string()),
            Some(0) => RulePattern::EndsWith(key[1..].to_string()),
            Some(i) => RulePattern::StartsWith(key[..i].to_string()),
        }
    }

    pub fn matches(&self, match_key: &str) -> bool {
        match self {
            RulePattern::Exact(exact) => match_key == exact,
            RulePattern::EndsWith(suffix) => match_key.ends_with(suffix.as_str()),
            RulePattern::StartsWith(prefix) => match_key.starts_with(prefix.as_str()),
            RulePattern::Wildcard => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub key: String,
    pub pattern: RulePattern,
    pub response: ResponseDescriptor,
}

impl Rule {
    pub fn new(key: impl Into<String>, response: ResponseDescriptor) -> Self {
        let key = key.into();
        Self {
            pattern: RulePattern::classify(&key),
            key,
            response,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.pattern == RulePattern::Wildcard
    }
}

/// Ordered rule table for one protocol.
///
/// Rules keep the order they were declared in; that order decides which
/// rule answers when several patterns match. The wildcard rule is held
/// apart since it only ever applies last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<Rule>,
    wildcard: Option<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule at the end of the table.
    ///
    /// Re-declaring a key replaces its response but keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, response: ResponseDescriptor) {
        let rule = Rule::new(key, response);

        if rule.is_wildcard() {
            self.wildcard = Some(rule);
        } else if let Some(existing) = self.rules.iter_mut().find(|r| r.key == rule.key) {
            existing.response = rule.response;
        } else {
            self.rules.push(rule);
        }
    }

    pub fn with_rule(mut self, key: impl Into<String>, response: ResponseDescriptor) -> Self {
        self.insert(key, response);
        self
    }

    /// Pattern rules in declaration order, wildcard excluded.
    pub fn patterns(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn wildcard(&self) -> Option<&Rule> {
        self.wildcard.as_ref()
    }

    pub fn len(&self) -> usize {
        self.rules.len() + usize::from(self.wildcard.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = RuleTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of rule keys to responses")
            }

            fn visit_map<A>(self, mut map: A) -> Result<RuleTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut table = RuleTable::new();
                while let Some((key, response)) = map.next_entry::<String, ResponseDescriptor>()? {
                    table.insert(key, response);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

impl<'de> Deserialize<'de> for ResponseDescriptor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DescriptorVisitor;

        impl<'de> Visitor<'de> for DescriptorVisitor {
            type Value = ResponseDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a response with at least a `code` field")
            }

            fn visit_map<A>(self, mut map: A) -> Result<ResponseDescriptor, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut code = None;
                let mut reason = None;
                let mut body = None;
                let mut headers = Vec::new();

                // `code`, `reason` and `body` are reserved; every other field
                // is a header.
                while let Some((field, value)) = map.next_entry::<String, Value>()? {
                    match field.as_str() {
                        "code" => code = Some(status_code(&value).map_err(<A::Error as de::Error>::custom)?),
                        "reason" => {
                            reason = Some(head_text("reason", &value).map_err(<A::Error as de::Error>::custom)?)
                        }
                        "body" => body = Some(text(&value)),
                        _ => {
                            if !is_latin1(&field) {
                                return Err(<A::Error as de::Error>::custom(format!(
                                    "header name {:?} is not ISO-8859-1",
                                    field
                                )));
                            }
                            let value = head_text("header value", &value).map_err(<A::Error as de::Error>::custom)?;
                            headers.push((field, value));
                        }
                    }
                }

                Ok(ResponseDescriptor {
                    code: code.ok_or_else(|| <A::Error as de::Error>::missing_field("code"))?,
                    reason,
                    headers,
                    body,
                })
            }
        }

        deserializer.deserialize_map(DescriptorVisitor)
    }
}

/// Accepts `200` as well as `"200"`.
fn status_code(value: &Value) -> Result<u16, String> {
    let code = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };

    match code {
        Some(c @ 100..=999) => Ok(c as u16),
        _ => Err(format!("invalid status code {}", value)),
    }
}

/// Strings are taken verbatim; anything else becomes compact JSON.
fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Like [`text`], for values that go into the response head.
fn head_text(what: &str, value: &Value) -> Result<String, String> {
    let text = text(value);
    if is_latin1(&text) {
        Ok(text)
    } else {
        Err(format!("{} {:?} is not ISO-8859-1", what, text))
    }
}
