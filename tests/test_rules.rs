use std::fs;

use canned::rules::loader::{parse_json, parse_yaml};
use canned::rules::{RuleTable, RulesError, ResponseDescriptor, load_rules, match_rule};

fn table() -> RuleTable {
    RuleTable::new()
        .with_rule("GET /health", ResponseDescriptor::new(200).body("ok"))
        .with_rule("GET /api/*", ResponseDescriptor::new(200).body("[]"))
        .with_rule("*logout", ResponseDescriptor::new(204))
        .with_rule("*", ResponseDescriptor::new(404))
}

fn matched(method: &str, target: &str, rules: &RuleTable) -> Option<String> {
    match_rule(method, target, rules).map(|rule| rule.key.clone())
}

#[test]
fn test_exact_match() {
    assert_eq!(matched("GET", "/health", &table()).as_deref(), Some("GET /health"));
}

#[test]
fn test_prefix_match() {
    let rules = table();
    assert_eq!(matched("GET", "/api/users", &rules).as_deref(), Some("GET /api/*"));
    assert_eq!(matched("GET", "/api/", &rules).as_deref(), Some("GET /api/*"));
    // Not a prefix of "GET /other", so only the wildcard is left.
    assert_eq!(matched("GET", "/other", &rules).as_deref(), Some("*"));
}

#[test]
fn test_suffix_match() {
    let rules = table();
    assert_eq!(matched("POST", "/session/logout", &rules).as_deref(), Some("*logout"));
    assert_eq!(matched("GET", "/logout?next=/", &rules).as_deref(), Some("*"));
}

#[test]
fn test_no_match_without_wildcard() {
    let rules = RuleTable::new().with_rule("GET /", ResponseDescriptor::new(200));

    assert!(match_rule("DELETE", "/", &rules).is_none());
    assert!(match_rule("GET", "/x", &rules).is_none());
}

#[test]
fn test_method_is_case_sensitive() {
    let rules = RuleTable::new().with_rule("GET /", ResponseDescriptor::new(200));
    assert!(match_rule("get", "/", &rules).is_none());
}

#[test]
fn test_first_declared_match_wins() {
    let prefix_first = RuleTable::new()
        .with_rule("GET /api/*", ResponseDescriptor::new(200))
        .with_rule("GET /api/users", ResponseDescriptor::new(201));
    let exact_first = RuleTable::new()
        .with_rule("GET /api/users", ResponseDescriptor::new(201))
        .with_rule("GET /api/*", ResponseDescriptor::new(200));

    assert_eq!(match_rule("GET", "/api/users", &prefix_first).unwrap().response.code, 200);
    assert_eq!(match_rule("GET", "/api/users", &exact_first).unwrap().response.code, 201);
}

#[test]
fn test_wildcard_applies_last_wherever_declared() {
    let rules = RuleTable::new()
        .with_rule("*", ResponseDescriptor::new(404))
        .with_rule("GET /", ResponseDescriptor::new(200));

    assert_eq!(match_rule("GET", "/", &rules).unwrap().response.code, 200);
    assert_eq!(match_rule("GET", "/nope", &rules).unwrap().response.code, 404);
}

#[test]
fn test_json_keeps_file_order() {
    let rules = parse_json(
        r#"{
            "GET /a*": { "code": 200 },
            "GET /ab": { "code": 201 }
        }"#,
    )
    .unwrap();

    let keys: Vec<_> = rules.patterns().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["GET /a*", "GET /ab"]);
    assert_eq!(match_rule("GET", "/ab", &rules).unwrap().response.code, 200);
}

#[test]
fn test_json_response_fields() {
    let rules = parse_json(
        r#"{
            "GET /": {
                "code": "201",
                "reason": "Made",
                "Content-Type": "application/json",
                "X-Retry": 3,
                "body": {"ok": true}
            }
        }"#,
    )
    .unwrap();

    let response = &match_rule("GET", "/", &rules).unwrap().response;
    assert_eq!(response.code, 201);
    assert_eq!(response.reason.as_deref(), Some("Made"));
    assert_eq!(
        response.headers,
        vec![
            ("Content-Type".to_string(), "application/json".to_string()),
            ("X-Retry".to_string(), "3".to_string()),
        ]
    );
    assert_eq!(response.body.as_deref(), Some(r#"{"ok":true}"#));
}

#[test]
fn test_missing_code_rejected() {
    let err = parse_json(r#"{ "GET /": { "body": "hi" } }"#).unwrap_err();
    assert!(err.contains("code"), "{}", err);
}

#[test]
fn test_invalid_code_rejected() {
    assert!(parse_json(r#"{ "GET /": { "code": "abc" } }"#).is_err());
    assert!(parse_json(r#"{ "GET /": { "code": 42 } }"#).is_err());
    assert!(parse_json(r#"{ "GET /": { "code": 1000 } }"#).is_err());
}

#[test]
fn test_head_text_must_be_latin1() {
    let err = parse_json(r#"{ "GET /": { "code": 200, "X-Name": "\u4e16\u754c" } }"#).unwrap_err();
    assert!(err.contains("ISO-8859-1"), "{}", err);

    let err = parse_yaml("GET /:\n  code: 200\n  reason: \"\u{2713} done\"\n").unwrap_err();
    assert!(err.contains("ISO-8859-1"), "{}", err);

    // Latin-1 text in the head and any text in the body are fine.
    let rules = parse_json(r#"{ "GET /": { "code": 200, "X-Name": "caf\u00e9", "body": "\u4e16" } }"#).unwrap();
    let response = &match_rule("GET", "/", &rules).unwrap().response;
    assert_eq!(response.headers[0].1, "caf\u{e9}");
    assert_eq!(response.body.as_deref(), Some("\u{4e16}"));
}

#[test]
fn test_load_rules_rejects_unencodable_header() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("http.yaml"), "\"*\":\n  code: 200\n  X-Mark: \"\u{2713}\"\n").unwrap();

    let err = load_rules(dir.path(), "http").unwrap_err();
    assert!(matches!(err, RulesError::Parse { .. }));
}

#[test]
fn test_top_level_must_be_object() {
    assert!(parse_json(r#"[{"code": 200}]"#).is_err());
}

#[test]
fn test_yaml_rules() {
    let rules = parse_yaml(
        "GET /api/*:\n  code: 200\n  body: '[]'\n\"*\":\n  code: 404\n  reason: Not Mocked\n",
    )
    .unwrap();

    assert_eq!(rules.len(), 2);
    assert_eq!(match_rule("GET", "/api/x", &rules).unwrap().response.body.as_deref(), Some("[]"));
    let fallback = &match_rule("PUT", "/", &rules).unwrap().response;
    assert_eq!(fallback.code, 404);
    assert_eq!(fallback.reason.as_deref(), Some("Not Mocked"));
}

#[test]
fn test_load_rules_prefers_json() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("http.json"), r#"{ "*": { "code": 200 } }"#).unwrap();
    fs::write(dir.path().join("http.yaml"), "\"*\":\n  code: 404\n").unwrap();

    let rules = load_rules(dir.path(), "http").unwrap();
    assert_eq!(rules.wildcard().unwrap().response.code, 200);
}

#[test]
fn test_load_rules_falls_back_to_yaml() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("http.yml"), "GET /:\n  code: 204\n").unwrap();

    let rules = load_rules(dir.path(), "http").unwrap();
    assert_eq!(match_rule("GET", "/", &rules).unwrap().response.code, 204);
}

#[test]
fn test_load_rules_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let err = load_rules(dir.path(), "http").unwrap_err();
    assert!(matches!(err, RulesError::NotFound { .. }));
}

#[test]
fn test_load_rules_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("http.json"), "{ not json").unwrap();

    let err = load_rules(dir.path(), "http").unwrap_err();
    assert!(matches!(err, RulesError::Parse { .. }));
}
