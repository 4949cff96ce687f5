use std::path::{Path, PathBuf};

use crate::rules::RulesError;
use crate::rules::table::RuleTable;

/// File extensions tried, in order, for `<dir>/<protocol>.<ext>`.
const EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Loads the rule table for `protocol` from `dir`.
///
/// The first of `<protocol>.json`, `<protocol>.yaml` and `<protocol>.yml`
/// that exists is read. JSON and YAML keep the key order of the file.
pub fn load_rules(dir: impl AsRef<Path>, protocol: &str) -> Result<RuleTable, RulesError> {
    let dir = dir.as_ref();
    let path = rule_file(dir, protocol).ok_or_else(|| RulesError::NotFound {
        protocol: protocol.to_string(),
        dir: dir.to_path_buf(),
    })?;

    let text = std::fs::read_to_string(&path).map_err(|source| RulesError::Io {
        path: path.clone(),
        source,
    })?;

    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let parsed = if is_json { parse_json(&text) } else { parse_yaml(&text) };

    let table = parsed.map_err(|message| RulesError::Parse {
        path: path.clone(),
        message,
    })?;

    tracing::info!(
        path = %path.display(),
        protocol = protocol,
        rules = table.len(),
        "Rules loaded"
    );

    Ok(table)
}

fn rule_file(dir: &Path, protocol: &str) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", protocol, ext)))
        .find(|path| path.is_file())
}

/// Parses a rule table written as a JSON object.
pub fn parse_json(text: &str) -> Result<RuleTable, String> {
    serde_json::from_str(text).map_err(|e| e.to_string())
}

/// Parses a rule table written as a YAML mapping.
pub fn parse_yaml(text: &str) -> Result<RuleTable, String> {
    serde_yaml::from_str(text).map_err(|e| e.to_string())
}
