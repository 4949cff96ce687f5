use crate::rules::table::{Rule, RuleTable};

/// Picks the rule that answers `"<method> <target>"`.
///
/// Pattern rules are tried in table order and the first match wins, even
/// when a later rule would match more specifically. The wildcard rule only
/// answers when no pattern matched. `None` means nothing is configured for
/// this request.
pub fn match_rule<'a>(method: &str, target: &str, table: &'a RuleTable) -> Option<&'a Rule> {
    let match_key = format!("{} {}", method, target);

    table
        .patterns()
        .find(|rule| rule.pattern.matches(&match_key))
        .or_else(|| table.wildcard())
}
