//! Application load balancer rule evaluation

use super::glob;
use crate::models::{Condition, Rule};

/// Sort key for non-default rules; unparsable priorities go last
fn priority_key(rule: &Rule) -> u32 {
    rule.priority.parse().unwrap_or(u32::MAX)
}

/// Order rules by ascending priority with default rules at the end
///
/// The sort is stable, so rules with equal keys keep API order.
pub fn sort_rules(rules: &mut [Rule]) {
    rules.sort_by_key(|r| (r.is_default, priority_key(r)));
}

/// A condition group matches when any of its values matches the request
pub fn condition_matches(condition: &Condition, host: &str, path: &str) -> bool {
    let input = match condition.field.as_str() {
        // Host comparison is case-sensitive; the host is used exactly as given
        "host-header" => host,
        "path-pattern" => path,
        _ => return false,
    };
    condition.values.iter().any(|v| glob::matches(input, v))
}

/// A rule matches when every condition group matches
pub fn rule_matches(rule: &Rule, host: &str, path: &str) -> bool {
    rule.conditions
        .iter()
        .all(|c| condition_matches(c, host, path))
}

/// First matching non-default rule
///
/// `rules` must already be in evaluation order (see [`sort_rules`]).
pub fn evaluate<'a>(rules: &'a [Rule], host: &str, path: &str) -> Option<&'a Rule> {
    rules
        .iter()
        .filter(|r| !r.is_default)
        .find(|r| rule_matches(r, host, path))
}

/// Hop label, e.g. `Priority 10: [host-header:api.example.com] `
pub fn rule_label(rule: &Rule) -> String {
    let conditions: String = rule
        .conditions
        .iter()
        .map(|c| format!("[{}:{}] ", c.field, c.values.join(",")))
        .collect();
    format!("Priority {}: {}", rule.priority, conditions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Action;

    /// Condition values are comma separated
    fn rule(priority: &str, conditions: &[(&str, &str)]) -> Rule {
        Rule {
            arn: format!("arn:rule/{}", priority),
            priority: priority.to_string(),
            is_default: priority == "default",
            conditions: conditions
                .iter()
                .map(|(field, values)| Condition {
                    field: field.to_string(),
                    values: values.split(',').map(str::to_string).collect(),
                })
                .collect(),
            actions: vec![Action::forward("arn:tg")],
        }
    }

    #[test]
    fn test_sort_puts_defaults_last() {
        let mut rules = vec![
            rule("default", &[]),
            rule("20", &[]),
            rule("abc", &[]),
            rule("3", &[]),
        ];
        sort_rules(&mut rules);
        let order: Vec<&str> = rules.iter().map(|r| r.priority.as_str()).collect();
        assert_eq!(order, vec!["3", "20", "abc", "default"]);
    }

    #[test]
    fn test_lowest_priority_match_wins() {
        let mut rules = vec![
            rule("20", &[("path-pattern", "/*")]),
            rule("10", &[("host-header", "api.example.com")]),
        ];
        sort_rules(&mut rules);
        let hit = evaluate(&rules, "api.example.com", "/users").unwrap();
        assert_eq!(hit.priority, "10");
    }

    #[test]
    fn test_all_conditions_must_match() {
        let r = rule(
            "1",
            &[
                ("host-header", "api.example.com"),
                ("path-pattern", "/v2/*"),
            ],
        );
        assert!(rule_matches(&r, "api.example.com", "/v2/items"));
        assert!(!rule_matches(&r, "api.example.com", "/v1/items"));
    }

    #[test]
    fn test_host_header_is_case_sensitive() {
        let r = rule("1", &[("host-header", "app.example.com")]);
        assert!(rule_matches(&r, "app.example.com", "/"));
        assert!(!rule_matches(&r, "APP.example.com", "/"));
    }

    #[test]
    fn test_unknown_field_never_matches() {
        let r = rule("1", &[("http-header", "*")]);
        assert!(!rule_matches(&r, "a", "/"));
    }

    #[test]
    fn test_default_rule_is_never_evaluated() {
        let rules = vec![rule("default", &[])];
        assert!(evaluate(&rules, "a", "/").is_none());
    }

    #[test]
    fn test_rule_label() {
        let r = rule("10", &[("host-header", "a.com,b.com")]);
        assert_eq!(rule_label(&r), "Priority 10: [host-header:a.com,b.com] ");
    }
}
