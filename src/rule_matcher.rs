//! Longest-prefix-first path routing.
//!
//! Replaces the teacher's `GatewayConfig::find_route_for_path`, which uses
//! `Iterator::max_by_key` over declaration order and therefore silently
//! prefers the *last* equal-length match on ties. This matcher precomputes
//! a stable-sorted table at construction time so the tie-break (first
//! declared wins) is structural rather than incidental — see REDESIGN
//! FLAGS in SPEC_FULL.md.

use std::sync::Arc;

use crate::config::ListenerRuleSpec;

#[derive(Debug, Clone)]
pub struct ListenerRule {
    pub path: String,
    pub rewrite: String,
    pub group: String,
}

/// A resolved match: the rule plus the already-stripped path remainder.
pub struct Resolved<'a> {
    pub rule: &'a ListenerRule,
    pub remainder: &'a str,
}

pub struct RuleMatcher {
    /// Sorted by (-prefix length, declaration index); first match wins.
    rules: Vec<Arc<ListenerRule>>,
}

impl RuleMatcher {
    pub fn new(specs: &[ListenerRuleSpec]) -> Self {
        let mut rules: Vec<Arc<ListenerRule>> = specs
            .iter()
            .map(|spec| {
                Arc::new(ListenerRule {
                    path: spec.path.clone(),
                    rewrite: spec.rewrite.clone(),
                    group: spec.group.clone(),
                })
            })
            .collect();
        // stable_sort_by preserves declaration order among equal-length prefixes.
        rules.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Self { rules }
    }

    /// Resolves an inbound request path to the matching rule and the
    /// portion of the path remaining after the rule's prefix is stripped.
    pub fn resolve<'a>(&'a self, path: &'a str) -> Option<Resolved<'a>> {
        for rule in &self.rules {
            if let Some(remainder) = matches_prefix(&rule.path, path) {
                return Some(Resolved { rule, remainder });
            }
        }
        None
    }
}

/// `prefix` matches `path` iff they're equal, or `prefix` is followed by
/// `/` or end-of-string in `path`. Returns the unmatched suffix of `path`.
fn matches_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if path == prefix {
        return Some("");
    }
    let stripped = path.strip_prefix(prefix)?;
    if prefix.ends_with('/') || stripped.starts_with('/') {
        Some(stripped)
    } else {
        None
    }
}

/// Applies a rule's rewrite, then prepends the target's base URI.
/// Query string and fragment are the caller's concern (preserved verbatim
/// by the forwarder, which never touches them here).
pub fn rewrite_path(rule: &ListenerRule, request_path: &str, base_uri: Option<&str>) -> String {
    let after_rewrite = if !rule.rewrite.is_empty() {
        request_path.strip_prefix(&rule.rewrite).unwrap_or(request_path)
    } else {
        request_path
    };

    let mut combined = String::new();
    if let Some(base) = base_uri {
        combined.push_str(base.trim_end_matches('/'));
    }

    if after_rewrite.is_empty() {
        if combined.is_empty() {
            combined.push('/');
        }
    } else {
        combined.push_str(after_rewrite);
    }

    combined
}
