use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{forwarder::Forwarder, rule_matcher::RuleMatcher, target_group::TargetGroup};

/// Shared application state. Target groups (and the supervisors/targets
/// they own) are built once at startup and never rebuilt — only the rule
/// table is swappable, by the hot-reload watcher (SPEC_FULL.md §1, §9).
pub struct AppState {
    pub groups: HashMap<String, Arc<TargetGroup>>,
    pub rules: RwLock<RuleMatcher>,
    pub forwarder: Forwarder,
    pub listener_port: u16,
}

impl AppState {
    pub fn group(&self, name: &str) -> Option<Arc<TargetGroup>> {
        self.groups.get(name).cloned()
    }

    pub fn shutdown(&self) {
        for group in self.groups.values() {
            group.shutdown();
        }
    }
}
