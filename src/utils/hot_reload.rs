//! Watches `gateway.yaml` and hot-swaps the rule table on change.
//!
//! Adapted from the teacher's `watch_config_files`: the notify watcher
//! setup, debounce delay, and "never fatal, keep the old state on failure"
//! posture are kept. Scope is narrower than the teacher's — target groups,
//! health supervisors and DNS resolution are fixed at startup (SPEC_FULL.md
//! §9), so a reload only re-parses the file, validates it, and swaps
//! `AppState::rules`; it never rebuilds groups. `GatewayConfig::validate`
//! only checks the new file against its own `groups:` list, so a second
//! check here rejects any rule whose group isn't among the groups actually
//! built at startup — otherwise the listener's "rule table only ever
//! references validated, existing groups" invariant would no longer hold.

use std::{path::PathBuf, sync::Arc, time::Duration};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::{config::GatewayConfig, constants::hot_reload as reload_defaults, rule_matcher::RuleMatcher, state::AppState};

pub async fn watch_rules(config_path: PathBuf, state: Arc<AppState>) -> Result<(), anyhow::Error> {
    let (tx, mut rx) = mpsc::channel(reload_defaults::CHANNEL_BUFFER_SIZE);

    let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        if let Ok(event) = res {
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                let _ = tx.try_send(());
            }
        }
    })?;

    watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    tracing::info!(path = %config_path.display(), "watching for configuration changes");

    let debounce = Duration::from_millis(reload_defaults::DEBOUNCE_DELAY_MS);
    while rx.recv().await.is_some() {
        tokio::time::sleep(debounce).await;
        while rx.try_recv().is_ok() {} // coalesce a burst of events into one reload

        reload(&config_path, &state).await;
    }

    Ok(())
}

async fn reload(config_path: &PathBuf, state: &Arc<AppState>) {
    let new_config = match GatewayConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "configuration reload failed, keeping previous rule table");
            return;
        }
    };

    if let Some(rule) = new_config
        .rules
        .iter()
        .find(|rule| !state.groups.contains_key(&rule.group))
    {
        tracing::warn!(
            rule = %rule.path,
            group = %rule.group,
            "reload rejected: rule references a group not running since startup, keeping previous rule table"
        );
        return;
    }

    let new_rules = RuleMatcher::new(&new_config.rules);
    let mut rules = state.rules.write().await;
    *rules = new_rules;
    tracing::info!("rule table reloaded");
}
