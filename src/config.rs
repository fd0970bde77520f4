//! Startup configuration: parsing and validation of `gateway.yaml`.
//!
//! Mirrors the teacher's `fs::read_to_string` + `serde_yaml::from_str`
//! loading idiom, but validates eagerly against the richer schema this
//! gateway needs (target groups, weights, health checks, rules) instead
//! of accepting whatever serde happens to produce.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;

use crate::{constants::health as health_defaults, errors::ConfigError};

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub listener_port: u16,
    pub connection_timeout_ms: u64,
    #[serde(default)]
    pub proxy_headers_enabled: bool,
    #[serde(default)]
    pub session_ttl_ms: Option<u64>,
    pub groups: Vec<TargetGroupSpec>,
    pub rules: Vec<ListenerRuleSpec>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    RoundRobin,
    Weighted,
    Sticky,
    Lrt,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSpec {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub base_uri: Option<String>,
}

impl EndpointSpec {
    /// The key used to look a target up in a group's weight map: `host:port`.
    pub fn weight_key(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HealthCheckSpec {
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_succeed_threshold")]
    pub succeed_threshold: u32,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_health_path() -> String {
    health_defaults::DEFAULT_PATH.to_string()
}
fn default_interval_ms() -> u64 {
    health_defaults::DEFAULT_INTERVAL_MS
}
fn default_succeed_threshold() -> u32 {
    health_defaults::DEFAULT_SUCCEED_THRESHOLD
}
fn default_failure_threshold() -> u32 {
    health_defaults::DEFAULT_FAILURE_THRESHOLD
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetGroupSpec {
    pub name: String,
    pub policy: PolicyKind,
    pub targets: Vec<EndpointSpec>,
    #[serde(default)]
    pub weights: Option<HashMap<String, u32>>,
    #[serde(default)]
    pub health_check: Option<HealthCheckSpec>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenerRuleSpec {
    pub path: String,
    #[serde(default)]
    pub rewrite: String,
    pub group: String,
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path_str = path.as_ref().display().to_string();
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
            path: path_str.clone(),
            source,
        })?;
        let config: GatewayConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path_str,
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-references and policy preconditions that serde alone can't enforce.
    /// Fatal at startup; a hot reload that fails validation keeps the previous rule table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let group_names: std::collections::HashSet<&str> =
            self.groups.iter().map(|g| g.name.as_str()).collect();

        for group in &self.groups {
            if group.targets.is_empty() {
                return Err(ConfigError::MalformedEndpoint {
                    group: group.name.clone(),
                    host: String::new(),
                    port: 0,
                    reason: "group has no targets".to_string(),
                });
            }

            for endpoint in &group.targets {
                if endpoint.host.trim().is_empty() {
                    return Err(ConfigError::MalformedEndpoint {
                        group: group.name.clone(),
                        host: endpoint.host.clone(),
                        port: endpoint.port,
                        reason: "host is empty".to_string(),
                    });
                }
                if let Some(base_uri) = &endpoint.base_uri {
                    if !base_uri.is_empty() && !base_uri.starts_with('/') {
                        return Err(ConfigError::MalformedEndpoint {
                            group: group.name.clone(),
                            host: endpoint.host.clone(),
                            port: endpoint.port,
                            reason: "base_uri must start with '/'".to_string(),
                        });
                    }
                }
            }

            match group.policy {
                PolicyKind::Weighted => match &group.weights {
                    None => return Err(ConfigError::MissingWeights(group.name.clone())),
                    Some(weights) => {
                        for endpoint in &group.targets {
                            if !weights.contains_key(&endpoint.weight_key()) {
                                return Err(ConfigError::IncompleteWeights {
                                    group: group.name.clone(),
                                    target: endpoint.weight_key(),
                                });
                            }
                        }
                    }
                },
                PolicyKind::Sticky => {
                    if self.session_ttl_ms.is_none() {
                        return Err(ConfigError::MissingSessionTtl(group.name.clone()));
                    }
                }
                PolicyKind::RoundRobin | PolicyKind::Lrt => {}
            }
        }

        for rule in &self.rules {
            if !rule.path.starts_with('/') {
                return Err(ConfigError::InvalidRewrite {
                    path: rule.path.clone(),
                    rewrite: rule.rewrite.clone(),
                });
            }
            if !rule.rewrite.is_empty() && !rule.path.starts_with(&rule.rewrite) {
                return Err(ConfigError::InvalidRewrite {
                    path: rule.path.clone(),
                    rewrite: rule.rewrite.clone(),
                });
            }
            if !group_names.contains(rule.group.as_str()) {
                return Err(ConfigError::UnknownGroup {
                    rule: rule.path.clone(),
                    group: rule.group.clone(),
                });
            }
        }

        Ok(())
    }
}
