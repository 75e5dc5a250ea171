//! Layered configuration: built-in defaults, an optional file, then
//! environment variables prefixed `QORE_` — mirroring `DaemonConfig::load`.
//!
//! The env var names in spec §4.7/§6 (`QORE_API_HOST`, `QORE_ZO_ALLOWED_MODELS`,
//! ...) don't follow a nested-struct dot convention, so [`QoreConfig`] is kept
//! flat and the `config` crate's `Environment::with_prefix("QORE")` maps each
//! one directly onto a lower-cased field of the same name.

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QoreConfig {
    pub api_host: String,
    pub api_port: u16,
    pub api_key: Option<String>,
    pub api_public_health: bool,
    pub proxy_api_key: Option<String>,
    pub actor_keys: String,
    pub zo_allowed_models: String,
    pub zo_upstream_url: String,
    pub replay_db_path: String,
    pub policy_dir: Option<String>,
    pub agent_os_enabled: bool,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for QoreConfig {
    fn default() -> Self {
        Self {
            api_host: "127.0.0.1".to_string(),
            api_port: 0,
            api_key: None,
            api_public_health: false,
            proxy_api_key: None,
            actor_keys: String::new(),
            zo_allowed_models: String::new(),
            zo_upstream_url: String::new(),
            replay_db_path: ".failsafe/ledger/replay-protection.db".to_string(),
            policy_dir: None,
            agent_os_enabled: false,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl QoreConfig {
    /// Load defaults, merge an optional file, then `QORE_`-prefixed env vars.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = builder.add_source(config::Config::try_from(&QoreConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("QORE")
                .separator("_")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Parse `QORE_ACTOR_KEYS` (`kid:secret,kid:secret,...`) into pairs.
    pub fn actor_key_pairs(&self) -> Vec<(String, String)> {
        self.actor_keys
            .split(',')
            .filter_map(|entry| {
                let entry = entry.trim();
                if entry.is_empty() {
                    return None;
                }
                entry.split_once(':').map(|(kid, secret)| (kid.to_string(), secret.to_string()))
            })
            .collect()
    }

    /// Parse `QORE_ZO_ALLOWED_MODELS` into a list; empty means allow any.
    pub fn allowed_models(&self) -> Vec<String> {
        self.zo_allowed_models
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = QoreConfig::default();
        assert_eq!(cfg.api_host, "127.0.0.1");
        assert_eq!(cfg.api_port, 0);
        assert!(!cfg.api_public_health);
        assert!(cfg.allowed_models().is_empty());
    }

    #[test]
    fn parses_actor_key_pairs() {
        let cfg = QoreConfig {
            actor_keys: "a:secret1, b:secret2".to_string(),
            ..Default::default()
        };
        assert_eq!(
            cfg.actor_key_pairs(),
            vec![("a".to_string(), "secret1".to_string()), ("b".to_string(), "secret2".to_string())]
        );
    }

    #[test]
    fn parses_allowed_models() {
        let cfg = QoreConfig {
            zo_allowed_models: "gpt-4, claude-3 ,".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.allowed_models(), vec!["gpt-4".to_string(), "claude-3".to_string()]);
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        let cfg = QoreConfig { api_host: "0.0.0.0".to_string(), api_port: 9000, ..Default::default() };
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
    }
}
