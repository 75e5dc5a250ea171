//! Shared application state for every handler (spec.md §4.5).

use std::sync::Arc;

use qore_policy::QoreConfig;
use qore_runtime::Runtime;

use crate::auth;
use crate::actor_proof::Keyring;
use crate::rate_limit::RateLimiter;
use crate::replay_store::ActorReplayStore;

/// Everything a handler needs: the governance runtime, resolved config, the
/// signed-actor keyring, rate limiter, proxy nonce store, and an HTTP client
/// for the upstream model call.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
    pub config: Arc<QoreConfig>,
    pub rate_limiter: Arc<RateLimiter>,
    pub actor_keyring: Arc<Keyring>,
    pub replay_store: Arc<dyn ActorReplayStore>,
    pub http_client: reqwest::Client,
    pub allowed_models: Arc<Vec<String>>,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        runtime: Arc<Runtime>,
        config: Arc<QoreConfig>,
        rate_limiter: Arc<RateLimiter>,
        actor_keyring: Arc<Keyring>,
        replay_store: Arc<dyn ActorReplayStore>,
        http_client: reqwest::Client,
    ) -> Self {
        let allowed_models = Arc::new(config.allowed_models());
        Self {
            runtime,
            config,
            rate_limiter,
            actor_keyring,
            replay_store,
            http_client,
            allowed_models,
            started_at: chrono::Utc::now(),
        }
    }

    /// `true` if the request's `X-Qore-Api-Key` matches the configured
    /// governance-surface key. If no key is configured, auth is disabled
    /// (local/dev posture) and every request passes.
    pub fn verify_api_key(&self, supplied: Option<&str>) -> bool {
        match &self.config.api_key {
            None => true,
            Some(configured) => supplied.map(|s| auth::verify_api_key(configured, s)).unwrap_or(false),
        }
    }

    /// Same check for the proxy-specific key, which may differ from the
    /// governance-surface key.
    pub fn verify_proxy_api_key(&self, supplied: Option<&str>) -> bool {
        match &self.config.proxy_api_key {
            None => self.verify_api_key(supplied),
            Some(configured) => supplied.map(|s| auth::verify_api_key(configured, s)).unwrap_or(false),
        }
    }
}
