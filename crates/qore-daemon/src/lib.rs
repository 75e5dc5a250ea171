//! Qore daemon library: the Axum HTTP surface, LLM proxy, signed-actor
//! verification, and durable replay store (spec.md §4.5).

pub mod actor_proof;
pub mod auth;
pub mod body;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model_policy;
pub mod prompt_classifier;
pub mod rate_limit;
pub mod replay_store;
pub mod router;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use server::Server;
pub use state::AppState;
