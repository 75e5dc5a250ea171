//! Policy engine, layered config, and the evaluation router (spec.md §4.1, §4.7).

pub mod config;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod risk;
pub mod router;

pub use config::QoreConfig;
pub use error::{PolicyError, Result};
pub use policy::PolicyEngine;
pub use risk::{classify_path, contains_secret_pattern, LexicalTier};
pub use router::{CortexEvent, EventCategory, Router, RoutingDecision, Tier, WriteLedgerByTier};
