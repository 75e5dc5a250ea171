//! Evaluation pipeline, replay cache, L3 approval queue, trust engine, and
//! shadow genome (spec.md §4.3, §4.6).

pub mod error;
pub mod event_bus;
pub mod hooks;
pub mod l3;
pub mod pipeline;
pub mod replay;
pub mod shadow_genome;
pub mod trust;

pub use error::{Result, RuntimeError};
pub use event_bus::EventBus;
pub use hooks::{GovernanceHooks, NoopHooks};
pub use l3::{ApprovalQueue, L3Outcome, L3_SLA_SECONDS};
pub use pipeline::{HealthReport, Runtime, REPLAY_TTL};
pub use replay::{compute_replay_fingerprint, ReplayCache, ReplayOutcome};
pub use shadow_genome::{FailureMode, FailurePatternCount, SentinelVerdict, ShadowGenome, ShadowGenomeEntry};
pub use trust::TrustEngine;
