//! Policy loading and path/content risk classification (spec.md §4.7).

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use qore_types::RiskGrade;

use crate::error::{PolicyError, Result};
use crate::risk::{classify_path, contains_secret_pattern};

const POLICY_FILES: &[&str] = &["risk_grading.json", "citation_policy.json", "trust_dynamics.json"];

/// Loaded policy definitions plus the derived `policyVersion` stamp.
///
/// `policyVersion = sha256(concat(policy file contents))`, captured once at
/// `initialize()` time and stamped on every `DecisionResponse` (invariant 5).
pub struct PolicyEngine {
    version: String,
    raw: Vec<(String, serde_json::Value)>,
}

impl PolicyEngine {
    /// Read the three policy JSON files from `dir`, or fall back to a
    /// minimal built-in classifier if `dir` is `None` or the files are
    /// absent. Missing files are tolerated; malformed ones are not.
    pub async fn load(dir: Option<&str>) -> Result<Self> {
        let mut raw = Vec::with_capacity(POLICY_FILES.len());
        let mut concatenated = String::new();

        if let Some(dir) = dir {
            for name in POLICY_FILES {
                let path = std::path::Path::new(dir).join(name);
                match tokio::fs::read_to_string(&path).await {
                    Ok(contents) => {
                        let value: serde_json::Value =
                            serde_json::from_str(&contents).map_err(|source| PolicyError::Malformed {
                                path: path.display().to_string(),
                                source,
                            })?;
                        concatenated.push_str(&contents);
                        raw.push(((*name).to_string(), value));
                    }
                    Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                        warn!(file = %path.display(), "policy file absent, using built-in default for this file");
                    }
                    Err(source) => {
                        return Err(PolicyError::Io { path: path.display().to_string(), source })
                    }
                }
            }
        }

        let mut hasher = Sha256::new();
        hasher.update(concatenated.as_bytes());
        let version = hex::encode(hasher.finalize());

        info!(policy_version = %version, loaded_files = raw.len(), "policy engine initialized");
        Ok(Self { version, raw })
    }

    pub fn policy_version(&self) -> &str {
        &self.version
    }

    pub fn loaded_files(&self) -> &[(String, serde_json::Value)] {
        &self.raw
    }

    /// Classify a path/content pair into a [`RiskGrade`]. Content inspection
    /// can only ever upgrade (never downgrade) the lexical path grade.
    pub fn classify(&self, target_path: &str, content: Option<&str>) -> RiskGrade {
        let path_grade = classify_path(target_path).as_risk_grade();
        match content {
            Some(content) if contains_secret_pattern(content) => {
                std::cmp::max(path_grade, RiskGrade::L3)
            }
            _ => path_grade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_built_in_classifier_without_a_dir() {
        let engine = PolicyEngine::load(None).await.unwrap();
        assert_eq!(engine.classify("/w/docs/note.md", None), RiskGrade::L1);
        assert_eq!(engine.classify("/w/src/api/handler.ts", None), RiskGrade::L2);
        assert_eq!(engine.classify("/w/src/auth/login.ts", None), RiskGrade::L3);
    }

    #[tokio::test]
    async fn secret_content_upgrades_grade() {
        let engine = PolicyEngine::load(None).await.unwrap();
        assert_eq!(
            engine.classify("/w/docs/note.md", Some("aws_secret_access_key=AKIA1234")),
            RiskGrade::L3
        );
    }

    #[tokio::test]
    async fn policy_version_is_stable_hash_of_concatenated_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in POLICY_FILES {
            tokio::fs::write(dir.path().join(name), b"{}").await.unwrap();
        }
        let a = PolicyEngine::load(Some(dir.path().to_str().unwrap())).await.unwrap();
        let b = PolicyEngine::load(Some(dir.path().to_str().unwrap())).await.unwrap();
        assert_eq!(a.policy_version(), b.policy_version());
        assert_eq!(a.loaded_files().len(), 3);
    }

    #[tokio::test]
    async fn malformed_policy_file_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("risk_grading.json"), b"not json").await.unwrap();
        let err = PolicyEngine::load(Some(dir.path().to_str().unwrap())).await.unwrap_err();
        assert!(matches!(err, PolicyError::Malformed { .. }));
    }
}
