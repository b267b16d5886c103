//! Runner configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::workflow::LoadError;

/// What a loop does when an action inside one of its iterations fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopFailurePolicy {
    /// Abort the whole loop on the first failing iteration (the default)
    #[default]
    Abort,

    /// Record the failure and move on to the next iteration
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Cap on `while` loop passes; exceeding it fails the loop since a
    /// re-evaluated condition has no intrinsic termination guarantee
    #[serde(default = "default_max_while_iterations")]
    pub max_while_iterations: u64,

    /// Cap on nested template expansion, guarding self-referential templates
    /// that the factory cannot detect at build time
    #[serde(default = "default_max_template_depth")]
    pub max_template_depth: u32,

    #[serde(default)]
    pub loop_failure_policy: LoopFailurePolicy,
}

fn default_max_while_iterations() -> u64 {
    10_000
}

fn default_max_template_depth() -> u32 {
    16
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_while_iterations: default_max_while_iterations(),
            max_template_depth: default_max_template_depth(),
            loop_failure_policy: LoopFailurePolicy::default(),
        }
    }
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| LoadError::Parse {
            file: path.display().to_string(),
            error: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RunnerConfig::default();
        assert_eq!(config.max_while_iterations, 10_000);
        assert_eq!(config.max_template_depth, 16);
        assert_eq!(config.loop_failure_policy, LoopFailurePolicy::Abort);
    }

    #[test]
    fn test_parse_partial_config() {
        let yaml = "loop_failure_policy: continue";
        let config: RunnerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.loop_failure_policy, LoopFailurePolicy::Continue);
        assert_eq!(config.max_while_iterations, 10_000);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
max_while_iterations: 50
max_template_depth: 4
loop_failure_policy: abort
"#;
        let config: RunnerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_while_iterations, 50);
        assert_eq!(config.max_template_depth, 4);
        assert_eq!(config.loop_failure_policy, LoopFailurePolicy::Abort);
    }
}
