//! Execution result types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Terminal state of one executed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Success,
    Failure,
    Skipped,
    Cancelled,
}

/// Outcome record for one executed (or skipped) action node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub name: String,
    pub action_type: String,
    pub status: ActionStatus,
    pub message: String,

    /// Stable error category for failures (e.g. "element_not_found")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ActionResult {
    pub fn success(name: String, action_type: &str, message: String) -> Self {
        Self {
            name,
            action_type: action_type.to_string(),
            status: ActionStatus::Success,
            message,
            error_kind: None,
        }
    }

    pub fn failure(
        name: String,
        action_type: &str,
        message: String,
        error_kind: &str,
    ) -> Self {
        Self {
            name,
            action_type: action_type.to_string(),
            status: ActionStatus::Failure,
            message,
            error_kind: Some(error_kind.to_string()),
        }
    }

    pub fn skipped(name: String, action_type: &str, message: String) -> Self {
        Self {
            name,
            action_type: action_type.to_string(),
            status: ActionStatus::Skipped,
            message,
            error_kind: None,
        }
    }

    pub fn cancelled(name: String, action_type: &str, message: String) -> Self {
        Self {
            name,
            action_type: action_type.to_string(),
            status: ActionStatus::Cancelled,
            message,
            error_kind: None,
        }
    }
}

/// Counts over the complete ordered result list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
}

impl ExecutionSummary {
    pub fn from_results(results: &[ActionResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.status {
                ActionStatus::Success => summary.success_count += 1,
                ActionStatus::Failure => summary.failure_count += 1,
                ActionStatus::Skipped => summary.skipped_count += 1,
                ActionStatus::Cancelled => {}
            }
        }
        summary
    }
}

/// Overall outcome of one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Success,
    Failed,
    Cancelled,
}

/// Full record of one run, suitable for logging or persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub workflow_name: String,
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub final_status: RunStatus,
    pub action_results: Vec<ActionResult>,
    pub summary: ExecutionSummary,
}
