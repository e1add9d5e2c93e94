//! Task results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome of running a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The task did its work
    Success,
    /// There was no applicable work
    Skipped,
    /// A well-understood problem; siblings may still run
    Failed,
}

impl TaskStatus {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Skipped => "SKIPPED",
            TaskStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The sealed result of a task run.
///
/// Results are assembled with [`TaskResultBuilder`] and cannot be changed
/// once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    status: TaskStatus,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, serde_json::Value>,
}

impl TaskResult {
    /// A bare SUCCESS result.
    pub fn success() -> Self {
        Self::builder(TaskStatus::Success).build()
    }

    /// A bare SKIPPED result.
    pub fn skipped() -> Self {
        Self::builder(TaskStatus::Skipped).build()
    }

    /// A SKIPPED result carrying the reason.
    pub fn skipped_because(reason: impl Into<String>) -> Self {
        Self::builder(TaskStatus::Skipped)
            .attribute("reason", reason.into())
            .build()
    }

    /// A FAILED result carrying the explanation.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::builder(TaskStatus::Failed)
            .attribute("error", error.into())
            .build()
    }

    /// The aggregate result of a composite: SUCCESS iff any child succeeded.
    pub fn from_subtasks(any_subtask_succeeded: bool) -> Self {
        if any_subtask_succeeded {
            Self::success()
        } else {
            Self::skipped()
        }
    }

    /// Start building a result.
    pub fn builder(status: TaskStatus) -> TaskResultBuilder {
        TaskResultBuilder {
            status,
            attributes: BTreeMap::new(),
        }
    }

    /// Get the status.
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Whether the status is SUCCESS.
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Whether the status is SKIPPED.
    pub fn is_skipped(&self) -> bool {
        self.status == TaskStatus::Skipped
    }

    /// Whether the status is FAILED.
    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }

    /// Get an attribute.
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Get all attributes.
    pub fn attributes(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.attributes
    }
}

/// Incremental builder for [`TaskResult`].
#[derive(Debug, Clone)]
pub struct TaskResultBuilder {
    status: TaskStatus,
    attributes: BTreeMap<String, serde_json::Value>,
}

impl TaskResultBuilder {
    /// Set the status.
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Seal the result.
    pub fn build(self) -> TaskResult {
        TaskResult {
            status: self.status,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_subtasks() {
        assert_eq!(TaskResult::from_subtasks(true).status(), TaskStatus::Success);
        assert_eq!(TaskResult::from_subtasks(false).status(), TaskStatus::Skipped);
    }

    #[test]
    fn test_builder_collects_attributes() {
        let result = TaskResult::builder(TaskStatus::Failed)
            .attribute("error", "no such profile")
            .attribute("attempts", 2)
            .build();

        assert!(result.is_failed());
        assert_eq!(result.attribute("error"), Some(&serde_json::json!("no such profile")));
        assert_eq!(result.attribute("attempts"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_serialized_status_is_upper_case() {
        let json = serde_json::to_value(TaskResult::skipped_because("nothing to do")).unwrap();
        assert_eq!(json["status"], "SKIPPED");
        assert_eq!(json["attributes"]["reason"], "nothing to do");
    }

    #[test]
    fn test_bare_result_serializes_without_attributes() {
        let json = serde_json::to_value(TaskResult::success()).unwrap();
        assert!(json.get("attributes").is_none());
    }
}
