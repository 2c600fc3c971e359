//! # Run Records
//!
//! Every invocation of a step's hook appends a [`Run`]: the observed
//! status, the hook's output on success, diagnostic info on failure and the
//! wall-clock window of the attempt. History is append-only; re-running a
//! test never rewrites past runs, it adds new ones. Skipping a step also
//! appends a run, one that carries the prior outcome forward and is marked
//! as skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// STATUS
// ============================================================================

/// Outcome of a run, ordered by severity. The aggregate status of many
/// runs (or steps, or tests) is the maximum of its parts.
#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Never run.
    #[default]
    Unknown,
    /// Ran and passed every assertion.
    Success,
    /// Failed, but the step tolerates failure.
    Ignored,
    /// Failed and eligible for another attempt.
    Pending,
    /// Failed with retries ruled out.
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unknown => "unknown",
            Status::Success => "success",
            Status::Ignored => "ignored",
            Status::Pending => "pending",
            Status::Failed => "failed",
        }
    }

    /// True when another run could still change the outcome for the better.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Status::Pending | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RUN
// ============================================================================

/// A single recorded invocation (or skip) of a step's hook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Run {
    pub status: Status,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Hook output, recorded only for successful non-null results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Diagnostic text, recorded only for failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Whether this run replayed a prior outcome instead of invoking the hook.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
}

impl Run {
    /// Records a successful invocation. Null outputs are not stored.
    pub fn success(output: Value, start: DateTime<Utc>) -> Self {
        let output = match output {
            Value::Null => None,
            value => Some(value),
        };
        Self {
            status: Status::Success,
            start,
            end: Utc::now(),
            output,
            info: None,
            skipped: false,
        }
    }

    /// Records a failed invocation with its diagnostic info.
    pub fn failure(info: String, start: DateTime<Utc>) -> Self {
        Self {
            status: Status::Failed,
            start,
            end: Utc::now(),
            output: None,
            info: Some(info),
            skipped: false,
        }
    }

    /// Records skipping over a step, carrying the prior outcome forward
    /// under fresh timestamps.
    pub fn skip(prior: &Run) -> Self {
        let now = Utc::now();
        Self {
            status: prior.status,
            start: now,
            end: now,
            output: prior.output.clone(),
            info: prior.info.clone(),
            skipped: true,
        }
    }

    /// Wall-clock duration of the attempt.
    pub fn elapsed(&self) -> chrono::Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn severity_orders_statuses() {
        assert!(Status::Unknown < Status::Success);
        assert!(Status::Success < Status::Ignored);
        assert!(Status::Ignored < Status::Pending);
        assert!(Status::Pending < Status::Failed);

        let worst = [Status::Success, Status::Failed, Status::Pending]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, Status::Failed);
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_yaml::to_string(&Status::Ignored).unwrap().trim(),
            "ignored"
        );
        let parsed: Status = serde_yaml::from_str("failed").unwrap();
        assert_eq!(parsed, Status::Failed);
    }

    #[test]
    fn skip_carries_outcome_under_fresh_timestamps() {
        let prior = Run::success(json!({"code": 0}), Utc::now());
        let skip = Run::skip(&prior);
        assert_eq!(skip.status, Status::Success);
        assert_eq!(skip.output, prior.output);
        assert!(skip.skipped);
        assert_eq!(skip.start, skip.end);
        assert!(skip.start >= prior.end);
    }

    #[test]
    fn quiet_fields_are_omitted() {
        let failed = Run::failure("hook failed".to_string(), Utc::now());
        let yaml = serde_yaml::to_string(&failed).unwrap();
        assert!(yaml.contains("status: failed"));
        assert!(yaml.contains("info:"));
        assert!(!yaml.contains("output"));
        assert!(!yaml.contains("skipped"));

        let quiet = Run::success(Value::Null, Utc::now());
        assert_eq!(quiet.output, None);
    }
}
