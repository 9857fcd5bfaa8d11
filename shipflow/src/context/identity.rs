//! Run identity for correlating logs and events of one invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunIdentity {
    /// The unique ID for this run.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
}

impl RunIdentity {
    /// Creates a new run identity with a generated run ID.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Creates a run identity with a specific run ID.
    #[must_use]
    pub fn with_run_id(run_id: Uuid) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
        }
    }

    /// Returns the milliseconds elapsed since the run started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }
}

impl Default for RunIdentity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_identity_has_unique_ids() {
        let a = RunIdentity::new();
        let b = RunIdentity::new();
        assert_ne!(a.run_id, b.run_id);
    }

    #[test]
    fn test_with_run_id() {
        let id = Uuid::new_v4();
        let identity = RunIdentity::with_run_id(id);
        assert_eq!(identity.run_id, id);
        assert!(identity.elapsed_ms() >= 0);
    }

    #[test]
    fn test_serialization() {
        let identity = RunIdentity::new();
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["run_id"], serde_json::json!(identity.run_id.to_string()));
    }
}
