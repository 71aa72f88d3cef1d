//! Consecutive token exchange failure tracking.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Failures before an exchange error is logged at `error` level.
pub const ESCALATION_THRESHOLD: u32 = 3;

/// Tracks token exchange failures per component app id.
///
/// Used to escalate log severity after consecutive failures.
#[derive(Default)]
pub struct ExchangeFailureTracker {
    failures: DashMap<String, FailureRecord>,
}

#[derive(Clone)]
struct FailureRecord {
    count: u32,
    first_failure: DateTime<Utc>,
    last_failure: DateTime<Utc>,
    last_error: String,
}

/// Snapshot of the failures recorded for one app id.
#[derive(Debug, Clone)]
pub struct FailureInfo {
    pub count: u32,
    pub first_failure: DateTime<Utc>,
    pub last_failure: DateTime<Utc>,
    pub last_error: String,
}

impl FailureInfo {
    /// Whether failures reached [`ESCALATION_THRESHOLD`].
    pub fn should_escalate(&self) -> bool {
        self.count >= ESCALATION_THRESHOLD
    }
}

impl ExchangeFailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return the updated count.
    pub fn record_failure(&self, app_id: &str, error: &str) -> u32 {
        let now = Utc::now();

        let mut entry = self
            .failures
            .entry(app_id.to_string())
            .or_insert(FailureRecord {
                count: 0,
                first_failure: now,
                last_failure: now,
                last_error: String::new(),
            });

        entry.count += 1;
        entry.last_failure = now;
        entry.last_error = error.to_string();

        entry.count
    }

    /// Clear failures on success.
    pub fn clear(&self, app_id: &str) {
        self.failures.remove(app_id);
    }

    pub fn failure_count(&self, app_id: &str) -> u32 {
        self.failures.get(app_id).map(|r| r.count).unwrap_or(0)
    }

    pub fn failure_info(&self, app_id: &str) -> Option<FailureInfo> {
        self.failures.get(app_id).map(|r| FailureInfo {
            count: r.count,
            first_failure: r.first_failure,
            last_failure: r.last_failure,
            last_error: r.last_error.clone(),
        })
    }
}
