use serde::{Deserialize, Serialize};

/// Metrics reported by one subnet, or merged across all of them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Jobs completed since the subnet process started (absolute counter).
    pub total_jobs_completed: u64,
    /// Rewards scheduled for the operator's address, in the smallest unit.
    pub rewards_scheduled_for_address: u128,
}

impl MetricsSnapshot {
    /// Fills the fields of `partial` that are present on top of `self`.
    pub fn overlay(self, partial: PartialMetrics) -> Self {
        Self {
            total_jobs_completed: partial
                .total_jobs_completed
                .unwrap_or(self.total_jobs_completed),
            rewards_scheduled_for_address: partial
                .rewards_scheduled_for_address
                .unwrap_or(self.rewards_scheduled_for_address),
        }
    }

    /// Field-wise sum (saturating).
    pub fn add(self, other: Self) -> Self {
        Self {
            total_jobs_completed: self
                .total_jobs_completed
                .saturating_add(other.total_jobs_completed),
            rewards_scheduled_for_address: self
                .rewards_scheduled_for_address
                .saturating_add(other.rewards_scheduled_for_address),
        }
    }
}

/// A submission; absent fields keep their previous value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PartialMetrics {
    pub total_jobs_completed: Option<u64>,
    pub rewards_scheduled_for_address: Option<u128>,
}

impl PartialMetrics {
    /// Submission carrying only the jobs counter.
    pub fn jobs(total: u64) -> Self {
        Self {
            total_jobs_completed: Some(total),
            ..Self::default()
        }
    }

    /// Submission carrying only the rewards figure.
    pub fn rewards(amount: u128) -> Self {
        Self {
            rewards_scheduled_for_address: Some(amount),
            ..Self::default()
        }
    }
}
