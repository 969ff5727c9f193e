//! # Activity notices and the multiplexed agent stream.
//!
//! [`ActivityEvent`] is what subnets and the supervisor publish through the
//! [`ActivityHub`](crate::ActivityHub). [`AgentEvent`] is the single typed
//! stream handed to presentation layers; it serializes as `{"type": ..., ...}`.
//!
//! ## Example
//! ```rust
//! use subnetvisor::{ActivityEvent, AgentEvent};
//!
//! let ev = ActivityEvent::error("spark", "Spark crashed with exit code 1");
//! let line = AgentEvent::from(&ev).to_json_line();
//! assert!(line.starts_with(r#"{"type":"activity:error""#));
//! ```

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;

/// Activity `source` used for notices emitted by the agent itself.
pub const STATION_SOURCE: &str = "Station";

/// Severity of an activity notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Informational.
    Info,
    /// Something went wrong.
    Error,
}

impl ActivityKind {
    /// Lower-case label (`info` / `error`).
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Info => "info",
            ActivityKind::Error => "error",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable activity notice, timestamped at creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivityEvent {
    /// Severity.
    pub kind: ActivityKind,
    /// Subnet name or [`STATION_SOURCE`].
    pub source: Arc<str>,
    /// Human-readable message.
    pub message: String,
    /// Wall-clock emission time.
    pub at: DateTime<Utc>,
}

impl ActivityEvent {
    /// Creates a notice stamped with the current time.
    pub fn new(kind: ActivityKind, source: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    /// Informational notice.
    #[inline]
    pub fn info(source: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Info, source, message)
    }

    /// Error notice.
    #[inline]
    pub fn error(source: impl Into<Arc<str>>, message: impl Into<String>) -> Self {
        Self::new(ActivityKind::Error, source, message)
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.kind == ActivityKind::Error
    }
}

/// One entry of the stream consumed by `logs`/`activity`/`metrics`/`events` views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    #[serde(rename = "activity:info")]
    ActivityInfo {
        source: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "activity:error")]
    ActivityError {
        source: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    /// Merged number of jobs completed across all subnets.
    #[serde(rename = "jobs-completed")]
    JobsCompleted { total: u64 },
    /// Full merged metrics snapshot.
    #[serde(rename = "metrics", rename_all = "camelCase")]
    Metrics {
        total_jobs_completed: u64,
        #[serde(with = "u128_string")]
        rewards_scheduled_for_address: u128,
    },
}

impl AgentEvent {
    /// The `type` tag as it appears on the wire.
    pub fn type_name(&self) -> &'static str {
        match self {
            AgentEvent::ActivityInfo { .. } => "activity:info",
            AgentEvent::ActivityError { .. } => "activity:error",
            AgentEvent::JobsCompleted { .. } => "jobs-completed",
            AgentEvent::Metrics { .. } => "metrics",
        }
    }

    /// Renders the event as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> String {
        // Only plain strings, integers and timestamps are serialized here.
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"{}","error":"{}"}}"#, self.type_name(), e)
        })
    }
}

impl From<&ActivityEvent> for AgentEvent {
    fn from(ev: &ActivityEvent) -> Self {
        let source = ev.source.to_string();
        let message = ev.message.clone();
        match ev.kind {
            ActivityKind::Info => AgentEvent::ActivityInfo {
                source,
                message,
                timestamp: ev.at,
            },
            ActivityKind::Error => AgentEvent::ActivityError {
                source,
                message,
                timestamp: ev.at,
            },
        }
    }
}

impl From<&MetricsSnapshot> for AgentEvent {
    fn from(m: &MetricsSnapshot) -> Self {
        AgentEvent::Metrics {
            total_jobs_completed: m.total_jobs_completed,
            rewards_scheduled_for_address: m.rewards_scheduled_for_address,
        }
    }
}

/// Big integers travel as decimal strings so JSON readers keep full precision.
mod u128_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }
}
