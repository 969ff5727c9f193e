//! # ProcessSupervisor: one OS process per active subnet, per generation.
//!
//! ## Generation lifecycle
//! ```text
//! spawning:
//!   for subnet in active subnets
//!     cwd = SourceSync::installed_dir(subnet)
//!     ChildProcess::spawn(...)   ──► JoinSet.spawn(child.run(generation token))
//!
//! running:
//!   Generation::next_exit()      first child to end wins
//!     └─► ProcessSupervisor::conclude(report)
//!           ├─ exit 0            ─► info  "<Subnet> exited"
//!           ├─ SIGTERM/KILL/INT  ─► info  "<Subnet> stopped via signal SIGX"
//!           ├─ other             ─► error "<Subnet> crashed with exit code N" (+ output tail)
//!           └─ inactive          ─► error "<Subnet> has been inactive for 5 minutes, restarting..."
//!
//! ending:
//!   Generation::shutdown()       cancel token, join every child (all reaped)
//! ```
//!
//! ## Rules
//! - Exactly one [`Generation`] is live at a time; the driver shuts one down
//!   before spawning the next.
//! - Only the first child to end decides the outcome; the rest are killed.
//! - A subnet that fails to spawn is reported and skipped; a generation with no
//!   children at all is an error.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::child::{classify, ChildCommand, ChildEnd, ChildProcess, ExitClass};
use super::config::Config;
use super::pipeline::EventPipeline;
use super::watchdog::Watchdog;
use crate::activity::ActivityHub;
use crate::error::{RuntimeError, SubnetError};
use crate::metrics::MetricsAggregator;
use crate::source::SourceSync;
use crate::subnets::{capitalize, SubnetDescriptor};

/// What a finished child reports back to its generation.
#[derive(Debug)]
pub(crate) struct ChildReport {
    subnet: String,
    end: ChildEnd,
    output: String,
}

/// How a generation ended.
#[derive(Debug)]
#[non_exhaustive]
pub enum GenerationEnd {
    /// A subnet exited with code 0.
    Exited {
        /// Subnet that exited.
        subnet: String,
    },
    /// A subnet was stopped from outside (SIGTERM, SIGKILL or SIGINT).
    Stopped {
        /// Subnet that was stopped.
        subnet: String,
        /// Signal name.
        signal: String,
    },
    /// A subnet crashed or went quiet.
    Failed(SubnetError),
    /// A newer subnet source was installed.
    SourceUpdated,
    /// The agent is shutting down.
    Shutdown,
}

/// Result of one generation, as seen by the generation loop.
#[derive(Debug)]
pub struct GenerationOutcome {
    /// Monotonic generation id (1-based).
    pub id: u64,
    /// Subnets that had a process in this generation.
    pub spawned: Vec<String>,
    /// Why the generation ended.
    pub end: GenerationEnd,
}

impl GenerationOutcome {
    /// The subnet failure that ended the generation, if any.
    pub fn failure(&self) -> Option<&SubnetError> {
        match &self.end {
            GenerationEnd::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// A live cohort of subnet processes sharing one cancellation token.
pub struct Generation {
    id: u64,
    token: CancellationToken,
    spawned: Vec<String>,
    children: JoinSet<ChildReport>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn spawned(&self) -> &[String] {
        &self.spawned
    }

    /// Waits for the first child to end.
    pub(crate) async fn next_exit(&mut self) -> Option<ChildReport> {
        loop {
            match self.children.join_next().await? {
                Ok(report) => return Some(report),
                Err(e) => tracing::error!(generation = self.id, error = %e, "child task failed"),
            }
        }
    }

    /// Cancels the generation and waits until every child has been reaped.
    pub async fn shutdown(mut self) -> Vec<String> {
        self.token.cancel();
        while let Some(joined) = self.children.join_next().await {
            match joined {
                Ok(report) => tracing::debug!(
                    generation = self.id,
                    subnet = %report.subnet,
                    end = ?report.end,
                    "subnet stopped"
                ),
                Err(e) => tracing::error!(generation = self.id, error = %e, "child task failed"),
            }
        }
        self.spawned
    }
}

/// Spawns generations and turns their first child exit into a [`GenerationEnd`].
pub struct ProcessSupervisor {
    runtime: PathBuf,
    cfg: Arc<Config>,
    sync: Arc<SourceSync>,
    activity: Arc<ActivityHub>,
    metrics: Arc<MetricsAggregator>,
}

impl ProcessSupervisor {
    pub fn new(
        runtime: PathBuf,
        cfg: Arc<Config>,
        sync: Arc<SourceSync>,
        activity: Arc<ActivityHub>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            runtime,
            cfg,
            sync,
            activity,
            metrics,
        }
    }

    /// Starts one process per active subnet under `token`.
    pub async fn spawn_generation(
        &self,
        id: u64,
        token: CancellationToken,
    ) -> Result<Generation, RuntimeError> {
        let subnets = self.cfg.active_subnets();
        if subnets.is_empty() {
            return Err(RuntimeError::NoSubnets);
        }

        let mut generation = Generation {
            id,
            token,
            spawned: Vec::with_capacity(subnets.len()),
            children: JoinSet::new(),
        };
        let mut last_error = None;

        for subnet in &subnets {
            match self.spawn_child(subnet).await {
                Ok(child) => {
                    generation.spawned.push(subnet.name.to_string());
                    let subnet = subnet.name.to_string();
                    let token = generation.token.clone();
                    generation.children.spawn(async move {
                        let (end, output) = child.run(token).await;
                        ChildReport {
                            subnet,
                            end,
                            output,
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(generation = id, subnet = %subnet.name, error = %e, "cannot start subnet");
                    self.activity.error(
                        &subnet.name,
                        format!("Failed to start {}", subnet.display_name()),
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if generation.spawned.is_empty() => Err(RuntimeError::NothingSpawned(e)),
            _ => {
                tracing::info!(generation = id, subnets = ?generation.spawned, "generation started");
                Ok(generation)
            }
        }
    }

    async fn spawn_child(&self, subnet: &SubnetDescriptor) -> Result<ChildProcess, SubnetError> {
        let cwd = self
            .sync
            .installed_dir(&subnet.name)
            .await
            .ok_or_else(|| SubnetError::Spawn {
                subnet: subnet.name.to_string(),
                error: "no source installed".to_string(),
            })?;

        ChildProcess::spawn(
            ChildCommand {
                runtime: &self.runtime,
                subnet,
                cwd,
                identity: &self.cfg.identity,
                state_root: &self.cfg.state_root,
                cache_root: &self.cfg.cache_root,
            },
            Watchdog::new(self.cfg.watchdog),
            self.cfg.output_tail_lines,
            EventPipeline::new(subnet, self.activity.clone(), self.metrics.clone()),
        )
    }

    /// Publishes the activity for the child that ended a generation and
    /// classifies the end.
    pub(crate) fn conclude(&self, generation: u64, report: ChildReport) -> GenerationEnd {
        let ChildReport {
            subnet,
            end,
            output,
        } = report;
        let display = capitalize(&subnet);

        match end {
            ChildEnd::Canceled => GenerationEnd::Shutdown,
            ChildEnd::Inactive => {
                let after = self.cfg.watchdog;
                self.activity.error(
                    &subnet,
                    format!(
                        "{display} has been inactive for {}, restarting...",
                        humanize(after)
                    ),
                );
                tracing::warn!(generation, subnet = %subnet, ?after, "subnet inactive");
                GenerationEnd::Failed(SubnetError::Inactive { subnet, after })
            }
            ChildEnd::Exited(status) => match classify(status) {
                ExitClass::Success => {
                    self.activity.info(&subnet, format!("{display} exited"));
                    GenerationEnd::Exited { subnet }
                }
                ExitClass::External { signal } => {
                    self.activity
                        .info(&subnet, format!("{display} stopped via signal {signal}"));
                    tracing::info!(generation, subnet = %subnet, %signal, "subnet terminated from outside");
                    GenerationEnd::Stopped { subnet, signal }
                }
                ExitClass::Crash { reason } => {
                    self.activity
                        .error(&subnet, format!("{display} crashed {reason}"));
                    tracing::error!(generation, subnet = %subnet, %reason, details = %output, "subnet crashed");
                    GenerationEnd::Failed(SubnetError::Crashed {
                        subnet,
                        reason,
                        details: output,
                    })
                }
            },
        }
    }
}

/// `5 minutes`, `1 minute`, `90 seconds`, `250 milliseconds`.
fn humanize(d: Duration) -> String {
    let secs = d.as_secs();
    if d.subsec_nanos() == 0 && secs >= 60 && secs % 60 == 0 {
        let mins = secs / 60;
        format!("{mins} minute{}", if mins == 1 { "" } else { "s" })
    } else if d.subsec_millis() == 0 && secs > 0 {
        format!("{secs} second{}", if secs == 1 { "" } else { "s" })
    } else {
        format!("{} milliseconds", d.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watchdog_durations_read_naturally() {
        assert_eq!(humanize(Duration::from_secs(300)), "5 minutes");
        assert_eq!(humanize(Duration::from_secs(60)), "1 minute");
        assert_eq!(humanize(Duration::from_secs(90)), "90 seconds");
        assert_eq!(humanize(Duration::from_millis(250)), "250 milliseconds");
    }
}
