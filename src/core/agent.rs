//! # Agent: the generation loop.
//!
//! ```text
//! run():
//!   installer.ensure_installed(runtime)
//!   "Updating source code for subnets..."
//!   refresh_all(Startup)                         (fatal on failure)
//!   "Subnet source code up to date"
//!   loop {                                       (iterative, one generation at a time)
//!     token = runtime_token.child_token()
//!     generation = supervisor.spawn_generation(id, token)
//!     select! {
//!       generation.next_exit()  ─► supervisor.conclude(report)
//!       scheduler.run(token)    ─► SourceUpdated / Shutdown
//!     }
//!     generation.shutdown()                      (cancel + reap every child)
//!     if runtime_token cancelled ─► return Ok(())
//!   }
//! ```
//!
//! Subnet failures never stop the loop. Only the first source refresh and the
//! first spawn step can fail the agent.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::installer::RuntimeInstaller;
use super::scheduler::{RefreshOutcome, RefreshScheduler};
use super::shutdown;
use super::supervisor::{GenerationEnd, GenerationOutcome, ProcessSupervisor};
use crate::activity::ActivityHub;
use crate::error::{FetchError, RuntimeError};
use crate::events::{AgentEvent, Bus};
use crate::metrics::MetricsAggregator;
use crate::source::{RefreshScope, RetryingFetcher};

/// Name of the workload runtime the subnets run on.
pub const RUNTIME_NAME: &str = "zinnia";
/// Runtime release the agent installs.
pub const RUNTIME_VERSION: &str = "v0.22.2";

/// Runs subnet generations until the runtime token is cancelled.
pub struct Agent {
    pub(crate) cfg: Arc<Config>,
    pub(crate) bus: Bus,
    pub(crate) activity: Arc<ActivityHub>,
    pub(crate) metrics: Arc<MetricsAggregator>,
    pub(crate) fetcher: Arc<RetryingFetcher>,
    pub(crate) installer: Arc<dyn RuntimeInstaller>,
    pub(crate) runtime_token: CancellationToken,
}

impl Agent {
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn activity(&self) -> &Arc<ActivityHub> {
        &self.activity
    }

    pub fn metrics(&self) -> &Arc<MetricsAggregator> {
        &self.metrics
    }

    /// Receiver of the multiplexed [`AgentEvent`] stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.bus.subscribe()
    }

    /// Token whose cancellation stops the agent after draining the live generation.
    pub fn runtime_token(&self) -> &CancellationToken {
        &self.runtime_token
    }

    /// Requests shutdown.
    pub fn shutdown(&self) {
        self.runtime_token.cancel();
    }

    /// Runs until SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then drains and returns.
    pub async fn run_until_signal(&self) -> Result<(), RuntimeError> {
        let token = self.runtime_token.clone();
        let watcher = tokio::spawn(async move {
            match shutdown::wait_for_shutdown_signal().await {
                Ok(()) => {
                    tracing::info!("shutdown signal received");
                    token.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "cannot listen for shutdown signals"),
            }
        });
        let res = self.run().await;
        watcher.abort();
        res
    }

    /// Prepares the runtime and sources, then drives generations until the
    /// runtime token is cancelled.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let Some(supervisor) = self.prepare().await? else {
            return Ok(());
        };

        let mut id: u64 = 0;
        while !self.runtime_token.is_cancelled() {
            id += 1;
            match self.run_generation(&supervisor, id).await {
                Ok(outcome) => self.record(&outcome),
                Err(e) if id == 1 => return Err(e),
                Err(e) => {
                    tracing::error!(generation = id, error = %e, label = e.as_label(), "generation failed");
                    let delay = self.cfg.retry.backoff.delay(0);
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.runtime_token.cancelled() => {}
                    }
                }
            }
        }
        tracing::info!(generations = id, "agent stopped");
        Ok(())
    }

    /// Installs the runtime and performs the mandatory first source refresh.
    ///
    /// Returns `None` when the agent was shut down meanwhile.
    pub async fn prepare(&self) -> Result<Option<ProcessSupervisor>, RuntimeError> {
        let runtime = self
            .installer
            .ensure_installed(RUNTIME_NAME, RUNTIME_VERSION)
            .await?;

        self.activity
            .station_info("Updating source code for subnets...");
        match self
            .fetcher
            .refresh_all(RefreshScope::Startup, Some(&self.runtime_token))
            .await
        {
            Ok(_) => self.activity.station_info("Subnet source code up to date"),
            Err(FetchError::Canceled) => return Ok(None),
            Err(e) => {
                self.activity
                    .station_error("Failed to download latest Subnet source code");
                return Err(e.into());
            }
        }

        Ok(Some(ProcessSupervisor::new(
            runtime,
            self.cfg.clone(),
            self.fetcher.sync().clone(),
            self.activity.clone(),
            self.metrics.clone(),
        )))
    }

    /// Runs one generation to completion; every child is reaped on return.
    pub async fn run_generation(
        &self,
        supervisor: &ProcessSupervisor,
        id: u64,
    ) -> Result<GenerationOutcome, RuntimeError> {
        let token = self.runtime_token.child_token();
        let mut generation = supervisor.spawn_generation(id, token.clone()).await?;
        let scheduler = RefreshScheduler::new(
            self.fetcher.clone(),
            self.activity.clone(),
            self.cfg.refresh_interval,
            self.cfg.refresh_jitter_policy(),
            self.cfg.experimental,
        );

        let end = tokio::select! {
            report = generation.next_exit() => match report {
                Some(report) => supervisor.conclude(id, report),
                None => GenerationEnd::Shutdown,
            },
            refresh = scheduler.run(&token) => match refresh {
                RefreshOutcome::Restart => GenerationEnd::SourceUpdated,
                RefreshOutcome::Canceled => GenerationEnd::Shutdown,
            },
        };

        let spawned = generation.shutdown().await;
        Ok(GenerationOutcome { id, spawned, end })
    }

    fn record(&self, outcome: &GenerationOutcome) {
        let id = outcome.id;
        match &outcome.end {
            GenerationEnd::Failed(e) => {
                tracing::error!(generation = id, label = e.as_label(), "{}", e.as_message())
            }
            GenerationEnd::Stopped { subnet, signal } => {
                tracing::info!(generation = id, subnet = %subnet, %signal, "generation ended: subnet stopped")
            }
            GenerationEnd::Exited { subnet } => {
                tracing::info!(generation = id, subnet = %subnet, "generation ended: subnet exited")
            }
            GenerationEnd::SourceUpdated => {
                tracing::info!(generation = id, "generation ended: source updated")
            }
            GenerationEnd::Shutdown => tracing::info!(generation = id, "generation ended: shutdown"),
        }
    }
}
