use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{agent::Agent, config::Config, installer::RuntimeInstaller};
use crate::{
    activity::ActivityHub,
    error::RuntimeError,
    events::{ActivityEvent, Bus},
    metrics::{JobsReporter, MetricsAggregator, MetricsSnapshot, TracingJobsReporter},
    source::{NameResolver, RetryingFetcher, SourceSync},
    subscribers::{BusForwarder, LogWriter, Subscribe},
};

/// Builder for constructing an [`Agent`] with its hubs and subscribers wired.
pub struct AgentBuilder {
    cfg: Config,
    resolver: Arc<dyn NameResolver>,
    installer: Arc<dyn RuntimeInstaller>,
    reporter: Arc<dyn JobsReporter>,
    activity_subs: Vec<Arc<dyn Subscribe<ActivityEvent>>>,
    metrics_subs: Vec<Arc<dyn Subscribe<MetricsSnapshot>>>,
    log_writer: bool,
}

impl AgentBuilder {
    /// Creates a new builder with the given configuration and collaborators.
    pub fn new(
        cfg: Config,
        resolver: Arc<dyn NameResolver>,
        installer: Arc<dyn RuntimeInstaller>,
    ) -> Self {
        Self {
            cfg,
            resolver,
            installer,
            reporter: Arc::new(TracingJobsReporter),
            activity_subs: Vec::new(),
            metrics_subs: Vec::new(),
            log_writer: true,
        }
    }

    /// Replaces the side channel incremental job counts are reported to.
    pub fn with_jobs_reporter(mut self, reporter: Arc<dyn JobsReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Adds a subscriber for activity notices.
    pub fn with_activity_subscriber(mut self, sub: Arc<dyn Subscribe<ActivityEvent>>) -> Self {
        self.activity_subs.push(sub);
        self
    }

    /// Adds a subscriber for merged metrics updates.
    pub fn with_metrics_subscriber(mut self, sub: Arc<dyn Subscribe<MetricsSnapshot>>) -> Self {
        self.metrics_subs.push(sub);
        self
    }

    /// Disables the built-in [`LogWriter`] subscriber.
    pub fn without_log_writer(mut self) -> Self {
        self.log_writer = false;
        self
    }

    /// Validates the configuration and builds the agent.
    ///
    /// Subscriber order on both hubs: [`LogWriter`] (unless disabled),
    /// [`BusForwarder`], then the added subscribers in insertion order.
    pub fn build(self) -> Result<Arc<Agent>, RuntimeError> {
        self.cfg.validate()?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let activity = Arc::new(ActivityHub::new());
        let metrics = Arc::new(MetricsAggregator::new(self.reporter));

        if self.log_writer {
            let log = Arc::new(LogWriter::new());
            activity.subscribe(log.clone());
            metrics.subscribe(log);
        }
        let forwarder = Arc::new(BusForwarder::new(bus.clone()));
        activity.subscribe(forwarder.clone());
        metrics.subscribe(forwarder);
        for sub in self.activity_subs {
            activity.subscribe(sub);
        }
        for sub in self.metrics_subs {
            metrics.subscribe(sub);
        }

        let sync = Arc::new(SourceSync::new(self.resolver, self.cfg.sources_dir.clone()));
        let fetcher = Arc::new(RetryingFetcher::new(
            sync,
            self.cfg.retry,
            self.cfg.subnets.clone(),
            self.cfg.filter.clone(),
        ));

        Ok(Arc::new(Agent {
            cfg: Arc::new(self.cfg),
            bus,
            activity,
            metrics,
            fetcher,
            installer: self.installer,
            runtime_token: CancellationToken::new(),
        }))
    }
}
