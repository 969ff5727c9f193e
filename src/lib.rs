//! # subnetvisor
//!
//! **Subnetvisor** keeps a node agent's subnet workloads running: it installs
//! the latest source bundle of every subnet, runs each one as a child process
//! of the workload runtime, restarts the whole cohort when anything goes
//! wrong or a new source version appears, and turns the processes' output
//! into one typed stream of activity and metrics events.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   NameResolver (external)             RuntimeInstaller (external)
//!        │                                     │
//!        ▼                                     ▼
//! ┌──────────────┐  refresh   ┌────────────────────────────────────────────┐
//! │  SourceSync  │◄───────────┤ Agent (generation loop)                    │
//! │ (per-subnet  │            │  - RetryingFetcher (rate-limit aware)      │
//! │   versions)  │            │  - RefreshScheduler (10 min ± 10 s)        │
//! └──────────────┘            │  - ProcessSupervisor (one Generation live) │
//!                             └──────┬──────────────────┬──────────────────┘
//!                                    ▼                  ▼
//!                             ┌──────────────┐   ┌──────────────┐
//!                             │ ChildProcess │   │ ChildProcess │   (+ Watchdog each)
//!                             │   (spark)    │   │    (...)     │
//!                             └──────┬───────┘   └──────┬───────┘
//!                                    │ stdout lines     │
//!                                    ▼                  ▼
//!                             ┌───────────────────────────────────┐
//!                             │          EventPipeline            │
//!                             └──────┬─────────────────────┬──────┘
//!                                    ▼                     ▼
//!                             ActivityHub          MetricsAggregator
//!                                    │   (ordered SubscriberSet)   │
//!                                    ▼                             ▼
//!                      LogWriter · BusForwarder · sinks · custom subscribers
//!                                    │
//!                                    ▼
//!                         Bus (broadcast AgentEvent)
//! ```
//!
//! ### Generation lifecycle
//! ```text
//! first start: ensure runtime ─► refresh all sources (fatal on failure)
//!
//! loop {
//!   ├─► token = runtime_token.child_token()
//!   ├─► spawn one process per active subnet
//!   ├─► race:
//!   │     ├─ first child exit  ─► exited / crashed / stopped from outside
//!   │     ├─ watchdog fired    ─► "<Subnet> has been inactive ..."
//!   │     └─ source changed    ─► "Updated subnet source code, restarting..."
//!   ├─► cancel token, reap every child
//!   └─► stop if runtime_token is cancelled
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                           |
//! |-------------------|--------------------------------------------------------------|----------------------------------------------|
//! | **Agent**         | Startup sequence and the generation loop.                    | [`Agent`], [`AgentBuilder`]                  |
//! | **Sources**       | Versioned bundle installs with rate-limit aware retries.     | [`NameResolver`], [`SourceSync`], [`RetryingFetcher`] |
//! | **Events**        | Activity notices, subnet wire events, the agent stream.      | [`ActivityEvent`], [`SubnetEvent`], [`AgentEvent`] |
//! | **Metrics**       | Per-subnet snapshots, merged totals, job deltas.             | [`MetricsAggregator`], [`JobsReporter`]      |
//! | **Subscribers**   | Ordered, panic-isolated fan-out.                             | [`Subscribe`], [`SubscriberSet`]             |
//! | **Policies**      | Backoff, jitter, retry.                                      | [`RetryPolicy`], [`BackoffPolicy`], [`JitterPolicy`] |
//! | **Configuration** | Validated agent settings.                                    | [`Config`], [`Identity`]                     |
//!
//! ## Optional features
//! - `logging`: exports `telemetry::init_tracing`, a `tracing-subscriber` setup aware of
//!   the agent's log targets.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use subnetvisor::{AgentBuilder, Config, MemoryResolver, PreinstalledRuntime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.identity.wallet_address = "0x000000000000000000000000000000000000dEaD".into();
//!     cfg.apply_env(|key| std::env::var(key).ok())?;
//!
//!     let resolver = Arc::new(MemoryResolver::new());
//!     let runtime = Arc::new(PreinstalledRuntime::new("/usr/local/bin/zinniad"));
//!
//!     let agent = AgentBuilder::new(cfg, resolver, runtime).build()?;
//!     let mut events = agent.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(ev) = events.recv().await {
//!             println!("{}", ev.to_json_line());
//!         }
//!     });
//!
//!     agent.run_until_signal().await?;
//!     Ok(())
//! }
//! ```
mod activity;
mod core;
mod error;
mod events;
mod metrics;
mod policies;
mod source;
mod subnets;
mod subscribers;

// ---- Public re-exports ----

pub use activity::ActivityHub;
pub use core::{
    wait_for_shutdown_signal, Agent, AgentBuilder, Config, EventPipeline, Generation,
    GenerationEnd, GenerationOutcome, Identity, PreinstalledRuntime, ProcessSupervisor,
    RefreshOutcome, RefreshScheduler, RuntimeInstaller, Watchdog, RUNTIME_NAME, RUNTIME_VERSION,
};
pub use error::{ConfigError, FetchError, RuntimeError, SubnetError, RATE_LIMIT_MARKER};
pub use events::{
    parse_line, ActivityEvent, ActivityKind, AgentEvent, Bus, LineError, SubnetEvent,
    STATION_SOURCE,
};
pub use metrics::{JobsReporter, MetricsAggregator, MetricsSnapshot, PartialMetrics, TracingJobsReporter};
pub use policies::{BackoffPolicy, JitterPolicy, RateLimitBackoff, RetryDelay, RetryPolicy};
pub use source::{
    Manifest, ManifestFile, MemoryResolver, NameResolver, RefreshScope, ResolveOptions,
    RetryingFetcher, SourceSync,
};
pub use subnets::{builtin as builtin_subnets, SubnetDescriptor, SubnetFilter};
pub use subscribers::{
    format_activity, ActivitySinkWriter, BusForwarder, FileSink, FnSubscriber, LineSink,
    LogWriter, MetricsSinkWriter, Subscribe, SubscriberSet, ACTIVITY_TARGET, JOBS_TARGET,
    METRICS_TARGET,
};

// Optional: tracing-subscriber setup.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub mod telemetry;
