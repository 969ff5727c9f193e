//! Agent core: generations of supervised subnet processes.
//!
//! The public entry points are [`AgentBuilder`] and [`Agent`].
//!
//! Internal modules:
//! - [`agent`]: the generation loop and startup sequence;
//! - [`supervisor`]: spawns a generation and classifies how it ended;
//! - [`child`]: one subnet process, its output pumps and exit classification;
//! - [`pipeline`]: subnet stdout events to activity and metrics;
//! - [`scheduler`]: jittered background source refresh;
//! - [`watchdog`]: per-process inactivity timer;
//! - [`installer`]: runtime executable collaborator;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod agent;
mod builder;
mod child;
mod config;
mod installer;
mod pipeline;
mod scheduler;
mod shutdown;
mod supervisor;
mod watchdog;

pub use agent::{Agent, RUNTIME_NAME, RUNTIME_VERSION};
pub use builder::AgentBuilder;
pub use config::{Config, Identity};
pub use installer::{PreinstalledRuntime, RuntimeInstaller};
pub use pipeline::EventPipeline;
pub use scheduler::{RefreshOutcome, RefreshScheduler};
pub use shutdown::wait_for_shutdown_signal;
pub use supervisor::{Generation, GenerationEnd, GenerationOutcome, ProcessSupervisor};
pub use watchdog::Watchdog;
