//! Error types used by the subnetvisor agent.
//!
//! This module defines four error enums:
//!
//! - [`FetchError`]: failures while resolving or downloading subnet sources.
//! - [`SubnetError`]: a subnet process ended a generation abnormally.
//! - [`ConfigError`]: configuration rejected before the agent starts.
//! - [`RuntimeError`]: failures that stop the agent itself.
//!
//! All of them provide `as_label` (stable snake_case label for logs) and
//! `as_message` helpers.

use std::time::Duration;
use thiserror::Error;

/// Text the name-resolution service puts into its rate-limiting responses.
pub const RATE_LIMIT_MARKER: &str = "You are being rate limited";

/// # Errors produced while refreshing subnet sources.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// Name resolution failed (network, service error, unknown name).
    #[error("cannot resolve {name}: {error}")]
    Resolve {
        /// Published name that was being resolved.
        name: String,
        /// The underlying error message.
        error: String,
    },

    /// A file listed in the manifest could not be downloaded.
    #[error("cannot download {path}: {error}")]
    Download {
        /// Manifest path of the file.
        path: String,
        /// The underlying error message.
        error: String,
    },

    /// Writing the downloaded files to disk failed.
    #[error("cannot install sources: {0}")]
    Io(#[from] std::io::Error),

    /// The manifest listed a path escaping the version directory.
    #[error("manifest path {path:?} is not a relative path inside the bundle")]
    InvalidPath {
        /// The offending manifest path.
        path: String,
    },

    /// Refresh requested for a subnet that is not in the catalog.
    #[error("unknown subnet {0}")]
    UnknownSubnet(String),

    /// Every retry attempt failed.
    #[error("failed to download {subnet} source after {attempts} attempts: {last}")]
    Exhausted {
        /// Subnet whose source could not be fetched.
        subnet: String,
        /// Number of attempts made.
        attempts: u32,
        /// The error of the final attempt.
        last: Box<FetchError>,
    },

    /// The refresh was interrupted by generation or agent shutdown.
    #[error("refresh cancelled")]
    Canceled,
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use subnetvisor::FetchError;
    ///
    /// let err = FetchError::UnknownSubnet("zeta".into());
    /// assert_eq!(err.as_label(), "fetch_unknown_subnet");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Resolve { .. } => "fetch_resolve",
            FetchError::Download { .. } => "fetch_download",
            FetchError::Io(_) => "fetch_io",
            FetchError::InvalidPath { .. } => "fetch_invalid_path",
            FetchError::UnknownSubnet(_) => "fetch_unknown_subnet",
            FetchError::Exhausted { .. } => "fetch_exhausted",
            FetchError::Canceled => "fetch_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FetchError::Exhausted {
                subnet, attempts, ..
            } => format!("gave up on {subnet} after {attempts} attempts"),
            other => other.to_string(),
        }
    }

    /// True when the failure text says the resolution service is throttling us.
    ///
    /// # Example
    /// ```
    /// use subnetvisor::FetchError;
    ///
    /// let err = FetchError::Resolve {
    ///     name: "k51".into(),
    ///     error: "429: You are being rate limited".into(),
    /// };
    /// assert!(err.is_rate_limited());
    /// ```
    pub fn is_rate_limited(&self) -> bool {
        self.to_string().contains(RATE_LIMIT_MARKER)
    }
}

/// # A subnet process ended its generation abnormally.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SubnetError {
    /// Non-zero exit code or an unexpected signal.
    #[error("{subnet} crashed {reason}")]
    Crashed {
        /// Subnet name.
        subnet: String,
        /// `with exit code N` or `via signal SIGX`.
        reason: String,
        /// Tail of the subnet's combined stdout/stderr.
        details: String,
    },

    /// No output for longer than the watchdog allows.
    #[error("{subnet} has been inactive for {after:?}")]
    Inactive {
        /// Subnet name.
        subnet: String,
        /// Watchdog duration that elapsed.
        after: Duration,
    },

    /// The runtime executable could not be started.
    #[error("cannot start {subnet}: {error}")]
    Spawn {
        /// Subnet name.
        subnet: String,
        /// The underlying error message.
        error: String,
    },
}

impl SubnetError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SubnetError::Crashed { .. } => "subnet_crashed",
            SubnetError::Inactive { .. } => "subnet_inactive",
            SubnetError::Spawn { .. } => "subnet_spawn",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SubnetError::Crashed {
                subnet,
                reason,
                details,
            } if !details.is_empty() => format!("{subnet} crashed {reason}\n{details}"),
            other => other.to_string(),
        }
    }

    /// Name of the subnet the error is about.
    pub fn subnet(&self) -> &str {
        match self {
            SubnetError::Crashed { subnet, .. }
            | SubnetError::Inactive { subnet, .. }
            | SubnetError::Spawn { subnet, .. } => subnet,
        }
    }
}

/// # Configuration rejected before startup.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The legacy `MODULE_FILTER` variable is set.
    #[error("MODULE_FILTER is deprecated, use SUBNET_FILTER instead")]
    DeprecatedModuleFilter,

    /// No wallet address configured; subnets cannot run without one.
    #[error("FIL_WALLET_ADDRESS required")]
    MissingWallet,

    /// A timing knob is zero where a positive duration is needed.
    #[error("{field} must be greater than zero")]
    InvalidDuration {
        /// Name of the config field.
        field: &'static str,
    },
}

/// # Errors that stop the agent.
///
/// Subnet failures never end up here: they end a generation and the
/// agent starts the next one.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The mandatory first source refresh failed.
    #[error("failed to download latest subnet source code: {0}")]
    SourceSync(#[from] FetchError),

    /// The runtime executable could not be installed.
    #[error("cannot install runtime {runtime}: {error}")]
    Install {
        /// Runtime name.
        runtime: String,
        /// The underlying error message.
        error: String,
    },

    /// The filter and experimental flag leave nothing to run.
    #[error("no subnet matches the configured filter")]
    NoSubnets,

    /// Not a single subnet process could be spawned.
    #[error("no subnet process could be started: {0}")]
    NothingSpawned(SubnetError),

    /// Configuration rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::SourceSync(_) => "runtime_source_sync",
            RuntimeError::Install { .. } => "runtime_install",
            RuntimeError::NoSubnets => "runtime_no_subnets",
            RuntimeError::NothingSpawned(_) => "runtime_nothing_spawned",
            RuntimeError::Config(_) => "runtime_config",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::SourceSync(e) => format!("source sync: {}", e.as_message()),
            RuntimeError::NothingSpawned(e) => format!("spawn: {}", e.as_message()),
            other => other.to_string(),
        }
    }
}
