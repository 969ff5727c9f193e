//! # Agent configuration.
//!
//! Provides [`Config`], the already-validated settings the agent runs with.
//!
//! Config is used in three ways:
//! 1. **Agent creation**: `AgentBuilder::new(config)`
//! 2. **Child environment**: [`Identity`] and the state/cache roots are passed to every subnet process
//! 3. **Timing**: watchdog, refresh interval and jitter, retry policy
//!
//! ## Sentinel values
//! - `refresh_jitter = 0s` → exact refresh interval (no jitter)
//! - `output_tail_lines = 0` → no output is kept for crash details
//!
//! Environment variables are read through an injected lookup so the core never
//! touches process-global state:
//! ```
//! use subnetvisor::{Config, SubnetFilter};
//!
//! let mut cfg = Config::default();
//! cfg.apply_env(|key| (key == "SUBNET_FILTER").then(|| "spark".to_string())).unwrap();
//! assert_eq!(cfg.filter, SubnetFilter::Only("spark".into()));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::{JitterPolicy, RetryPolicy};
use crate::subnets::{self, SubnetDescriptor, SubnetFilter};

/// Node identity handed to every subnet process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    /// Stable identifier of this node (`STATION_ID`).
    pub station_id: String,
    /// Wallet rewards are scheduled for (`FIL_WALLET_ADDRESS`).
    pub wallet_address: String,
}

/// Settings for one agent instance.
///
/// ## Field semantics
/// - `subnets`: catalog the filter and experimental flag select from
/// - `watchdog`: inactivity limit per subnet process
/// - `refresh_interval` / `refresh_jitter`: background source refresh cadence
/// - `bus_capacity`: ring buffer of the [`AgentEvent`](crate::events::AgentEvent) stream (min 1)
///
/// All fields are public. Prefer the accessor helpers over sentinel checks.
#[derive(Clone, Debug)]
pub struct Config {
    /// Known subnets.
    pub subnets: Vec<SubnetDescriptor>,
    /// Which subnets this instance runs.
    pub filter: SubnetFilter,
    /// Run experimental subnets too.
    pub experimental: bool,
    /// Node identity and wallet.
    pub identity: Identity,
    /// Root for per-subnet persistent state (`STATE_ROOT`).
    pub state_root: PathBuf,
    /// Root for per-subnet caches (`CACHE_ROOT`).
    pub cache_root: PathBuf,
    /// Where subnet source bundles are installed.
    pub sources_dir: PathBuf,
    /// A subnet silent for this long is restarted together with its generation.
    pub watchdog: Duration,
    /// Base period of the background source refresh.
    pub refresh_interval: Duration,
    /// Maximum random offset applied to each refresh period, in both directions.
    pub refresh_jitter: Duration,
    /// Retries of failed source downloads.
    pub retry: RetryPolicy,
    /// Capacity of the agent event bus.
    pub bus_capacity: usize,
    /// Lines of combined child output kept for crash details.
    pub output_tail_lines: usize,
}

impl Config {
    /// Reads `SUBNET_FILTER` through `lookup` and rejects the legacy `MODULE_FILTER`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("MODULE_FILTER").is_some_and(|v| !v.is_empty()) {
            return Err(ConfigError::DeprecatedModuleFilter);
        }
        if let Some(raw) = lookup("SUBNET_FILTER") {
            self.filter = SubnetFilter::parse(&raw);
        }
        Ok(())
    }

    /// Checks the settings the agent cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.wallet_address.trim().is_empty() {
            return Err(ConfigError::MissingWallet);
        }
        if self.watchdog.is_zero() {
            return Err(ConfigError::InvalidDuration { field: "watchdog" });
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::InvalidDuration {
                field: "refresh_interval",
            });
        }
        Ok(())
    }

    /// Subnets that run in a generation: filter-matched and enabled for the
    /// experimental flag.
    pub fn active_subnets(&self) -> Vec<SubnetDescriptor> {
        self.subnets
            .iter()
            .filter(|s| self.filter.matches(&s.name) && s.enabled(self.experimental))
            .cloned()
            .collect()
    }

    /// Jitter applied to every refresh period.
    #[inline]
    pub fn refresh_jitter_policy(&self) -> JitterPolicy {
        if self.refresh_jitter.is_zero() {
            JitterPolicy::None
        } else {
            JitterPolicy::Spread(self.refresh_jitter)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - built-in subnet catalog, no filter, experimental off
    /// - `watchdog = 5min`
    /// - `refresh_interval = 10min`, `refresh_jitter = 10s`
    /// - `bus_capacity = 1024`, `output_tail_lines = 200`
    /// - state, cache and sources under `./subnetvisor`
    fn default() -> Self {
        let root = PathBuf::from("subnetvisor");
        Self {
            subnets: subnets::builtin(),
            filter: SubnetFilter::All,
            experimental: false,
            identity: Identity::default(),
            state_root: root.join("state"),
            cache_root: root.join("cache"),
            sources_dir: root.join("sources"),
            watchdog: Duration::from_secs(5 * 60),
            refresh_interval: Duration::from_secs(10 * 60),
            refresh_jitter: Duration::from_secs(10),
            retry: RetryPolicy::default(),
            bus_capacity: 1024,
            output_tail_lines: 200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn subnet_filter_from_env() {
        let mut cfg = Config::default();
        cfg.apply_env(env(&[("SUBNET_FILTER", "spark")])).unwrap();
        assert_eq!(cfg.filter, SubnetFilter::Only("spark".into()));

        cfg.apply_env(env(&[("SUBNET_FILTER", "")])).unwrap();
        assert_eq!(cfg.filter, SubnetFilter::All);
    }

    #[test]
    fn legacy_module_filter_is_rejected() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.apply_env(env(&[("MODULE_FILTER", "spark")])),
            Err(ConfigError::DeprecatedModuleFilter)
        );
    }

    #[test]
    fn wallet_is_required() {
        let mut cfg = Config::default();
        assert_eq!(cfg.validate(), Err(ConfigError::MissingWallet));
        cfg.identity.wallet_address = "0x000000000000000000000000000000000000dEaD".into();
        assert_eq!(cfg.validate(), Ok(()));

        cfg.watchdog = Duration::ZERO;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidDuration { field: "watchdog" })
        );
    }

    #[test]
    fn active_subnets_apply_filter_and_experimental_flag() {
        let mut cfg = Config::default();
        cfg.subnets = vec![
            SubnetDescriptor::new("spark", "k1"),
            SubnetDescriptor::new("voyager", "k2").experimental(),
        ];
        let names = |cfg: &Config| {
            cfg.active_subnets()
                .into_iter()
                .map(|s| s.name.into_owned())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&cfg), vec!["spark"]);

        cfg.experimental = true;
        assert_eq!(names(&cfg), vec!["spark", "voyager"]);

        cfg.filter = SubnetFilter::parse("voyager");
        assert_eq!(names(&cfg), vec!["voyager"]);
    }

    #[test]
    fn zero_jitter_means_exact_interval() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.refresh_jitter_policy(),
            JitterPolicy::Spread(Duration::from_secs(10))
        );
        cfg.refresh_jitter = Duration::ZERO;
        assert_eq!(cfg.refresh_jitter_policy(), JitterPolicy::None);
    }
}
