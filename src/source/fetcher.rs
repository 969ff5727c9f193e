//! # RetryingFetcher: SourceSync with bounded, rate-limit-aware retries.
//!
//! ## Attempt loop
//! ```text
//! attempt = 1..=max_attempts
//!   ├─► sync.refresh(subnet, no_cache = attempt > 1)   (cancellable)
//!   │     ├─ Ok(changed) ─► return
//!   │     └─ Err(e)      ─► warn "Failed to download <subnet> source. Retrying..."
//!   ├─► out of attempts ─► FetchError::Exhausted
//!   └─► sleep(policy.delay_after(e, attempt))            (cancellable)
//! ```
//!
//! A pass over several subnets runs their refreshes concurrently.

use std::future::Future;
use std::sync::Arc;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::policies::{RetryDelay, RetryPolicy};
use crate::source::resolver::ResolveOptions;
use crate::source::sync::SourceSync;
use crate::subnets::{SubnetDescriptor, SubnetFilter};

/// Which subnets take part in a refresh pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshScope {
    /// Mandatory pre-fetch: every subnet matching the filter.
    Startup,
    /// Periodic refresh: matching subnets, minus experimental ones unless enabled.
    Background { experimental: bool },
}

/// Retry wrapper around [`SourceSync`].
pub struct RetryingFetcher {
    sync: Arc<SourceSync>,
    policy: RetryPolicy,
    subnets: Vec<SubnetDescriptor>,
    filter: SubnetFilter,
}

impl RetryingFetcher {
    pub fn new(
        sync: Arc<SourceSync>,
        policy: RetryPolicy,
        subnets: Vec<SubnetDescriptor>,
        filter: SubnetFilter,
    ) -> Self {
        Self {
            sync,
            policy,
            subnets,
            filter,
        }
    }

    pub fn sync(&self) -> &Arc<SourceSync> {
        &self.sync
    }

    /// Subnets taking part in a pass of the given scope.
    pub fn participants(&self, scope: RefreshScope) -> Vec<&SubnetDescriptor> {
        self.subnets
            .iter()
            .filter(|s| self.filter.matches(&s.name))
            .filter(|s| match scope {
                RefreshScope::Startup => true,
                RefreshScope::Background { experimental } => s.enabled(experimental),
            })
            .collect()
    }

    /// Refreshes every participant; true if any of them changed.
    pub async fn refresh_all(
        &self,
        scope: RefreshScope,
        token: Option<&CancellationToken>,
    ) -> Result<bool, FetchError> {
        let participants = self.participants(scope);
        let changed = try_join_all(participants.into_iter().map(|s| self.refresh(s, token))).await?;
        Ok(changed.into_iter().any(|c| c))
    }

    /// Refreshes one subnet, retrying per the policy.
    ///
    /// Subnets outside the configured catalog fail immediately with
    /// [`FetchError::UnknownSubnet`].
    pub async fn refresh(
        &self,
        subnet: &SubnetDescriptor,
        token: Option<&CancellationToken>,
    ) -> Result<bool, FetchError> {
        if !self.subnets.iter().any(|s| s.name == subnet.name) {
            return Err(FetchError::UnknownSubnet(subnet.name.to_string()));
        }

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let opts = ResolveOptions {
                no_cache: attempt > 1,
            };

            let err = match cancellable(token, self.sync.refresh(subnet, opts)).await {
                None => return Err(FetchError::Canceled),
                Some(Ok(changed)) => return Ok(changed),
                Some(Err(e)) => e,
            };
            tracing::warn!(
                subnet = %subnet.name,
                attempt,
                error = %err,
                "Failed to download {} source. Retrying...",
                subnet.name
            );

            if !self.policy.allows_retry(attempt) {
                return Err(FetchError::Exhausted {
                    subnet: subnet.name.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.policy.delay_after(&err, attempt);
            if let RetryDelay::RateLimited(d) = delay {
                tracing::warn!(
                    subnet = %subnet.name,
                    "Rate limited. Waiting {} seconds...",
                    d.as_secs()
                );
            }
            if cancellable(token, tokio::time::sleep(delay.duration()))
                .await
                .is_none()
            {
                return Err(FetchError::Canceled);
            }
        }
    }
}

/// Runs `fut` to completion unless `token` is cancelled first.
async fn cancellable<F: Future>(token: Option<&CancellationToken>, fut: F) -> Option<F::Output> {
    match token {
        Some(token) => tokio::select! {
            out = fut => Some(out),
            _ = token.cancelled() => None,
        },
        None => Some(fut.await),
    }
}
