//! Rate-limit tracking for timeline and follower reads
//!
//! The tracker holds the last snapshot read from the provider plus a local
//! estimate of calls spent since then. Before every upstream call the caller
//! asks for budget; when the estimate drops below the safety threshold the
//! tracker sleeps until the endpoint resets and takes a fresh snapshot.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::api::TimelineApi;
use crate::clock::Clock;
use crate::error::{ConfigError, Result};

/// Remaining calls for one endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointBudget {
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

/// Point-in-time read of per-endpoint budgets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    taken_at: DateTime<Utc>,
    budgets: HashMap<String, EndpointBudget>,
}

impl RateLimitSnapshot {
    pub fn new(taken_at: DateTime<Utc>, budgets: HashMap<String, EndpointBudget>) -> Self {
        Self { taken_at, budgets }
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointBudget> {
        self.budgets.get(endpoint)
    }

    /// Like [`get`](Self::get), but a missing endpoint is a configuration fault
    pub fn require(&self, endpoint: &str) -> Result<&EndpointBudget> {
        self.budgets
            .get(endpoint)
            .ok_or_else(|| ConfigError::MissingEndpoint(endpoint.to_string()).into())
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.budgets.keys().map(String::as_str)
    }
}

/// Time to wait for `endpoint` to reset, plus `margin`
///
/// The result is negative once the reset time has passed by more than the
/// margin; use [`clamp_wait`] before sleeping on it.
pub fn wait_time(
    snapshot: &RateLimitSnapshot,
    endpoint: &str,
    now: DateTime<Utc>,
    margin: Duration,
) -> Result<chrono::Duration> {
    let budget = snapshot.require(endpoint)?;
    let margin = chrono::Duration::from_std(margin).unwrap_or(chrono::Duration::zero());
    Ok(budget.reset_at - now + margin)
}

/// Convert a signed wait into something sleepable
pub fn clamp_wait(wait: chrono::Duration) -> Duration {
    wait.to_std().unwrap_or(Duration::ZERO)
}

/// Shortest sleep between two checks of a low budget
pub const MIN_RECHECK_WAIT: Duration = Duration::from_secs(1);

/// Shared budget across all sequential fetch sessions of a run
#[derive(Debug)]
pub struct RateLimitTracker {
    snapshot: Option<RateLimitSnapshot>,
    /// Calls issued per endpoint since `snapshot` was taken
    spent: HashMap<String, u32>,
    safety_threshold: u32,
    margin: Duration,
}

impl RateLimitTracker {
    pub fn new(safety_threshold: u32, margin: Duration) -> Self {
        Self {
            snapshot: None,
            spent: HashMap::new(),
            safety_threshold,
            margin,
        }
    }

    /// Build a tracker from collection parameters
    pub fn from_params(params: &crate::config::CollectionParams) -> Self {
        Self::new(params.safety_threshold, params.margin())
    }

    pub fn snapshot(&self) -> Option<&RateLimitSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn safety_threshold(&self) -> u32 {
        self.safety_threshold
    }

    /// Read fresh counters from the provider, discarding local estimates
    pub async fn check(&mut self, api: &dyn TimelineApi) -> Result<&RateLimitSnapshot> {
        let snapshot = api.rate_limit_status().await?;
        debug!(
            "Rate limit snapshot from {} at {} ({} endpoints)",
            api.name(),
            snapshot.taken_at(),
            snapshot.budgets.len()
        );
        self.spent.clear();
        let snapshot = self.snapshot.insert(snapshot);
        Ok(&*snapshot)
    }

    /// Estimated calls left for `endpoint`
    ///
    /// # Errors
    ///
    /// Fails with `ConfigError::MissingEndpoint` if no snapshot has been taken
    /// or the snapshot does not cover `endpoint`.
    pub fn remaining(&self, endpoint: &str) -> Result<u32> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEndpoint(endpoint.to_string()))?;
        let budget = snapshot.require(endpoint)?;
        let spent = self.spent.get(endpoint).copied().unwrap_or(0);
        Ok(budget.remaining.saturating_sub(spent))
    }

    /// Record one call against `endpoint`
    pub fn consume(&mut self, endpoint: &str) {
        *self.spent.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    /// Treat `endpoint` as spent until the next real check
    pub fn mark_exhausted(&mut self, endpoint: &str) {
        let remaining = self
            .snapshot
            .as_ref()
            .and_then(|s| s.get(endpoint))
            .map(|b| b.remaining)
            .unwrap_or(0);
        self.spent.insert(endpoint.to_string(), remaining);
    }

    /// Wait until at least `safety_threshold` calls are available on `endpoint`
    ///
    /// Takes the first snapshot lazily. While the estimate is below the
    /// threshold, sleeps for the endpoint's reset wait and re-checks, so the
    /// call that follows is the same call that was about to be made. A reset
    /// time already in the past still sleeps the margin (at least
    /// [`MIN_RECHECK_WAIT`]) before the next check.
    pub async fn ensure_budget(
        &mut self,
        api: &dyn TimelineApi,
        clock: &dyn Clock,
        endpoint: &str,
    ) -> Result<()> {
        if self.snapshot.is_none() {
            self.check(api).await?;
        }

        loop {
            let remaining = self.remaining(endpoint)?;
            if remaining >= self.safety_threshold {
                return Ok(());
            }

            let snapshot = self
                .snapshot
                .as_ref()
                .ok_or_else(|| ConfigError::MissingEndpoint(endpoint.to_string()))?;
            let mut wait = clamp_wait(wait_time(snapshot, endpoint, clock.now(), self.margin)?);
            if wait.is_zero() {
                wait = self.margin.max(MIN_RECHECK_WAIT);
            }
            info!(
                "{} calls left on {} (threshold {}), sleeping {}",
                remaining,
                endpoint,
                self.safety_threshold,
                humantime::format_duration(wait)
            );
            clock.sleep(wait).await;
            self.check(api).await?;
        }
    }
}
