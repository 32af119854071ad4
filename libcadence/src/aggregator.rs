//! Corpus aggregation across all followers
//!
//! Followers are processed strictly one after another. A fault while
//! collecting one follower is logged and skipped; only configuration problems
//! and a failed follower listing abort the run.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{TimelineApi, FOLLOWERS_ENDPOINT};
use crate::clock::Clock;
use crate::collector::{Collection, FollowerCollector};
use crate::config::CollectionParams;
use crate::corpus::Corpus;
use crate::error::Result;
use crate::rate_limit::RateLimitTracker;
use crate::types::Follower;

/// Per-run tallies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub root_user: String,
    pub followers: usize,
    pub accepted: usize,
    pub rejected_volume: usize,
    pub rejected_sparse: usize,
    pub failed: usize,
    pub posts: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "@{}: {} followers, {} accepted, {} rejected (volume), {} rejected (sparse), {} failed, {} posts",
            self.root_user,
            self.followers,
            self.accepted,
            self.rejected_volume,
            self.rejected_sparse,
            self.failed,
            self.posts
        )
    }
}

pub struct CorpusAggregator<'a> {
    api: &'a dyn TimelineApi,
    clock: &'a dyn Clock,
    params: &'a CollectionParams,
}

impl<'a> CorpusAggregator<'a> {
    pub fn new(api: &'a dyn TimelineApi, clock: &'a dyn Clock, params: &'a CollectionParams) -> Self {
        Self { api, clock, params }
    }

    /// Walk the follower list of `account`, up to `max_followers`
    pub async fn list_followers(
        &self,
        tracker: &mut RateLimitTracker,
        account: &str,
    ) -> Result<Vec<Follower>> {
        let mut followers = Vec::new();
        let mut cursor = None;

        loop {
            tracker
                .ensure_budget(self.api, self.clock, FOLLOWERS_ENDPOINT)
                .await?;
            let page = self.api.follower_page(account, cursor).await?;
            tracker.consume(FOLLOWERS_ENDPOINT);

            followers.extend(page.followers);
            if followers.len() >= self.params.max_followers {
                followers.truncate(self.params.max_followers);
                break;
            }
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!("@{} has {} followers to collect", account, followers.len());
        Ok(followers)
    }

    /// Collect every follower of `account` into one corpus
    pub async fn run(
        &self,
        tracker: &mut RateLimitTracker,
        account: &str,
    ) -> Result<(Corpus, RunSummary)> {
        let followers = self.list_followers(tracker, account).await?;
        self.collect(tracker, account, &followers).await
    }

    /// Collect the given followers into one corpus
    pub async fn collect(
        &self,
        tracker: &mut RateLimitTracker,
        account: &str,
        followers: &[Follower],
    ) -> Result<(Corpus, RunSummary)> {
        let collector = FollowerCollector::new(self.api, self.clock, self.params);
        let mut corpus = Corpus::new(account);
        let mut summary = RunSummary {
            root_user: account.to_string(),
            followers: followers.len(),
            ..Default::default()
        };

        for (index, follower) in followers.iter().enumerate() {
            info!(
                "[{}/{}] Collecting @{}",
                index + 1,
                followers.len(),
                follower.handle
            );

            match collector.collect(tracker, follower).await {
                Ok(Collection::Accepted(posts)) => {
                    summary.accepted += 1;
                    let added = corpus.merge(posts);
                    info!("@{}: kept {} posts", follower.handle, added);
                }
                Ok(Collection::RejectedVolume { .. }) => summary.rejected_volume += 1,
                Ok(Collection::RejectedSparse { .. }) => summary.rejected_sparse += 1,
                Err(e) if e.is_per_follower() => {
                    summary.failed += 1;
                    warn!("Failed to collect @{}: {}", follower.handle, e);
                }
                Err(e) => return Err(e),
            }
        }

        summary.posts = corpus.len();
        info!("{}", summary);
        Ok((corpus, summary))
    }
}
