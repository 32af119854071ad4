//! Per-follower timeline collection
//!
//! Walks one follower's timeline page by page, newest first, until the
//! lookback horizon is crossed or the volume cap makes the follower look
//! automated. Every call is preceded by a rate-limit budget check.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::api::{TimelineApi, TIMELINE_ENDPOINT};
use crate::clock::Clock;
use crate::config::CollectionParams;
use crate::error::{ApiError, CadenceError, Result};
use crate::rate_limit::RateLimitTracker;
use crate::types::{Cursor, Follower, Post};

/// Final state of one follower's collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    /// Posts strictly newer than the horizon, newest first
    Accepted(Vec<Post>),
    /// More posts than the cap allows inside the window
    RejectedVolume { count: usize, cap: usize },
    /// A page came back (nearly) empty
    RejectedSparse { page_len: usize },
}

impl Collection {
    /// Posts to merge into the corpus; rejections contribute nothing
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            Collection::Accepted(posts) => posts,
            Collection::RejectedVolume { .. } | Collection::RejectedSparse { .. } => Vec::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Collection::Accepted(_))
    }
}

/// Drives paging for a single follower at a time
pub struct FollowerCollector<'a> {
    api: &'a dyn TimelineApi,
    clock: &'a dyn Clock,
    params: &'a CollectionParams,
}

impl<'a> FollowerCollector<'a> {
    pub fn new(api: &'a dyn TimelineApi, clock: &'a dyn Clock, params: &'a CollectionParams) -> Self {
        Self { api, clock, params }
    }

    /// Collect `follower`'s posts inside the lookback window
    ///
    /// # Errors
    ///
    /// API faults abort this follower only and are returned as-is; a
    /// server-side rate-limit refusal also marks the timeline budget spent so
    /// the next call waits for a reset. A rate-limit snapshot lacking the
    /// timeline endpoint fails with `ConfigError::MissingEndpoint`.
    pub async fn collect(
        &self,
        tracker: &mut RateLimitTracker,
        follower: &Follower,
    ) -> Result<Collection> {
        let horizon = self.clock.now() - self.params.lookback();
        let cap = self.params.cap();

        let mut cursor: Option<Cursor> = None;
        let mut collected: Vec<Post> = Vec::new();

        loop {
            tracker
                .ensure_budget(self.api, self.clock, TIMELINE_ENDPOINT)
                .await?;

            let page = match self
                .api
                .timeline_page(follower, cursor, self.params.page_size)
                .await
            {
                Ok(page) => page,
                Err(CadenceError::Api(err @ ApiError::RateLimit(_))) => {
                    tracker.mark_exhausted(TIMELINE_ENDPOINT);
                    return Err(err.into());
                }
                Err(e) => return Err(e),
            };
            tracker.consume(TIMELINE_ENDPOINT);

            let count = collected.len() + page.len();
            debug!(
                "@{}: page of {} posts ({} total, cursor {:?})",
                follower.handle,
                page.len(),
                count,
                cursor.map(|c| c.max_id())
            );

            if count > cap {
                info!(
                    "Skipping @{}: {} posts exceeds cap of {}",
                    follower.handle, count, cap
                );
                return Ok(Collection::RejectedVolume { count, cap });
            }

            if page.len() <= self.params.min_page_size {
                info!(
                    "Skipping @{}: sparse page of {} posts",
                    follower.handle,
                    page.len()
                );
                return Ok(Collection::RejectedSparse {
                    page_len: page.len(),
                });
            }

            let oldest = page.oldest().map(|p| p.created_at);
            let next_cursor = page.next_cursor;
            collected.extend(page.posts);

            let reached_horizon = oldest.map_or(true, |t| t <= horizon);
            if reached_horizon || next_cursor.is_none() {
                let posts = trim_to_horizon(collected, horizon);
                debug!("@{}: accepted {} posts", follower.handle, posts.len());
                return Ok(Collection::Accepted(posts));
            }

            if count >= cap {
                info!(
                    "Skipping @{}: reached cap of {} before the lookback horizon",
                    follower.handle, cap
                );
                return Ok(Collection::RejectedVolume { count, cap });
            }

            cursor = next_cursor;
        }
    }
}

/// Keep only posts created strictly after `horizon`
pub fn trim_to_horizon(posts: Vec<Post>, horizon: DateTime<Utc>) -> Vec<Post> {
    posts.into_iter().filter(|p| p.created_at > horizon).collect()
}
