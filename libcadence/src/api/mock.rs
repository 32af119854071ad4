//! Mock API implementation for testing
//!
//! Serves canned follower lists, timelines and rate-limit snapshots so the
//! collector and aggregator can be exercised without network access. Every
//! call is recorded for later verification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::api::{TimelineApi, FOLLOWERS_ENDPOINT, TIMELINE_ENDPOINT};
use crate::clock::{Clock, ManualClock};
use crate::error::{ApiError, Result};
use crate::rate_limit::{EndpointBudget, RateLimitSnapshot};
use crate::types::{Cursor, Follower, FollowerPage, Page, Post};

/// How a follower's timeline is served
#[derive(Debug, Clone)]
enum TimelineScript {
    /// Full history, newest first, paged by cursor and page size
    History(Vec<Post>),
    /// Fixed pages returned in order regardless of the cursor
    Pages(Vec<Vec<Post>>),
}

/// A recorded timeline request
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineCall {
    pub follower_id: u64,
    pub cursor: Option<Cursor>,
    pub page_size: u32,
    /// Clock reading at call time, when a clock is attached
    pub at: Option<DateTime<Utc>>,
}

/// Mock provider for testing
pub struct MockApi {
    name: String,
    auth_succeeds: bool,
    authenticated: bool,
    followers: Vec<Follower>,
    follower_page_size: usize,
    timelines: HashMap<u64, TimelineScript>,
    /// Errors keyed by follower id, raised on the given zero-based page
    failures: HashMap<u64, (usize, ApiError)>,
    rate_limits: Mutex<Vec<RateLimitSnapshot>>,
    clock: Option<ManualClock>,
    timeline_calls: Mutex<Vec<TimelineCall>>,
    follower_calls: Mutex<usize>,
    rate_limit_calls: Mutex<usize>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            auth_succeeds: true,
            authenticated: false,
            followers: Vec::new(),
            follower_page_size: 200,
            timelines: HashMap::new(),
            failures: HashMap::new(),
            rate_limits: Mutex::new(Vec::new()),
            clock: None,
            timeline_calls: Mutex::new(Vec::new()),
            follower_calls: Mutex::new(0),
            rate_limit_calls: Mutex::new(0),
        }
    }

    /// Create a mock that rejects authentication
    pub fn auth_failure() -> Self {
        Self {
            auth_succeeds: false,
            ..Self::new()
        }
    }

    pub fn with_followers(mut self, followers: Vec<Follower>) -> Self {
        self.followers = followers;
        self
    }

    /// Serve the follower list in pages of `size`
    pub fn with_follower_page_size(mut self, size: usize) -> Self {
        self.follower_page_size = size.max(1);
        self
    }

    /// Serve `posts` (newest first) as a follower's full history
    pub fn with_history(mut self, follower_id: u64, posts: Vec<Post>) -> Self {
        self.timelines
            .insert(follower_id, TimelineScript::History(posts));
        self
    }

    /// Serve fixed pages for a follower, one per call
    pub fn with_pages(mut self, follower_id: u64, pages: Vec<Vec<Post>>) -> Self {
        self.timelines.insert(follower_id, TimelineScript::Pages(pages));
        self
    }

    /// Fail the `page`-th timeline call for a follower
    pub fn with_failure(mut self, follower_id: u64, page: usize, error: ApiError) -> Self {
        self.failures.insert(follower_id, (page, error));
        self
    }

    /// Snapshots returned by successive rate-limit checks
    ///
    /// The last snapshot repeats once the list is used up. Without any, each
    /// check reports a generous budget on every endpoint.
    pub fn with_rate_limits(self, snapshots: Vec<RateLimitSnapshot>) -> Self {
        *self.rate_limits.lock().unwrap() = snapshots;
        self
    }

    /// Stamp every timeline call with this clock's reading
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn timeline_calls(&self) -> Vec<TimelineCall> {
        self.timeline_calls.lock().unwrap().clone()
    }

    pub fn timeline_call_count(&self) -> usize {
        self.timeline_calls.lock().unwrap().len()
    }

    /// Timeline calls issued for one follower
    pub fn calls_for(&self, follower_id: u64) -> usize {
        self.timeline_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.follower_id == follower_id)
            .count()
    }

    pub fn follower_call_count(&self) -> usize {
        *self.follower_calls.lock().unwrap()
    }

    pub fn rate_limit_call_count(&self) -> usize {
        *self.rate_limit_calls.lock().unwrap()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock
            .as_ref()
            .map(|c| c.now())
            .unwrap_or_else(Utc::now)
    }

    fn generous_snapshot(&self) -> RateLimitSnapshot {
        let now = self.now();
        let budget = EndpointBudget {
            remaining: 900,
            reset_at: now + chrono::Duration::minutes(15),
        };
        let budgets = [TIMELINE_ENDPOINT, FOLLOWERS_ENDPOINT]
            .into_iter()
            .map(|key| (key.to_string(), budget))
            .collect();
        RateLimitSnapshot::new(now, budgets)
    }
}

#[async_trait]
impl TimelineApi for MockApi {
    async fn authenticate(&mut self) -> Result<()> {
        if self.auth_succeeds {
            self.authenticated = true;
            Ok(())
        } else {
            Err(ApiError::Authentication("Mock authentication failed".to_string()).into())
        }
    }

    async fn timeline_page(
        &self,
        follower: &Follower,
        cursor: Option<Cursor>,
        page_size: u32,
    ) -> Result<Page> {
        let page_index = {
            let mut calls = self.timeline_calls.lock().unwrap();
            let index = calls.iter().filter(|c| c.follower_id == follower.id).count();
            calls.push(TimelineCall {
                follower_id: follower.id,
                cursor,
                page_size,
                at: self.clock.as_ref().map(|c| c.now()),
            });
            index
        };

        if let Some((fail_at, error)) = self.failures.get(&follower.id) {
            if *fail_at == page_index {
                return Err(error.clone().into());
            }
        }

        let posts = match self.timelines.get(&follower.id) {
            None => Vec::new(),
            Some(TimelineScript::Pages(pages)) => {
                pages.get(page_index).cloned().unwrap_or_default()
            }
            Some(TimelineScript::History(history)) => history
                .iter()
                .filter(|p| cursor.map_or(true, |c| p.id <= c.max_id()))
                .take(page_size as usize)
                .cloned()
                .collect(),
        };

        Ok(Page::from_posts(posts))
    }

    async fn follower_page(&self, _account: &str, cursor: Option<i64>) -> Result<FollowerPage> {
        *self.follower_calls.lock().unwrap() += 1;

        let start = cursor.unwrap_or(0).max(0) as usize;
        let end = (start + self.follower_page_size).min(self.followers.len());
        let followers = self.followers.get(start..end).unwrap_or_default().to_vec();
        let next_cursor = (end < self.followers.len()).then_some(end as i64);

        Ok(FollowerPage {
            followers,
            next_cursor,
        })
    }

    async fn rate_limit_status(&self) -> Result<RateLimitSnapshot> {
        *self.rate_limit_calls.lock().unwrap() += 1;

        let mut scripted = self.rate_limits.lock().unwrap();
        let snapshot = match scripted.len() {
            0 => self.generous_snapshot(),
            1 => scripted[0].clone(),
            _ => scripted.remove(0),
        };
        Ok(snapshot)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
