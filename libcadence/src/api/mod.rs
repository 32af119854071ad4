//! Upstream API boundary
//!
//! The collector only needs three capabilities from the provider: reading one
//! page of a user's timeline, reading one page of an account's followers, and
//! reading the current rate-limit counters. [`TimelineApi`] captures exactly
//! those calls so the paging logic can run against the real Twitter client or
//! against [`mock::MockApi`] in tests.
//!
//! # Examples
//!
//! ```no_run
//! use libcadence::api::{twitter::TwitterClient, TimelineApi, TIMELINE_ENDPOINT};
//! use libcadence::credentials::Credentials;
//!
//! # async fn example(credentials: Credentials) -> libcadence::Result<()> {
//! let mut client = TwitterClient::from_credentials(&credentials)?;
//! client.authenticate().await?;
//!
//! let snapshot = client.rate_limit_status().await?;
//! if let Some(budget) = snapshot.get(TIMELINE_ENDPOINT) {
//!     println!("{} timeline calls left", budget.remaining);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::rate_limit::RateLimitSnapshot;
use crate::types::{Cursor, Follower, FollowerPage, Page};

pub mod mock;
pub mod twitter;

/// Rate-limit key for timeline reads
pub const TIMELINE_ENDPOINT: &str = "/statuses/user_timeline";

/// Rate-limit key for follower list reads
pub const FOLLOWERS_ENDPOINT: &str = "/followers/list";

/// Every endpoint the collector consults before calling out
pub const REQUIRED_ENDPOINTS: [&str; 2] = [TIMELINE_ENDPOINT, FOLLOWERS_ENDPOINT];

#[async_trait]
pub trait TimelineApi: Send + Sync {
    /// Obtain whatever session the provider requires before reading
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Authentication` if the provider rejects the credentials.
    async fn authenticate(&mut self) -> Result<()>;

    /// Fetch one page of `follower`'s posts, newest first
    ///
    /// With `cursor = None` the newest posts are returned; otherwise only posts
    /// strictly older than the post the cursor was derived from. `page_size` is
    /// an upper bound, the provider may return fewer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Network`/`ApiError::Decode` on transport or payload
    /// faults and `ApiError::RateLimit` if the provider refuses the call.
    async fn timeline_page(
        &self,
        follower: &Follower,
        cursor: Option<Cursor>,
        page_size: u32,
    ) -> Result<Page>;

    /// Fetch one page of the followers of `account`
    async fn follower_page(&self, account: &str, cursor: Option<i64>) -> Result<FollowerPage>;

    /// Read remaining-call counters and reset times for [`REQUIRED_ENDPOINTS`]
    async fn rate_limit_status(&self) -> Result<RateLimitSnapshot>;

    /// Lowercase provider identifier, used in log lines
    fn name(&self) -> &str;
}
