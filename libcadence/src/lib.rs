//! Cadence - follower activity collection and heatmaps
//!
//! This library walks an account's followers, pages through each follower's
//! recent posts under a shared rate-limit budget, and flattens the result
//! into a weekday/hour table for activity analysis.

pub mod aggregator;
pub mod api;
pub mod clock;
pub mod collector;
pub mod config;
pub mod corpus;
pub mod credentials;
pub mod error;
pub mod heatmap;
pub mod logging;
pub mod rate_limit;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use aggregator::{CorpusAggregator, RunSummary};
pub use api::TimelineApi;
pub use clock::{Clock, SystemClock};
pub use collector::{Collection, FollowerCollector};
pub use config::{CollectionParams, Config, TableFormat};
pub use corpus::{Corpus, CorpusRow};
pub use credentials::Credentials;
pub use error::{CadenceError, Result};
pub use heatmap::{Heatmap, HeatmapKind};
pub use rate_limit::RateLimitTracker;
pub use types::{Cursor, Follower, Post};
