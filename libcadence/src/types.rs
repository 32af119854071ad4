//! Core types for Cadence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account following the root account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    pub id: u64,
    pub handle: String,
}

impl Follower {
    pub fn new(id: u64, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: handle.into(),
        }
    }
}

/// A single post read from a follower's timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Provider post id, only used to derive pagination cursors
    pub id: u64,
    pub author_handle: String,
    /// Follower whose timeline this post was read from
    pub source_follower_handle: String,
    pub text: String,
    pub is_retweet: bool,
    pub created_at: DateTime<Utc>,
}

/// Identity used for corpus deduplication
///
/// The provider id is deliberately left out.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostKey {
    author_handle: String,
    source_follower_handle: String,
    text: String,
    created_at: DateTime<Utc>,
}

impl Post {
    pub fn key(&self) -> PostKey {
        PostKey {
            author_handle: self.author_handle.clone(),
            source_follower_handle: self.source_follower_handle.clone(),
            text: self.text.clone(),
            created_at: self.created_at,
        }
    }
}

/// Pagination boundary for "strictly older than" timeline queries
///
/// Wraps the inclusive `max_id` the provider expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor(u64);

impl Cursor {
    /// Cursor selecting posts strictly older than `post_id`
    ///
    /// Returns `None` when nothing can be older (id 0).
    pub fn older_than(post_id: u64) -> Option<Self> {
        post_id.checked_sub(1).map(Cursor)
    }

    /// Inclusive upper bound on post ids for the next request
    pub fn max_id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of a timeline, newest first
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub posts: Vec<Post>,
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Build a page and derive its cursor from the oldest post
    pub fn from_posts(posts: Vec<Post>) -> Self {
        let next_cursor = posts
            .iter()
            .map(|p| p.id)
            .min()
            .and_then(Cursor::older_than);
        Self { posts, next_cursor }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Oldest post in the page
    pub fn oldest(&self) -> Option<&Post> {
        self.posts.iter().min_by_key(|p| p.created_at)
    }
}

/// One page of the follower list
#[derive(Debug, Clone, Default)]
pub struct FollowerPage {
    pub followers: Vec<Follower>,
    /// Provider cursor for the next page, `None` once the list is exhausted
    pub next_cursor: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: u64, secs: i64) -> Post {
        Post {
            id,
            author_handle: "alice".to_string(),
            source_follower_handle: "alice".to_string(),
            text: format!("post {}", id),
            is_retweet: false,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    #[test]
    fn test_cursor_excludes_boundary_post() {
        let cursor = Cursor::older_than(1000).unwrap();
        assert_eq!(cursor.max_id(), 999);
        assert!(Cursor::older_than(0).is_none());
    }

    #[test]
    fn test_page_cursor_from_oldest_id() {
        let page = Page::from_posts(vec![post(30, 300), post(20, 200), post(10, 100)]);
        assert_eq!(page.next_cursor, Cursor::older_than(10));
        assert_eq!(page.oldest().unwrap().id, 10);
    }

    #[test]
    fn test_empty_page_has_no_cursor() {
        let page = Page::from_posts(Vec::new());
        assert!(page.is_empty());
        assert!(page.next_cursor.is_none());
        assert!(page.oldest().is_none());
    }

    #[test]
    fn test_key_ignores_provider_id() {
        let a = post(1, 100);
        let mut b = a.clone();
        b.id = 2;
        assert_eq!(a.key(), b.key());

        b.text = "edited".to_string();
        assert_ne!(a.key(), b.key());
    }
}
