//! Deduplicated post corpus and its flat row form

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{Post, PostKey};

/// Day ordering used for sorting and heatmap rows, Sunday first
pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Position of `day` in [`WEEKDAY_ORDER`] (Sunday = 0)
pub fn weekday_index(day: Weekday) -> usize {
    day.num_days_from_sunday() as usize
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "Sunday",
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
    }
}

/// One persisted row
///
/// Column order is the table contract:
/// `root_user, follower, tweet, is_retweet, tweet_time, weekday, hour`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRow {
    pub root_user: String,
    pub follower: String,
    pub tweet: String,
    pub is_retweet: bool,
    pub tweet_time: DateTime<Utc>,
    #[serde(with = "weekday_serde")]
    pub weekday: Weekday,
    pub hour: u32,
}

/// Column names in table order
pub const COLUMNS: [&str; 7] = [
    "root_user",
    "follower",
    "tweet",
    "is_retweet",
    "tweet_time",
    "weekday",
    "hour",
];

impl CorpusRow {
    /// Flatten a post, deriving weekday and hour in `offset`
    pub fn from_post(root_user: &str, post: &Post, offset: FixedOffset) -> Self {
        let local = post.created_at.with_timezone(&offset);
        Self {
            root_user: root_user.to_string(),
            follower: post.source_follower_handle.clone(),
            tweet: post.text.clone(),
            is_retweet: post.is_retweet,
            tweet_time: post.created_at,
            weekday: local.weekday(),
            hour: local.hour(),
        }
    }
}

mod weekday_serde {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(super::weekday_name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse::<Weekday>()
            .map_err(|_| serde::de::Error::custom(format!("unknown weekday '{}'", name)))
    }
}

/// All accepted posts of one run, deduplicated
#[derive(Debug, Clone)]
pub struct Corpus {
    root_user: String,
    posts: Vec<Post>,
    seen: HashSet<PostKey>,
}

impl Corpus {
    pub fn new(root_user: impl Into<String>) -> Self {
        Self {
            root_user: root_user.into(),
            posts: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn root_user(&self) -> &str {
        &self.root_user
    }

    /// Add posts not already present, returning how many were new
    pub fn merge(&mut self, posts: impl IntoIterator<Item = Post>) -> usize {
        let before = self.posts.len();
        for post in posts {
            if self.seen.insert(post.key()) {
                self.posts.push(post);
            }
        }
        self.posts.len() - before
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// Flat rows with weekday/hour derived in `offset`
    pub fn rows(&self, offset: FixedOffset) -> Vec<CorpusRow> {
        self.posts
            .iter()
            .map(|p| CorpusRow::from_post(&self.root_user, p, offset))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn post(id: u64, text: &str, secs: i64) -> Post {
        Post {
            id,
            author_handle: "carol".to_string(),
            source_follower_handle: "carol".to_string(),
            text: text.to_string(),
            is_retweet: false,
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_merge_is_idempotent() {
        let page = vec![post(3, "c", 300), post(2, "b", 200), post(1, "a", 100)];
        let mut once = Corpus::new("root");
        once.merge(page.clone());

        let mut twice = Corpus::new("root");
        assert_eq!(twice.merge(page.clone()), 3);
        assert_eq!(twice.merge(page), 0);

        assert_eq!(once.posts(), twice.posts());
    }

    #[test]
    fn test_duplicates_within_one_merge_collapse() {
        let mut corpus = Corpus::new("root");
        let added = corpus.merge(vec![post(1, "same", 100), post(9, "same", 100)]);
        assert_eq!(added, 1);
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_same_text_from_different_followers_kept() {
        let mut corpus = Corpus::new("root");
        let mut other = post(1, "hello", 100);
        other.source_follower_handle = "dave".to_string();
        corpus.merge(vec![post(1, "hello", 100), other]);
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_row_derives_weekday_and_hour() {
        // 2024-05-05 was a Sunday
        let mut p = post(1, "late night", 0);
        p.created_at = Utc.with_ymd_and_hms(2024, 5, 5, 23, 30, 0).unwrap();

        let row = CorpusRow::from_post("root", &p, utc());
        assert_eq!(row.weekday, Weekday::Sun);
        assert_eq!(row.hour, 23);
        assert_eq!(row.follower, "carol");
        assert_eq!(row.root_user, "root");

        // Two hours east pushes it into Monday
        let shifted = CorpusRow::from_post("root", &p, FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(shifted.weekday, Weekday::Mon);
        assert_eq!(shifted.hour, 1);
        assert_eq!(shifted.tweet_time, p.created_at);
    }

    #[test]
    fn test_weekday_order_is_sunday_first() {
        for (index, day) in WEEKDAY_ORDER.iter().enumerate() {
            assert_eq!(weekday_index(*day), index);
        }
        assert_eq!(weekday_name(WEEKDAY_ORDER[0]), "Sunday");
        assert_eq!(weekday_name(WEEKDAY_ORDER[6]), "Saturday");
    }

    #[test]
    fn test_row_json_uses_weekday_names() {
        let mut p = post(1, "hi", 0);
        p.created_at = Utc.with_ymd_and_hms(2024, 5, 8, 10, 0, 0).unwrap();
        let row = CorpusRow::from_post("root", &p, utc());

        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["weekday"], "Wednesday");
        assert_eq!(json["hour"], 10);

        let back: CorpusRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
