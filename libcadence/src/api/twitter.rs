//! Twitter REST API v1.1 client
//!
//! Uses application-only authentication: the consumer key and secret are
//! exchanged for a bearer token once, and every read carries that token.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::api::{TimelineApi, FOLLOWERS_ENDPOINT, TIMELINE_ENDPOINT};
use crate::credentials::Credentials;
use crate::error::{ApiError, Result};
use crate::rate_limit::{EndpointBudget, RateLimitSnapshot};
use crate::types::{Cursor, Follower, FollowerPage, Page, Post};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

const USER_AGENT: &str = concat!("cadence/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const FOLLOWERS_PAGE_SIZE: u32 = 200;

/// `created_at` layout used by v1.1 payloads, e.g. `Wed Oct 10 20:19:24 +0000 2018`
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct RawStatus {
    id: u64,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    text: Option<String>,
    created_at: String,
    user: RawUser,
    #[serde(default)]
    retweeted_status: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    id: u64,
    screen_name: String,
}

#[derive(Debug, Deserialize)]
struct RawFollowers {
    users: Vec<RawUser>,
    #[serde(default)]
    next_cursor: i64,
}

#[derive(Debug, Deserialize)]
struct RawRateLimits {
    resources: HashMap<String, HashMap<String, RawBudget>>,
}

#[derive(Debug, Deserialize)]
struct RawBudget {
    remaining: u32,
    reset: i64,
}

pub struct TwitterClient {
    client: Client,
    base_url: String,
    consumer_key: SecretString,
    consumer_secret: SecretString,
    bearer: Option<SecretString>,
}

impl TwitterClient {
    /// Build an unauthenticated client for the given credentials
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            consumer_key: SecretString::from(credentials.consumer_key().to_string()),
            consumer_secret: SecretString::from(credentials.consumer_secret().to_string()),
            bearer: None,
        })
    }

    /// Point the client at another host, e.g. a local test server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn basic_auth(&self) -> String {
        let pair = format!(
            "{}:{}",
            urlencoding::encode(self.consumer_key.expose_secret()),
            urlencoding::encode(self.consumer_secret.expose_secret())
        );
        format!("Basic {}", STANDARD.encode(pair))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        endpoint: &str,
    ) -> Result<T> {
        let bearer = self
            .bearer
            .as_ref()
            .ok_or_else(|| ApiError::Authentication("Client is not authenticated".to_string()))?;

        let url = build_url(&self.base_url, path, query);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer.expose_secret())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let reset = response
            .headers()
            .get("x-rate-limit-reset")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let mut error = classify_status(status, &body, endpoint);
            if let (ApiError::RateLimit(message), Some(reset)) = (&mut error, reset) {
                message.push_str(&format!(" (resets at {})", reset));
            }
            return Err(error.into());
        }

        serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()).into())
    }
}

#[async_trait]
impl TimelineApi for TwitterClient {
    async fn authenticate(&mut self) -> Result<()> {
        let url = format!("{}/oauth2/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", self.basic_auth())
            .header(
                "Content-Type",
                "application/x-www-form-urlencoded;charset=UTF-8",
            )
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(ApiError::Authentication(format!(
                "Token request rejected ({}): {}",
                status,
                snippet(&body)
            ))
            .into());
        }

        let token = parse_token(&body)?;
        self.bearer = Some(token);
        debug!("Obtained application bearer token");
        Ok(())
    }

    async fn timeline_page(
        &self,
        follower: &Follower,
        cursor: Option<Cursor>,
        page_size: u32,
    ) -> Result<Page> {
        let mut query = vec![
            ("user_id", follower.id.to_string()),
            ("count", page_size.to_string()),
            ("include_rts", "true".to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("max_id", cursor.max_id().to_string()));
        }

        let statuses: Vec<RawStatus> = self
            .get("/1.1/statuses/user_timeline.json", &query, TIMELINE_ENDPOINT)
            .await?;
        Ok(timeline_page_from(statuses, follower)?)
    }

    async fn follower_page(&self, account: &str, cursor: Option<i64>) -> Result<FollowerPage> {
        let query = [
            ("screen_name", account.to_string()),
            ("count", FOLLOWERS_PAGE_SIZE.to_string()),
            ("cursor", cursor.unwrap_or(-1).to_string()),
            ("skip_status", "true".to_string()),
        ];

        let raw: RawFollowers = self
            .get("/1.1/followers/list.json", &query, FOLLOWERS_ENDPOINT)
            .await?;
        Ok(follower_page_from(raw))
    }

    async fn rate_limit_status(&self) -> Result<RateLimitSnapshot> {
        let query = [("resources", "statuses,followers".to_string())];
        let raw: RawRateLimits = self
            .get("/1.1/application/rate_limit_status.json", &query, "")
            .await?;
        Ok(snapshot_from(raw, Utc::now())?)
    }

    fn name(&self) -> &str {
        "twitter"
    }
}

fn build_url(base_url: &str, path: &str, query: &[(&str, String)]) -> String {
    let query = query
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    if query.is_empty() {
        format!("{}{}", base_url, path)
    } else {
        format!("{}{}?{}", base_url, path, query)
    }
}

/// Map a non-success status to an API error
///
/// On timeline reads, 401/403/404 mean the follower's timeline is protected,
/// suspended or gone; anywhere else 401/403 mean our own token is bad.
fn classify_status(status: StatusCode, body: &str, endpoint: &str) -> ApiError {
    let detail = format!("HTTP {}: {}", status.as_u16(), snippet(body));
    match status {
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(detail),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
            if endpoint == TIMELINE_ENDPOINT =>
        {
            ApiError::Unavailable(detail)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Authentication(detail),
        _ => ApiError::Network(detail),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((index, _)) => &body[..index],
        None => body,
    }
}

fn parse_token(body: &str) -> std::result::Result<SecretString, ApiError> {
    let token: TokenResponse =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    if !token.token_type.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::Authentication(format!(
            "Unexpected token type '{}'",
            token.token_type
        )));
    }
    Ok(SecretString::from(token.access_token))
}

fn parse_created_at(raw: &str) -> std::result::Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_str(raw, CREATED_AT_FORMAT)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ApiError::Decode(format!("invalid created_at '{}': {}", raw, e)))
}

fn timeline_page_from(
    statuses: Vec<RawStatus>,
    follower: &Follower,
) -> std::result::Result<Page, ApiError> {
    let posts = statuses
        .into_iter()
        .map(|status| {
            Ok(Post {
                id: status.id,
                created_at: parse_created_at(&status.created_at)?,
                text: status.full_text.or(status.text).unwrap_or_default(),
                is_retweet: status.retweeted_status.is_some(),
                author_handle: status.user.screen_name,
                source_follower_handle: follower.handle.clone(),
            })
        })
        .collect::<std::result::Result<Vec<_>, ApiError>>()?;
    Ok(Page::from_posts(posts))
}

fn follower_page_from(raw: RawFollowers) -> FollowerPage {
    FollowerPage {
        followers: raw
            .users
            .into_iter()
            .map(|u| Follower::new(u.id, u.screen_name))
            .collect(),
        next_cursor: (raw.next_cursor != 0).then_some(raw.next_cursor),
    }
}

fn snapshot_from(
    raw: RawRateLimits,
    taken_at: DateTime<Utc>,
) -> std::result::Result<RateLimitSnapshot, ApiError> {
    let mut budgets = HashMap::new();
    for (endpoint, budget) in raw.resources.into_values().flatten() {
        let reset_at = Utc
            .timestamp_opt(budget.reset, 0)
            .single()
            .ok_or_else(|| ApiError::Decode(format!("invalid reset time {}", budget.reset)))?;
        budgets.insert(
            endpoint,
            EndpointBudget {
                remaining: budget.remaining,
                reset_at,
            },
        );
    }
    Ok(RateLimitSnapshot::new(taken_at, budgets))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMELINE: &str = r#"[
        {
            "id": 1790000000000000002,
            "full_text": "RT @someone: worth reading",
            "created_at": "Tue May 07 14:05:00 +0000 2024",
            "user": {"id": 42, "screen_name": "erin"},
            "retweeted_status": {"id": 1789999999999999999}
        },
        {
            "id": 1790000000000000001,
            "text": "good morning",
            "created_at": "Tue May 07 06:30:00 +0200 2024",
            "user": {"id": 42, "screen_name": "erin"}
        }
    ]"#;

    #[test]
    fn test_parse_timeline() {
        let statuses: Vec<RawStatus> = serde_json::from_str(TIMELINE).unwrap();
        let page = timeline_page_from(statuses, &Follower::new(42, "erin")).unwrap();

        assert_eq!(page.len(), 2);
        assert!(page.posts[0].is_retweet);
        assert_eq!(page.posts[0].text, "RT @someone: worth reading");
        assert!(!page.posts[1].is_retweet);
        assert_eq!(page.posts[1].text, "good morning");
        assert_eq!(
            page.posts[1].created_at,
            Utc.with_ymd_and_hms(2024, 5, 7, 4, 30, 0).unwrap()
        );
        assert_eq!(page.posts[1].source_follower_handle, "erin");
        assert_eq!(page.next_cursor, Cursor::older_than(1790000000000000001));
    }

    #[test]
    fn test_bad_created_at_is_decode_error() {
        let err = parse_created_at("2024-05-07T14:05:00Z").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_parse_followers_end_of_list() {
        let raw: RawFollowers = serde_json::from_str(
            r#"{"users": [{"id": 1, "screen_name": "a"}, {"id": 2, "screen_name": "b"}],
                "next_cursor": 0, "previous_cursor": 0}"#,
        )
        .unwrap();
        let page = follower_page_from(raw);
        assert_eq!(page.followers, vec![Follower::new(1, "a"), Follower::new(2, "b")]);
        assert_eq!(page.next_cursor, None);

        let raw: RawFollowers =
            serde_json::from_str(r#"{"users": [], "next_cursor": 1489467234237774933}"#).unwrap();
        assert_eq!(follower_page_from(raw).next_cursor, Some(1489467234237774933));
    }

    #[test]
    fn test_parse_rate_limits() {
        let raw: RawRateLimits = serde_json::from_str(
            r#"{
                "rate_limit_context": {"application": "abc"},
                "resources": {
                    "statuses": {
                        "/statuses/user_timeline": {"limit": 1500, "remaining": 1497, "reset": 1715090700}
                    },
                    "followers": {
                        "/followers/list": {"limit": 15, "remaining": 0, "reset": 1715090400}
                    }
                }
            }"#,
        )
        .unwrap();
        let taken_at = Utc.with_ymd_and_hms(2024, 5, 7, 14, 0, 0).unwrap();
        let snapshot = snapshot_from(raw, taken_at).unwrap();

        let timeline = snapshot.require(TIMELINE_ENDPOINT).unwrap();
        assert_eq!(timeline.remaining, 1497);
        assert_eq!(timeline.reset_at, Utc.timestamp_opt(1715090700, 0).unwrap());
        assert_eq!(snapshot.require(FOLLOWERS_ENDPOINT).unwrap().remaining, 0);
        assert_eq!(snapshot.taken_at(), taken_at);
    }

    #[test]
    fn test_classify_status() {
        let timeline_401 = classify_status(StatusCode::UNAUTHORIZED, "Not authorized.", TIMELINE_ENDPOINT);
        assert!(matches!(timeline_401, ApiError::Unavailable(_)));

        let followers_401 = classify_status(StatusCode::UNAUTHORIZED, "", FOLLOWERS_ENDPOINT);
        assert!(matches!(followers_401, ApiError::Authentication(_)));

        let throttled = classify_status(StatusCode::TOO_MANY_REQUESTS, "", TIMELINE_ENDPOINT);
        assert!(matches!(throttled, ApiError::RateLimit(_)));

        let outage = classify_status(StatusCode::SERVICE_UNAVAILABLE, "over capacity", TIMELINE_ENDPOINT);
        assert!(outage.to_string().contains("HTTP 503: over capacity"));
    }

    #[test]
    fn test_parse_token() {
        let token = parse_token(r#"{"token_type": "bearer", "access_token": "AAAA%2FAAA"}"#).unwrap();
        assert_eq!(token.expose_secret(), "AAAA%2FAAA");

        let err = parse_token(r#"{"token_type": "mac", "access_token": "x"}"#).unwrap_err();
        assert!(matches!(err, ApiError::Authentication(_)));
    }

    #[test]
    fn test_build_url_encodes_values() {
        let url = build_url(
            DEFAULT_BASE_URL,
            "/1.1/followers/list.json",
            &[("screen_name", "a b".to_string()), ("cursor", "-1".to_string())],
        );
        assert_eq!(
            url,
            "https://api.twitter.com/1.1/followers/list.json?screen_name=a%20b&cursor=-1"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        let creds = Credentials::new("root", "key", "sec ret");
        let client = TwitterClient::from_credentials(&creds).unwrap();
        // base64("key:sec%20ret")
        assert_eq!(client.basic_auth(), "Basic a2V5OnNlYyUyMHJldA==");
    }
}
