// Core data structures for the herald publishing engine

use chrono::{DateTime, Local, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured publishing identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_posts_per_day")]
    pub posts_per_day: u32,
    /// "HH:MM" slot for single-daily-slot accounts, none for quota-driven ones
    #[serde(default)]
    pub daily_slot: Option<String>,
    #[serde(default)]
    pub channel: ChannelChoice,
    #[serde(default)]
    pub visibility: VisibilityChoice,
    /// Persona hint passed through to the content generator
    #[serde(default)]
    pub profile: Option<String>,
    /// Opaque key/value pairs consumed by collaborators (poster login etc.)
    #[serde(default)]
    pub credentials: HashMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_posts_per_day() -> u32 {
    1
}

impl Account {
    /// Minimal account with defaults, mostly useful in tests and examples
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            active: true,
            posts_per_day: 1,
            daily_slot: None,
            channel: ChannelChoice::Feed,
            visibility: VisibilityChoice::Public,
            profile: None,
            credentials: HashMap::new(),
        }
    }
}

/// Publish channel on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostChannel {
    Feed,
    Album,
}

impl PostChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Album => "album",
        }
    }
}

impl std::fmt::Display for PostChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Post visibility on the remote service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostVisibility {
    Public,
    FollowersOnly,
}

impl PostVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::FollowersOnly => "followers_only",
        }
    }
}

impl std::fmt::Display for PostVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Channel setting on an account: a fixed channel, or a per-run coin flip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelChoice {
    Feed,
    Album,
    Random,
}

impl ChannelChoice {
    /// Resolve to a concrete channel, drawing once per run when random
    pub fn resolve<R: Rng>(&self, rng: &mut R) -> PostChannel {
        match self {
            Self::Feed => PostChannel::Feed,
            Self::Album => PostChannel::Album,
            Self::Random => {
                if rng.gen_bool(0.5) {
                    PostChannel::Feed
                } else {
                    PostChannel::Album
                }
            }
        }
    }
}

impl Default for ChannelChoice {
    fn default() -> Self {
        Self::Feed
    }
}

/// Visibility setting on an account: fixed, or a per-run coin flip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityChoice {
    Public,
    FollowersOnly,
    Random,
}

impl VisibilityChoice {
    /// Resolve to a concrete visibility, drawing once per run when random
    pub fn resolve<R: Rng>(&self, rng: &mut R) -> PostVisibility {
        match self {
            Self::Public => PostVisibility::Public,
            Self::FollowersOnly => PostVisibility::FollowersOnly,
            Self::Random => {
                if rng.gen_bool(0.5) {
                    PostVisibility::Public
                } else {
                    PostVisibility::FollowersOnly
                }
            }
        }
    }
}

impl Default for VisibilityChoice {
    fn default() -> Self {
        Self::Public
    }
}

/// Channel and visibility after per-run resolution, recorded for audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    pub channel: PostChannel,
    pub visibility: PostVisibility,
}

/// Generated content ready for publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedPost {
    pub title: String,
    pub body: String,
    pub char_count: usize,
}

impl GeneratedPost {
    /// Build from title and body, counting body characters (not bytes)
    pub fn from_parts(title: String, body: String) -> Self {
        let char_count = body.chars().count();
        Self {
            title,
            body,
            char_count,
        }
    }
}

/// What kind of send a run was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Normal scheduled or manual publish, counted against the daily quota
    Publish,
    /// One-off notification send from a random plan, not quota-counted
    Notification,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Notification => "notification",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "publish" => Some(Self::Publish),
            "notification" => Some(Self::Notification),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal status of a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Success,
    Failed,
    TestSkipped,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::TestSkipped => "test_skipped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "test_skipped" | "test-skipped" => Some(Self::TestSkipped),
            _ => None,
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content details attached to successful and test-skipped records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentMeta {
    pub title: String,
    pub char_count: usize,
    pub resource: String,
    pub channel: PostChannel,
    pub visibility: PostVisibility,
}

impl ContentMeta {
    pub fn new(post: &GeneratedPost, resource: &str, options: ResolvedOptions) -> Self {
        Self {
            title: post.title.clone(),
            char_count: post.char_count,
            resource: resource.to_string(),
            channel: options.channel,
            visibility: options.visibility,
        }
    }
}

/// One immutable entry in the append-only run history.
///
/// The calendar date is captured once at append time and is the only
/// source of truth for "today" queries afterwards, keeping day boundaries
/// stable no matter when the record is read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub account_id: String,
    pub account_name: String,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
    pub kind: RunKind,
    pub status: RecordStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub content: Option<ContentMeta>,
}

impl HistoryRecord {
    fn stamped(account: &Account, kind: RunKind, status: RecordStatus) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            account_name: account.name.clone(),
            created_at: Utc::now(),
            date: Local::now().date_naive(),
            kind,
            status,
            message: None,
            content: None,
        }
    }

    /// Record for a completed publish
    pub fn success(account: &Account, kind: RunKind, content: ContentMeta) -> Self {
        let mut record = Self::stamped(account, kind, RecordStatus::Success);
        record.content = Some(content);
        record
    }

    /// Record for a failed run attempt
    pub fn failure(account: &Account, kind: RunKind, message: impl Into<String>) -> Self {
        let mut record = Self::stamped(account, kind, RecordStatus::Failed);
        record.message = Some(message.into());
        record
    }

    /// Record for a run that generated content but skipped publishing
    pub fn test_skipped(account: &Account, kind: RunKind, content: ContentMeta) -> Self {
        let mut record = Self::stamped(account, kind, RecordStatus::TestSkipped);
        record.message = Some("posting disabled, publish skipped".to_string());
        record.content = Some(content);
        record
    }
}

/// Compact result of the most recent run, kept in the in-memory state table
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RecordStatus,
    pub message: Option<String>,
}

impl RunSummary {
    pub fn ok(status: RecordStatus) -> Self {
        Self {
            status,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: RecordStatus::Failed,
            message: Some(message.into()),
        }
    }
}
