//! Wire protocol for the liveboard server-push channels.
//!
//! Every live channel is a one-way `text/event-stream` connection carrying
//! named frames with JSON payloads. Payloads are parsed exactly once, at the
//! channel boundary, into the tagged frame enums below so that downstream
//! reducers match exhaustively instead of trusting untyped JSON shape.
//!
//! Channels:
//! - event feed:      `events` / `new-event` / `event-update` / `event-delete`
//! - event counter:   `event-count` / `event-count-update`
//! - quota:           `quota` / `quota-update`
//! - post statistics: `stats` / `stats-update` / `posts-by-status` / `posts-update`

use std::collections::BTreeMap;

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

// ── Event names ──────────────────────────────────────────────────────────────

pub mod feed {
    pub const SNAPSHOT: &str = "events";
    pub const CREATED: &str = "new-event";
    pub const UPDATED: &str = "event-update";
    pub const DELETED: &str = "event-delete";

    pub const RECOGNIZED: &[&str] = &[SNAPSHOT, CREATED, UPDATED, DELETED];
}

pub mod counter {
    pub const SNAPSHOT: &str = "event-count";
    pub const UPDATED: &str = "event-count-update";

    pub const RECOGNIZED: &[&str] = &[SNAPSHOT, UPDATED];
}

pub mod quota {
    pub const SNAPSHOT: &str = "quota";
    pub const UPDATED: &str = "quota-update";

    pub const RECOGNIZED: &[&str] = &[SNAPSHOT, UPDATED];
}

pub mod stats {
    pub const SNAPSHOT: &str = "stats";
    pub const UPDATED: &str = "stats-update";
    pub const BY_STATUS: &str = "posts-by-status";
    pub const BY_STATUS_UPDATED: &str = "posts-update";

    pub const RECOGNIZED: &[&str] = &[SNAPSHOT, UPDATED, BY_STATUS, BY_STATUS_UPDATED];
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed '{event}' payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    fn malformed(event: &str, source: serde_json::Error) -> Self {
        Self::MalformedPayload {
            event: event.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

fn decode<T: serde::de::DeserializeOwned>(event: &str, data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| Error::malformed(event, e))
}

// ── Domain payloads ──────────────────────────────────────────────────────────

/// One item on the event feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEvent {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(
        rename = "createdAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

/// Running total shown on the event counter badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCount {
    pub count: u64,
}

/// Publishing quota for the current billing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub used: u64,
    pub remaining: u64,
}

/// Post count per workflow status (`"published"`, `"scheduled"`, ...).
pub type PostsByStatus = BTreeMap<String, u64>;

/// Aggregate post statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total_posts: u64,
    pub total_views: u64,
    pub total_engagements: u64,
    #[serde(default)]
    pub posts_by_status: PostsByStatus,
}

// ── Wire envelopes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DeleteRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CounterPayload {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct QuotaPayload {
    quota: Quota,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByStatusPayload {
    posts_by_status: PostsByStatus,
}

// ── Frames ───────────────────────────────────────────────────────────────────

/// A parsed event-feed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedFrame {
    /// Initial full list, replacing anything held so far.
    Snapshot(Vec<FeedEvent>),
    /// A single new item, prepended to the feed.
    Created(FeedEvent),
    /// Replacement for the item with the matching id.
    Updated(FeedEvent),
    /// Removal of the item with this id.
    Deleted(String),
}

impl FeedFrame {
    /// Parse a named frame into a feed variant. `Ok(None)` for names the
    /// feed channel does not recognize.
    pub fn parse(name: &str, data: &str) -> Result<Option<Self>> {
        let frame = match name {
            feed::SNAPSHOT => Self::Snapshot(decode(name, data)?),
            feed::CREATED => Self::Created(decode(name, data)?),
            feed::UPDATED => Self::Updated(decode(name, data)?),
            feed::DELETED => Self::Deleted(decode::<DeleteRef>(name, data)?.id),
            _ => return Ok(None),
        };
        Ok(Some(frame))
    }
}

/// A parsed event-counter frame. Both names replace the count wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterFrame {
    Replace(EventCount),
}

impl CounterFrame {
    pub fn parse(name: &str, data: &str) -> Result<Option<Self>> {
        match name {
            counter::SNAPSHOT | counter::UPDATED => {
                let payload: CounterPayload = decode(name, data)?;
                Ok(Some(Self::Replace(EventCount {
                    count: payload.count,
                })))
            },
            _ => Ok(None),
        }
    }
}

/// A parsed quota frame. Both names replace the quota wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaFrame {
    Replace(Quota),
}

impl QuotaFrame {
    pub fn parse(name: &str, data: &str) -> Result<Option<Self>> {
        match name {
            quota::SNAPSHOT | quota::UPDATED => {
                let payload: QuotaPayload = decode(name, data)?;
                Ok(Some(Self::Replace(payload.quota)))
            },
            _ => Ok(None),
        }
    }
}

/// A parsed post-statistics frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsFrame {
    /// Full aggregate, replacing the previous value wholesale.
    Replace(PostStats),
    /// Status breakdown only; the reducer rebuilds a complete value from
    /// the previous aggregate.
    ReplaceByStatus(PostsByStatus),
}

impl StatsFrame {
    pub fn parse(name: &str, data: &str) -> Result<Option<Self>> {
        let frame = match name {
            stats::SNAPSHOT | stats::UPDATED => Self::Replace(decode(name, data)?),
            stats::BY_STATUS | stats::BY_STATUS_UPDATED => {
                Self::ReplaceByStatus(decode::<ByStatusPayload>(name, data)?.posts_by_status)
            },
            _ => return Ok(None),
        };
        Ok(Some(frame))
    }
}
