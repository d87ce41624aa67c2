//! Typed live-data channels built on [`liveboard_stream`].
//!
//! A projection is one [`StreamChannel`](liveboard_stream::StreamChannel)
//! plus a small reducer: the channel delivers recognized named frames, the
//! reducer folds each one into a typed state value. State is replaced
//! wholesale on every update, never mutated in place, so consumers can
//! detect change with `Arc::ptr_eq` and never observe a torn value.
//!
//! Consumers read through the hook-like [`ProjectionView`] contract
//! (`{state, is_connected, error}`) or register listeners via
//! [`Projection::subscribe`]; the UI binding itself is an adapter outside
//! this crate.

pub mod counter;
pub mod error;
pub mod feed;
pub mod projection;
pub mod quota;
pub mod stats;

pub use {
    counter::{EventCounter, event_counter},
    error::{Error, Result},
    feed::{EventFeed, event_feed},
    projection::{Projection, ProjectionView, Reducer, Subscription},
    quota::{QuotaFeed, quota_feed},
    stats::{PostStatsFeed, post_stats_feed},
};
