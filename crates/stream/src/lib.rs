//! Resilient server-push streaming connections.
//!
//! A [`StreamChannel`] wraps one `text/event-stream` connection to one
//! backend endpoint: it owns the connect/reconnect lifecycle, filters frames
//! to the channel's recognized event names, and delivers them to the
//! consumer in network arrival order. Transport failures trigger exponential
//! backoff with a bounded retry budget; exhausting the budget parks the
//! channel in a terminal error state until it is explicitly re-opened
//! (typically after a credential refresh).
//!
//! The transport is strictly server → client. Payloads are delivered as raw
//! JSON text; typed parsing happens downstream at the projection boundary.

pub mod channel;
pub mod config;
pub mod error;

mod sse;

pub use {
    channel::{ChannelEvent, ChannelStatus, StreamChannel},
    config::{ChannelConfig, ReconnectPolicy, TokenPlacement},
    error::{Error, Result},
};
