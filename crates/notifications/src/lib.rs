//! Notification derivation for the event feed.
//!
//! Raw server pushes are not user-facing notifications: reconnect replays
//! and initial loads would otherwise flood the user with items they have
//! already seen. This crate derives notifications the other way around: a
//! [`ChangeDetector`] diffs consecutive feed snapshots for genuinely new
//! items, and only those land in the bounded, read/unread
//! [`NotificationStore`].

pub mod bridge;
pub mod detector;
pub mod store;

pub use {
    bridge::attach,
    detector::ChangeDetector,
    store::{MAX_NOTIFICATIONS, Notification, NotificationStore},
};
