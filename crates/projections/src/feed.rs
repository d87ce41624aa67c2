//! The event feed projection: a live, ordered list of events, newest first.

use std::sync::Arc;

use liveboard_protocol::{FeedEvent, FeedFrame, feed};

use crate::{
    error::Result,
    projection::{Projection, Reducer},
};

pub const EVENT_FEED_PATH: &str = "/api/stream/events";

pub struct EventFeedReducer;

impl Reducer for EventFeedReducer {
    type State = Vec<FeedEvent>;

    fn path(&self) -> &'static str {
        EVENT_FEED_PATH
    }

    fn recognized(&self) -> &'static [&'static str] {
        feed::RECOGNIZED
    }

    fn apply(
        &self,
        prev: Option<&Arc<Vec<FeedEvent>>>,
        name: &str,
        data: &str,
    ) -> liveboard_protocol::Result<Option<Arc<Vec<FeedEvent>>>> {
        let Some(frame) = FeedFrame::parse(name, data)? else {
            return Ok(None);
        };

        let next = match frame {
            FeedFrame::Snapshot(items) => items,
            FeedFrame::Created(event) => {
                let mut items = Vec::with_capacity(prev.map_or(0, |p| p.len()) + 1);
                items.push(event);
                if let Some(prev) = prev {
                    items.extend(prev.iter().cloned());
                }
                items
            },
            FeedFrame::Updated(event) => match prev {
                Some(prev) => prev
                    .iter()
                    .map(|e| if e.id == event.id { event.clone() } else { e.clone() })
                    .collect(),
                // Nothing to update before the initial snapshot.
                None => return Ok(None),
            },
            FeedFrame::Deleted(id) => match prev {
                Some(prev) => prev.iter().filter(|e| e.id != id).cloned().collect(),
                None => return Ok(None),
            },
        };

        Ok(Some(Arc::new(next)))
    }
}

/// Live event feed channel.
pub type EventFeed = Projection<EventFeedReducer>;

/// Open the event feed against the dashboard backend.
pub fn event_feed(base_url: &str, auth_token: &str) -> Result<EventFeed> {
    Projection::spawn(EventFeedReducer, base_url, auth_token)
}
