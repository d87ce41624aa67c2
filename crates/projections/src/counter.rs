//! The event counter projection: a single running total.

use std::sync::Arc;

use liveboard_protocol::{CounterFrame, EventCount, counter};

use crate::{
    error::Result,
    projection::{Projection, Reducer},
};

pub const EVENT_COUNTER_PATH: &str = "/api/stream/event-count";

pub struct EventCounterReducer;

impl Reducer for EventCounterReducer {
    type State = EventCount;

    fn path(&self) -> &'static str {
        EVENT_COUNTER_PATH
    }

    fn recognized(&self) -> &'static [&'static str] {
        counter::RECOGNIZED
    }

    fn apply(
        &self,
        _prev: Option<&Arc<EventCount>>,
        name: &str,
        data: &str,
    ) -> liveboard_protocol::Result<Option<Arc<EventCount>>> {
        Ok(CounterFrame::parse(name, data)?
            .map(|CounterFrame::Replace(count)| Arc::new(count)))
    }
}

/// Live event counter channel.
pub type EventCounter = Projection<EventCounterReducer>;

/// Open the event counter against the dashboard backend.
pub fn event_counter(base_url: &str, auth_token: &str) -> Result<EventCounter> {
    Projection::spawn(EventCounterReducer, base_url, auth_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_names_replace_the_count() {
        let first = EventCounterReducer
            .apply(None, counter::SNAPSHOT, r#"{"count":3}"#)
            .unwrap()
            .expect("snapshot populates");
        assert_eq!(first.count, 3);

        let second = EventCounterReducer
            .apply(Some(&first), counter::UPDATED, r#"{"count":4}"#)
            .unwrap()
            .expect("update replaces");
        assert_eq!(second.count, 4);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn foreign_names_are_ignored() {
        let result = EventCounterReducer
            .apply(None, "quota", r#"{"count":1}"#)
            .unwrap();
        assert!(result.is_none());
    }
}
