//! Wiring from a live event feed into the notification store.

use std::sync::{Arc, Mutex};

use tracing::debug;

use liveboard_projections::{EventFeed, Subscription};

use crate::{detector::ChangeDetector, store::NotificationStore};

/// Subscribe a change detector to a live event feed and forward each newly
/// appearing item into the store, in snapshot order. Dropping the returned
/// subscription stops the forwarding.
pub fn attach(feed: &EventFeed, store: Arc<NotificationStore>) -> Subscription {
    let detector = Mutex::new(ChangeDetector::new());
    feed.subscribe(move |snapshot| {
        let fresh = match detector.lock() {
            Ok(mut detector) => detector.observe(snapshot),
            Err(_) => return,
        };
        if fresh.is_empty() {
            return;
        }
        debug!(count = fresh.len(), "new feed items detected");
        for event in fresh {
            store.add(event);
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use liveboard_projections::{Projection, feed::EventFeedReducer};
    use liveboard_stream::{ChannelConfig, ReconnectPolicy};

    use super::*;

    async fn wait_for<T>(mut probe: impl FnMut() -> Option<T>) -> T {
        for _ in 0..500 {
            if let Some(value) = probe() {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not met in time");
    }

    #[tokio::test]
    async fn only_genuinely_new_items_become_notifications() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/stream/events")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                // Baseline snapshot: no notifications for it.
                "event: events\n",
                "data: [{\"id\":\"a\",\"title\":\"existing\"}]\n\n",
                // One genuinely new item.
                "event: new-event\n",
                "data: {\"id\":\"b\",\"title\":\"fresh\"}\n\n",
                // An update to a known item: not news.
                "event: event-update\n",
                "data: {\"id\":\"a\",\"title\":\"renamed\"}\n\n",
            ))
            .create_async()
            .await;

        let config = ChannelConfig::new(
            format!("{}/api/stream/events", server.url()),
            "token-1",
            &[],
        )
        .with_reconnect(ReconnectPolicy {
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
            max_attempts: 3,
        });
        let feed = Projection::spawn_with_config(EventFeedReducer, config).unwrap();

        let store = Arc::new(NotificationStore::new());
        let _subscription = attach(&feed, Arc::clone(&store));

        wait_for(|| (store.len() == 1).then_some(())).await;
        // Let the remaining frames drain to prove nothing else lands.
        wait_for(|| {
            feed.state()
                .filter(|s| s.iter().any(|e| e.title == "renamed"))
        })
        .await;

        let entries = store.notifications();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source.id, "b");
        assert!(!entries[0].is_read);
        assert_eq!(store.unread_count(), 1);

        feed.close();
    }

    #[tokio::test]
    async fn dropping_the_subscription_stops_forwarding() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/stream/events")
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(concat!(
                "event: events\n",
                "data: [{\"id\":\"a\",\"title\":\"existing\"}]\n\n",
                "event: new-event\n",
                "data: {\"id\":\"b\",\"title\":\"fresh\"}\n\n",
            ))
            .create_async()
            .await;

        let config = ChannelConfig::new(
            format!("{}/api/stream/events", server.url()),
            "token-1",
            &[],
        )
        .with_reconnect(ReconnectPolicy {
            base_delay_ms: 60_000,
            max_delay_ms: 60_000,
            max_attempts: 3,
        });
        let feed = Projection::spawn_with_config(EventFeedReducer, config).unwrap();

        let store = Arc::new(NotificationStore::new());
        let subscription = attach(&feed, Arc::clone(&store));
        subscription.unsubscribe();

        wait_for(|| feed.state().filter(|s| s.len() == 2)).await;
        assert!(store.is_empty());

        feed.close();
    }
}
