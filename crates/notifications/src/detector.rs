//! Snapshot diffing: which feed items are genuinely new?

use std::collections::HashSet;

use liveboard_protocol::FeedEvent;

/// Compares consecutive event-feed snapshots and yields the items that were
/// absent from the previous one.
///
/// An empty snapshot means "no data yet" and advances nothing, so a dropped
/// connection is never mistaken for an emptied feed. The first non-empty
/// snapshot seeds the baseline without yielding anything; initial load and
/// reconnect replay are not news.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    baseline: Option<HashSet<String>>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the latest snapshot. New items come back in the order they
    /// appear in `current` (network order, not re-sorted); the baseline is
    /// replaced with `current`'s ids whether or not anything was new.
    pub fn observe(&mut self, current: &[FeedEvent]) -> Vec<FeedEvent> {
        if current.is_empty() {
            return Vec::new();
        }

        let ids: HashSet<String> = current.iter().map(|e| e.id.clone()).collect();
        let fresh = match &self.baseline {
            None => Vec::new(),
            Some(previous) => current
                .iter()
                .filter(|e| !previous.contains(&e.id))
                .cloned()
                .collect(),
        };

        self.baseline = Some(ids);
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str) -> FeedEvent {
        FeedEvent {
            id: id.into(),
            title: id.to_uppercase(),
            message: None,
            kind: None,
            created_at: None,
        }
    }

    #[test]
    fn first_snapshot_yields_nothing() {
        let mut detector = ChangeDetector::new();
        let fresh = detector.observe(&[event("a"), event("b")]);
        assert!(fresh.is_empty());
    }

    #[test]
    fn added_item_is_detected() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[event("a")]);

        let fresh = detector.observe(&[event("a"), event("b")]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "b");
    }

    #[test]
    fn new_items_come_back_in_snapshot_order() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[event("a")]);

        let fresh = detector.observe(&[event("c"), event("a"), event("d")]);
        assert_eq!(
            fresh.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            ["c", "d"]
        );
    }

    #[test]
    fn empty_snapshot_does_not_advance_the_baseline() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[event("a")]);

        assert!(detector.observe(&[]).is_empty());

        // "a" is still baseline, so only "b" is new.
        let fresh = detector.observe(&[event("a"), event("b")]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "b");
    }

    #[test]
    fn removed_then_readded_item_is_new_again() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[event("a"), event("b")]);
        assert!(detector.observe(&[event("a")]).is_empty());

        let fresh = detector.observe(&[event("a"), event("b")]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "b");
    }

    #[test]
    fn unchanged_snapshot_yields_nothing() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[event("a"), event("b")]);
        assert!(detector.observe(&[event("a"), event("b")]).is_empty());
    }
}
