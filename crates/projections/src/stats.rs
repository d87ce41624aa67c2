//! The post statistics projection.
//!
//! Two frame families feed one state value: `stats`/`stats-update` carry
//! the full aggregate, `posts-by-status`/`posts-update` carry only the
//! status breakdown. The reducer always yields a complete value; a
//! breakdown arriving before the first full aggregate is held back rather
//! than exposing a torn one.

use std::sync::Arc;

use liveboard_protocol::{PostStats, StatsFrame, stats};

use crate::{
    error::Result,
    projection::{Projection, Reducer},
};

pub const POST_STATS_PATH: &str = "/api/stream/post-stats";

pub struct PostStatsReducer;

impl Reducer for PostStatsReducer {
    type State = PostStats;

    fn path(&self) -> &'static str {
        POST_STATS_PATH
    }

    fn recognized(&self) -> &'static [&'static str] {
        stats::RECOGNIZED
    }

    fn apply(
        &self,
        prev: Option<&Arc<PostStats>>,
        name: &str,
        data: &str,
    ) -> liveboard_protocol::Result<Option<Arc<PostStats>>> {
        let Some(frame) = StatsFrame::parse(name, data)? else {
            return Ok(None);
        };

        let next = match frame {
            StatsFrame::Replace(stats) => stats,
            StatsFrame::ReplaceByStatus(by_status) => match prev {
                Some(prev) => {
                    let mut next = (**prev).clone();
                    next.posts_by_status = by_status;
                    next
                },
                None => return Ok(None),
            },
        };

        Ok(Some(Arc::new(next)))
    }
}

/// Live post statistics channel.
pub type PostStatsFeed = Projection<PostStatsReducer>;

/// Open the post statistics channel against the dashboard backend.
pub fn post_stats_feed(base_url: &str, auth_token: &str) -> Result<PostStatsFeed> {
    Projection::spawn(PostStatsReducer, base_url, auth_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = concat!(
        r#"{"totalPosts":10,"totalViews":200,"totalEngagements":30,"#,
        r#""postsByStatus":{"published":7,"scheduled":3}}"#,
    );

    #[test]
    fn full_aggregate_replaces_wholesale() {
        let state = PostStatsReducer
            .apply(None, stats::SNAPSHOT, FULL)
            .unwrap()
            .expect("snapshot populates");
        assert_eq!(state.total_posts, 10);
        assert_eq!(state.posts_by_status.get("published"), Some(&7));
    }

    #[test]
    fn breakdown_rebuilds_a_complete_value() {
        let first = PostStatsReducer
            .apply(None, stats::SNAPSHOT, FULL)
            .unwrap()
            .expect("snapshot populates");
        let second = PostStatsReducer
            .apply(
                Some(&first),
                stats::BY_STATUS_UPDATED,
                r#"{"postsByStatus":{"published":8,"scheduled":2}}"#,
            )
            .unwrap()
            .expect("breakdown replaces");

        assert_eq!(second.posts_by_status.get("published"), Some(&8));
        // The rest of the aggregate carries over intact.
        assert_eq!(second.total_views, 200);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.posts_by_status.get("published"), Some(&7));
    }

    #[test]
    fn breakdown_before_first_aggregate_is_held_back() {
        let result = PostStatsReducer
            .apply(None, stats::BY_STATUS, r#"{"postsByStatus":{"draft":1}}"#)
            .unwrap();
        assert!(result.is_none());
    }
}
