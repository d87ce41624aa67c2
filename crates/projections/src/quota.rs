//! The quota projection: remaining publishing allowance for the current
//! billing window.

use std::sync::Arc;

use liveboard_protocol::{Quota, QuotaFrame, quota};

use crate::{
    error::Result,
    projection::{Projection, Reducer},
};

pub const QUOTA_PATH: &str = "/api/stream/quota";

pub struct QuotaReducer;

impl Reducer for QuotaReducer {
    type State = Quota;

    fn path(&self) -> &'static str {
        QUOTA_PATH
    }

    fn recognized(&self) -> &'static [&'static str] {
        quota::RECOGNIZED
    }

    fn apply(
        &self,
        _prev: Option<&Arc<Quota>>,
        name: &str,
        data: &str,
    ) -> liveboard_protocol::Result<Option<Arc<Quota>>> {
        Ok(QuotaFrame::parse(name, data)?.map(|QuotaFrame::Replace(quota)| Arc::new(quota)))
    }
}

/// Live quota channel.
pub type QuotaFeed = Projection<QuotaReducer>;

/// Open the quota channel against the dashboard backend.
pub fn quota_feed(base_url: &str, auth_token: &str) -> Result<QuotaFeed> {
    Projection::spawn(QuotaReducer, base_url, auth_token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_replaced_wholesale() {
        let first = QuotaReducer
            .apply(None, quota::SNAPSHOT, r#"{"quota":{"used":1,"remaining":9}}"#)
            .unwrap()
            .expect("snapshot populates");
        assert_eq!(first.remaining, 9);

        let second = QuotaReducer
            .apply(
                Some(&first),
                quota::UPDATED,
                r#"{"quota":{"used":2,"remaining":8}}"#,
            )
            .unwrap()
            .expect("update replaces");
        assert_eq!((second.used, second.remaining), (2, 8));
        assert_eq!((first.used, first.remaining), (1, 9));
    }
}
