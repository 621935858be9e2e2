//! Event types published after a persistence cycle.

use serde::Serialize;

use droptrack_core::Release;

/// Channel name for the full-list event.
pub const RELEASES_UPDATED: &str = "releases:updated";
/// Channel name for a single newly-inserted release.
pub const RELEASE_NEW: &str = "release:new";

/// A change event emitted after a persistence cycle.
///
/// All `New` events for one cycle are published before that cycle's
/// `ListUpdated`; events from different cycles never interleave because
/// cycles themselves are serialized by the invoker.
#[derive(Debug, Clone)]
pub enum ReleaseEvent {
    /// The full current release list changed.
    ListUpdated { releases: Vec<Release> },
    /// One release was inserted (not updated) this cycle.
    New { release: Release },
}

/// Wire shape: `{"event": "<channel>", "data": ...}`.
#[derive(Debug, Serialize)]
struct WireFrame<'a, T: Serialize> {
    event: &'a str,
    data: T,
}

impl ReleaseEvent {
    /// The named channel this event belongs to.
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            ReleaseEvent::ListUpdated { .. } => RELEASES_UPDATED,
            ReleaseEvent::New { .. } => RELEASE_NEW,
        }
    }

    /// Serializes the event to its JSON wire frame.
    ///
    /// Serialization of these types cannot fail; the fallback empty-object
    /// frame exists to keep the send path infallible regardless.
    #[must_use]
    pub fn to_frame(&self) -> String {
        let result = match self {
            ReleaseEvent::ListUpdated { releases } => serde_json::to_string(&WireFrame {
                event: RELEASES_UPDATED,
                data: releases,
            }),
            ReleaseEvent::New { release } => serde_json::to_string(&WireFrame {
                event: RELEASE_NEW,
                data: release,
            }),
        };
        result.unwrap_or_else(|_| format!("{{\"event\":\"{}\",\"data\":null}}", self.channel()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use droptrack_core::ReleaseStatus;

    fn make_release(id: &str) -> Release {
        Release {
            id: id.to_string(),
            source_key: "air-max-1".to_string(),
            retailer_id: "feature".to_string(),
            retailer_name: "Feature".to_string(),
            product_name: Some("Air Max 1".to_string()),
            release_date: None,
            price: Some(130.0),
            currency: "USD".to_string(),
            status: ReleaseStatus::Live,
            url: "https://feature.com/products/air-max-1".to_string(),
            region: "US".to_string(),
            images: vec![],
        }
    }

    #[test]
    fn channels_match_the_wire_names() {
        let new = ReleaseEvent::New {
            release: make_release("feature-air-max-1"),
        };
        let updated = ReleaseEvent::ListUpdated { releases: vec![] };
        assert_eq!(new.channel(), "release:new");
        assert_eq!(updated.channel(), "releases:updated");
    }

    #[test]
    fn new_event_frames_single_release() {
        let event = ReleaseEvent::New {
            release: make_release("feature-air-max-1"),
        };
        let frame: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(frame["event"], "release:new");
        assert_eq!(frame["data"]["id"], "feature-air-max-1");
        assert_eq!(frame["data"]["status"], "live");
    }

    #[test]
    fn list_updated_frames_full_list() {
        let event = ReleaseEvent::ListUpdated {
            releases: vec![make_release("feature-a"), make_release("feature-b")],
        };
        let frame: serde_json::Value = serde_json::from_str(&event.to_frame()).unwrap();
        assert_eq!(frame["event"], "releases:updated");
        assert_eq!(frame["data"].as_array().unwrap().len(), 2);
    }
}
