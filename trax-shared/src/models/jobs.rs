use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire message for one unit of notification fan-out work.
///
/// The queue runtime redelivers at least once, so every variant must be safe
/// to process twice. `Continue` carries the cursor for resuming a paginated
/// lane scan; a scan terminates when a page comes back shorter than `limit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FanoutJob {
    /// Resume terminal-leg discovery after the given leg id.
    #[serde(rename_all = "camelCase")]
    Continue {
        event_id: Uuid,
        limit: usize,
        after: Uuid,
    },
    /// Dispatch one event against one already-resolved terminal leg.
    #[serde(rename_all = "camelCase")]
    EventForLeg { event_id: Uuid, leg_id: Uuid },
    /// Entry point: discover the terminal legs this event affects.
    #[serde(rename_all = "camelCase")]
    Event { event_id: Uuid },
}

/// A notification built by a dispatcher, persisted for the delivery workers.
/// Created once, never mutated by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub requestor: String,
    pub request: serde_json::Value,
}
