use async_trait::async_trait;
use trax_shared::{FanoutJob, NotificationJob};
use uuid::Uuid;

use crate::models::{Leg, Shipment, TrackingEvent};

/// Failure talking to a backing store or resolver. Propagated to the job
/// runtime, which owns retry policy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Event/segment document store.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_event(&self, id: Uuid) -> Result<Option<TrackingEvent>, StoreError>;

    /// All events whose owning leg carries one of these tracking numbers,
    /// plus events from non-terminal legs in the same lanes.
    async fn find_events_for_tracking_numbers(
        &self,
        tracking_numbers: &[String],
    ) -> Result<Vec<TrackingEvent>, StoreError>;

    async fn insert_event(&self, event: TrackingEvent) -> Result<(), StoreError>;
}

/// Shipment lookup.
#[async_trait]
pub trait ShipmentStore: Send + Sync {
    async fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError>;

    /// None is normal for tracking numbers outside our order set.
    async fn find_shipment_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Shipment>, StoreError>;
}

/// Leg/lane graph queries.
#[async_trait]
pub trait TopologyResolver: Send + Sync {
    async fn find_leg(&self, id: Uuid) -> Result<Option<Leg>, StoreError>;

    /// Terminal legs reachable from the given leg through its lane, ordered
    /// by leg id. `after` is an exclusive cursor; at most `limit` results.
    async fn terminal_legs_from(
        &self,
        leg_id: Uuid,
        limit: usize,
        after: Option<Uuid>,
    ) -> Result<Vec<Leg>, StoreError>;
}

/// Durable queue handle for fan-out work. Passed explicitly; never a
/// module-global.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, jobs: Vec<FanoutJob>) -> Result<(), StoreError>;

    async fn dequeue(&self) -> Result<Option<FanoutJob>, StoreError>;
}

/// Durable sink for built notifications. Implementations must tolerate the
/// same batch being persisted more than once.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create_jobs(&self, jobs: &[NotificationJob]) -> Result<(), StoreError>;
}

/// Exchanges an internal signature object key for a time-limited signed URL.
#[async_trait]
pub trait SignatureStorage: Send + Sync {
    async fn signed_url(&self, object_key: &str) -> Result<String, StoreError>;
}

/// Resolves a destination zip to an IANA timezone name.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn timezone_for_zip(&self, zip: &str) -> Result<Option<String>, StoreError>;
}
