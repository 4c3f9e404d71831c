use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use trax_core::models::{Lane, Leg, Shipment, TrackingEvent};
use trax_core::repository::{
    EventStore, GeoResolver, JobQueue, NotificationStore, ShipmentStore, SignatureStorage,
    StoreError, TopologyResolver,
};
use trax_shared::{FanoutJob, NotificationJob};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, TrackingEvent>,
    legs: HashMap<Uuid, Leg>,
    lanes: HashMap<Uuid, Lane>,
    shipments: HashMap<Uuid, Shipment>,
}

/// In-memory document store implementing every read-side collaborator.
/// Backs the worker's local mode and the test suites.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_event(&self, event: TrackingEvent) {
        self.inner.write().unwrap().events.insert(event.id, event);
    }

    pub fn add_leg(&self, leg: Leg) {
        self.inner.write().unwrap().legs.insert(leg.id, leg);
    }

    pub fn add_lane(&self, lane: Lane) {
        self.inner.write().unwrap().lanes.insert(lane.id, lane);
    }

    pub fn add_shipment(&self, shipment: Shipment) {
        self.inner
            .write()
            .unwrap()
            .shipments
            .insert(shipment.id, shipment);
    }

    /// Flip the hidden flag on a stored event, the one mutation events
    /// permit.
    pub fn hide_event(&self, event_id: Uuid) {
        if let Some(event) = self.inner.write().unwrap().events.get_mut(&event_id) {
            event.hidden = true;
        }
    }

    /// Terminal leg ids in a lane, in cursor order. Test helper.
    pub fn terminal_leg_ids_sorted(&self, lane_id: Uuid) -> Vec<Uuid> {
        let inner = self.inner.read().unwrap();
        let mut ids: Vec<Uuid> = inner
            .legs
            .values()
            .filter(|leg| leg.terminal && leg.lane_id == Some(lane_id))
            .map(|leg| leg.id)
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn find_event(&self, id: Uuid) -> Result<Option<TrackingEvent>, StoreError> {
        Ok(self.inner.read().unwrap().events.get(&id).cloned())
    }

    async fn find_events_for_tracking_numbers(
        &self,
        tracking_numbers: &[String],
    ) -> Result<Vec<TrackingEvent>, StoreError> {
        let inner = self.inner.read().unwrap();

        // Target legs plus every leg sharing a lane with them: inbound
        // linehaul scans belong to the same shipment's history.
        let direct: Vec<&Leg> = inner
            .legs
            .values()
            .filter(|leg| tracking_numbers.contains(&leg.tracking_number))
            .collect();
        let lane_ids: Vec<Uuid> = direct.iter().filter_map(|leg| leg.lane_id).collect();
        let leg_ids: Vec<Uuid> = inner
            .legs
            .values()
            .filter(|leg| {
                tracking_numbers.contains(&leg.tracking_number)
                    || leg
                        .lane_id
                        .map_or(false, |lane_id| lane_ids.contains(&lane_id))
            })
            .map(|leg| leg.id)
            .collect();

        Ok(inner
            .events
            .values()
            .filter(|event| leg_ids.contains(&event.leg_id))
            .cloned()
            .collect())
    }

    async fn insert_event(&self, event: TrackingEvent) -> Result<(), StoreError> {
        self.add_event(event);
        Ok(())
    }
}

#[async_trait]
impl ShipmentStore for MemoryStore {
    async fn find_shipment(&self, id: Uuid) -> Result<Option<Shipment>, StoreError> {
        Ok(self.inner.read().unwrap().shipments.get(&id).cloned())
    }

    async fn find_shipment_by_tracking_number(
        &self,
        tracking_number: &str,
    ) -> Result<Option<Shipment>, StoreError> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .shipments
            .values()
            .find(|s| s.terminal_tracking_number == tracking_number)
            .cloned())
    }
}

#[async_trait]
impl TopologyResolver for MemoryStore {
    async fn find_leg(&self, id: Uuid) -> Result<Option<Leg>, StoreError> {
        Ok(self.inner.read().unwrap().legs.get(&id).cloned())
    }

    async fn terminal_legs_from(
        &self,
        leg_id: Uuid,
        limit: usize,
        after: Option<Uuid>,
    ) -> Result<Vec<Leg>, StoreError> {
        let inner = self.inner.read().unwrap();
        let Some(origin) = inner.legs.get(&leg_id) else {
            return Ok(Vec::new());
        };

        let mut reachable: Vec<Leg> = match origin.lane_id {
            Some(lane_id) => inner
                .legs
                .values()
                .filter(|leg| leg.terminal && leg.lane_id == Some(lane_id))
                .cloned()
                .collect(),
            // A terminal leg outside any lane reaches only itself.
            None if origin.terminal => vec![origin.clone()],
            None => Vec::new(),
        };

        reachable.sort_by_key(|leg| leg.id);
        Ok(reachable
            .into_iter()
            .filter(|leg| after.map_or(true, |cursor| leg.id > cursor))
            .take(limit)
            .collect())
    }
}

/// In-memory fan-out queue. The production queue runtime lives outside this
/// core; this stand-in preserves its at-least-once, FIFO contract.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<FanoutJob>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything currently queued. Test helper.
    pub fn drain(&self) -> Vec<FanoutJob> {
        self.jobs.lock().unwrap().drain(..).collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, jobs: Vec<FanoutJob>) -> Result<(), StoreError> {
        self.jobs.lock().unwrap().extend(jobs);
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<FanoutJob>, StoreError> {
        Ok(self.jobs.lock().unwrap().pop_front())
    }
}

/// Notification sink with duplicate suppression: redelivered jobs rebuild
/// identical notifications, and an exact match is skipped on create.
#[derive(Default)]
pub struct MemoryNotificationStore {
    jobs: Mutex<Vec<NotificationJob>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<NotificationJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn create_jobs(&self, jobs: &[NotificationJob]) -> Result<(), StoreError> {
        let mut stored = self.jobs.lock().unwrap();
        for job in jobs {
            if stored.contains(job) {
                tracing::debug!(requestor = %job.requestor, "Skipping duplicate notification job");
            } else {
                stored.push(job.clone());
            }
        }
        Ok(())
    }
}

/// Zip-prefix timezone table. A real deployment fronts a geo service; the
/// first-digit heuristic is enough for local mode and tests.
pub struct PrefixGeoResolver;

#[async_trait]
impl GeoResolver for PrefixGeoResolver {
    async fn timezone_for_zip(&self, zip: &str) -> Result<Option<String>, StoreError> {
        let tz = match zip.chars().next() {
            Some('0') | Some('1') | Some('2') | Some('3') => "America/New_York",
            Some('4') | Some('5') | Some('6') | Some('7') => "America/Chicago",
            Some('8') => "America/Denver",
            Some('9') => "America/Los_Angeles",
            _ => return Ok(None),
        };
        Ok(Some(tz.to_string()))
    }
}

/// Deterministic signed-URL issuer for local mode and tests.
pub struct StaticSignatureStorage {
    pub base_url: String,
}

impl Default for StaticSignatureStorage {
    fn default() -> Self {
        Self {
            base_url: "https://signatures.local".to_string(),
        }
    }
}

#[async_trait]
impl SignatureStorage for StaticSignatureStorage {
    async fn signed_url(&self, object_key: &str) -> Result<String, StoreError> {
        Ok(format!("{}/{}?ttl=900", self.base_url, object_key))
    }
}
