use std::sync::Arc;

use trax_core::models::TrackingEvent;
use trax_core::repository::{
    EventStore, JobQueue, NotificationStore, ShipmentStore, StoreError, TopologyResolver,
};
use trax_shared::{FanoutJob, NotificationJob};
use tracing::{debug, info};
use uuid::Uuid;

use crate::dispatch::{DispatchContext, DispatchError, Dispatcher};

/// Page size for terminal-leg discovery. Bounds the work a single job
/// invocation can do regardless of lane size.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum FanoutError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Event not found: {0}")]
    EventNotFound(Uuid),

    #[error("Leg not found: {0}")]
    LegNotFound(Uuid),
}

/// Turns one stored event into per-leg notification jobs.
///
/// A leg-bound job dispatches directly. An unbound job pages through the
/// terminal legs reachable from the event's originating leg, re-enqueueing
/// itself with a cursor when a page comes back full, and one leg-bound job
/// per result. Every path tolerates at-least-once redelivery.
pub struct FanoutScheduler {
    events: Arc<dyn EventStore>,
    shipments: Arc<dyn ShipmentStore>,
    topology: Arc<dyn TopologyResolver>,
    queue: Arc<dyn JobQueue>,
    notifications: Arc<dyn NotificationStore>,
    dispatchers: Vec<Arc<dyn Dispatcher>>,
    page_limit: usize,
}

impl FanoutScheduler {
    pub fn new(
        events: Arc<dyn EventStore>,
        shipments: Arc<dyn ShipmentStore>,
        topology: Arc<dyn TopologyResolver>,
        queue: Arc<dyn JobQueue>,
        notifications: Arc<dyn NotificationStore>,
    ) -> Self {
        Self {
            events,
            shipments,
            topology,
            queue,
            notifications,
            dispatchers: Vec::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn register(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.push(dispatcher);
        self
    }

    /// Execute one fan-out job to completion.
    pub async fn run(&self, job: FanoutJob) -> Result<(), FanoutError> {
        match job {
            FanoutJob::Event { event_id } => self.discover(event_id, self.page_limit, None).await,
            FanoutJob::Continue {
                event_id,
                limit,
                after,
            } => self.discover(event_id, limit, Some(after)).await,
            FanoutJob::EventForLeg { event_id, leg_id } => {
                self.dispatch_direct(event_id, leg_id).await
            }
        }
    }

    /// Page through reachable terminal legs, reducing the event to one
    /// leg-bound job each, plus a continuation when the page was full.
    async fn discover(
        &self,
        event_id: Uuid,
        limit: usize,
        after: Option<Uuid>,
    ) -> Result<(), FanoutError> {
        let Some(event) = self.load_visible_event(event_id).await? else {
            return Ok(());
        };

        let page = self
            .topology
            .terminal_legs_from(event.leg_id, limit, after)
            .await?;
        if page.is_empty() {
            return Ok(());
        }

        let mut jobs: Vec<FanoutJob> = page
            .iter()
            .map(|leg| FanoutJob::EventForLeg {
                event_id,
                leg_id: leg.id,
            })
            .collect();

        // A full page may mean more legs remain; a short page is the
        // termination condition.
        if page.len() == limit {
            if let Some(last) = page.last() {
                jobs.push(FanoutJob::Continue {
                    event_id,
                    limit,
                    after: last.id,
                });
            }
        }

        info!(
            %event_id,
            legs = page.len(),
            continued = page.len() == limit,
            "Fanning out event to terminal legs"
        );
        self.queue.enqueue(jobs).await?;
        Ok(())
    }

    /// Dispatch one event against one resolved terminal leg.
    async fn dispatch_direct(&self, event_id: Uuid, leg_id: Uuid) -> Result<(), FanoutError> {
        let Some(event) = self.load_visible_event(event_id).await? else {
            return Ok(());
        };

        let leg = self
            .topology
            .find_leg(leg_id)
            .await?
            .ok_or(FanoutError::LegNotFound(leg_id))?;

        let shipment = self
            .shipments
            .find_shipment_by_tracking_number(&leg.tracking_number)
            .await?;
        let ctx = DispatchContext { shipment };

        let mut built: Vec<NotificationJob> = Vec::new();
        for dispatcher in &self.dispatchers {
            let jobs = dispatcher.build_notifications(&event, &leg, &ctx).await?;
            debug!(
                dispatcher = dispatcher.name(),
                %event_id,
                jobs = jobs.len(),
                "Dispatcher built notifications"
            );
            built.extend(jobs);
        }

        // One create call for the whole batch; the store absorbs duplicates
        // from redelivered jobs.
        if !built.is_empty() {
            self.notifications.create_jobs(&built).await?;
        }
        Ok(())
    }

    /// Load an event, treating hidden ones as absent: hidden events reach no
    /// consumer, notification dispatchers included.
    async fn load_visible_event(
        &self,
        event_id: Uuid,
    ) -> Result<Option<TrackingEvent>, FanoutError> {
        let event = self
            .events
            .find_event(event_id)
            .await?
            .ok_or(FanoutError::EventNotFound(event_id))?;
        if event.hidden {
            debug!(%event_id, "Dropping fan-out for hidden event");
            return Ok(None);
        }
        Ok(Some(event))
    }
}
