use std::sync::Arc;

use async_trait::async_trait;
use trax_core::models::{Leg, Shipment, TrackingEvent};
use trax_core::status::TaxonomyError;
use trax_core::IntegrationRegistry;
use trax_shared::NotificationJob;

/// Resolved context handed to every dispatcher for one (event, leg) pair.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// None when the tracking number belongs to no shipment of ours. That is
    /// normal and produces zero jobs, not an error.
    pub shipment: Option<Shipment>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}

/// A pluggable notification builder. Implementations must be idempotent:
/// the job runtime may hand the same (event, leg) pair to a dispatcher more
/// than once.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn name(&self) -> &'static str;

    async fn build_notifications(
        &self,
        event: &TrackingEvent,
        leg: &Leg,
        ctx: &DispatchContext,
    ) -> Result<Vec<NotificationJob>, DispatchError>;
}

/// Builds one delivery job per webhook subscription on the shipment.
pub struct WebhookDispatcher;

#[async_trait]
impl Dispatcher for WebhookDispatcher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn build_notifications(
        &self,
        event: &TrackingEvent,
        leg: &Leg,
        ctx: &DispatchContext,
    ) -> Result<Vec<NotificationJob>, DispatchError> {
        let Some(shipment) = &ctx.shipment else {
            return Ok(Vec::new());
        };

        let jobs = shipment
            .webhook_urls
            .iter()
            .map(|url| NotificationJob {
                requestor: format!("webhook:{url}"),
                request: serde_json::json!({
                    "url": url,
                    "shipmentId": shipment.id,
                    "trackingNumber": leg.tracking_number,
                    "status": event.external_status,
                    "timestamp": event.timestamp,
                    "message": event.message,
                }),
            })
            .collect();
        Ok(jobs)
    }
}

/// Pushes status updates to the marketplace for shipments that originated
/// there. The translation table is verified complete at startup, so a miss
/// here means the process check was bypassed; it surfaces as an error.
pub struct MarketplaceDispatcher {
    registry: Arc<IntegrationRegistry>,
    integration: &'static str,
}

impl MarketplaceDispatcher {
    pub fn new(registry: Arc<IntegrationRegistry>) -> Self {
        Self {
            registry,
            integration: "marketplace",
        }
    }
}

#[async_trait]
impl Dispatcher for MarketplaceDispatcher {
    fn name(&self) -> &'static str {
        "marketplace"
    }

    async fn build_notifications(
        &self,
        event: &TrackingEvent,
        leg: &Leg,
        ctx: &DispatchContext,
    ) -> Result<Vec<NotificationJob>, DispatchError> {
        let Some(shipment) = &ctx.shipment else {
            return Ok(Vec::new());
        };
        let Some(order_ref) = &shipment.marketplace_order_ref else {
            return Ok(Vec::new());
        };

        let code = self
            .registry
            .translate(self.integration, event.canonical_status)?;

        Ok(vec![NotificationJob {
            requestor: self.integration.to_string(),
            request: serde_json::json!({
                "orderRef": order_ref,
                "trackingNumber": leg.tracking_number,
                "statusCode": code,
                "timestamp": event.timestamp,
            }),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use trax_core::models::ShipmentStatus;
    use trax_core::status::{CanonicalStatus, Provider};
    use trax_shared::{Address, Location};
    use uuid::Uuid;

    fn leg() -> Leg {
        Leg {
            id: Uuid::new_v4(),
            provider: Provider::Usps,
            tracking_number: "9400TEST".to_string(),
            lane_id: None,
            ship_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            terminal: true,
        }
    }

    fn event(leg: &Leg) -> TrackingEvent {
        TrackingEvent::from_scan(leg, Utc::now(), "DELIVERED", "Delivered, front door").unwrap()
    }

    fn shipment(webhooks: Vec<String>, order_ref: Option<String>) -> Shipment {
        Shipment {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: ShipmentStatus::Active,
            terminal_provider: Provider::Usps,
            terminal_tracking_number: "9400TEST".to_string(),
            origin: Location::default(),
            destination: Address {
                line1: "1 Main St".to_string(),
                line2: None,
                city: "Austin".to_string(),
                state: "TX".to_string(),
                zip: "78701".to_string(),
            },
            marketplace_order_ref: order_ref,
            webhook_urls: webhooks,
        }
    }

    #[tokio::test]
    async fn test_webhook_dispatcher_builds_one_job_per_subscription() {
        let leg = leg();
        let event = event(&leg);
        let ctx = DispatchContext {
            shipment: Some(shipment(
                vec![
                    "https://a.example/hook".to_string(),
                    "https://b.example/hook".to_string(),
                ],
                None,
            )),
        };

        let jobs = WebhookDispatcher
            .build_notifications(&event, &leg, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].requestor, "webhook:https://a.example/hook");
        assert_eq!(jobs[0].request["status"], "DELIVERED");
    }

    #[tokio::test]
    async fn test_no_shipment_means_zero_jobs() {
        let leg = leg();
        let event = event(&leg);
        let ctx = DispatchContext { shipment: None };

        let jobs = WebhookDispatcher
            .build_notifications(&event, &leg, &ctx)
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_marketplace_dispatcher_translates_status() {
        let registry = Arc::new(IntegrationRegistry::with_marketplace_defaults());
        let dispatcher = MarketplaceDispatcher::new(registry);
        let leg = leg();
        let event = event(&leg);
        let ctx = DispatchContext {
            shipment: Some(shipment(Vec::new(), Some("MKT-1234".to_string()))),
        };

        let jobs = dispatcher
            .build_notifications(&event, &leg, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].requestor, "marketplace");
        assert_eq!(jobs[0].request["statusCode"], "DELIVERED");
        assert_eq!(jobs[0].request["orderRef"], "MKT-1234");
    }

    #[tokio::test]
    async fn test_marketplace_dispatcher_skips_non_marketplace_shipments() {
        let registry = Arc::new(IntegrationRegistry::with_marketplace_defaults());
        let dispatcher = MarketplaceDispatcher::new(registry);
        let leg = leg();
        let event = event(&leg);
        let ctx = DispatchContext {
            shipment: Some(shipment(Vec::new(), None)),
        };

        let jobs = dispatcher
            .build_notifications(&event, &leg, &ctx)
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_attempt_detail_does_not_break_translation() {
        let registry = Arc::new(IntegrationRegistry::with_marketplace_defaults());
        let dispatcher = MarketplaceDispatcher::new(registry);
        let leg = leg();
        let mut event = event(&leg);
        event.canonical_status = CanonicalStatus::DeliveryAttempted(Some(
            trax_core::status::AttemptDetail::MailboxFull,
        ));
        event.external_status = event.canonical_status.external();
        let ctx = DispatchContext {
            shipment: Some(shipment(Vec::new(), Some("MKT-9".to_string()))),
        };

        let jobs = dispatcher
            .build_notifications(&event, &leg, &ctx)
            .await
            .unwrap();
        assert_eq!(jobs[0].request["statusCode"], "ATTEMPTED_DELIVERY");
    }
}
