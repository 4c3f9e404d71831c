use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use trax_core::models::{Shipment, TrackingEvent};
use trax_core::repository::{EventStore, GeoResolver, SignatureStorage, StoreError};
use trax_core::status::{CanonicalStatus, ExternalStatus};
use trax_shared::Location;
use tracing::warn;
use uuid::Uuid;

use crate::estimator::{self, EstimatorOptions};
use crate::timeline;

/// The externally visible tracking record. Recomputed on every read, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedTrackingRecord {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub events: Vec<PresentedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentedEvent {
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub message: String,
    pub location: Location,
    pub expected_delivery_date: Option<DateTime<Utc>>,
    pub signature: Option<String>,
    pub signature_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    pub estimator: EstimatorOptions,
    /// Used when the destination zip does not resolve to a timezone.
    pub default_timezone: Tz,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            estimator: EstimatorOptions::default(),
            default_timezone: chrono_tz::America::Chicago,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Shapes the canonical timeline and delivery estimate for one shipment.
pub struct TrackingAssembler {
    events: Arc<dyn EventStore>,
    signatures: Arc<dyn SignatureStorage>,
    geo: Arc<dyn GeoResolver>,
    options: AssemblerOptions,
}

impl TrackingAssembler {
    pub fn new(
        events: Arc<dyn EventStore>,
        signatures: Arc<dyn SignatureStorage>,
        geo: Arc<dyn GeoResolver>,
        options: AssemblerOptions,
    ) -> Self {
        Self {
            events,
            signatures,
            geo,
            options,
        }
    }

    pub async fn assemble(
        &self,
        shipment: &Shipment,
    ) -> Result<PresentedTrackingRecord, AssembleError> {
        self.assemble_at(shipment, Utc::now()).await
    }

    /// Like [`assemble`](Self::assemble) with an injected clock.
    pub async fn assemble_at(
        &self,
        shipment: &Shipment,
        now: DateTime<Utc>,
    ) -> Result<PresentedTrackingRecord, AssembleError> {
        let mut events = self
            .events
            .find_events_for_tracking_numbers(&[shipment.terminal_tracking_number.clone()])
            .await?;

        // Some carriers never emit a label-created scan; anchor the timeline
        // on the order placement instead. A hidden label-created event counts
        // as present: hiding the anchor suppresses the history, and a
        // synthetic replacement would undo that.
        if !events.iter().any(|e| e.is_label_created()) {
            events.insert(0, synthesize_anchor(shipment));
        }

        let timeline = timeline::build(&events);
        let last = match timeline.last() {
            Some(last) => last.clone(),
            None => {
                return Ok(PresentedTrackingRecord {
                    status: ExternalStatus::Unknown.label().to_string(),
                    expected_delivery_date: None,
                    events: Vec::new(),
                })
            }
        };

        let mut presented = Vec::with_capacity(timeline.len());
        for event in &timeline {
            presented.push(self.present(event).await?);
        }

        let tz = self.destination_timezone(shipment).await?;
        let expected_delivery_date =
            estimator::estimate(&timeline, tz, &self.options.estimator, now);

        Ok(PresentedTrackingRecord {
            status: last.external_status.label().to_string(),
            expected_delivery_date,
            events: presented,
        })
    }

    async fn present(&self, event: &TrackingEvent) -> Result<PresentedEvent, AssembleError> {
        // Signature fields only mean anything on a delivered scan. The stored
        // reference is an internal object key; exchange it for a time-limited
        // URL instead of leaking it. A signing failure propagates.
        let (signature, signature_url) = if event.external_status == ExternalStatus::Delivered {
            let url = match &event.signature_url {
                Some(key) => Some(self.signatures.signed_url(key).await?),
                None => None,
            };
            (event.signature.clone(), url)
        } else {
            (None, None)
        };

        Ok(PresentedEvent {
            timestamp: event.timestamp,
            status: event.external_status.label().to_string(),
            message: event.message.clone(),
            location: event.location.clone().unwrap_or_default(),
            expected_delivery_date: event.expected_delivery_date,
            signature,
            signature_url,
        })
    }

    async fn destination_timezone(&self, shipment: &Shipment) -> Result<Tz, AssembleError> {
        let resolved = self
            .geo
            .timezone_for_zip(&shipment.destination.zip)
            .await?;
        let tz = resolved.and_then(|name| match name.parse::<Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                warn!(timezone = %name, zip = %shipment.destination.zip, "Unparseable timezone from geo resolver");
                None
            }
        });
        Ok(tz.unwrap_or(self.options.default_timezone))
    }
}

fn synthesize_anchor(shipment: &Shipment) -> TrackingEvent {
    TrackingEvent {
        id: Uuid::new_v4(),
        // Synthetic anchors are not bound to a stored leg.
        leg_id: Uuid::nil(),
        timestamp: shipment.created_at,
        provider: shipment.terminal_provider,
        provider_native_status: "LABEL_CREATED".to_string(),
        canonical_status: CanonicalStatus::LabelCreated,
        external_status: ExternalStatus::LabelCreated,
        message: "Shipping label created".to_string(),
        hidden: false,
        terminal: true,
        location: Some(shipment.origin.clone()),
        signature: None,
        signature_url: None,
        expected_delivery_date: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Timelike};
    use std::sync::Mutex;
    use trax_core::status::Provider;
    use trax_shared::Address;

    struct FixedEventStore {
        events: Mutex<Vec<TrackingEvent>>,
    }

    #[async_trait]
    impl EventStore for FixedEventStore {
        async fn find_event(&self, id: Uuid) -> Result<Option<TrackingEvent>, StoreError> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned())
        }

        async fn find_events_for_tracking_numbers(
            &self,
            _tracking_numbers: &[String],
        ) -> Result<Vec<TrackingEvent>, StoreError> {
            Ok(self.events.lock().unwrap().clone())
        }

        async fn insert_event(&self, event: TrackingEvent) -> Result<(), StoreError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct StubSigner;

    #[async_trait]
    impl SignatureStorage for StubSigner {
        async fn signed_url(&self, object_key: &str) -> Result<String, StoreError> {
            Ok(format!("https://signed.example/{object_key}?ttl=900"))
        }
    }

    struct FailingSigner;

    #[async_trait]
    impl SignatureStorage for FailingSigner {
        async fn signed_url(&self, _object_key: &str) -> Result<String, StoreError> {
            Err(StoreError::Unavailable("signer down".to_string()))
        }
    }

    struct StubGeo;

    #[async_trait]
    impl GeoResolver for StubGeo {
        async fn timezone_for_zip(&self, _zip: &str) -> Result<Option<String>, StoreError> {
            Ok(Some("America/Chicago".to_string()))
        }
    }

    fn shipment() -> Shipment {
        Shipment::new(
            Provider::Usps,
            "9400110200881234567890".to_string(),
            Location::default(),
            Address {
                line1: "600 W Chicago Ave".to_string(),
                line2: None,
                city: "Chicago".to_string(),
                state: "IL".to_string(),
                zip: "60654".to_string(),
            },
        )
    }

    fn scan(status: CanonicalStatus, timestamp: DateTime<Utc>) -> TrackingEvent {
        TrackingEvent {
            id: Uuid::new_v4(),
            leg_id: Uuid::new_v4(),
            timestamp,
            provider: Provider::Usps,
            provider_native_status: status.key().to_string(),
            canonical_status: status,
            external_status: status.external(),
            message: "scan".to_string(),
            hidden: false,
            terminal: true,
            location: None,
            signature: None,
            signature_url: None,
            expected_delivery_date: None,
        }
    }

    fn assembler(events: Vec<TrackingEvent>) -> TrackingAssembler {
        TrackingAssembler::new(
            Arc::new(FixedEventStore {
                events: Mutex::new(events),
            }),
            Arc::new(StubSigner),
            Arc::new(StubGeo),
            AssemblerOptions::default(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 12, 16, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_no_events_synthesizes_anchor_and_reports_label_created() {
        let assembler = assembler(Vec::new());
        let record = assembler.assemble_at(&shipment(), now()).await.unwrap();

        assert_eq!(record.status, "Label Created");
        assert_eq!(record.events.len(), 1);
        assert!(record.expected_delivery_date.is_some());
    }

    #[tokio::test]
    async fn test_hidden_anchor_reports_unknown_with_no_estimate() {
        let mut anchor = scan(CanonicalStatus::LabelCreated, now() - Duration::days(2));
        anchor.hidden = true;
        // A visible later scan exists, but the anchor is suppressed. No
        // synthetic anchor is added because a label-created event is present.
        let later = scan(CanonicalStatus::InTransit, now() - Duration::days(1));

        let assembler = assembler(vec![anchor, later]);
        let record = assembler.assemble_at(&shipment(), now()).await.unwrap();

        assert_eq!(record.status, "Unknown");
        assert!(record.events.is_empty());
        assert!(record.expected_delivery_date.is_none());
    }

    #[tokio::test]
    async fn test_signature_only_presented_on_delivered() {
        let anchor = scan(CanonicalStatus::LabelCreated, now() - Duration::days(2));
        let mut in_transit = scan(CanonicalStatus::InTransit, now() - Duration::days(1));
        in_transit.signature = Some("J. Doe".to_string());
        in_transit.signature_url = Some("sigs/abc".to_string());
        let mut delivered = scan(CanonicalStatus::Delivered, now());
        delivered.signature = Some("J. Doe".to_string());
        delivered.signature_url = Some("sigs/abc".to_string());

        let assembler = assembler(vec![anchor, in_transit, delivered]);
        let record = assembler.assemble_at(&shipment(), now()).await.unwrap();

        assert_eq!(record.status, "Delivered");
        let mid = &record.events[1];
        assert!(mid.signature.is_none());
        assert!(mid.signature_url.is_none());

        let last = record.events.last().unwrap();
        assert_eq!(last.signature.as_deref(), Some("J. Doe"));
        assert_eq!(
            last.signature_url.as_deref(),
            Some("https://signed.example/sigs/abc?ttl=900")
        );
    }

    #[tokio::test]
    async fn test_signing_failure_propagates() {
        let anchor = scan(CanonicalStatus::LabelCreated, now() - Duration::days(1));
        let mut delivered = scan(CanonicalStatus::Delivered, now());
        delivered.signature_url = Some("sigs/abc".to_string());

        let assembler = TrackingAssembler::new(
            Arc::new(FixedEventStore {
                events: Mutex::new(vec![anchor, delivered]),
            }),
            Arc::new(FailingSigner),
            Arc::new(StubGeo),
            AssemblerOptions::default(),
        );

        assert!(assembler.assemble_at(&shipment(), now()).await.is_err());
    }

    #[tokio::test]
    async fn test_delivered_record_estimate_is_cutoff_instant() {
        let anchor = scan(CanonicalStatus::LabelCreated, now() - Duration::days(1));
        let delivered = scan(CanonicalStatus::Delivered, now());

        let assembler = assembler(vec![anchor, delivered]);
        let record = assembler.assemble_at(&shipment(), now()).await.unwrap();

        let edd = record.expected_delivery_date.unwrap();
        let local = edd.with_timezone(&chrono_tz::America::Chicago);
        assert_eq!(local.hour(), 20);
        assert_eq!(local.minute(), 0);
    }
}
