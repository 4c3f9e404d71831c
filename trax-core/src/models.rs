use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use trax_shared::{Address, Location};
use uuid::Uuid;

use crate::status::{CanonicalStatus, ExternalStatus, Provider, TaxonomyError};

/// A single carrier scan, immutable once created. `hidden` is the one field
/// that may be flipped later, to retroactively suppress a bad scan; hidden
/// events are invisible to every consumer.
///
/// `terminal` is denormalized from the owning leg when the store materializes
/// the event, so pure timeline code never needs a leg lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub id: Uuid,
    pub leg_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub provider: Provider,
    pub provider_native_status: String,
    pub canonical_status: CanonicalStatus,
    pub external_status: ExternalStatus,
    pub message: String,
    #[serde(default)]
    pub hidden: bool,
    pub terminal: bool,
    pub location: Option<Location>,
    pub signature: Option<String>,
    pub signature_url: Option<String>,
    pub expected_delivery_date: Option<DateTime<Utc>>,
}

impl TrackingEvent {
    /// Build an event from a raw carrier scan, deriving the canonical and
    /// external statuses. Fails loudly on an unmapped native code.
    pub fn from_scan(
        leg: &Leg,
        timestamp: DateTime<Utc>,
        native_status: &str,
        message: &str,
    ) -> Result<Self, TaxonomyError> {
        let canonical = crate::status::to_canonical(leg.provider, native_status)?;
        Ok(Self {
            id: Uuid::new_v4(),
            leg_id: leg.id,
            timestamp,
            provider: leg.provider,
            provider_native_status: native_status.to_string(),
            canonical_status: canonical,
            external_status: canonical.external(),
            message: message.to_string(),
            hidden: false,
            terminal: leg.terminal,
            location: None,
            signature: None,
            signature_url: None,
            expected_delivery_date: None,
        })
    }

    pub fn is_label_created(&self) -> bool {
        self.canonical_status == CanonicalStatus::LabelCreated
    }
}

/// One tracked provider segment of a shipment's journey. Terminality is
/// fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub id: Uuid,
    pub provider: Provider,
    pub tracking_number: String,
    pub lane_id: Option<Uuid>,
    pub ship_date: NaiveDate,
    pub terminal: bool,
}

/// A grouping of non-terminal legs that feed one or more terminal legs.
/// Inbound linehaul scans resolve through their lane to the terminal legs
/// they eventually affect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lane {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Active,
    Cancelled,
}

/// The order-level record. Created at order placement, never deleted;
/// cancellation flows only mutate `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: ShipmentStatus,
    pub terminal_provider: Provider,
    pub terminal_tracking_number: String,
    pub origin: Location,
    pub destination: Address,
    pub marketplace_order_ref: Option<String>,
    pub webhook_urls: Vec<String>,
}

impl Shipment {
    pub fn new(
        terminal_provider: Provider,
        terminal_tracking_number: String,
        origin: Location,
        destination: Address,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: ShipmentStatus::Active,
            terminal_provider,
            terminal_tracking_number,
            origin,
            destination,
            marketplace_order_ref: None,
            webhook_urls: Vec::new(),
        }
    }
}
