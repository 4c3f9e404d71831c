pub mod integrations;
pub mod models;
pub mod repository;
pub mod status;

pub use integrations::IntegrationRegistry;
pub use models::{Lane, Leg, Shipment, ShipmentStatus, TrackingEvent};
pub use status::{
    AttemptDetail, CanonicalStatus, ExternalStatus, Provider, TaxonomyError,
};
