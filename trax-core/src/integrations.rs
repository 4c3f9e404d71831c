use std::collections::HashMap;

use crate::status::{CanonicalStatus, TaxonomyError};

/// Per-integration translation tables from canonical statuses to an external
/// partner's code set (e.g. a marketplace push API).
///
/// Tables are registered once at process start and then only read, so the
/// registry is shared immutably across workers.
#[derive(Debug, Default)]
pub struct IntegrationRegistry {
    translations: HashMap<String, HashMap<&'static str, String>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the marketplace code set.
    pub fn with_marketplace_defaults() -> Self {
        let mut registry = Self::new();
        let table = [
            (CanonicalStatus::Unknown, "PENDING"),
            (CanonicalStatus::LabelCreated, "LABEL_PURCHASED"),
            (CanonicalStatus::InTransit, "IN_TRANSIT"),
            (CanonicalStatus::OutForDelivery, "OUT_FOR_DELIVERY"),
            (CanonicalStatus::Delayed, "IN_TRANSIT"),
            (CanonicalStatus::Exception, "FAILURE"),
            (CanonicalStatus::DeliveryAttempted(None), "ATTEMPTED_DELIVERY"),
            (CanonicalStatus::HoldForPickup, "READY_FOR_PICKUP"),
            (CanonicalStatus::Undeliverable, "FAILURE"),
            (CanonicalStatus::Delivered, "DELIVERED"),
            (CanonicalStatus::ReturnToSender, "RETURNED_TO_SENDER"),
        ];
        for (status, code) in table {
            registry.register("marketplace", status, code);
        }
        registry
    }

    /// Register a translation. Tables are keyed on the major status, so one
    /// entry covers every attempt-detail variant.
    pub fn register(&mut self, integration: &str, status: CanonicalStatus, code: &str) {
        self.translations
            .entry(integration.to_string())
            .or_default()
            .insert(status.key(), code.to_string());
    }

    pub fn integrations(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }

    /// Translate a canonical status for one integration.
    pub fn translate(
        &self,
        integration: &str,
        status: CanonicalStatus,
    ) -> Result<&str, TaxonomyError> {
        self.translations
            .get(integration)
            .and_then(|table| table.get(status.key()))
            .map(String::as_str)
            .ok_or_else(|| TaxonomyError::MissingTranslation {
                integration: integration.to_string(),
                status: status.key(),
            })
    }

    /// Startup completeness check: every canonical status must translate for
    /// every registered integration. Carriers and partners drift on their own
    /// schedules; a hole here must stop the process, not a request.
    pub fn verify_complete(&self) -> Result<(), TaxonomyError> {
        for integration in self.translations.keys() {
            for status in CanonicalStatus::all() {
                self.translate(integration, status)?;
            }
        }
        Ok(())
    }
}
