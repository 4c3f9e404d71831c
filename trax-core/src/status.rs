use serde::{Deserialize, Serialize};

/// Carriers we ingest scans from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provider {
    Usps,
    Ups,
    FedEx,
    Dhl,
    OnTrac,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::Usps => "USPS",
            Provider::Ups => "UPS",
            Provider::FedEx => "FEDEX",
            Provider::Dhl => "DHL",
            Provider::OnTrac => "ONTRAC",
        };
        f.write_str(name)
    }
}

/// Why a delivery attempt failed, when the carrier tells us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptDetail {
    MailboxFull,
    BusinessClosed,
    NoAccess,
    RecipientUnavailable,
}

impl AttemptDetail {
    pub const ALL: [AttemptDetail; 4] = [
        AttemptDetail::MailboxFull,
        AttemptDetail::BusinessClosed,
        AttemptDetail::NoAccess,
        AttemptDetail::RecipientUnavailable,
    ];
}

/// Normalized internal status derived from a carrier-native code.
///
/// The progression is mostly linear; `rank` gives each stage an integer used
/// only to break exact-timestamp ties when sorting a timeline, never as a
/// primary sort key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CanonicalStatus {
    Unknown,
    LabelCreated,
    InTransit,
    OutForDelivery,
    Delayed,
    Exception,
    DeliveryAttempted(Option<AttemptDetail>),
    HoldForPickup,
    Undeliverable,
    Delivered,
    ReturnToSender,
}

impl CanonicalStatus {
    /// Hierarchy rank. Lower means earlier in the delivery lifecycle.
    pub const fn rank(&self) -> u8 {
        match self {
            CanonicalStatus::Unknown | CanonicalStatus::LabelCreated => 1,
            CanonicalStatus::InTransit => 2,
            CanonicalStatus::OutForDelivery
            | CanonicalStatus::Delayed
            | CanonicalStatus::Exception => 3,
            CanonicalStatus::DeliveryAttempted(_) | CanonicalStatus::HoldForPickup => 4,
            CanonicalStatus::Undeliverable => 5,
            CanonicalStatus::Delivered => 6,
            CanonicalStatus::ReturnToSender => 7,
        }
    }

    /// Coarser, customer-facing status.
    pub const fn external(&self) -> ExternalStatus {
        match self {
            CanonicalStatus::Unknown => ExternalStatus::Unknown,
            CanonicalStatus::LabelCreated => ExternalStatus::LabelCreated,
            CanonicalStatus::InTransit | CanonicalStatus::Delayed => ExternalStatus::InTransit,
            CanonicalStatus::Exception | CanonicalStatus::Undeliverable => {
                ExternalStatus::Exception
            }
            CanonicalStatus::OutForDelivery => ExternalStatus::OutForDelivery,
            CanonicalStatus::DeliveryAttempted(_) | CanonicalStatus::HoldForPickup => {
                ExternalStatus::Attempted
            }
            CanonicalStatus::Delivered => ExternalStatus::Delivered,
            CanonicalStatus::ReturnToSender => ExternalStatus::ReturnToSender,
        }
    }

    /// Major-status key, insensitive to attempt detail. Integration
    /// translation tables are keyed on this.
    pub const fn key(&self) -> &'static str {
        match self {
            CanonicalStatus::Unknown => "UNKNOWN",
            CanonicalStatus::LabelCreated => "LABEL_CREATED",
            CanonicalStatus::InTransit => "IN_TRANSIT",
            CanonicalStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            CanonicalStatus::Delayed => "DELAYED",
            CanonicalStatus::Exception => "EXCEPTION",
            CanonicalStatus::DeliveryAttempted(_) => "DELIVERY_ATTEMPTED",
            CanonicalStatus::HoldForPickup => "HOLD_FOR_PICKUP",
            CanonicalStatus::Undeliverable => "UNDELIVERABLE",
            CanonicalStatus::Delivered => "DELIVERED",
            CanonicalStatus::ReturnToSender => "RETURN_TO_SENDER",
        }
    }

    /// Every canonical value, including each attempt-detail variant. Startup
    /// completeness checks iterate this list.
    pub fn all() -> Vec<CanonicalStatus> {
        let mut statuses = vec![
            CanonicalStatus::Unknown,
            CanonicalStatus::LabelCreated,
            CanonicalStatus::InTransit,
            CanonicalStatus::OutForDelivery,
            CanonicalStatus::Delayed,
            CanonicalStatus::Exception,
            CanonicalStatus::DeliveryAttempted(None),
            CanonicalStatus::HoldForPickup,
            CanonicalStatus::Undeliverable,
            CanonicalStatus::Delivered,
            CanonicalStatus::ReturnToSender,
        ];
        statuses.extend(
            AttemptDetail::ALL
                .iter()
                .map(|d| CanonicalStatus::DeliveryAttempted(Some(*d))),
        );
        statuses
    }
}

/// Customer-facing status, coarser than the canonical set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    Unknown,
    LabelCreated,
    InTransit,
    Exception,
    OutForDelivery,
    Attempted,
    Delivered,
    ReturnToSender,
}

impl ExternalStatus {
    /// Human-readable label used in presented timelines.
    pub const fn label(&self) -> &'static str {
        match self {
            ExternalStatus::Unknown => "Unknown",
            ExternalStatus::LabelCreated => "Label Created",
            ExternalStatus::InTransit => "In Transit",
            ExternalStatus::Exception => "Exception",
            ExternalStatus::OutForDelivery => "Out for Delivery",
            ExternalStatus::Attempted => "Delivery Attempted",
            ExternalStatus::Delivered => "Delivered",
            ExternalStatus::ReturnToSender => "Return to Sender",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    #[error("Unmapped {provider} status code: {code}")]
    UnmappedStatus { provider: Provider, code: String },

    #[error("Integration {integration} has no translation for {status}")]
    MissingTranslation {
        integration: String,
        status: &'static str,
    },
}

/// Map a carrier-native status code to the canonical set.
///
/// Unmapped codes are an explicit error. Carriers introduce new codes without
/// notice; mapping those to `Unknown` would hide real operational drift, so
/// the failure has to surface at ingestion time.
pub fn to_canonical(provider: Provider, code: &str) -> Result<CanonicalStatus, TaxonomyError> {
    let mapped = match provider {
        Provider::Usps => usps(code),
        Provider::Ups => ups(code),
        Provider::FedEx => fedex(code),
        Provider::Dhl => dhl(code),
        Provider::OnTrac => ontrac(code),
    };

    mapped.ok_or_else(|| TaxonomyError::UnmappedStatus {
        provider,
        code: code.to_string(),
    })
}

fn usps(code: &str) -> Option<CanonicalStatus> {
    let status = match code {
        "PRE_SHIPMENT" => CanonicalStatus::LabelCreated,
        "ACCEPTED" | "IN_TRANSIT" | "ARRIVED_AT_UNIT" | "DEPARTED_FACILITY" => {
            CanonicalStatus::InTransit
        }
        "OUT_FOR_DELIVERY" => CanonicalStatus::OutForDelivery,
        "DELAYED" => CanonicalStatus::Delayed,
        "ALERT" => CanonicalStatus::Exception,
        "NOTICE_LEFT" => CanonicalStatus::DeliveryAttempted(None),
        "NOTICE_LEFT_RECEPTACLE_FULL" => {
            CanonicalStatus::DeliveryAttempted(Some(AttemptDetail::MailboxFull))
        }
        "NOTICE_LEFT_BUSINESS_CLOSED" => {
            CanonicalStatus::DeliveryAttempted(Some(AttemptDetail::BusinessClosed))
        }
        "HELD_AT_POST_OFFICE" => CanonicalStatus::HoldForPickup,
        "UNDELIVERABLE_AS_ADDRESSED" => CanonicalStatus::Undeliverable,
        "DELIVERED" => CanonicalStatus::Delivered,
        "RETURN_TO_SENDER" => CanonicalStatus::ReturnToSender,
        _ => return None,
    };
    Some(status)
}

fn ups(code: &str) -> Option<CanonicalStatus> {
    let status = match code {
        "MP" => CanonicalStatus::LabelCreated,
        "P" | "I" => CanonicalStatus::InTransit,
        "O" => CanonicalStatus::OutForDelivery,
        "DY" => CanonicalStatus::Delayed,
        "X" => CanonicalStatus::Exception,
        "A" => CanonicalStatus::DeliveryAttempted(None),
        "A_NO_ACCESS" => CanonicalStatus::DeliveryAttempted(Some(AttemptDetail::NoAccess)),
        "HFP" => CanonicalStatus::HoldForPickup,
        "NA" => CanonicalStatus::Undeliverable,
        "D" => CanonicalStatus::Delivered,
        "RS" => CanonicalStatus::ReturnToSender,
        _ => return None,
    };
    Some(status)
}

fn fedex(code: &str) -> Option<CanonicalStatus> {
    let status = match code {
        "OC" => CanonicalStatus::LabelCreated,
        "PU" | "IT" | "AR" | "DP" => CanonicalStatus::InTransit,
        "OD" => CanonicalStatus::OutForDelivery,
        "DL_DELAY" => CanonicalStatus::Delayed,
        "SE" => CanonicalStatus::Exception,
        "DE" => CanonicalStatus::DeliveryAttempted(None),
        "DE_RECIPIENT_UNAVAILABLE" => {
            CanonicalStatus::DeliveryAttempted(Some(AttemptDetail::RecipientUnavailable))
        }
        "HL" => CanonicalStatus::HoldForPickup,
        "CA" => CanonicalStatus::Undeliverable,
        "DL" => CanonicalStatus::Delivered,
        "RTS" => CanonicalStatus::ReturnToSender,
        _ => return None,
    };
    Some(status)
}

fn dhl(code: &str) -> Option<CanonicalStatus> {
    let status = match code {
        "PRE_TRANSIT" => CanonicalStatus::LabelCreated,
        "TRANSIT" => CanonicalStatus::InTransit,
        "OUT_FOR_DELIVERY" => CanonicalStatus::OutForDelivery,
        "DELAYED" => CanonicalStatus::Delayed,
        "EXCEPTION" => CanonicalStatus::Exception,
        "ATTEMPTED" => CanonicalStatus::DeliveryAttempted(None),
        "AVAILABLE_FOR_PICKUP" => CanonicalStatus::HoldForPickup,
        "UNDELIVERABLE" => CanonicalStatus::Undeliverable,
        "DELIVERED" => CanonicalStatus::Delivered,
        "RETURNED" => CanonicalStatus::ReturnToSender,
        _ => return None,
    };
    Some(status)
}

fn ontrac(code: &str) -> Option<CanonicalStatus> {
    let status = match code {
        "XX" => CanonicalStatus::LabelCreated,
        "OS" | "IP" => CanonicalStatus::InTransit,
        "OF" => CanonicalStatus::OutForDelivery,
        "DS" => CanonicalStatus::Delayed,
        "ER" => CanonicalStatus::Exception,
        "AT" => CanonicalStatus::DeliveryAttempted(None),
        "WC" => CanonicalStatus::HoldForPickup,
        "UD" => CanonicalStatus::Undeliverable,
        "OK" => CanonicalStatus::Delivered,
        "RT" => CanonicalStatus::ReturnToSender,
        _ => return None,
    };
    Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map() {
        assert_eq!(
            to_canonical(Provider::Usps, "OUT_FOR_DELIVERY").unwrap(),
            CanonicalStatus::OutForDelivery
        );
        assert_eq!(
            to_canonical(Provider::Ups, "D").unwrap(),
            CanonicalStatus::Delivered
        );
        assert_eq!(
            to_canonical(Provider::FedEx, "RTS").unwrap(),
            CanonicalStatus::ReturnToSender
        );
    }

    #[test]
    fn test_unmapped_code_is_an_error() {
        let err = to_canonical(Provider::Usps, "BRAND_NEW_SCAN").unwrap_err();
        match err {
            TaxonomyError::UnmappedStatus { provider, code } => {
                assert_eq!(provider, Provider::Usps);
                assert_eq!(code, "BRAND_NEW_SCAN");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_attempt_detail_is_preserved() {
        let status = to_canonical(Provider::Usps, "NOTICE_LEFT_RECEPTACLE_FULL").unwrap();
        assert_eq!(
            status,
            CanonicalStatus::DeliveryAttempted(Some(AttemptDetail::MailboxFull))
        );
        // Detail never changes the rank or the key.
        assert_eq!(status.rank(), CanonicalStatus::DeliveryAttempted(None).rank());
        assert_eq!(status.key(), "DELIVERY_ATTEMPTED");
    }

    #[test]
    fn test_rank_ordering() {
        assert!(CanonicalStatus::LabelCreated.rank() < CanonicalStatus::InTransit.rank());
        assert!(CanonicalStatus::InTransit.rank() < CanonicalStatus::OutForDelivery.rank());
        assert_eq!(
            CanonicalStatus::OutForDelivery.rank(),
            CanonicalStatus::Delayed.rank()
        );
        assert!(CanonicalStatus::Delivered.rank() < CanonicalStatus::ReturnToSender.rank());
    }

    #[test]
    fn test_every_canonical_status_has_an_external_status() {
        for status in CanonicalStatus::all() {
            // external() is an exhaustive match; this pins the coarse set.
            let _ = status.external().label();
        }
        assert_eq!(
            CanonicalStatus::Delayed.external(),
            ExternalStatus::InTransit
        );
        assert_eq!(
            CanonicalStatus::HoldForPickup.external(),
            ExternalStatus::Attempted
        );
    }
}
