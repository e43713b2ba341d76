use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Business progress of a sale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SaleStatus {
    Pending,
    Ordered,
    Completed,
    #[serde(alias = "cancelled")]
    #[strum(to_string = "canceled", serialize = "cancelled")]
    Canceled,
    Annulled,
}

/// Fulfillment progress, derived from status transitions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SaleStage {
    Processed,
    Finished,
    Delivered,
    Closed,
}

/// How the customer consumes the order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SaleMode {
    Local,
    Carry,
    Delivery,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, EnumIter,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PaymentMethod {
    Cash,
    Card,
    Qr,
    Transfer,
}

/// Paraguayan VAT brackets. Serialized as the percentage number (0, 5, 10),
/// matching the wire format of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "u32", into = "u32")]
pub enum IvaRate {
    Exempt,
    Five,
    Ten,
}

impl IvaRate {
    /// Percentage as a decimal (0, 5 or 10).
    pub fn percent(&self) -> Decimal {
        match self {
            IvaRate::Exempt => Decimal::ZERO,
            IvaRate::Five => dec!(5),
            IvaRate::Ten => dec!(10),
        }
    }
}

impl TryFrom<u32> for IvaRate {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(IvaRate::Exempt),
            5 => Ok(IvaRate::Five),
            10 => Ok(IvaRate::Ten),
            other => Err(format!("invalid IVA rate: {} (expected 0, 5 or 10)", other)),
        }
    }
}

impl From<IvaRate> for u32 {
    fn from(rate: IvaRate) -> u32 {
        match rate {
            IvaRate::Exempt => 0,
            IvaRate::Five => 5,
            IvaRate::Ten => 10,
        }
    }
}

/// Stage projection for a status transition. `None` leaves the stage as-is
/// (pending/ordered carry no fulfillment information of their own).
///
/// Both the creation and the update path go through this single mapping.
pub fn stage_for_status(status: SaleStatus) -> Option<SaleStage> {
    match status {
        SaleStatus::Completed => Some(SaleStage::Delivered),
        SaleStatus::Canceled | SaleStatus::Annulled => Some(SaleStage::Closed),
        SaleStatus::Pending | SaleStatus::Ordered => None,
    }
}

/// Allowed status transitions. Repeating the current status is a no-op and
/// accepted.
pub fn is_valid_transition(from: SaleStatus, to: SaleStatus) -> bool {
    use SaleStatus::*;
    match (from, to) {
        (Pending, Completed) | (Ordered, Completed) => true,
        (Pending, Canceled) | (Ordered, Canceled) => true,
        (Completed, Annulled) => true,
        _ if from == to => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn canceled_maps_to_closed_stage() {
        assert_eq!(
            stage_for_status(SaleStatus::Canceled),
            Some(SaleStage::Closed)
        );
        assert_eq!(
            stage_for_status(SaleStatus::Annulled),
            Some(SaleStage::Closed)
        );
    }

    #[test]
    fn completed_maps_to_delivered_stage() {
        assert_eq!(
            stage_for_status(SaleStatus::Completed),
            Some(SaleStage::Delivered)
        );
    }

    #[test]
    fn pending_and_ordered_leave_stage_untouched() {
        assert_eq!(stage_for_status(SaleStatus::Pending), None);
        assert_eq!(stage_for_status(SaleStatus::Ordered), None);
    }

    #[test]
    fn transition_matrix() {
        use SaleStatus::*;
        assert!(is_valid_transition(Pending, Completed));
        assert!(is_valid_transition(Ordered, Completed));
        assert!(is_valid_transition(Pending, Canceled));
        assert!(is_valid_transition(Ordered, Canceled));
        assert!(is_valid_transition(Completed, Annulled));
        // no-op repeats are accepted
        assert!(is_valid_transition(Pending, Pending));
        assert!(is_valid_transition(Completed, Completed));
        // everything else is rejected
        assert!(!is_valid_transition(Completed, Pending));
        assert!(!is_valid_transition(Canceled, Completed));
        assert!(!is_valid_transition(Annulled, Completed));
        assert!(!is_valid_transition(Pending, Annulled));
        assert!(!is_valid_transition(Canceled, Annulled));
    }

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(SaleStatus::Canceled.to_string(), "canceled");
        assert_eq!(
            SaleStatus::from_str("cancelled").unwrap(),
            SaleStatus::Canceled
        );
        assert_eq!(
            SaleStatus::from_str("pending").unwrap(),
            SaleStatus::Pending
        );
        assert!(SaleStatus::from_str("shipped").is_err());
    }

    #[test]
    fn iva_rate_accepts_only_known_brackets() {
        assert_eq!(IvaRate::try_from(10).unwrap(), IvaRate::Ten);
        assert_eq!(IvaRate::try_from(5).unwrap(), IvaRate::Five);
        assert_eq!(IvaRate::try_from(0).unwrap(), IvaRate::Exempt);
        assert!(IvaRate::try_from(7).is_err());
    }

    #[test]
    fn iva_rate_serializes_as_number() {
        let json = serde_json::to_string(&IvaRate::Ten).unwrap();
        assert_eq!(json, "10");
        let parsed: IvaRate = serde_json::from_str("5").unwrap();
        assert_eq!(parsed, IvaRate::Five);
    }
}
