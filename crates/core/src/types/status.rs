//! Status enums for marketplace entities.
//!
//! These mirror the string values the marketplace API serializes; unknown
//! values decode to the `Other` variant so a new backend status never breaks
//! page rendering.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
    /// Any status value this client does not know about yet.
    #[serde(other)]
    Other,
}

impl OrderStatus {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::OutForDelivery => "Out for delivery",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
            Self::Other => "Processing",
        }
    }

    /// The API wire value for this status, used when updating an order.
    #[must_use]
    pub const fn wire_value(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Other => "pending",
        }
    }
}

/// Provider (farm) registration approval status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Other,
}

impl RegistrationStatus {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending review",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Other => "In review",
        }
    }
}

/// Account role: regular buyer or approved producer ("farmer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Buyer,
    Farmer,
    #[serde(other)]
    Other,
}

impl UserRole {
    /// Whether this role may access the farmer portal.
    #[must_use]
    pub const fn is_farmer(&self) -> bool {
        matches!(self, Self::Farmer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_decode() {
        let status: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_unknown_status_decodes_to_other() {
        let status: OrderStatus = serde_json::from_str("\"frozen\"").unwrap();
        assert_eq!(status, OrderStatus::Other);

        let reg: RegistrationStatus = serde_json::from_str("\"escalated\"").unwrap();
        assert_eq!(reg, RegistrationStatus::Other);
    }

    #[test]
    fn test_role_decode() {
        let role: UserRole = serde_json::from_str("\"farmer\"").unwrap();
        assert!(role.is_farmer());
        let role: UserRole = serde_json::from_str("\"buyer\"").unwrap();
        assert!(!role.is_farmer());
    }
}
