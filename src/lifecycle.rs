//! Order lifecycle — per-item delivery statuses and the derived order status.
//!
//! An order's status is never stored. It is derived from the set of
//! `delivered.status` values across the order's items, with a strict
//! weakest-link precedence: one Pending item anywhere forces the whole
//! order to read as Pending, even if every other item is already delivered.
//!
//! All four role-scoped projections call [`derive_order_status`]; the
//! precedence lives in exactly one place so the views cannot drift.

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Holding location pieces are relocated to when an order is prepared.
pub const HOLDING_ROOM: i32 = 4;
pub const HOLDING_SHELF: i32 = 3;
pub const HOLDING_NOTE: &str = "Ready for delivery";

/// Delivery status of a single item assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    #[default]
    Pending,
    InProgress,
    Delivered,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "Pending",
            DeliveryStatus::InProgress => "InProgress",
            DeliveryStatus::Delivered => "Delivered",
        }
    }
}

impl FromStr for DeliveryStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(DeliveryStatus::Pending),
            "InProgress" => Ok(DeliveryStatus::InProgress),
            "Delivered" => Ok(DeliveryStatus::Delivered),
            other => Err(anyhow!("unknown delivery status: {}", other)),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive an order's status from its per-item delivery statuses.
///
/// Precedence is strict: Pending > InProgress > Delivered > fallback.
/// An empty status set (order started but no items linked yet) reads as
/// Pending.
pub fn derive_order_status(statuses: &[DeliveryStatus]) -> DeliveryStatus {
    if statuses.contains(&DeliveryStatus::Pending) {
        DeliveryStatus::Pending
    } else if statuses.contains(&DeliveryStatus::InProgress) {
        DeliveryStatus::InProgress
    } else if !statuses.is_empty() {
        DeliveryStatus::Delivered
    } else {
        DeliveryStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeliveryStatus::*;

    #[test]
    fn any_pending_forces_pending() {
        assert_eq!(derive_order_status(&[Pending]), Pending);
        assert_eq!(derive_order_status(&[Delivered, Delivered, Pending]), Pending);
        assert_eq!(derive_order_status(&[InProgress, Pending, Delivered]), Pending);
    }

    #[test]
    fn in_progress_beats_delivered() {
        assert_eq!(derive_order_status(&[InProgress]), InProgress);
        assert_eq!(derive_order_status(&[Delivered, InProgress, Delivered]), InProgress);
    }

    #[test]
    fn all_delivered_non_empty_is_delivered() {
        assert_eq!(derive_order_status(&[Delivered]), Delivered);
        assert_eq!(derive_order_status(&[Delivered, Delivered, Delivered]), Delivered);
    }

    #[test]
    fn empty_set_falls_back_to_pending() {
        assert_eq!(derive_order_status(&[]), Pending);
    }

    #[test]
    fn status_string_roundtrip() {
        for s in [Pending, InProgress, Delivered] {
            let parsed: DeliveryStatus = s.as_str().parse().unwrap();
            assert_eq!(parsed, s);
        }
        assert!("pending".parse::<DeliveryStatus>().is_err());
        assert!("Done".parse::<DeliveryStatus>().is_err());
    }
}
