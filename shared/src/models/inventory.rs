//! Supply inventory models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::fifo::FifoLedger;

/// Direction of an inventory transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// What produced an inventory transaction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionSource {
    /// Supplies received against a purchase order
    StorehouseEntry,
    /// Manual stock correction
    Adjustment,
    /// Supplies used by the packhouse
    Consumption,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionSource::StorehouseEntry => "storehouse_entry",
            TransactionSource::Adjustment => "adjustment",
            TransactionSource::Consumption => "consumption",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "storehouse_entry" => Some(TransactionSource::StorehouseEntry),
            "adjustment" => Some(TransactionSource::Adjustment),
            "consumption" => Some(TransactionSource::Consumption),
            _ => None,
        }
    }
}

/// Current stock position of a supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyBalance {
    pub supply_id: Uuid,
    pub quantity: Decimal,
    /// Remaining stock valued at each lot's cost
    pub value: Decimal,
    pub open_lots: usize,
    pub minimum_stock: Decimal,
    pub below_minimum: bool,
}

impl SupplyBalance {
    pub fn from_ledger(supply_id: Uuid, ledger: &FifoLedger, minimum_stock: Decimal) -> Self {
        let quantity = ledger.available();
        Self {
            supply_id,
            quantity,
            value: ledger.value(),
            open_lots: ledger.open_lots().count(),
            minimum_stock,
            below_minimum: quantity < minimum_stock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_balance_from_ledger() {
        let mut ledger = FifoLedger::new();
        ledger
            .receive(Uuid::new_v4(), Decimal::from(10), Decimal::from(3), Utc::now())
            .unwrap();
        ledger.consume(Decimal::from(7)).unwrap();

        let balance = SupplyBalance::from_ledger(Uuid::new_v4(), &ledger, Decimal::from(5));
        assert_eq!(balance.quantity, Decimal::from(3));
        assert_eq!(balance.value, Decimal::from(9));
        assert_eq!(balance.open_lots, 1);
        assert!(balance.below_minimum);
    }

    #[test]
    fn test_direction_round_trip() {
        assert_eq!(Direction::from_str("in"), Some(Direction::In));
        assert_eq!(Direction::from_str(Direction::Out.as_str()), Some(Direction::Out));
        assert_eq!(Direction::from_str("sideways"), None);
    }
}
