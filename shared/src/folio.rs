//! Organization-scoped sequence numbers (ooids) and their folio rendering
//!
//! Every sequenced document carries an `ooid` that starts at 1 for each
//! organization and grows by one per record. The database layer serializes
//! assignment; this module holds the arithmetic and the folio format.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of digits in a rendered folio
pub const FOLIO_WIDTH: usize = 6;

/// Documents that receive an organization-scoped ooid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceScope {
    ScheduleHarvest,
    IncomingProduct,
    Batch,
    PackingPallet,
    Requisition,
    PurchaseOrder,
    ServiceOrder,
    FruitPurchaseOrder,
    StorehouseEntry,
    AdjustmentInventory,
}

impl SequenceScope {
    pub const ALL: [SequenceScope; 10] = [
        SequenceScope::ScheduleHarvest,
        SequenceScope::IncomingProduct,
        SequenceScope::Batch,
        SequenceScope::PackingPallet,
        SequenceScope::Requisition,
        SequenceScope::PurchaseOrder,
        SequenceScope::ServiceOrder,
        SequenceScope::FruitPurchaseOrder,
        SequenceScope::StorehouseEntry,
        SequenceScope::AdjustmentInventory,
    ];

    /// Table holding the sequenced rows
    pub fn table(&self) -> &'static str {
        match self {
            SequenceScope::ScheduleHarvest => "schedule_harvests",
            SequenceScope::IncomingProduct => "incoming_products",
            SequenceScope::Batch => "batches",
            SequenceScope::PackingPallet => "packing_pallets",
            SequenceScope::Requisition => "requisitions",
            SequenceScope::PurchaseOrder => "purchase_orders",
            SequenceScope::ServiceOrder => "service_orders",
            SequenceScope::FruitPurchaseOrder => "fruit_purchase_orders",
            SequenceScope::StorehouseEntry => "storehouse_entries",
            SequenceScope::AdjustmentInventory => "adjustment_inventories",
        }
    }

    /// Folio prefix shown to users
    pub fn prefix(&self) -> &'static str {
        match self {
            SequenceScope::ScheduleHarvest => "SCH",
            SequenceScope::IncomingProduct => "INC",
            SequenceScope::Batch => "BAT",
            SequenceScope::PackingPallet => "PAL",
            SequenceScope::Requisition => "REQ",
            SequenceScope::PurchaseOrder => "PO",
            SequenceScope::ServiceOrder => "SO",
            SequenceScope::FruitPurchaseOrder => "FPO",
            SequenceScope::StorehouseEntry => "ENT",
            SequenceScope::AdjustmentInventory => "ADJ",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.prefix() == prefix)
    }

    /// Render an ooid of this scope as a folio
    pub fn folio(&self, ooid: i64) -> String {
        format_folio(self.prefix(), ooid)
    }
}

/// Errors raised when parsing a folio
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FolioError {
    #[error("folio '{0}' is missing the prefix separator")]
    MissingSeparator(String),

    #[error("unknown folio prefix '{0}'")]
    UnknownPrefix(String),

    #[error("folio number '{0}' is not a positive integer")]
    InvalidNumber(String),
}

/// Next ooid given the current maximum for an organization
pub fn next_sequence(current_max: Option<i64>) -> i64 {
    match current_max {
        Some(max) if max > 0 => max + 1,
        _ => 1,
    }
}

/// Format an ooid as `PREFIX-000042`; numbers wider than the pad stay intact
pub fn format_folio(prefix: &str, ooid: i64) -> String {
    format!("{}-{:0width$}", prefix, ooid, width = FOLIO_WIDTH)
}

/// Parse a folio back into its scope and ooid
pub fn parse_folio(folio: &str) -> Result<(SequenceScope, i64), FolioError> {
    let (prefix, number) = folio
        .split_once('-')
        .ok_or_else(|| FolioError::MissingSeparator(folio.to_string()))?;

    let scope = SequenceScope::from_prefix(prefix)
        .ok_or_else(|| FolioError::UnknownPrefix(prefix.to_string()))?;

    if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(FolioError::InvalidNumber(number.to_string()));
    }

    let ooid = number
        .parse::<i64>()
        .map_err(|_| FolioError::InvalidNumber(number.to_string()))?;

    if ooid < 1 {
        return Err(FolioError::InvalidNumber(number.to_string()));
    }

    Ok((scope, ooid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_sequence_starts_at_one() {
        assert_eq!(next_sequence(None), 1);
        assert_eq!(next_sequence(Some(0)), 1);
    }

    #[test]
    fn test_next_sequence_increments() {
        assert_eq!(next_sequence(Some(41)), 42);
    }

    #[test]
    fn test_format_folio_pads() {
        assert_eq!(format_folio("BAT", 42), "BAT-000042");
        assert_eq!(SequenceScope::PurchaseOrder.folio(7), "PO-000007");
    }

    #[test]
    fn test_format_folio_wide_numbers() {
        assert_eq!(format_folio("REQ", 12_345_678), "REQ-12345678");
    }

    #[test]
    fn test_parse_folio() {
        assert_eq!(
            parse_folio("FPO-000013").unwrap(),
            (SequenceScope::FruitPurchaseOrder, 13)
        );
        assert!(matches!(
            parse_folio("XYZ-000001"),
            Err(FolioError::UnknownPrefix(_))
        ));
        assert!(matches!(
            parse_folio("BAT000001"),
            Err(FolioError::MissingSeparator(_))
        ));
        assert!(matches!(
            parse_folio("BAT-000000"),
            Err(FolioError::InvalidNumber(_))
        ));
        assert!(matches!(
            parse_folio("BAT--12"),
            Err(FolioError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_prefixes_are_unique() {
        let mut prefixes: Vec<_> = SequenceScope::ALL.iter().map(|s| s.prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), SequenceScope::ALL.len());
    }
}
