//! Harvest scheduling models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::StatusFlow;

/// Status of a scheduled harvest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HarvestStatus {
    /// Planned, details may still change
    Open,
    /// Confirmed and expected at the packhouse
    Ready,
    /// Fruit has been received
    Closed,
    Canceled,
}

impl HarvestStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(HarvestStatus::Open),
            "ready" => Some(HarvestStatus::Ready),
            "closed" => Some(HarvestStatus::Closed),
            "canceled" => Some(HarvestStatus::Canceled),
            _ => None,
        }
    }

    /// Whether the schedule details may still be edited
    pub fn is_editable(&self) -> bool {
        matches!(self, HarvestStatus::Open)
    }
}

impl StatusFlow for HarvestStatus {
    const ENTITY: &'static str = "schedule harvest";

    fn as_str(&self) -> &'static str {
        match self {
            HarvestStatus::Open => "open",
            HarvestStatus::Ready => "ready",
            HarvestStatus::Closed => "closed",
            HarvestStatus::Canceled => "canceled",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (HarvestStatus::Open, HarvestStatus::Ready)
                | (HarvestStatus::Ready, HarvestStatus::Closed)
                | (HarvestStatus::Open, HarvestStatus::Canceled)
                | (HarvestStatus::Ready, HarvestStatus::Canceled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, HarvestStatus::Closed | HarvestStatus::Canceled)
    }
}

/// Validate the planned harvest figures
pub fn validate_schedule(
    harvest_date: NaiveDate,
    estimated_weight_kg: Decimal,
    today: NaiveDate,
    allow_past: bool,
) -> Result<(), &'static str> {
    if estimated_weight_kg <= Decimal::ZERO {
        return Err("Estimated weight must be positive");
    }
    if !allow_past && harvest_date < today {
        return Err("Harvest date cannot be in the past");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(HarvestStatus::Open.transition(HarvestStatus::Ready).is_ok());
        assert!(HarvestStatus::Ready.transition(HarvestStatus::Closed).is_ok());
        assert!(HarvestStatus::Ready.transition(HarvestStatus::Canceled).is_ok());
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(HarvestStatus::Open.transition(HarvestStatus::Closed).is_err());
        assert!(HarvestStatus::Ready.transition(HarvestStatus::Open).is_err());
        assert!(HarvestStatus::Closed.transition(HarvestStatus::Canceled).is_err());
        let err = HarvestStatus::Canceled
            .transition(HarvestStatus::Open)
            .unwrap_err();
        assert_eq!(err.to_string(), "schedule harvest cannot move from 'canceled' to 'open'");
    }

    #[test]
    fn test_validate_schedule() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert!(validate_schedule(today, Decimal::from(500), today, false).is_ok());
        assert!(validate_schedule(today, Decimal::ZERO, today, false).is_err());
        assert!(validate_schedule(yesterday, Decimal::ONE, today, false).is_err());
        assert!(validate_schedule(yesterday, Decimal::ONE, today, true).is_ok());
    }
}
