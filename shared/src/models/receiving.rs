//! Incoming product receiving and weighing

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::StatusFlow;

/// Errors raised by weight calculations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeightError {
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },

    #[error("tare {tare} exceeds gross weight {gross}")]
    TareExceedsGross { gross: Decimal, tare: Decimal },

    #[error("batch would be overdrawn: available {available}, requested {requested}")]
    Overdrawn {
        available: Decimal,
        requested: Decimal,
    },
}

/// Decision state of an incoming product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncomingStatus {
    Pending,
    Accepted,
    Quarantined,
    Rejected,
}

impl IncomingStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(IncomingStatus::Pending),
            "accepted" => Some(IncomingStatus::Accepted),
            "quarantined" => Some(IncomingStatus::Quarantined),
            "rejected" => Some(IncomingStatus::Rejected),
            _ => None,
        }
    }

    /// Weighing sets may be recorded in these states
    pub fn accepts_weighing(&self) -> bool {
        matches!(self, IncomingStatus::Pending | IncomingStatus::Accepted)
    }
}

impl StatusFlow for IncomingStatus {
    const ENTITY: &'static str = "incoming product";

    fn as_str(&self) -> &'static str {
        match self {
            IncomingStatus::Pending => "pending",
            IncomingStatus::Accepted => "accepted",
            IncomingStatus::Quarantined => "quarantined",
            IncomingStatus::Rejected => "rejected",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (IncomingStatus::Pending, IncomingStatus::Accepted)
                | (IncomingStatus::Pending, IncomingStatus::Quarantined)
                | (IncomingStatus::Pending, IncomingStatus::Rejected)
                | (IncomingStatus::Quarantined, IncomingStatus::Accepted)
                | (IncomingStatus::Quarantined, IncomingStatus::Rejected)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, IncomingStatus::Accepted | IncomingStatus::Rejected)
    }
}

/// Scale reading for part of an incoming product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeighingReading {
    pub gross_weight_kg: Decimal,
    pub platform_tare_kg: Decimal,
    pub container_count: i32,
    pub container_tare_kg: Decimal,
}

impl WeighingReading {
    /// Total tare: platform plus every container
    pub fn tare_kg(&self) -> Decimal {
        self.platform_tare_kg + Decimal::from(self.container_count) * self.container_tare_kg
    }

    /// Net fruit weight; fails when any figure is negative or tare exceeds gross
    pub fn net_weight_kg(&self) -> Result<Decimal, WeightError> {
        if self.gross_weight_kg < Decimal::ZERO {
            return Err(WeightError::Negative { field: "gross_weight_kg" });
        }
        if self.platform_tare_kg < Decimal::ZERO {
            return Err(WeightError::Negative { field: "platform_tare_kg" });
        }
        if self.container_count < 0 {
            return Err(WeightError::Negative { field: "container_count" });
        }
        if self.container_tare_kg < Decimal::ZERO {
            return Err(WeightError::Negative { field: "container_tare_kg" });
        }

        let tare = self.tare_kg();
        if tare > self.gross_weight_kg {
            return Err(WeightError::TareExceedsGross {
                gross: self.gross_weight_kg,
                tare,
            });
        }
        Ok(self.gross_weight_kg - tare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn reading(gross: &str, platform: &str, count: i32, container: &str) -> WeighingReading {
        WeighingReading {
            gross_weight_kg: dec(gross),
            platform_tare_kg: dec(platform),
            container_count: count,
            container_tare_kg: dec(container),
        }
    }

    #[test]
    fn test_net_weight() {
        let r = reading("1250.5", "30", 40, "1.8");
        assert_eq!(r.tare_kg(), dec("102.0"));
        assert_eq!(r.net_weight_kg().unwrap(), dec("1148.5"));
    }

    #[test]
    fn test_tare_exceeds_gross() {
        let r = reading("50", "30", 20, "1.5");
        assert!(matches!(
            r.net_weight_kg(),
            Err(WeightError::TareExceedsGross { .. })
        ));
    }

    #[test]
    fn test_negative_fields() {
        assert!(reading("-1", "0", 0, "0").net_weight_kg().is_err());
        assert!(reading("10", "0", -2, "1").net_weight_kg().is_err());
    }

    #[test]
    fn test_decisions() {
        assert!(IncomingStatus::Pending.transition(IncomingStatus::Quarantined).is_ok());
        assert!(IncomingStatus::Quarantined.transition(IncomingStatus::Accepted).is_ok());
        assert!(IncomingStatus::Accepted.transition(IncomingStatus::Rejected).is_err());
        assert!(IncomingStatus::Rejected.transition(IncomingStatus::Accepted).is_err());
    }
}
