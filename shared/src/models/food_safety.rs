//! Food-safety sampling

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::status::StatusFlow;

/// Laboratory result of a sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    Pending,
    Passed,
    Failed,
}

impl SampleStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SampleStatus::Pending),
            "passed" => Some(SampleStatus::Passed),
            "failed" => Some(SampleStatus::Failed),
            _ => None,
        }
    }
}

impl StatusFlow for SampleStatus {
    const ENTITY: &'static str = "food safety sample";

    fn as_str(&self) -> &'static str {
        match self {
            SampleStatus::Pending => "pending",
            SampleStatus::Passed => "passed",
            SampleStatus::Failed => "failed",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (SampleStatus::Pending, SampleStatus::Passed) | (SampleStatus::Pending, SampleStatus::Failed)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, SampleStatus::Pending)
    }
}

/// Overall food-safety standing of a batch given its sample results
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FoodSafetyStanding {
    /// No samples taken yet
    Unsampled,
    /// At least one sample is still at the lab
    Pending,
    Passed,
    /// Any failed sample fails the batch
    Failed,
}

pub fn food_safety_standing(results: &[SampleStatus]) -> FoodSafetyStanding {
    if results.is_empty() {
        FoodSafetyStanding::Unsampled
    } else if results.contains(&SampleStatus::Failed) {
        FoodSafetyStanding::Failed
    } else if results.contains(&SampleStatus::Pending) {
        FoodSafetyStanding::Pending
    } else {
        FoodSafetyStanding::Passed
    }
}

/// Sample weight must be positive
pub fn validate_sample_weight(weight_kg: Decimal) -> Result<(), &'static str> {
    if weight_kg <= Decimal::ZERO {
        return Err("Sample weight must be positive");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standing() {
        assert_eq!(food_safety_standing(&[]), FoodSafetyStanding::Unsampled);
        assert_eq!(
            food_safety_standing(&[SampleStatus::Passed, SampleStatus::Pending]),
            FoodSafetyStanding::Pending
        );
        assert_eq!(
            food_safety_standing(&[SampleStatus::Pending, SampleStatus::Failed]),
            FoodSafetyStanding::Failed
        );
        assert_eq!(
            food_safety_standing(&[SampleStatus::Passed, SampleStatus::Passed]),
            FoodSafetyStanding::Passed
        );
    }

    #[test]
    fn test_result_is_final() {
        assert!(SampleStatus::Pending.transition(SampleStatus::Failed).is_ok());
        assert!(SampleStatus::Failed.transition(SampleStatus::Passed).is_err());
    }
}
