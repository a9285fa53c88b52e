//! Field-to-pallet workflow tests
//!
//! Harvest scheduling, incoming product decisions and weighing, food-safety
//! standing and packing totals.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    food_safety_standing, packaged_weight_kg, validate_sample_weight, validate_schedule,
    FoodSafetyStanding, HarvestStatus, IncomingStatus, PalletStatus, PalletTotals, SampleStatus,
    StatusFlow, WeighingReading, WeightError,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn reading(gross: &str, platform: &str, containers: i32, container_tare: &str) -> WeighingReading {
    WeighingReading {
        gross_weight_kg: dec(gross),
        platform_tare_kg: dec(platform),
        container_count: containers,
        container_tare_kg: dec(container_tare),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_schedule_rules() {
        assert!(validate_schedule(day(10), dec("1500"), day(10), false).is_ok());
        assert!(validate_schedule(day(9), dec("1500"), day(10), false).is_err());
        assert!(validate_schedule(day(9), dec("1500"), day(10), true).is_ok());
        assert!(validate_schedule(day(11), Decimal::ZERO, day(10), false).is_err());
    }

    #[test]
    fn test_harvest_workflow() {
        use HarvestStatus::*;
        assert!(Open.transition(Ready).is_ok());
        assert!(Ready.transition(Closed).is_ok());
        assert!(Open.transition(Closed).is_err());
        assert!(Closed.transition(Canceled).is_err());
        assert!(Open.is_editable());
        assert!(!Ready.is_editable());
    }

    /// 1040 kg gross, 40 kg platform, 50 crates of 1.2 kg
    #[test]
    fn test_net_weight() {
        let set = reading("1040", "40", 50, "1.2");
        assert_eq!(set.tare_kg(), dec("100.0"));
        assert_eq!(set.net_weight_kg().unwrap(), dec("940.0"));
    }

    #[test]
    fn test_tare_cannot_exceed_gross() {
        let set = reading("100", "40", 50, "1.2");
        assert!(matches!(set.net_weight_kg(), Err(WeightError::TareExceedsGross { .. })));

        // tare equal to gross leaves an empty load
        assert_eq!(reading("100", "40", 50, "1.2").tare_kg(), dec("100.0"));
        assert_eq!(reading("100", "100", 0, "0").net_weight_kg().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_negative_figures_rejected() {
        assert_eq!(
            reading("-1", "0", 0, "0").net_weight_kg(),
            Err(WeightError::Negative { field: "gross_weight_kg" })
        );
        assert_eq!(
            reading("10", "0", -1, "0").net_weight_kg(),
            Err(WeightError::Negative { field: "container_count" })
        );
    }

    #[test]
    fn test_incoming_decisions() {
        use IncomingStatus::*;
        assert!(Pending.transition(Accepted).is_ok());
        assert!(Pending.transition(Quarantined).is_ok());
        assert!(Quarantined.transition(Accepted).is_ok());
        assert!(Quarantined.transition(Rejected).is_ok());
        assert!(Accepted.transition(Rejected).is_err());
        assert!(Rejected.transition(Accepted).is_err());

        assert!(Pending.accepts_weighing());
        assert!(!Quarantined.accepts_weighing());
        assert!(!Rejected.accepts_weighing());
    }

    #[test]
    fn test_transition_error_names_states() {
        let err = IncomingStatus::Rejected
            .transition(IncomingStatus::Accepted)
            .unwrap_err();
        assert_eq!(err.from, "rejected");
        assert_eq!(err.to, "accepted");
        assert!(err.to_string().contains("incoming product"));
    }

    #[test]
    fn test_food_safety_standing() {
        use SampleStatus::*;
        assert_eq!(food_safety_standing(&[]), FoodSafetyStanding::Unsampled);
        assert_eq!(food_safety_standing(&[Passed, Pending]), FoodSafetyStanding::Pending);
        assert_eq!(food_safety_standing(&[Passed, Passed]), FoodSafetyStanding::Passed);
        assert_eq!(food_safety_standing(&[Pending, Failed, Passed]), FoodSafetyStanding::Failed);
    }

    #[test]
    fn test_sample_results_are_final() {
        assert!(SampleStatus::Pending.transition(SampleStatus::Passed).is_ok());
        assert!(SampleStatus::Passed.transition(SampleStatus::Failed).is_err());
        assert!(validate_sample_weight(dec("0.5")).is_ok());
        assert!(validate_sample_weight(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_packing_and_pallet() {
        let lines = [(100, dec("4.5")), (40, dec("9"))];
        for (count, per) in lines {
            assert!(packaged_weight_kg(count, per).is_ok());
        }

        let totals = PalletTotals::from_packages(&lines);
        assert_eq!(totals.package_count, 140);
        assert_eq!(totals.net_weight_kg, dec("810.0"));
        assert!(totals.can_close());

        assert!(PalletStatus::Open.transition(PalletStatus::Closed).is_ok());
        assert!(PalletStatus::Closed.transition(PalletStatus::Closed).is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn kg_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=500000i64).prop_map(|n| Decimal::new(n, 1)) // 0.0 to 50000.0
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Net weight plus tare always gives back the gross
        #[test]
        fn prop_net_plus_tare_is_gross(
            gross in kg_strategy(),
            platform in kg_strategy(),
            containers in 0i32..500,
            container_tare in (0i64..=50i64).prop_map(|n| Decimal::new(n, 1)),
        ) {
            let set = WeighingReading {
                gross_weight_kg: gross,
                platform_tare_kg: platform,
                container_count: containers,
                container_tare_kg: container_tare,
            };
            match set.net_weight_kg() {
                Ok(net) => {
                    prop_assert!(net >= Decimal::ZERO);
                    prop_assert_eq!(net + set.tare_kg(), gross);
                }
                Err(WeightError::TareExceedsGross { gross: g, tare }) => prop_assert!(tare > g),
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// A pallet's weight is the sum of its package lines
        #[test]
        fn prop_pallet_weight_is_sum_of_packages(
            lines in prop::collection::vec((1i32..500, (1i64..=200i64).prop_map(|n| Decimal::new(n, 1))), 0..10),
        ) {
            let totals = PalletTotals::from_packages(&lines);
            let expected: Decimal = lines
                .iter()
                .map(|(count, per)| packaged_weight_kg(*count, *per).unwrap())
                .sum();
            prop_assert_eq!(totals.net_weight_kg, expected);
            prop_assert_eq!(totals.package_lines, lines.len() as i64);
            prop_assert_eq!(totals.can_close(), !lines.is_empty());
        }

        /// One failed sample always fails the batch
        #[test]
        fn prop_any_failure_fails_batch(
            mut results in prop::collection::vec(
                prop_oneof![Just(SampleStatus::Pending), Just(SampleStatus::Passed)],
                0..8,
            ),
            position in any::<prop::sample::Index>(),
        ) {
            let at = position.index(results.len() + 1);
            results.insert(at, SampleStatus::Failed);
            prop_assert_eq!(food_safety_standing(&results), FoodSafetyStanding::Failed);
        }
    }
}
