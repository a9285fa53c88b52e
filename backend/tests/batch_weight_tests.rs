//! Batch weight and merge tests
//!
//! A batch's received, sampled, packaged and available weights are derived
//! from its weighings, samples, packages and merged children. These tests
//! pin down that derivation and the merge rules.

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    validate_merge, BatchStatus, BatchWeightSources, BatchWeights, MergeCandidate, MergeError,
    StatusFlow, WeightError,
};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn open_batch(product_id: Uuid) -> MergeCandidate {
    MergeCandidate {
        id: Uuid::new_v4(),
        product_id,
        status: BatchStatus::Open,
        parent_id: None,
        has_children: false,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Received weight is the sum of the weighing nets, minus samples and packages
    #[test]
    fn test_reconcile_batch() {
        let weights = BatchWeights::reconcile(&BatchWeightSources {
            weighing_nets_kg: vec![dec("480.5"), dec("519.5")],
            sample_weights_kg: vec![dec("2.5")],
            packaged_weights_kg: vec![dec("450"), dec("90")],
            ..Default::default()
        })
        .unwrap();

        assert_eq!(weights.received_kg, dec("1000.0"));
        assert_eq!(weights.sampled_kg, dec("2.5"));
        assert_eq!(weights.packaged_kg, dec("540"));
        assert_eq!(weights.available_kg, dec("457.5"));
        assert_eq!(weights.transferred_kg, Decimal::ZERO);
    }

    #[test]
    fn test_merged_child_hands_stock_to_parent() {
        let child = BatchWeights::reconcile(&BatchWeightSources {
            weighing_nets_kg: vec![dec("300")],
            sample_weights_kg: vec![dec("1")],
            is_merged_child: true,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(child.available_kg, Decimal::ZERO);
        assert_eq!(child.transferred_kg, dec("299"));

        let parent = BatchWeights::reconcile(&BatchWeightSources {
            weighing_nets_kg: vec![dec("700")],
            children_transferred_kg: vec![child.transferred_kg],
            ..Default::default()
        })
        .unwrap();
        assert_eq!(parent.merged_in_kg, dec("299"));
        assert_eq!(parent.available_kg, dec("999"));
    }

    #[test]
    fn test_overdrawn_batch_is_rejected() {
        let result = BatchWeights::reconcile(&BatchWeightSources {
            weighing_nets_kg: vec![dec("100")],
            packaged_weights_kg: vec![dec("100.01")],
            ..Default::default()
        });
        assert!(matches!(result, Err(WeightError::Overdrawn { .. })));
    }

    #[test]
    fn test_draw_limited_to_available() {
        let weights = BatchWeights::reconcile(&BatchWeightSources {
            weighing_nets_kg: vec![dec("50")],
            ..Default::default()
        })
        .unwrap();
        assert!(weights.ensure_can_draw(dec("50")).is_ok());
        assert!(weights.ensure_can_draw(dec("50.001")).is_err());
    }

    #[test]
    fn test_empty_batch() {
        let weights = BatchWeights::reconcile(&BatchWeightSources::default()).unwrap();
        assert_eq!(weights.received_kg, Decimal::ZERO);
        assert_eq!(weights.available_kg, Decimal::ZERO);
        assert!(weights.ensure_can_draw(dec("0.1")).is_err());
    }

    #[test]
    fn test_valid_merge() {
        let product = Uuid::new_v4();
        let parent = open_batch(product);
        let children = vec![open_batch(product), open_batch(product)];
        assert!(validate_merge(&parent, &children).is_ok());
    }

    #[test]
    fn test_merge_rules() {
        let product = Uuid::new_v4();
        let parent = open_batch(product);

        assert_eq!(validate_merge(&parent, &[]), Err(MergeError::NoChildren));

        assert_eq!(
            validate_merge(&parent, &[parent.clone()]),
            Err(MergeError::SelfMerge)
        );

        let child = open_batch(product);
        assert_eq!(
            validate_merge(&parent, &[child.clone(), child.clone()]),
            Err(MergeError::Duplicate(child.id))
        );

        let closed = MergeCandidate {
            status: BatchStatus::Closed,
            ..open_batch(product)
        };
        assert_eq!(
            validate_merge(&parent, &[closed.clone()]),
            Err(MergeError::NotOpen(closed.id))
        );

        let merged = MergeCandidate {
            parent_id: Some(Uuid::new_v4()),
            ..open_batch(product)
        };
        assert_eq!(
            validate_merge(&parent, &[merged.clone()]),
            Err(MergeError::AlreadyMerged(merged.id))
        );

        let grouped = MergeCandidate {
            has_children: true,
            ..open_batch(product)
        };
        assert_eq!(
            validate_merge(&parent, &[grouped.clone()]),
            Err(MergeError::ChildHasChildren(grouped.id))
        );

        let other = open_batch(Uuid::new_v4());
        assert_eq!(
            validate_merge(&parent, &[other.clone()]),
            Err(MergeError::ProductMismatch(other.id))
        );
    }

    /// A batch that was merged away cannot become a parent
    #[test]
    fn test_merged_child_cannot_be_parent() {
        let product = Uuid::new_v4();
        let parent = MergeCandidate {
            parent_id: Some(Uuid::new_v4()),
            ..open_batch(product)
        };
        assert_eq!(
            validate_merge(&parent, &[open_batch(product)]),
            Err(MergeError::AlreadyMerged(parent.id))
        );
    }

    #[test]
    fn test_batch_workflow() {
        assert!(BatchStatus::Open.transition(BatchStatus::Closed).is_ok());
        assert!(BatchStatus::Open.transition(BatchStatus::Canceled).is_ok());
        assert!(BatchStatus::Closed.transition(BatchStatus::Open).is_err());
        assert!(BatchStatus::Canceled.is_terminal());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating weights (0.1 to 2000.0 kg)
    fn weight_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=20000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn weights_strategy() -> impl Strategy<Value = Vec<Decimal>> {
        prop::collection::vec(weight_strategy(), 0..8)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Weight is conserved: what comes in is either still available or accounted for
        #[test]
        fn prop_weight_is_conserved(
            nets in weights_strategy(),
            samples in weights_strategy(),
            packages in weights_strategy(),
            merged_in in weights_strategy(),
            is_child in any::<bool>(),
        ) {
            let sources = BatchWeightSources {
                weighing_nets_kg: nets,
                sample_weights_kg: samples,
                packaged_weights_kg: packages,
                children_transferred_kg: merged_in,
                is_merged_child: is_child,
            };

            match BatchWeights::reconcile(&sources) {
                Ok(w) => {
                    prop_assert!(w.available_kg >= Decimal::ZERO);
                    prop_assert_eq!(
                        w.received_kg + w.merged_in_kg,
                        w.sampled_kg + w.packaged_kg + w.available_kg + w.transferred_kg
                    );
                    if is_child {
                        prop_assert_eq!(w.available_kg, Decimal::ZERO);
                    } else {
                        prop_assert_eq!(w.transferred_kg, Decimal::ZERO);
                    }
                }
                Err(WeightError::Overdrawn { available, requested }) => {
                    prop_assert!(requested > available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Merging moves stock without creating or losing any
        #[test]
        fn prop_merge_preserves_total(
            parent_nets in weights_strategy(),
            child_nets in prop::collection::vec(weights_strategy(), 1..4),
        ) {
            let children: Vec<BatchWeights> = child_nets
                .iter()
                .map(|nets| {
                    BatchWeights::reconcile(&BatchWeightSources {
                        weighing_nets_kg: nets.clone(),
                        is_merged_child: true,
                        ..Default::default()
                    })
                    .unwrap()
                })
                .collect();

            let parent = BatchWeights::reconcile(&BatchWeightSources {
                weighing_nets_kg: parent_nets.clone(),
                children_transferred_kg: children.iter().map(|c| c.transferred_kg).collect(),
                ..Default::default()
            })
            .unwrap();

            let total_received: Decimal = parent_nets.iter().chain(child_nets.iter().flatten()).sum();
            prop_assert_eq!(parent.available_kg, total_received);
        }
    }
}
