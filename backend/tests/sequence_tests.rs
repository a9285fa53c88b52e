//! Sequence (ooid) and folio tests
//!
//! Covers per-organization numbering and folio rendering and parsing.

use proptest::prelude::*;
use shared::folio::{format_folio, next_sequence, parse_folio, FolioError, SequenceScope};

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_first_ooid_is_one() {
        assert_eq!(next_sequence(None), 1);
        assert_eq!(next_sequence(Some(0)), 1);
    }

    #[test]
    fn test_next_ooid_follows_max() {
        assert_eq!(next_sequence(Some(1)), 2);
        assert_eq!(next_sequence(Some(41)), 42);
    }

    #[test]
    fn test_folio_padding() {
        assert_eq!(SequenceScope::Batch.folio(42), "BAT-000042");
        assert_eq!(SequenceScope::PurchaseOrder.folio(1), "PO-000001");
        assert_eq!(format_folio("ADJ", 1234567), "ADJ-1234567");
    }

    #[test]
    fn test_prefixes_are_unique() {
        let mut prefixes: Vec<_> = SequenceScope::ALL.iter().map(|s| s.prefix()).collect();
        prefixes.sort_unstable();
        prefixes.dedup();
        assert_eq!(prefixes.len(), SequenceScope::ALL.len());
    }

    #[test]
    fn test_every_scope_has_its_own_table() {
        for scope in SequenceScope::ALL {
            assert!(!scope.table().is_empty());
            assert_eq!(SequenceScope::from_prefix(scope.prefix()), Some(scope));
        }
    }

    #[test]
    fn test_parse_folio() {
        assert_eq!(parse_folio("SCH-000007").unwrap(), (SequenceScope::ScheduleHarvest, 7));
        assert_eq!(parse_folio("FPO-12").unwrap(), (SequenceScope::FruitPurchaseOrder, 12));
    }

    #[test]
    fn test_parse_folio_rejects_garbage() {
        assert!(matches!(parse_folio("BAT000001"), Err(FolioError::MissingSeparator(_))));
        assert!(matches!(parse_folio("XYZ-000001"), Err(FolioError::UnknownPrefix(_))));
        assert!(matches!(parse_folio("BAT-"), Err(FolioError::InvalidNumber(_))));
        assert!(matches!(parse_folio("BAT-00a1"), Err(FolioError::InvalidNumber(_))));
        assert!(matches!(parse_folio("BAT-000000"), Err(FolioError::InvalidNumber(_))));
        assert!(matches!(parse_folio("BAT--1"), Err(FolioError::InvalidNumber(_))));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn scope_strategy() -> impl Strategy<Value = SequenceScope> {
        prop::sample::select(SequenceScope::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Assigning n records in a row yields exactly 1..=n
        #[test]
        fn prop_sequence_is_contiguous(count in 1usize..200) {
            let mut assigned = Vec::with_capacity(count);
            for _ in 0..count {
                let next = next_sequence(assigned.last().copied());
                assigned.push(next);
            }
            let expected: Vec<i64> = (1..=count as i64).collect();
            prop_assert_eq!(assigned, expected);
        }

        /// The next ooid is always above everything already stored
        #[test]
        fn prop_next_exceeds_max(max in 1i64..i64::MAX / 2) {
            prop_assert!(next_sequence(Some(max)) > max);
        }

        /// A rendered folio parses back to its scope and number
        #[test]
        fn prop_folio_parses_back(scope in scope_strategy(), ooid in 1i64..100_000_000) {
            let folio = scope.folio(ooid);
            prop_assert_eq!(parse_folio(&folio).unwrap(), (scope, ooid));
        }

        /// Folios of the same scope sort like their ooids while under the pad width
        #[test]
        fn prop_folios_sort_numerically(a in 1i64..999_999, b in 1i64..999_999) {
            let fa = SequenceScope::Batch.folio(a);
            let fb = SequenceScope::Batch.folio(b);
            prop_assert_eq!(fa.cmp(&fb), a.cmp(&b));
        }
    }
}
