//! Supply inventory tests
//!
//! FIFO ledger behaviour the inventory service relies on: consumption order,
//! insufficient-stock rejection, replay of persisted allocations, kardex and
//! balances.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::fifo::{allocation_cost, kardex, Allocation, FifoError, FifoLedger, LedgerEntry};
use shared::{Direction, SupplyBalance};
use std::str::FromStr;
use uuid::Uuid;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap() + Duration::minutes(minute)
}

fn inbound(minute: i64, quantity: Decimal, unit_cost: Decimal) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4(),
        direction: Direction::In,
        quantity,
        unit_cost,
        occurred_at: at(minute),
        seq: minute,
        consumed_from: None,
    }
}

/// Outbound rows the service writes for a consumption, one per allocation
fn outbound_rows(minute: i64, allocations: &[Allocation]) -> Vec<LedgerEntry> {
    allocations
        .iter()
        .map(|a| LedgerEntry {
            id: Uuid::new_v4(),
            direction: Direction::Out,
            quantity: a.quantity,
            unit_cost: a.unit_cost,
            occurred_at: at(minute),
            seq: minute,
            consumed_from: Some(a.lot_id),
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two receipts, one consumption spanning both
    #[test]
    fn test_consumption_spans_lots() {
        let first = inbound(0, dec("100"), dec("1.50"));
        let second = inbound(10, dec("50"), dec("2.00"));
        let ledger = FifoLedger::replay(&[first.clone(), second.clone()]).unwrap();

        let allocations = ledger.allocate(dec("120")).unwrap();
        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].lot_id, first.id);
        assert_eq!(allocations[0].quantity, dec("100"));
        assert_eq!(allocations[1].lot_id, second.id);
        assert_eq!(allocations[1].quantity, dec("20"));
        assert_eq!(allocation_cost(&allocations), dec("190.00"));
    }

    /// Persisting the allocations and replaying gives the same remaining stock
    #[test]
    fn test_replay_after_consumption() {
        let first = inbound(0, dec("100"), dec("1.50"));
        let second = inbound(10, dec("50"), dec("2.00"));
        let mut entries = vec![first, second];

        let ledger = FifoLedger::replay(&entries).unwrap();
        let allocations = ledger.allocate(dec("120")).unwrap();
        entries.extend(outbound_rows(20, &allocations));

        let replayed = FifoLedger::replay(&entries).unwrap();
        assert_eq!(replayed.available(), dec("30"));
        assert_eq!(replayed.value(), dec("60.00"));
        assert_eq!(replayed.open_lots().count(), 1);
    }

    /// Asking for more than is on hand fails and changes nothing
    #[test]
    fn test_insufficient_stock_blocks() {
        let ledger = FifoLedger::replay(&[inbound(0, dec("10"), dec("1"))]).unwrap();
        let err = ledger.allocate(dec("10.001")).unwrap_err();
        assert_eq!(
            err,
            FifoError::Insufficient {
                requested: dec("10.001"),
                available: dec("10"),
            }
        );
        assert_eq!(ledger.available(), dec("10"));
    }

    #[test]
    fn test_empty_supply_has_nothing() {
        let ledger = FifoLedger::replay(&[]).unwrap();
        assert_eq!(ledger.available(), Decimal::ZERO);
        assert_eq!(ledger.last_unit_cost(), None);
        assert!(ledger.allocate(Decimal::ONE).is_err());
    }

    /// A receipt and a consumption written in one transaction share a
    /// timestamp; the write order decides
    #[test]
    fn test_same_timestamp_replays_in_write_order() {
        let mut lot = inbound(0, dec("5"), dec("1"));
        lot.seq = 1;
        let out = LedgerEntry {
            id: Uuid::new_v4(),
            direction: Direction::Out,
            quantity: dec("5"),
            unit_cost: dec("1"),
            occurred_at: at(0),
            seq: 2,
            consumed_from: Some(lot.id),
        };
        let ledger = FifoLedger::replay(&[out, lot]).unwrap();
        assert_eq!(ledger.available(), Decimal::ZERO);
    }

    /// A consumption that began before a later receipt but waited on the
    /// supply lock is stamped earlier than the lot it drew from
    #[test]
    fn test_draw_stamped_before_its_lot_still_replays() {
        let older = inbound(0, dec("10"), dec("1"));
        let mut newer = inbound(1, dec("10"), dec("2"));
        newer.occurred_at = at(30);

        let ledger = FifoLedger::replay(&[older.clone(), newer.clone()]).unwrap();
        let allocations = ledger.allocate(dec("15")).unwrap();
        assert_eq!(allocations[1].lot_id, newer.id);

        let mut entries = vec![older, newer];
        let mut draws = outbound_rows(2, &allocations);
        for row in &mut draws {
            row.occurred_at = at(20);
        }
        entries.extend(draws);

        let replayed = FifoLedger::replay(&entries).unwrap();
        assert_eq!(replayed.available(), dec("5"));
        assert_eq!(replayed.value(), dec("10"));
        let lines = kardex(&entries).unwrap();
        assert_eq!(lines.last().map(|l| l.balance), Some(dec("5")));

        // The next consumption keeps working on the same supply
        assert!(replayed.allocate(dec("5")).is_ok());
    }

    #[test]
    fn test_kardex_matches_ledger() {
        let first = inbound(0, dec("8"), dec("3"));
        let ledger = FifoLedger::replay(&[first.clone()]).unwrap();
        let allocations = ledger.allocate(dec("5")).unwrap();

        let mut entries = vec![first];
        entries.extend(outbound_rows(5, &allocations));
        entries.push(inbound(9, dec("2"), dec("4")));

        let lines = kardex(&entries).unwrap();
        let balances: Vec<_> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec("8"), dec("3"), dec("5")]);
        assert_eq!(FifoLedger::replay(&entries).unwrap().available(), dec("5"));
    }

    #[test]
    fn test_balance_flags_minimum_stock() {
        let supply_id = Uuid::new_v4();
        let ledger = FifoLedger::replay(&[inbound(0, dec("12"), dec("2.5"))]).unwrap();

        let above = SupplyBalance::from_ledger(supply_id, &ledger, dec("10"));
        assert!(!above.below_minimum);
        assert_eq!(above.value, dec("30.0"));

        let below = SupplyBalance::from_ledger(supply_id, &ledger, dec("20"));
        assert!(below.below_minimum);
    }

    /// Found stock is valued at the latest lot cost
    #[test]
    fn test_last_unit_cost_for_adjustments() {
        let ledger = FifoLedger::replay(&[
            inbound(0, dec("1"), dec("2.00")),
            inbound(1, dec("1"), dec("2.75")),
        ])
        .unwrap();
        assert_eq!(ledger.last_unit_cost(), Some(dec("2.75")));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating valid quantities (positive decimals)
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=10000i64).prop_map(|n| Decimal::new(n, 1)) // 0.1 to 1000.0
    }

    /// Strategy for generating valid unit costs
    fn cost_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=100000i64).prop_map(|n| Decimal::new(n, 2)) // 0.00 to 1000.00
    }

    fn receipts_strategy() -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
        prop::collection::vec((quantity_strategy(), cost_strategy()), 1..12)
    }

    fn receive_all(receipts: &[(Decimal, Decimal)]) -> Vec<LedgerEntry> {
        receipts
            .iter()
            .enumerate()
            .map(|(i, (qty, cost))| inbound(i as i64, *qty, *cost))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Allocations cover exactly the requested quantity, or the request fails
        #[test]
        fn prop_allocation_covers_request(
            receipts in receipts_strategy(),
            request in quantity_strategy(),
        ) {
            let entries = receive_all(&receipts);
            let ledger = FifoLedger::replay(&entries).unwrap();
            let available = ledger.available();

            match ledger.allocate(request) {
                Ok(allocations) => {
                    prop_assert!(request <= available);
                    let total: Decimal = allocations.iter().map(|a| a.quantity).sum();
                    prop_assert_eq!(total, request);
                    prop_assert!(allocations.iter().all(|a| a.quantity > Decimal::ZERO));
                }
                Err(FifoError::Insufficient { requested, available: reported }) => {
                    prop_assert!(request > available);
                    prop_assert_eq!(requested, request);
                    prop_assert_eq!(reported, available);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Lots are drawn oldest first: only the last lot touched may be partial
        #[test]
        fn prop_oldest_lots_first(
            receipts in receipts_strategy(),
            fraction in 1u32..=100,
        ) {
            let entries = receive_all(&receipts);
            let ledger = FifoLedger::replay(&entries).unwrap();
            let request = (ledger.available() * Decimal::from(fraction) / Decimal::from(100)).round_dp(3);
            prop_assume!(request > Decimal::ZERO);

            let allocations = ledger.allocate(request).unwrap();
            for (i, allocation) in allocations.iter().enumerate() {
                prop_assert_eq!(allocation.lot_id, entries[i].id);
                if i + 1 < allocations.len() {
                    prop_assert_eq!(allocation.quantity, entries[i].quantity);
                }
            }
        }

        /// Balance never goes negative across any sequence of consumptions
        #[test]
        fn prop_balance_never_negative(
            receipts in receipts_strategy(),
            requests in prop::collection::vec(quantity_strategy(), 1..10),
        ) {
            let mut entries = receive_all(&receipts);
            let mut minute = 1_000;

            for request in requests {
                let ledger = FifoLedger::replay(&entries).unwrap();
                if let Ok(allocations) = ledger.allocate(request) {
                    entries.extend(outbound_rows(minute, &allocations));
                }
                minute += 1;

                let replayed = FifoLedger::replay(&entries).unwrap();
                prop_assert!(replayed.available() >= Decimal::ZERO);
                prop_assert!(replayed.open_lots().all(|l| l.remaining_quantity > Decimal::ZERO));
            }

            let total_in: Decimal = receipts.iter().map(|(q, _)| *q).sum();
            let total_out: Decimal = entries
                .iter()
                .filter(|e| e.direction == Direction::Out)
                .map(|e| e.quantity)
                .sum();
            let ledger = FifoLedger::replay(&entries).unwrap();
            prop_assert_eq!(ledger.available(), total_in - total_out);
            prop_assert!(kardex(&entries).is_ok());
        }

        /// Replay follows write order, whatever the timestamps or input order
        #[test]
        fn prop_replay_follows_write_order(
            receipts in receipts_strategy(),
            request in quantity_strategy(),
            keys in prop::collection::vec(any::<u32>(), 32),
        ) {
            let mut entries = receive_all(&receipts);
            let ledger = FifoLedger::replay(&entries).unwrap();
            if let Ok(allocations) = ledger.allocate(request) {
                entries.extend(outbound_rows(1_000, &allocations));
            }
            let lots = |ledger: &FifoLedger| -> Vec<(Uuid, Decimal)> {
                ledger.open_lots().map(|l| (l.id, l.remaining_quantity)).collect()
            };
            let expected = lots(&FifoLedger::replay(&entries).unwrap());

            // Timestamps run backwards and the rows arrive shuffled
            for entry in &mut entries {
                entry.occurred_at = at(-entry.seq);
            }
            let mut keyed: Vec<_> = entries.into_iter().zip(keys.iter().cycle()).collect();
            keyed.sort_by_key(|(_, key)| **key);
            let shuffled: Vec<LedgerEntry> = keyed.into_iter().map(|(entry, _)| entry).collect();

            prop_assert_eq!(lots(&FifoLedger::replay(&shuffled).unwrap()), expected);
            prop_assert!(kardex(&shuffled).is_ok());
        }

        /// Stock value falls by exactly the cost of what was consumed
        #[test]
        fn prop_value_drops_by_allocation_cost(
            receipts in receipts_strategy(),
            request in quantity_strategy(),
        ) {
            let mut ledger = FifoLedger::replay(&receive_all(&receipts)).unwrap();
            let before = ledger.value();
            if let Ok(allocations) = ledger.consume(request) {
                prop_assert_eq!(before - ledger.value(), allocation_cost(&allocations));
            }
        }
    }
}
