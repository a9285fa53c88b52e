//! Purchasing tests
//!
//! Order totals, payments, storehouse receipts against purchase order lines
//! and the document workflow shared by requisitions and orders.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    ensure_batch_weight_unpriced, ensure_receivable, line_amount, validate_service_period,
    DocumentStatus, OrderError, OrderKind, OrderTotals, PaymentStatus, StatusFlow, SupplyUnit, WeighingReading,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Lines 2 x 500 and 1 x 250, a 100 freight charge and a 50 discount
    #[test]
    fn test_purchase_order_totals() {
        let lines = [
            line_amount(dec("2"), dec("500")).unwrap(),
            line_amount(dec("1"), dec("250")).unwrap(),
        ];
        let totals = OrderTotals::compute(&lines, &[dec("100")], &[dec("50")], &[]).unwrap();

        assert_eq!(totals.subtotal, dec("1250"));
        assert_eq!(totals.total, dec("1300"));
        assert_eq!(totals.balance, dec("1300"));
        assert!(!totals.is_settled());
    }

    #[test]
    fn test_partial_then_full_payment() {
        let lines = [dec("1000")];
        let first = OrderTotals::compute(&lines, &[], &[], &[(dec("400"), PaymentStatus::Applied)]).unwrap();
        assert_eq!(first.balance, dec("600"));
        assert!(first.ensure_payment_fits(dec("600")).is_ok());

        let second = OrderTotals::compute(
            &lines,
            &[],
            &[],
            &[
                (dec("400"), PaymentStatus::Applied),
                (dec("600"), PaymentStatus::Applied),
            ],
        )
        .unwrap();
        assert!(second.is_settled());
        assert!(matches!(
            second.ensure_payment_fits(dec("0.01")),
            Err(OrderError::Overpaid { .. })
        ));
    }

    /// Canceling a payment frees the amount for a new one
    #[test]
    fn test_canceled_payment_reopens_balance() {
        let totals = OrderTotals::compute(
            &[dec("500")],
            &[],
            &[],
            &[(dec("500"), PaymentStatus::Canceled)],
        )
        .unwrap();
        assert_eq!(totals.paid, Decimal::ZERO);
        assert!(totals.ensure_payment_fits(dec("500")).is_ok());
    }

    #[test]
    fn test_zero_total_order_is_not_settled() {
        let totals = OrderTotals::compute(&[], &[], &[], &[]).unwrap();
        assert!(!totals.is_settled());
        assert!(totals.ensure_payment_fits(dec("1")).is_err());
    }

    #[test]
    fn test_line_amount_rules() {
        assert_eq!(line_amount(dec("3.5"), dec("2")).unwrap(), dec("7.0"));
        assert_eq!(line_amount(dec("1"), Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert!(line_amount(Decimal::ZERO, dec("2")).is_err());
        assert!(line_amount(dec("1"), dec("-0.01")).is_err());
    }

    /// Receiving 6 then 4 of an ordered 10 fills the line; anything more is rejected
    #[test]
    fn test_storehouse_receipts_fill_line() {
        let ordered = dec("10");
        tokio_test::assert_ok!(ensure_receivable(ordered, Decimal::ZERO, dec("6")));
        tokio_test::assert_ok!(ensure_receivable(ordered, dec("6"), dec("4")));
        assert_eq!(
            ensure_receivable(ordered, dec("10"), dec("0.5")),
            Err(OrderError::OverReceived {
                pending: Decimal::ZERO,
                incoming: dec("0.5"),
            })
        );
    }

    #[test]
    fn test_service_period() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert!(validate_service_period(start, end).is_ok());
        assert!(matches!(
            validate_service_period(end, start),
            Err(OrderError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn test_document_workflow() {
        use DocumentStatus::*;
        assert!(Open.transition(Ready).is_ok());
        assert!(Ready.transition(Closed).is_ok());
        assert!(Open.transition(Canceled).is_ok());
        assert!(Ready.transition(Canceled).is_ok());

        assert!(Open.transition(Closed).is_err());
        assert!(Ready.transition(Open).is_err());
        assert!(Closed.transition(Canceled).is_err());
        assert!(Canceled.transition(Open).is_err());
    }

    #[test]
    fn test_only_open_documents_are_editable() {
        assert!(DocumentStatus::Open.is_editable());
        assert!(!DocumentStatus::Ready.is_editable());
        assert!(!DocumentStatus::Open.accepts_payments());
        assert!(DocumentStatus::Ready.accepts_payments());
        assert!(!DocumentStatus::Closed.accepts_payments());
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in [
            DocumentStatus::Open,
            DocumentStatus::Ready,
            DocumentStatus::Closed,
            DocumentStatus::Canceled,
        ] {
            assert_eq!(DocumentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::from_str("draft"), None);
    }

    #[test]
    fn test_order_kind_tables() {
        assert_eq!(OrderKind::PurchaseOrder.table(), "purchase_orders");
        assert_eq!(OrderKind::ServiceOrder.table(), "service_orders");
        assert_eq!(OrderKind::FruitPurchaseOrder.table(), "fruit_purchase_orders");
    }

    /// Two 100 kg weighings bought at 2/kg, paid in full and closed: the
    /// batch weight behind that price can no longer move
    #[test]
    fn test_paid_fruit_receipt_freezes_batch_weight() {
        let weighing = WeighingReading {
            gross_weight_kg: dec("120"),
            platform_tare_kg: dec("20"),
            container_count: 0,
            container_tare_kg: Decimal::ZERO,
        };
        let received = weighing.net_weight_kg().unwrap() * Decimal::from(2);
        let amount = line_amount(received, dec("2")).unwrap();

        let totals = OrderTotals::compute(&[amount], &[], &[], &[(dec("400"), PaymentStatus::Applied)]).unwrap();
        assert!(totals.is_settled());

        // Dropping a weighing afterwards would leave the order overpaid
        let repriced = OrderTotals::compute(
            &[line_amount(received / Decimal::from(2), dec("2")).unwrap()],
            &[],
            &[],
            &[(dec("400"), PaymentStatus::Applied)],
        )
        .unwrap();
        assert!(repriced.balance < Decimal::ZERO);

        for status in [DocumentStatus::Ready, DocumentStatus::Closed] {
            assert_eq!(
                ensure_batch_weight_unpriced(Some(status)),
                Err(OrderError::WeightPriced { status: status.as_str() })
            );
        }
    }

    /// Lines of whole-unit supplies are whole, so they can be received in full
    #[test]
    fn test_order_line_quantity_follows_unit() {
        assert!(SupplyUnit::Roll.validate_quantity(dec("2.5")).is_err());
        assert!(SupplyUnit::Piece.validate_quantity(dec("0.5")).is_err());
        assert!(SupplyUnit::Roll.validate_quantity(dec("3")).is_ok());

        let ordered = dec("2.5");
        assert!(SupplyUnit::Kilogram.validate_quantity(ordered).is_ok());
        tokio_test::assert_ok!(ensure_receivable(ordered, dec("2"), dec("0.5")));
    }

    #[test]
    fn test_unpriced_batch_weight_may_change() {
        assert!(ensure_batch_weight_unpriced(None).is_ok());
        assert!(ensure_batch_weight_unpriced(Some(DocumentStatus::Open)).is_ok());
        assert!(ensure_batch_weight_unpriced(Some(DocumentStatus::Canceled)).is_ok());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating money amounts (0.01 to 10000.00)
    fn amount_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Paying in any sequence of accepted payments never exceeds the total
        #[test]
        fn prop_payments_never_exceed_total(
            lines in prop::collection::vec(amount_strategy(), 1..6),
            attempts in prop::collection::vec(amount_strategy(), 1..12),
        ) {
            let mut applied: Vec<(Decimal, PaymentStatus)> = Vec::new();
            for amount in attempts {
                let totals = OrderTotals::compute(&lines, &[], &[], &applied).unwrap();
                if totals.ensure_payment_fits(amount).is_ok() {
                    applied.push((amount, PaymentStatus::Applied));
                }
            }

            let totals = OrderTotals::compute(&lines, &[], &[], &applied).unwrap();
            prop_assert!(totals.paid <= totals.total);
            prop_assert!(totals.balance >= Decimal::ZERO);
        }

        /// total = subtotal + charges - deductions whenever it is accepted
        #[test]
        fn prop_total_formula(
            lines in prop::collection::vec(amount_strategy(), 0..6),
            charges in prop::collection::vec(amount_strategy(), 0..3),
            deductions in prop::collection::vec(amount_strategy(), 0..3),
        ) {
            match OrderTotals::compute(&lines, &charges, &deductions, &[]) {
                Ok(totals) => {
                    prop_assert_eq!(totals.total, totals.subtotal + totals.charges - totals.deductions);
                    prop_assert!(totals.total >= Decimal::ZERO);
                }
                Err(OrderError::NegativeTotal { gross, deductions }) => {
                    prop_assert!(deductions > gross);
                }
                Err(other) => prop_assert!(false, "unexpected error {:?}", other),
            }
        }

        /// Accepted receipts never push a line past its ordered quantity
        #[test]
        fn prop_receipts_bounded_by_order(
            ordered in amount_strategy(),
            receipts in prop::collection::vec(amount_strategy(), 1..10),
        ) {
            let mut received = Decimal::ZERO;
            for quantity in receipts {
                if ensure_receivable(ordered, received, quantity).is_ok() {
                    received += quantity;
                }
            }
            prop_assert!(received <= ordered);
        }
    }
}
