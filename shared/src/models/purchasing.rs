//! Purchasing documents: requisitions, purchase, service and fruit purchase orders
//!
//! All four documents share one workflow (`DocumentStatus`) and the order
//! types share one money model (`OrderTotals`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::status::StatusFlow;

/// Errors raised by order money rules
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("deductions ({deductions}) exceed subtotal plus charges ({gross})")]
    NegativeTotal { gross: Decimal, deductions: Decimal },

    #[error("payments exceeding total cost: total {total}, already paid {paid}, new payment {amount}")]
    Overpaid {
        total: Decimal,
        paid: Decimal,
        amount: Decimal,
    },

    #[error("received quantity {incoming} exceeds pending quantity {pending}")]
    OverReceived { pending: Decimal, incoming: Decimal },

    #[error("start date {start} is after end date {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("batch weight is priced on a {status} fruit purchase order and can no longer change")]
    WeightPriced { status: &'static str },
}

/// Workflow shared by all purchasing documents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Draft, lines editable
    Open,
    /// Approved; payments and receipts allowed
    Ready,
    /// Fully settled
    Closed,
    Canceled,
}

impl DocumentStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(DocumentStatus::Open),
            "ready" => Some(DocumentStatus::Ready),
            "closed" => Some(DocumentStatus::Closed),
            "canceled" => Some(DocumentStatus::Canceled),
            _ => None,
        }
    }

    /// Lines, charges and deductions may change
    pub fn is_editable(&self) -> bool {
        matches!(self, DocumentStatus::Open)
    }

    /// Payments and receipts may be recorded
    pub fn accepts_payments(&self) -> bool {
        matches!(self, DocumentStatus::Ready)
    }
}

impl StatusFlow for DocumentStatus {
    const ENTITY: &'static str = "document";

    fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Open => "open",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Closed => "closed",
            DocumentStatus::Canceled => "canceled",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Open, DocumentStatus::Ready)
                | (DocumentStatus::Ready, DocumentStatus::Closed)
                | (DocumentStatus::Open, DocumentStatus::Canceled)
                | (DocumentStatus::Ready, DocumentStatus::Canceled)
        )
    }

    fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Closed | DocumentStatus::Canceled)
    }
}

/// Payment lifecycle; canceled payments no longer count as paid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Applied,
    Canceled,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Applied => "applied",
            PaymentStatus::Canceled => "canceled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "applied" => Some(PaymentStatus::Applied),
            "canceled" => Some(PaymentStatus::Canceled),
            _ => None,
        }
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Check,
    Credit,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Credit => "credit",
        }
    }
}

/// Kinds of order that carry charges, deductions and payments
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    PurchaseOrder,
    ServiceOrder,
    FruitPurchaseOrder,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::PurchaseOrder => "purchase_order",
            OrderKind::ServiceOrder => "service_order",
            OrderKind::FruitPurchaseOrder => "fruit_purchase_order",
        }
    }

    /// Table holding the order headers
    pub fn table(&self) -> &'static str {
        match self {
            OrderKind::PurchaseOrder => "purchase_orders",
            OrderKind::ServiceOrder => "service_orders",
            OrderKind::FruitPurchaseOrder => "fruit_purchase_orders",
        }
    }
}

/// Money position of an order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub charges: Decimal,
    pub deductions: Decimal,
    pub total: Decimal,
    pub paid: Decimal,
    pub balance: Decimal,
}

impl OrderTotals {
    /// Compute totals from amounts; `payments` pairs each amount with its status
    pub fn compute(
        line_amounts: &[Decimal],
        charges: &[Decimal],
        deductions: &[Decimal],
        payments: &[(Decimal, PaymentStatus)],
    ) -> Result<Self, OrderError> {
        let subtotal: Decimal = line_amounts.iter().sum();
        let charges: Decimal = charges.iter().sum();
        let deductions: Decimal = deductions.iter().sum();

        let gross = subtotal + charges;
        if deductions > gross {
            return Err(OrderError::NegativeTotal { gross, deductions });
        }
        let total = gross - deductions;

        let paid: Decimal = payments
            .iter()
            .filter(|(_, status)| *status == PaymentStatus::Applied)
            .map(|(amount, _)| *amount)
            .sum();

        Ok(Self {
            subtotal,
            charges,
            deductions,
            total,
            paid,
            balance: total - paid,
        })
    }

    /// Check a new payment against the outstanding balance
    pub fn ensure_payment_fits(&self, amount: Decimal) -> Result<(), OrderError> {
        if amount <= Decimal::ZERO {
            return Err(OrderError::NonPositive { field: "amount" });
        }
        if self.paid + amount > self.total {
            return Err(OrderError::Overpaid {
                total: self.total,
                paid: self.paid,
                amount,
            });
        }
        Ok(())
    }

    /// A ready order is settled once nothing is owed
    pub fn is_settled(&self) -> bool {
        self.balance == Decimal::ZERO && self.total > Decimal::ZERO
    }
}

/// Amount of a priced line
pub fn line_amount(quantity: Decimal, unit_price: Decimal) -> Result<Decimal, OrderError> {
    if quantity <= Decimal::ZERO {
        return Err(OrderError::NonPositive { field: "quantity" });
    }
    if unit_price < Decimal::ZERO {
        return Err(OrderError::NonPositive { field: "unit_price" });
    }
    Ok(quantity * unit_price)
}

/// Check that a storehouse receipt fits what is still pending on a line
pub fn ensure_receivable(
    ordered: Decimal,
    already_received: Decimal,
    incoming: Decimal,
) -> Result<(), OrderError> {
    if incoming <= Decimal::ZERO {
        return Err(OrderError::NonPositive { field: "quantity" });
    }
    let pending = (ordered - already_received).max(Decimal::ZERO);
    if incoming > pending {
        return Err(OrderError::OverReceived { pending, incoming });
    }
    Ok(())
}

/// Service period must not end before it starts
pub fn validate_service_period(start: NaiveDate, end: NaiveDate) -> Result<(), OrderError> {
    if start > end {
        return Err(OrderError::InvalidPeriod { start, end });
    }
    Ok(())
}

/// A batch's received weight prices its fruit purchase receipt, so it may
/// only change while the batch is on no order, an open one or a canceled one
pub fn ensure_batch_weight_unpriced(order_status: Option<DocumentStatus>) -> Result<(), OrderError> {
    match order_status {
        Some(status @ (DocumentStatus::Ready | DocumentStatus::Closed)) => {
            Err(OrderError::WeightPriced { status: status.as_str() })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_totals() {
        let totals = OrderTotals::compute(
            &[dec("1000"), dec("250.50")],
            &[dec("80")],
            &[dec("30.50")],
            &[
                (dec("500"), PaymentStatus::Applied),
                (dec("200"), PaymentStatus::Canceled),
            ],
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec("1250.50"));
        assert_eq!(totals.total, dec("1300.00"));
        assert_eq!(totals.paid, dec("500"));
        assert_eq!(totals.balance, dec("800.00"));
        assert!(!totals.is_settled());
    }

    #[test]
    fn test_deductions_cannot_exceed_total() {
        let result = OrderTotals::compute(&[dec("100")], &[], &[dec("100.01")], &[]);
        assert!(matches!(result, Err(OrderError::NegativeTotal { .. })));
    }

    #[test]
    fn test_payment_exceeding_total_cost() {
        let totals =
            OrderTotals::compute(&[dec("100")], &[], &[], &[(dec("60"), PaymentStatus::Applied)])
                .unwrap();
        assert!(totals.ensure_payment_fits(dec("40")).is_ok());
        assert!(matches!(
            totals.ensure_payment_fits(dec("40.01")),
            Err(OrderError::Overpaid { .. })
        ));
        assert!(totals.ensure_payment_fits(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_settled() {
        let totals =
            OrderTotals::compute(&[dec("100")], &[], &[], &[(dec("100"), PaymentStatus::Applied)])
                .unwrap();
        assert!(totals.is_settled());
    }

    #[test]
    fn test_receivable() {
        assert!(ensure_receivable(dec("10"), dec("4"), dec("6")).is_ok());
        assert!(matches!(
            ensure_receivable(dec("10"), dec("4"), dec("7")),
            Err(OrderError::OverReceived { .. })
        ));
        assert!(ensure_receivable(dec("10"), dec("12"), dec("1")).is_err());
    }

    #[test]
    fn test_document_workflow() {
        assert!(DocumentStatus::Open.transition(DocumentStatus::Ready).is_ok());
        assert!(DocumentStatus::Open.transition(DocumentStatus::Closed).is_err());
        assert!(DocumentStatus::Closed.transition(DocumentStatus::Canceled).is_err());
        assert!(DocumentStatus::Ready.accepts_payments());
        assert!(!DocumentStatus::Ready.is_editable());
    }

    #[test]
    fn test_service_period() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 9).unwrap();
        assert!(validate_service_period(start, start).is_ok());
        assert!(validate_service_period(start, end).is_err());
    }
}
