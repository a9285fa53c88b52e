//! First-in-first-out inventory ledger
//!
//! A supply's transactions are replayed in the order they were written: every inbound
//! transaction opens a lot, every outbound transaction draws from the oldest
//! lots that still hold stock. The ledger answers how much is available,
//! what it is worth, and which lots a new consumption would draw from.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Direction;

/// Errors raised by the FIFO ledger
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FifoError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient {
        requested: Decimal,
        available: Decimal,
    },

    #[error("lot {0} does not exist in this ledger")]
    UnknownLot(Uuid),

    #[error("lot {lot_id} holds {remaining}, cannot draw {requested}")]
    LotOverdrawn {
        lot_id: Uuid,
        remaining: Decimal,
        requested: Decimal,
    },
}

/// One persisted inventory transaction as seen by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub occurred_at: DateTime<Utc>,
    /// Write order within the supply; assigned while the supply is locked
    #[serde(default)]
    pub seq: i64,
    /// Inbound lot an outbound transaction was drawn from
    pub consumed_from: Option<Uuid>,
}

/// Stock received by one inbound transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FifoLot {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub unit_cost: Decimal,
    pub original_quantity: Decimal,
    pub remaining_quantity: Decimal,
}

impl FifoLot {
    pub fn is_exhausted(&self) -> bool {
        self.remaining_quantity <= Decimal::ZERO
    }

    pub fn remaining_value(&self) -> Decimal {
        self.remaining_quantity * self.unit_cost
    }
}

/// Quantity drawn from a single lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
}

impl Allocation {
    pub fn cost(&self) -> Decimal {
        self.quantity * self.unit_cost
    }
}

/// Total cost of a set of allocations
pub fn allocation_cost(allocations: &[Allocation]) -> Decimal {
    allocations.iter().map(Allocation::cost).sum()
}

fn in_write_order(entries: &[LedgerEntry]) -> Vec<&LedgerEntry> {
    let mut ordered: Vec<&LedgerEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.seq);
    ordered
}

/// FIFO ledger for a single supply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FifoLedger {
    lots: VecDeque<FifoLot>,
}

impl FifoLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the ledger from persisted transactions.
    ///
    /// Entries are ordered by `seq`. `occurred_at` can run behind it: a draw
    /// that waited on the supply lock may carry an earlier time than the lot
    /// it draws from. Ties keep their input order. Outbound entries that name their source lot draw
    /// from it directly, the rest are allocated first-in-first-out.
    pub fn replay(entries: &[LedgerEntry]) -> Result<Self, FifoError> {
        let ordered = in_write_order(entries);

        let mut ledger = Self::new();
        for entry in ordered {
            match entry.direction {
                Direction::In => {
                    ledger.receive(entry.id, entry.quantity, entry.unit_cost, entry.occurred_at)?
                }
                Direction::Out => match entry.consumed_from {
                    Some(lot_id) => ledger.draw_from(lot_id, entry.quantity)?,
                    None => {
                        ledger.consume(entry.quantity)?;
                    }
                },
            }
        }

        Ok(ledger)
    }

    /// Open a new lot at the back of the queue
    pub fn receive(
        &mut self,
        id: Uuid,
        quantity: Decimal,
        unit_cost: Decimal,
        received_at: DateTime<Utc>,
    ) -> Result<(), FifoError> {
        if quantity <= Decimal::ZERO {
            return Err(FifoError::NonPositiveQuantity(quantity));
        }

        self.lots.push_back(FifoLot {
            id,
            received_at,
            unit_cost,
            original_quantity: quantity,
            remaining_quantity: quantity,
        });
        Ok(())
    }

    /// Total quantity still held across all lots
    pub fn available(&self) -> Decimal {
        self.lots.iter().map(|l| l.remaining_quantity).sum()
    }

    /// Value of the remaining stock at each lot's cost
    pub fn value(&self) -> Decimal {
        self.lots.iter().map(FifoLot::remaining_value).sum()
    }

    /// Lots that still hold stock, oldest first
    pub fn open_lots(&self) -> impl Iterator<Item = &FifoLot> {
        self.lots.iter().filter(|l| !l.is_exhausted())
    }

    /// Unit cost of the most recently received lot
    pub fn last_unit_cost(&self) -> Option<Decimal> {
        self.lots.back().map(|l| l.unit_cost)
    }

    /// Work out which lots a consumption would draw from, without applying it
    pub fn allocate(&self, quantity: Decimal) -> Result<Vec<Allocation>, FifoError> {
        if quantity <= Decimal::ZERO {
            return Err(FifoError::NonPositiveQuantity(quantity));
        }

        let available = self.available();
        if quantity > available {
            return Err(FifoError::Insufficient {
                requested: quantity,
                available,
            });
        }

        let mut pending = quantity;
        let mut allocations = Vec::new();
        for lot in self.open_lots() {
            if pending <= Decimal::ZERO {
                break;
            }
            let take = pending.min(lot.remaining_quantity);
            allocations.push(Allocation {
                lot_id: lot.id,
                quantity: take,
                unit_cost: lot.unit_cost,
            });
            pending -= take;
        }

        Ok(allocations)
    }

    /// Consume stock first-in-first-out, returning the lots drawn from
    pub fn consume(&mut self, quantity: Decimal) -> Result<Vec<Allocation>, FifoError> {
        let allocations = self.allocate(quantity)?;
        for allocation in &allocations {
            self.draw_from(allocation.lot_id, allocation.quantity)?;
        }
        Ok(allocations)
    }

    fn draw_from(&mut self, lot_id: Uuid, quantity: Decimal) -> Result<(), FifoError> {
        if quantity <= Decimal::ZERO {
            return Err(FifoError::NonPositiveQuantity(quantity));
        }

        let lot = self
            .lots
            .iter_mut()
            .find(|l| l.id == lot_id)
            .ok_or(FifoError::UnknownLot(lot_id))?;

        if quantity > lot.remaining_quantity {
            return Err(FifoError::LotOverdrawn {
                lot_id,
                remaining: lot.remaining_quantity,
                requested: quantity,
            });
        }

        lot.remaining_quantity -= quantity;
        Ok(())
    }
}

/// One line of a kardex: a transaction and the balance right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KardexLine {
    pub entry_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub direction: Direction,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub balance: Decimal,
}

/// Ledger in write order with running balance; fails if the balance dips below zero
pub fn kardex(entries: &[LedgerEntry]) -> Result<Vec<KardexLine>, FifoError> {
    let ordered = in_write_order(entries);

    let mut balance = Decimal::ZERO;
    let mut lines = Vec::with_capacity(ordered.len());
    for entry in ordered {
        match entry.direction {
            Direction::In => balance += entry.quantity,
            Direction::Out => {
                if entry.quantity > balance {
                    return Err(FifoError::Insufficient {
                        requested: entry.quantity,
                        available: balance,
                    });
                }
                balance -= entry.quantity;
            }
        }
        lines.push(KardexLine {
            entry_id: entry.id,
            occurred_at: entry.occurred_at,
            direction: entry.direction,
            quantity: entry.quantity,
            unit_cost: entry.unit_cost,
            balance,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn at(day: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::days(day)
    }

    fn inbound(day: i64, qty: &str, cost: &str) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            direction: Direction::In,
            quantity: dec(qty),
            unit_cost: dec(cost),
            occurred_at: at(day),
            seq: day,
            consumed_from: None,
        }
    }

    fn outbound(day: i64, qty: &str, from: Option<Uuid>) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::new_v4(),
            direction: Direction::Out,
            quantity: dec(qty),
            unit_cost: Decimal::ZERO,
            occurred_at: at(day),
            seq: day,
            consumed_from: from,
        }
    }

    #[test]
    fn test_consume_draws_oldest_first() {
        let first = inbound(0, "10", "2.00");
        let second = inbound(1, "5", "3.00");
        let mut ledger = FifoLedger::replay(&[second.clone(), first.clone()]).unwrap();

        let allocations = ledger.consume(dec("12")).unwrap();

        assert_eq!(allocations.len(), 2);
        assert_eq!(allocations[0].lot_id, first.id);
        assert_eq!(allocations[0].quantity, dec("10"));
        assert_eq!(allocations[1].lot_id, second.id);
        assert_eq!(allocations[1].quantity, dec("2"));
        assert_eq!(allocation_cost(&allocations), dec("26.00"));
        assert_eq!(ledger.available(), dec("3"));
        assert_eq!(ledger.value(), dec("9.00"));
    }

    #[test]
    fn test_plan_does_not_mutate() {
        let ledger = FifoLedger::replay(&[inbound(0, "4", "1")]).unwrap();
        let plan = ledger.allocate(dec("3")).unwrap();
        assert_eq!(plan[0].quantity, dec("3"));
        assert_eq!(ledger.available(), dec("4"));
    }

    #[test]
    fn test_insufficient_stock() {
        let mut ledger = FifoLedger::replay(&[inbound(0, "4", "1")]).unwrap();
        let err = ledger.consume(dec("4.5")).unwrap_err();
        assert_eq!(
            err,
            FifoError::Insufficient {
                requested: dec("4.5"),
                available: dec("4"),
            }
        );
        assert_eq!(ledger.available(), dec("4"));
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let mut ledger = FifoLedger::new();
        assert!(matches!(
            ledger.consume(Decimal::ZERO),
            Err(FifoError::NonPositiveQuantity(_))
        ));
        assert!(matches!(
            ledger.receive(Uuid::new_v4(), dec("-1"), Decimal::ONE, at(0)),
            Err(FifoError::NonPositiveQuantity(_))
        ));
    }

    #[test]
    fn test_replay_honours_recorded_source_lot() {
        let first = inbound(0, "10", "1");
        let second = inbound(1, "10", "2");
        // Drawn explicitly from the newer lot
        let out = outbound(2, "6", Some(second.id));
        let ledger = FifoLedger::replay(&[first.clone(), second.clone(), out]).unwrap();

        let lots: Vec<_> = ledger.open_lots().collect();
        assert_eq!(lots[0].remaining_quantity, dec("10"));
        assert_eq!(lots[1].remaining_quantity, dec("4"));
    }

    #[test]
    fn test_replay_rejects_overdrawn_lot() {
        let first = inbound(0, "3", "1");
        let out = outbound(1, "5", Some(first.id));
        assert!(matches!(
            FifoLedger::replay(&[first, out]),
            Err(FifoError::LotOverdrawn { .. })
        ));
    }

    #[test]
    fn test_replay_rejects_unknown_lot() {
        let out = outbound(1, "1", Some(Uuid::new_v4()));
        assert!(matches!(
            FifoLedger::replay(&[inbound(0, "3", "1"), out]),
            Err(FifoError::UnknownLot(_))
        ));
    }

    #[test]
    fn test_exhausted_lots_are_not_open() {
        let mut ledger = FifoLedger::replay(&[inbound(0, "2", "1"), inbound(1, "2", "1")]).unwrap();
        ledger.consume(dec("2")).unwrap();
        assert_eq!(ledger.open_lots().count(), 1);
        assert_eq!(ledger.last_unit_cost(), Some(dec("1")));
    }

    #[test]
    fn test_kardex_running_balance() {
        let lines = kardex(&[
            inbound(0, "10", "1"),
            outbound(1, "4", None),
            inbound(2, "3", "1"),
        ])
        .unwrap();
        let balances: Vec<_> = lines.iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec("10"), dec("6"), dec("9")]);
    }

    #[test]
    fn test_replay_follows_write_order_over_timestamps() {
        let lot = inbound(0, "10", "1");
        let mut late = inbound(1, "10", "2");
        late.occurred_at = at(5);
        // Began before the second lot was written, drew from it afterwards
        let first_draw = outbound(2, "10", Some(lot.id));
        let mut out = outbound(2, "5", Some(late.id));
        out.occurred_at = at(3);

        let entries = [lot, late, first_draw, out];
        let ledger = FifoLedger::replay(&entries).unwrap();
        assert_eq!(ledger.available(), dec("5"));
        let balances: Vec<_> = kardex(&entries).unwrap().iter().map(|l| l.balance).collect();
        assert_eq!(balances, vec![dec("10"), dec("20"), dec("10"), dec("5")]);
    }

    #[test]
    fn test_kardex_negative_balance() {
        assert!(kardex(&[inbound(1, "1", "1"), outbound(0, "1", None)]).is_err());
    }
}
