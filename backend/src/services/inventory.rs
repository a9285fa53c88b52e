//! Supply inventory service
//!
//! Stock only moves through `inventory_transactions`. Storehouse entries
//! and inbound adjustments open FIFO lots; consumptions and outbound
//! adjustments write one outbound row per lot they draw from, so replaying
//! the rows always rebuilds the same ledger. Every movement of a supply
//! runs with that supply's row locked.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::order_money::lock_document;
use super::parse_status;
use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::fifo::{allocation_cost, kardex, Allocation, FifoLedger, FifoLot, KardexLine, LedgerEntry};
use shared::folio::SequenceScope;
use shared::{
    ensure_receivable, validate_non_negative, Direction, DocumentStatus, OrderKind, StatusFlow,
    SupplyBalance, SupplyUnit, TransactionSource,
};

#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Persisted inventory transaction
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub supply_id: Uuid,
    pub direction: String,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub source: String,
    pub source_id: Option<Uuid>,
    pub consumed_from: Option<Uuid>,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub seq: i64,
    pub created_by: Option<Uuid>,
}

impl InventoryTransaction {
    fn to_ledger_entry(&self) -> AppResult<LedgerEntry> {
        Ok(LedgerEntry {
            id: self.id,
            direction: parse_status(&self.direction, Direction::from_str)?,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            occurred_at: self.occurred_at,
            seq: self.seq,
            consumed_from: self.consumed_from,
        })
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StorehouseEntry {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub purchase_order_id: Uuid,
    pub received_at: DateTime<Utc>,
    pub comments: Option<String>,
    pub created_by: Option<Uuid>,
}

impl StorehouseEntry {
    pub fn folio(&self) -> String {
        SequenceScope::StorehouseEntry.folio(self.ooid)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StorehouseEntryLine {
    pub id: Uuid,
    pub purchase_order_line_id: Uuid,
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct StorehouseEntryDetail {
    #[serde(flatten)]
    pub entry: StorehouseEntry,
    pub folio: String,
    pub lines: Vec<StorehouseEntryLine>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdjustmentInventory {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub supply_id: Uuid,
    pub direction: String,
    pub quantity: Decimal,
    pub reason: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl AdjustmentInventory {
    pub fn folio(&self) -> String {
        SequenceScope::AdjustmentInventory.folio(self.ooid)
    }
}

#[derive(Debug, Deserialize)]
pub struct EntryLineInput {
    pub purchase_order_line_id: Uuid,
    pub quantity: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateStorehouseEntryInput {
    pub purchase_order_id: Uuid,
    pub comments: Option<String>,
    pub lines: Vec<EntryLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeInput {
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAdjustmentInput {
    pub supply_id: Uuid,
    pub direction: Direction,
    pub quantity: Decimal,
    pub reason: String,
    /// Cost of found stock; defaults to the supply's latest lot cost
    pub unit_cost: Option<Decimal>,
}

/// Outcome of drawing stock
#[derive(Debug, Serialize)]
pub struct ConsumptionResult {
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub allocations: Vec<Allocation>,
    pub balance: SupplyBalance,
}

#[derive(Debug, Serialize)]
pub struct AdjustmentResult {
    #[serde(flatten)]
    pub adjustment: AdjustmentInventory,
    pub folio: String,
    pub allocations: Vec<Allocation>,
    pub balance: SupplyBalance,
}

#[derive(Debug, Default, Deserialize)]
pub struct EntryFilter {
    pub purchase_order_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdjustmentFilter {
    pub supply_id: Option<Uuid>,
}

/// Locked supply row
struct LockedSupply {
    unit: SupplyUnit,
    minimum_stock: Decimal,
}

const SELECT_TRANSACTION: &str = r#"
    SELECT id, supply_id, direction, quantity, unit_cost, source, source_id, consumed_from,
           reason, occurred_at, seq, created_by
    FROM inventory_transactions
"#;

async fn lock_supply(conn: &mut PgConnection, organization_id: Uuid, supply_id: Uuid) -> AppResult<LockedSupply> {
    let (unit, minimum_stock, is_enabled) = sqlx::query_as::<_, (String, Decimal, bool)>(
        r#"
        SELECT unit, minimum_stock, is_enabled
        FROM supplies
        WHERE id = $1 AND organization_id = $2
        FOR UPDATE
        "#,
    )
    .bind(supply_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Supply"))?;

    if !is_enabled {
        return Err(AppError::validation("supply_id", "Supply is disabled"));
    }

    Ok(LockedSupply {
        unit: parse_status(&unit, SupplyUnit::from_str)?,
        minimum_stock,
    })
}

fn check_quantity(unit: SupplyUnit, quantity: Decimal) -> AppResult<()> {
    unit.validate_quantity(quantity)
        .map_err(|msg| AppError::validation("quantity", msg))
}

/// Check a document line quantity against its supply's unit
pub async fn check_line_quantity(
    conn: &mut PgConnection,
    organization_id: Uuid,
    supply_id: Uuid,
    quantity: Decimal,
) -> AppResult<()> {
    let unit = sqlx::query_scalar::<_, String>("SELECT unit FROM supplies WHERE id = $1 AND organization_id = $2")
        .bind(supply_id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Supply"))?;

    check_quantity(parse_status(&unit, SupplyUnit::from_str)?, quantity)
}

async fn supply_transactions(
    conn: &mut PgConnection,
    organization_id: Uuid,
    supply_id: Uuid,
) -> AppResult<Vec<InventoryTransaction>> {
    let query = format!(
        "{} WHERE organization_id = $1 AND supply_id = $2 ORDER BY seq",
        SELECT_TRANSACTION
    );
    let rows = sqlx::query_as::<_, InventoryTransaction>(&query)
        .bind(organization_id)
        .bind(supply_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

fn ledger_entries(rows: &[InventoryTransaction]) -> AppResult<Vec<LedgerEntry>> {
    rows.iter().map(InventoryTransaction::to_ledger_entry).collect()
}

/// Rebuild the FIFO ledger of a supply from its transactions
pub async fn load_ledger(conn: &mut PgConnection, organization_id: Uuid, supply_id: Uuid) -> AppResult<FifoLedger> {
    let rows = supply_transactions(&mut *conn, organization_id, supply_id).await?;
    let ledger = FifoLedger::replay(&ledger_entries(&rows)?)?;
    Ok(ledger)
}

/// Write an inbound transaction; it becomes a new lot
#[allow(clippy::too_many_arguments)]
async fn record_inbound(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
    supply_id: Uuid,
    quantity: Decimal,
    unit_cost: Decimal,
    source: TransactionSource,
    source_id: Option<Uuid>,
    reason: Option<&str>,
) -> AppResult<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO inventory_transactions
            (organization_id, supply_id, direction, quantity, unit_cost, source, source_id, reason, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(supply_id)
    .bind(Direction::In.as_str())
    .bind(quantity)
    .bind(unit_cost)
    .bind(source.as_str())
    .bind(source_id)
    .bind(reason)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

/// Draw stock first-in-first-out, one outbound row per lot touched.
///
/// The supply must already be locked by the caller.
#[allow(clippy::too_many_arguments)]
async fn draw_fifo(
    conn: &mut PgConnection,
    organization_id: Uuid,
    user_id: Uuid,
    supply_id: Uuid,
    quantity: Decimal,
    source: TransactionSource,
    source_id: Option<Uuid>,
    reason: Option<&str>,
) -> AppResult<Vec<Allocation>> {
    let ledger = load_ledger(&mut *conn, organization_id, supply_id).await?;
    let allocations = match ledger.allocate(quantity) {
        Ok(allocations) => allocations,
        Err(e) => {
            tracing::warn!(%supply_id, %quantity, available = %ledger.available(), "stock draw rejected");
            return Err(e.into());
        }
    };

    for allocation in &allocations {
        sqlx::query(
            r#"
            INSERT INTO inventory_transactions
                (organization_id, supply_id, direction, quantity, unit_cost, source, source_id,
                 consumed_from, reason, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(organization_id)
        .bind(supply_id)
        .bind(Direction::Out.as_str())
        .bind(allocation.quantity)
        .bind(allocation.unit_cost)
        .bind(source.as_str())
        .bind(source_id)
        .bind(allocation.lot_id)
        .bind(reason)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(allocations)
}

async fn balance_of(
    conn: &mut PgConnection,
    organization_id: Uuid,
    supply_id: Uuid,
    minimum_stock: Decimal,
) -> AppResult<SupplyBalance> {
    let ledger = load_ledger(&mut *conn, organization_id, supply_id).await?;
    Ok(SupplyBalance::from_ledger(supply_id, &ledger, minimum_stock))
}

impl InventoryService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ---- storehouse entries ------------------------------------------------

    /// Receive supplies against a ready purchase order
    pub async fn create_storehouse_entry(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateStorehouseEntryInput,
    ) -> AppResult<StorehouseEntryDetail> {
        if input.lines.is_empty() {
            return Err(AppError::validation("lines", "A storehouse entry needs at least one line"));
        }

        let mut tx = self.db.begin().await?;

        let status = lock_document(
            &mut tx,
            organization_id,
            OrderKind::PurchaseOrder.table(),
            input.purchase_order_id,
        )
        .await?;
        if status != DocumentStatus::Ready {
            return Err(AppError::InvalidStateTransition(format!(
                "supplies can only be received on ready purchase orders, this one is {}",
                status.as_str()
            )));
        }

        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::StorehouseEntry).await?;
        let entry_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO storehouse_entries (organization_id, ooid, purchase_order_id, comments, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.purchase_order_id)
        .bind(&input.comments)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let mut order_lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let row = sqlx::query_as::<_, (Uuid, Decimal, Decimal, Decimal)>(
                r#"
                SELECT supply_id, quantity, received_quantity, unit_price
                FROM purchase_order_lines
                WHERE id = $1 AND purchase_order_id = $2
                FOR UPDATE
                "#,
            )
            .bind(line.purchase_order_line_id)
            .bind(input.purchase_order_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order line"))?;
            order_lines.push(row);
        }
        // Supplies are locked in id order so concurrent entries cannot deadlock
        let mut paired: Vec<_> = input.lines.into_iter().zip(order_lines).collect();
        paired.sort_by_key(|(_, (supply_id, ..))| *supply_id);

        let mut received: HashMap<Uuid, Decimal> = HashMap::new();
        for (line, (supply_id, ordered, already_received, unit_price)) in &paired {
            let supply = lock_supply(&mut tx, organization_id, *supply_id).await?;
            check_quantity(supply.unit, line.quantity)?;

            // The same order line may appear twice in one entry
            let earlier = received.entry(line.purchase_order_line_id).or_insert(Decimal::ZERO);
            ensure_receivable(*ordered, *already_received + *earlier, line.quantity)?;
            *earlier += line.quantity;

            sqlx::query(
                "UPDATE purchase_order_lines SET received_quantity = received_quantity + $2 WHERE id = $1",
            )
            .bind(line.purchase_order_line_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO storehouse_entry_lines (storehouse_entry_id, purchase_order_line_id, quantity)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(entry_id)
            .bind(line.purchase_order_line_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            record_inbound(
                &mut tx,
                organization_id,
                user_id,
                *supply_id,
                line.quantity,
                *unit_price,
                TransactionSource::StorehouseEntry,
                Some(entry_id),
                None,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            folio = %SequenceScope::StorehouseEntry.folio(ooid),
            purchase_order_id = %input.purchase_order_id,
            lines = paired.len(),
            "storehouse entry recorded"
        );
        self.get_storehouse_entry(organization_id, entry_id).await
    }

    pub async fn list_storehouse_entries(
        &self,
        organization_id: Uuid,
        filter: &EntryFilter,
    ) -> AppResult<Vec<StorehouseEntry>> {
        let entries = sqlx::query_as::<_, StorehouseEntry>(
            r#"
            SELECT id, organization_id, ooid, purchase_order_id, received_at, comments, created_by
            FROM storehouse_entries
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR purchase_order_id = $2)
            ORDER BY ooid DESC
            "#,
        )
        .bind(organization_id)
        .bind(filter.purchase_order_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn get_storehouse_entry(&self, organization_id: Uuid, id: Uuid) -> AppResult<StorehouseEntryDetail> {
        let entry = sqlx::query_as::<_, StorehouseEntry>(
            r#"
            SELECT id, organization_id, ooid, purchase_order_id, received_at, comments, created_by
            FROM storehouse_entries
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Storehouse entry"))?;

        let lines = sqlx::query_as::<_, StorehouseEntryLine>(
            r#"
            SELECT el.id, el.purchase_order_line_id, pol.supply_id, el.quantity, pol.unit_price
            FROM storehouse_entry_lines el
            JOIN purchase_order_lines pol ON pol.id = el.purchase_order_line_id
            WHERE el.storehouse_entry_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(StorehouseEntryDetail {
            folio: entry.folio(),
            entry,
            lines,
        })
    }

    // ---- consumption -------------------------------------------------------

    /// Use supplies, drawing from the oldest lots first
    pub async fn consume(&self, organization_id: Uuid, user_id: Uuid, input: ConsumeInput) -> AppResult<ConsumptionResult> {
        let mut tx = self.db.begin().await?;

        let supply = lock_supply(&mut tx, organization_id, input.supply_id).await?;
        check_quantity(supply.unit, input.quantity)?;

        let allocations = draw_fifo(
            &mut tx,
            organization_id,
            user_id,
            input.supply_id,
            input.quantity,
            TransactionSource::Consumption,
            None,
            input.reason.as_deref(),
        )
        .await?;

        let balance = balance_of(&mut tx, organization_id, input.supply_id, supply.minimum_stock).await?;
        tx.commit().await?;

        let cost = allocation_cost(&allocations);
        tracing::info!(
            supply_id = %input.supply_id,
            quantity = %input.quantity,
            %cost,
            lots = allocations.len(),
            "supply consumed"
        );
        if balance.below_minimum {
            tracing::warn!(supply_id = %input.supply_id, remaining = %balance.quantity, "supply below minimum stock");
        }

        Ok(ConsumptionResult {
            supply_id: input.supply_id,
            quantity: input.quantity,
            cost,
            allocations,
            balance,
        })
    }

    // ---- adjustments -------------------------------------------------------

    /// Correct stock by hand; found stock opens a lot, lost stock is drawn FIFO
    pub async fn create_adjustment(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateAdjustmentInput,
    ) -> AppResult<AdjustmentResult> {
        let reason = input.reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "A reason is required"));
        }
        if let Some(cost) = input.unit_cost {
            validate_non_negative(cost).map_err(|msg| AppError::validation("unit_cost", msg))?;
        }

        let mut tx = self.db.begin().await?;

        let supply = lock_supply(&mut tx, organization_id, input.supply_id).await?;
        check_quantity(supply.unit, input.quantity)?;

        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::AdjustmentInventory).await?;
        let adjustment = sqlx::query_as::<_, AdjustmentInventory>(
            r#"
            INSERT INTO adjustment_inventories
                (organization_id, ooid, supply_id, direction, quantity, reason, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, organization_id, ooid, supply_id, direction, quantity, reason, created_by, created_at
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.supply_id)
        .bind(input.direction.as_str())
        .bind(input.quantity)
        .bind(reason)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let allocations = match input.direction {
            Direction::In => {
                let unit_cost = match input.unit_cost {
                    Some(cost) => cost,
                    None => load_ledger(&mut tx, organization_id, input.supply_id)
                        .await?
                        .last_unit_cost()
                        .unwrap_or(Decimal::ZERO),
                };
                record_inbound(
                    &mut tx,
                    organization_id,
                    user_id,
                    input.supply_id,
                    input.quantity,
                    unit_cost,
                    TransactionSource::Adjustment,
                    Some(adjustment.id),
                    Some(reason),
                )
                .await?;
                Vec::new()
            }
            Direction::Out => {
                draw_fifo(
                    &mut tx,
                    organization_id,
                    user_id,
                    input.supply_id,
                    input.quantity,
                    TransactionSource::Adjustment,
                    Some(adjustment.id),
                    Some(reason),
                )
                .await?
            }
        };

        let balance = balance_of(&mut tx, organization_id, input.supply_id, supply.minimum_stock).await?;
        tx.commit().await?;

        tracing::info!(
            folio = %adjustment.folio(),
            supply_id = %input.supply_id,
            direction = input.direction.as_str(),
            quantity = %input.quantity,
            "inventory adjusted"
        );

        Ok(AdjustmentResult {
            folio: adjustment.folio(),
            adjustment,
            allocations,
            balance,
        })
    }

    pub async fn list_adjustments(
        &self,
        organization_id: Uuid,
        filter: &AdjustmentFilter,
    ) -> AppResult<Vec<AdjustmentInventory>> {
        let adjustments = sqlx::query_as::<_, AdjustmentInventory>(
            r#"
            SELECT id, organization_id, ooid, supply_id, direction, quantity, reason, created_by, created_at
            FROM adjustment_inventories
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR supply_id = $2)
            ORDER BY ooid DESC
            "#,
        )
        .bind(organization_id)
        .bind(filter.supply_id)
        .fetch_all(&self.db)
        .await?;

        Ok(adjustments)
    }

    // ---- queries -----------------------------------------------------------

    async fn minimum_stock(&self, conn: &mut PgConnection, organization_id: Uuid, supply_id: Uuid) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>("SELECT minimum_stock FROM supplies WHERE id = $1 AND organization_id = $2")
            .bind(supply_id)
            .bind(organization_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Supply"))
    }

    pub async fn balance(&self, organization_id: Uuid, supply_id: Uuid) -> AppResult<SupplyBalance> {
        let mut conn = self.db.acquire().await?;
        let minimum_stock = self.minimum_stock(&mut conn, organization_id, supply_id).await?;
        balance_of(&mut conn, organization_id, supply_id, minimum_stock).await
    }

    /// Balances of every enabled supply
    pub async fn balances(&self, organization_id: Uuid) -> AppResult<Vec<SupplyBalance>> {
        let supplies = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, minimum_stock FROM supplies WHERE organization_id = $1 AND is_enabled ORDER BY name",
        )
        .bind(organization_id)
        .fetch_all(&self.db)
        .await?;

        let query = format!(
            "{} WHERE organization_id = $1 ORDER BY seq",
            SELECT_TRANSACTION
        );
        let rows = sqlx::query_as::<_, InventoryTransaction>(&query)
            .bind(organization_id)
            .fetch_all(&self.db)
            .await?;

        let mut by_supply: HashMap<Uuid, Vec<LedgerEntry>> = HashMap::new();
        for row in &rows {
            by_supply.entry(row.supply_id).or_default().push(row.to_ledger_entry()?);
        }

        supplies
            .into_iter()
            .map(|(supply_id, minimum_stock)| {
                let entries = by_supply.remove(&supply_id).unwrap_or_default();
                let ledger = FifoLedger::replay(&entries)?;
                Ok(SupplyBalance::from_ledger(supply_id, &ledger, minimum_stock))
            })
            .collect()
    }

    /// Chronological movements of a supply with running balance
    pub async fn kardex(&self, organization_id: Uuid, supply_id: Uuid) -> AppResult<Vec<KardexLine>> {
        let mut conn = self.db.acquire().await?;
        self.minimum_stock(&mut conn, organization_id, supply_id).await?;

        let rows = supply_transactions(&mut conn, organization_id, supply_id).await?;
        let lines = kardex(&ledger_entries(&rows)?)?;
        Ok(lines)
    }

    /// Lots of a supply that still hold stock, oldest first
    pub async fn open_lots(&self, organization_id: Uuid, supply_id: Uuid) -> AppResult<Vec<FifoLot>> {
        let mut conn = self.db.acquire().await?;
        self.minimum_stock(&mut conn, organization_id, supply_id).await?;

        let ledger = load_ledger(&mut conn, organization_id, supply_id).await?;
        Ok(ledger.open_lots().cloned().collect())
    }

    pub async fn transactions(&self, organization_id: Uuid, supply_id: Uuid) -> AppResult<Vec<InventoryTransaction>> {
        let mut conn = self.db.acquire().await?;
        supply_transactions(&mut conn, organization_id, supply_id).await
    }
}
