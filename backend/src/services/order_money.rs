//! Charges, deductions, payments and totals shared by every order kind
//!
//! Purchase, service and fruit purchase orders keep their money records in
//! the same three tables keyed by `(order_kind, order_id)`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::parse_status;
use crate::error::{AppError, AppResult};
use shared::{DocumentStatus, OrderKind, OrderTotals, PaymentMethod, PaymentStatus, StatusFlow};

#[derive(Clone)]
pub struct OrderMoneyService {
    db: PgPool,
}

/// A charge or a deduction
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderAdjustment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: String,
    pub reference: Option<String>,
    pub status: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Money records of an order and the totals they add up to
#[derive(Debug, Serialize)]
pub struct OrderMoney {
    pub charges: Vec<OrderAdjustment>,
    pub deductions: Vec<OrderAdjustment>,
    pub payments: Vec<OrderPayment>,
    pub totals: OrderTotals,
}

#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub description: String,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PaymentInput {
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub method: PaymentMethod,
    pub reference: Option<String>,
}

/// Which adjustment table a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentKind {
    Charge,
    Deduction,
}

impl AdjustmentKind {
    fn table(&self) -> &'static str {
        match self {
            AdjustmentKind::Charge => "order_charges",
            AdjustmentKind::Deduction => "order_deductions",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AdjustmentKind::Charge => "Charge",
            AdjustmentKind::Deduction => "Deduction",
        }
    }
}

/// Lock a document row and return its status
pub async fn lock_document(
    conn: &mut PgConnection,
    organization_id: Uuid,
    table: &'static str,
    id: Uuid,
) -> AppResult<DocumentStatus> {
    let query = format!(
        "SELECT status FROM {} WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        table
    );
    let status = sqlx::query_scalar::<_, String>(&query)
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Document"))?;

    parse_status(&status, DocumentStatus::from_str)
}

/// Fail unless the document is still open for editing
pub fn ensure_editable(status: DocumentStatus) -> AppResult<()> {
    if !status.is_editable() {
        return Err(AppError::InvalidStateTransition(format!(
            "a {} document can no longer be edited",
            status.as_str()
        )));
    }
    Ok(())
}

/// Amounts of an order's priced lines
async fn line_amounts(conn: &mut PgConnection, kind: OrderKind, order_id: Uuid) -> AppResult<Vec<Decimal>> {
    let query = match kind {
        OrderKind::PurchaseOrder => {
            "SELECT quantity * unit_price FROM purchase_order_lines WHERE purchase_order_id = $1"
        }
        OrderKind::ServiceOrder => {
            "SELECT quantity * unit_price FROM service_order_lines WHERE service_order_id = $1"
        }
        OrderKind::FruitPurchaseOrder => {
            r#"
            SELECT b.received_weight_kg * r.price_per_kg
            FROM fruit_purchase_receipts r
            JOIN batches b ON b.id = r.batch_id
            WHERE r.fruit_purchase_order_id = $1
            "#
        }
    };

    let amounts = sqlx::query_scalar::<_, Decimal>(query)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(amounts)
}

async fn adjustments(
    conn: &mut PgConnection,
    kind: OrderKind,
    adjustment: AdjustmentKind,
    order_id: Uuid,
) -> AppResult<Vec<OrderAdjustment>> {
    let query = format!(
        r#"
        SELECT id, order_id, description, amount, created_at
        FROM {}
        WHERE order_kind = $1 AND order_id = $2
        ORDER BY created_at
        "#,
        adjustment.table()
    );
    let rows = sqlx::query_as::<_, OrderAdjustment>(&query)
        .bind(kind.as_str())
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(rows)
}

async fn load_payments(conn: &mut PgConnection, kind: OrderKind, order_id: Uuid) -> AppResult<Vec<OrderPayment>> {
    let rows = sqlx::query_as::<_, OrderPayment>(
        r#"
        SELECT id, order_id, amount, payment_date, method, reference, status, created_by, created_at
        FROM order_payments
        WHERE order_kind = $1 AND order_id = $2
        ORDER BY payment_date, created_at
        "#,
    )
    .bind(kind.as_str())
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows)
}

/// Load every money record of an order and compute its totals
pub async fn load_money(conn: &mut PgConnection, kind: OrderKind, order_id: Uuid) -> AppResult<OrderMoney> {
    let lines = line_amounts(&mut *conn, kind, order_id).await?;
    let charges = adjustments(&mut *conn, kind, AdjustmentKind::Charge, order_id).await?;
    let deductions = adjustments(&mut *conn, kind, AdjustmentKind::Deduction, order_id).await?;
    let payments = load_payments(&mut *conn, kind, order_id).await?;

    let paid = payments
        .iter()
        .map(|p| -> AppResult<(Decimal, PaymentStatus)> {
            Ok((p.amount, parse_status(&p.status, PaymentStatus::from_str)?))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let totals = OrderTotals::compute(
        &lines,
        &charges.iter().map(|c| c.amount).collect::<Vec<_>>(),
        &deductions.iter().map(|d| d.amount).collect::<Vec<_>>(),
        &paid,
    )?;

    Ok(OrderMoney {
        charges,
        deductions,
        payments,
        totals,
    })
}

/// Move an order along the document workflow.
///
/// `ready` needs at least one priced line; `closed` needs the order paid in full.
pub async fn transition_order(
    conn: &mut PgConnection,
    organization_id: Uuid,
    kind: OrderKind,
    order_id: Uuid,
    next: DocumentStatus,
) -> AppResult<DocumentStatus> {
    let current = lock_document(&mut *conn, organization_id, kind.table(), order_id).await?;
    let next = current.transition(next)?;

    match next {
        DocumentStatus::Ready => {
            if line_amounts(&mut *conn, kind, order_id).await?.is_empty() {
                return Err(AppError::validation("lines", "An order needs at least one line"));
            }
            load_money(&mut *conn, kind, order_id).await?;
        }
        DocumentStatus::Closed => {
            let money = load_money(&mut *conn, kind, order_id).await?;
            if !money.totals.is_settled() {
                return Err(AppError::InvalidStateTransition(format!(
                    "order still has an outstanding balance of {}",
                    money.totals.balance
                )));
            }
        }
        DocumentStatus::Open | DocumentStatus::Canceled => {}
    }

    let query = format!(
        "UPDATE {} SET status = $2, updated_at = NOW() WHERE id = $1",
        kind.table()
    );
    sqlx::query(&query)
        .bind(order_id)
        .bind(next.as_str())
        .execute(&mut *conn)
        .await?;

    tracing::info!(kind = kind.as_str(), %order_id, status = next.as_str(), "order status changed");
    Ok(next)
}

impl OrderMoneyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, organization_id: Uuid, kind: OrderKind, order_id: Uuid) -> AppResult<OrderMoney> {
        let mut conn = self.db.acquire().await?;
        ensure_exists(&mut conn, organization_id, kind, order_id).await?;
        load_money(&mut conn, kind, order_id).await
    }

    /// Add a charge or deduction to an open order
    pub async fn add_adjustment(
        &self,
        organization_id: Uuid,
        kind: OrderKind,
        adjustment: AdjustmentKind,
        order_id: Uuid,
        input: AdjustmentInput,
    ) -> AppResult<OrderMoney> {
        if input.amount <= Decimal::ZERO {
            return Err(AppError::validation("amount", "Amount must be positive"));
        }
        if input.description.trim().is_empty() {
            return Err(AppError::validation("description", "Description is required"));
        }

        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, kind.table(), order_id).await?)?;

        let query = format!(
            "INSERT INTO {} (organization_id, order_kind, order_id, description, amount) VALUES ($1, $2, $3, $4, $5)",
            adjustment.table()
        );
        sqlx::query(&query)
            .bind(organization_id)
            .bind(kind.as_str())
            .bind(order_id)
            .bind(input.description.trim())
            .bind(input.amount)
            .execute(&mut *tx)
            .await?;

        // A deduction larger than the order is rejected by the totals
        let money = load_money(&mut tx, kind, order_id).await?;
        tx.commit().await?;

        Ok(money)
    }

    /// Remove a charge or deduction from an open order
    pub async fn remove_adjustment(
        &self,
        organization_id: Uuid,
        kind: OrderKind,
        adjustment: AdjustmentKind,
        order_id: Uuid,
        adjustment_id: Uuid,
    ) -> AppResult<OrderMoney> {
        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, kind.table(), order_id).await?)?;

        let query = format!(
            "DELETE FROM {} WHERE id = $1 AND order_kind = $2 AND order_id = $3",
            adjustment.table()
        );
        let result = sqlx::query(&query)
            .bind(adjustment_id)
            .bind(kind.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(adjustment.label()));
        }

        let money = load_money(&mut tx, kind, order_id).await?;
        tx.commit().await?;

        Ok(money)
    }

    /// Record a payment against a ready order
    pub async fn add_payment(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        kind: OrderKind,
        order_id: Uuid,
        input: PaymentInput,
    ) -> AppResult<OrderMoney> {
        let mut tx = self.db.begin().await?;

        let status = lock_document(&mut tx, organization_id, kind.table(), order_id).await?;
        if !status.accepts_payments() {
            return Err(AppError::InvalidStateTransition(format!(
                "payments can only be recorded on ready orders, this one is {}",
                status.as_str()
            )));
        }

        let before = load_money(&mut tx, kind, order_id).await?;
        if let Err(e) = before.totals.ensure_payment_fits(input.amount) {
            tracing::warn!(kind = kind.as_str(), %order_id, amount = %input.amount, "payment rejected");
            return Err(e.into());
        }

        sqlx::query(
            r#"
            INSERT INTO order_payments
                (organization_id, order_kind, order_id, amount, payment_date, method, reference, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(organization_id)
        .bind(kind.as_str())
        .bind(order_id)
        .bind(input.amount)
        .bind(input.payment_date)
        .bind(input.method.as_str())
        .bind(&input.reference)
        .bind(PaymentStatus::Applied.as_str())
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let money = load_money(&mut tx, kind, order_id).await?;
        tx.commit().await?;

        tracing::info!(
            kind = kind.as_str(),
            %order_id,
            amount = %input.amount,
            balance = %money.totals.balance,
            "payment recorded"
        );
        Ok(money)
    }

    /// Cancel a payment; it stops counting as paid
    pub async fn cancel_payment(
        &self,
        organization_id: Uuid,
        kind: OrderKind,
        order_id: Uuid,
        payment_id: Uuid,
    ) -> AppResult<OrderMoney> {
        let mut tx = self.db.begin().await?;

        let status = lock_document(&mut tx, organization_id, kind.table(), order_id).await?;
        if status.is_terminal() {
            return Err(AppError::InvalidStateTransition(format!(
                "payments of a {} order cannot change",
                status.as_str()
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE order_payments SET status = $4
            WHERE id = $1 AND order_kind = $2 AND order_id = $3 AND status = $5
            "#,
        )
        .bind(payment_id)
        .bind(kind.as_str())
        .bind(order_id)
        .bind(PaymentStatus::Canceled.as_str())
        .bind(PaymentStatus::Applied.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Applied payment"));
        }

        let money = load_money(&mut tx, kind, order_id).await?;
        tx.commit().await?;

        tracing::info!(kind = kind.as_str(), %order_id, %payment_id, "payment canceled");
        Ok(money)
    }
}

async fn ensure_exists(conn: &mut PgConnection, organization_id: Uuid, kind: OrderKind, order_id: Uuid) -> AppResult<()> {
    let query = format!(
        "SELECT COUNT(*) FROM {} WHERE id = $1 AND organization_id = $2",
        kind.table()
    );
    let count = sqlx::query_scalar::<_, i64>(&query)
        .bind(order_id)
        .bind(organization_id)
        .fetch_one(&mut *conn)
        .await?;

    if count == 0 {
        return Err(AppError::not_found("Order"));
    }
    Ok(())
}
