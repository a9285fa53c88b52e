//! Purchase order service: supply orders to vendors

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::inventory::check_line_quantity;
use super::order_money::{ensure_editable, load_money, lock_document, transition_order, OrderMoney};
use super::requisition::ensure_ready;
use super::sequence::next_ooid;
use super::CatalogService;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{line_amount, DocumentStatus, OrderKind, ProviderCategory, StatusFlow};

const KIND: OrderKind = OrderKind::PurchaseOrder;

#[derive(Clone)]
pub struct PurchaseOrderService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub provider_id: Uuid,
    pub requisition_id: Option<Uuid>,
    pub status: String,
    pub currency: String,
    pub comments: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    pub fn folio(&self) -> String {
        SequenceScope::PurchaseOrder.folio(self.ooid)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub received_quantity: Decimal,
}

#[derive(Debug, Serialize)]
pub struct PurchaseOrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub folio: String,
    pub lines: Vec<PurchaseOrderLine>,
    #[serde(flatten)]
    pub money: OrderMoney,
}

#[derive(Debug, Deserialize)]
pub struct PurchaseOrderLineInput {
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreatePurchaseOrderInput {
    pub provider_id: Uuid,
    pub requisition_id: Option<Uuid>,
    pub currency: Option<String>,
    pub comments: Option<String>,
    #[serde(default)]
    pub lines: Vec<PurchaseOrderLineInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PurchaseOrderFilter {
    pub status: Option<String>,
    pub provider_id: Option<Uuid>,
}

const SELECT_ORDER: &str = r#"
    SELECT id, organization_id, ooid, provider_id, requisition_id, status, currency, comments,
           created_by, created_at, updated_at
    FROM purchase_orders
"#;

impl PurchaseOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &PurchaseOrderFilter) -> AppResult<Vec<PurchaseOrder>> {
        if let Some(status) = &filter.status {
            if DocumentStatus::from_str(status).is_none() {
                return Err(AppError::validation("status", "Unknown document status"));
            }
        }

        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR provider_id = $3)
            ORDER BY ooid DESC
            "#,
            SELECT_ORDER
        );
        let orders = sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.provider_id)
            .fetch_all(&self.db)
            .await?;

        Ok(orders)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut conn = self.db.acquire().await?;

        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_ORDER);
        let order = sqlx::query_as::<_, PurchaseOrder>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Purchase order"))?;

        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT id, purchase_order_id, supply_id, quantity, unit_price, received_quantity
            FROM purchase_order_lines
            WHERE purchase_order_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let money = load_money(&mut conn, KIND, id).await?;

        Ok(PurchaseOrderDetail {
            folio: order.folio(),
            order,
            lines,
            money,
        })
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreatePurchaseOrderInput,
    ) -> AppResult<PurchaseOrderDetail> {
        for line in &input.lines {
            line_amount(line.quantity, line.unit_price)?;
        }
        CatalogService::new(self.db.clone())
            .ensure_provider(organization_id, input.provider_id, Some(ProviderCategory::SupplyVendor))
            .await?;

        let mut tx = self.db.begin().await?;

        if let Some(requisition_id) = input.requisition_id {
            ensure_ready(&mut tx, organization_id, requisition_id).await?;
        }

        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::PurchaseOrder).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO purchase_orders
                (organization_id, ooid, provider_id, requisition_id, status, currency, comments, created_by)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'USD'), $7, $8)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.provider_id)
        .bind(input.requisition_id)
        .bind(DocumentStatus::Open.as_str())
        .bind(&input.currency)
        .bind(&input.comments)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            insert_line(&mut tx, organization_id, id, line).await?;
        }

        tx.commit().await?;

        tracing::info!(folio = %SequenceScope::PurchaseOrder.folio(ooid), "purchase order created");
        self.get(organization_id, id).await
    }

    pub async fn add_line(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: PurchaseOrderLineInput,
    ) -> AppResult<PurchaseOrderDetail> {
        line_amount(input.quantity, input.unit_price)?;

        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;
        insert_line(&mut tx, organization_id, id, &input).await?;
        load_money(&mut tx, KIND, id).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn remove_line(&self, organization_id: Uuid, id: Uuid, line_id: Uuid) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;

        let result = sqlx::query("DELETE FROM purchase_order_lines WHERE id = $1 AND purchase_order_id = $2")
            .bind(line_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Purchase order line"));
        }

        // Deductions may now exceed what is left
        load_money(&mut tx, KIND, id).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn set_status(&self, organization_id: Uuid, id: Uuid, next: DocumentStatus) -> AppResult<PurchaseOrderDetail> {
        let mut tx = self.db.begin().await?;
        transition_order(&mut tx, organization_id, KIND, id, next).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }
}

async fn insert_line(
    conn: &mut PgConnection,
    organization_id: Uuid,
    purchase_order_id: Uuid,
    line: &PurchaseOrderLineInput,
) -> AppResult<()> {
    check_line_quantity(&mut *conn, organization_id, line.supply_id, line.quantity).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO purchase_order_lines (purchase_order_id, supply_id, quantity, unit_price)
        SELECT $1, s.id, $3, $4 FROM supplies s WHERE s.id = $2 AND s.organization_id = $5
        "#,
    )
    .bind(purchase_order_id)
    .bind(line.supply_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(organization_id)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::not_found("Supply"));
    }
    Ok(())
}
