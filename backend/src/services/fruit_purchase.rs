//! Fruit purchase order service: paying producers for received batches
//!
//! A receipt prices one batch per kilogram; the line amount follows the
//! batch's received weight, so reweighing the batch reprices the order.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::order_money::{ensure_editable, load_money, lock_document, transition_order, OrderMoney};
use super::sequence::next_ooid;
use super::CatalogService;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{validate_non_negative, DocumentStatus, OrderKind, ProviderCategory, StatusFlow};

const KIND: OrderKind = OrderKind::FruitPurchaseOrder;

#[derive(Clone)]
pub struct FruitPurchaseService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FruitPurchaseOrder {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub provider_id: Uuid,
    pub status: String,
    pub currency: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FruitPurchaseOrder {
    pub fn folio(&self) -> String {
        SequenceScope::FruitPurchaseOrder.folio(self.ooid)
    }
}

/// A batch bought on this order
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FruitReceipt {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub batch_ooid: i64,
    pub price_per_kg: Decimal,
    pub received_weight_kg: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct FruitPurchaseDetail {
    #[serde(flatten)]
    pub order: FruitPurchaseOrder,
    pub folio: String,
    pub receipts: Vec<FruitReceipt>,
    #[serde(flatten)]
    pub money: OrderMoney,
}

#[derive(Debug, Deserialize)]
pub struct CreateFruitPurchaseInput {
    pub provider_id: Uuid,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiptInput {
    pub batch_id: Uuid,
    pub price_per_kg: Decimal,
}

#[derive(Debug, Default, Deserialize)]
pub struct FruitPurchaseFilter {
    pub status: Option<String>,
    pub provider_id: Option<Uuid>,
}

const SELECT_ORDER: &str = r#"
    SELECT id, organization_id, ooid, provider_id, status, currency, created_by, created_at, updated_at
    FROM fruit_purchase_orders
"#;

impl FruitPurchaseService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &FruitPurchaseFilter) -> AppResult<Vec<FruitPurchaseOrder>> {
        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR provider_id = $3)
            ORDER BY ooid DESC
            "#,
            SELECT_ORDER
        );
        let orders = sqlx::query_as::<_, FruitPurchaseOrder>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.provider_id)
            .fetch_all(&self.db)
            .await?;

        Ok(orders)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<FruitPurchaseDetail> {
        let mut conn = self.db.acquire().await?;

        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_ORDER);
        let order = sqlx::query_as::<_, FruitPurchaseOrder>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Fruit purchase order"))?;

        let receipts = sqlx::query_as::<_, FruitReceipt>(
            r#"
            SELECT r.id, r.batch_id, b.ooid AS batch_ooid, r.price_per_kg, b.received_weight_kg,
                   b.received_weight_kg * r.price_per_kg AS amount
            FROM fruit_purchase_receipts r
            JOIN batches b ON b.id = r.batch_id
            WHERE r.fruit_purchase_order_id = $1
            ORDER BY b.ooid
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let money = load_money(&mut conn, KIND, id).await?;

        Ok(FruitPurchaseDetail {
            folio: order.folio(),
            order,
            receipts,
            money,
        })
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateFruitPurchaseInput,
    ) -> AppResult<FruitPurchaseDetail> {
        CatalogService::new(self.db.clone())
            .ensure_provider(organization_id, input.provider_id, Some(ProviderCategory::FruitProducer))
            .await?;

        let mut tx = self.db.begin().await?;
        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::FruitPurchaseOrder).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO fruit_purchase_orders (organization_id, ooid, provider_id, status, currency, created_by)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'USD'), $6)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.provider_id)
        .bind(DocumentStatus::Open.as_str())
        .bind(&input.currency)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(folio = %SequenceScope::FruitPurchaseOrder.folio(ooid), "fruit purchase order created");
        self.get(organization_id, id).await
    }

    /// Price a batch from the order's producer; a batch is bought only once
    pub async fn add_receipt(&self, organization_id: Uuid, id: Uuid, input: ReceiptInput) -> AppResult<FruitPurchaseDetail> {
        validate_non_negative(input.price_per_kg).map_err(|msg| AppError::validation("price_per_kg", msg))?;

        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;

        let same_provider = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT sh.provider_id = fpo.provider_id
            FROM batches b
            JOIN incoming_products ip ON ip.id = b.incoming_product_id
            JOIN schedule_harvests sh ON sh.id = ip.schedule_harvest_id
            JOIN fruit_purchase_orders fpo ON fpo.id = $2
            WHERE b.id = $1 AND b.organization_id = $3
            "#,
        )
        .bind(input.batch_id)
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Batch"))?;

        if !same_provider {
            return Err(AppError::validation(
                "batch_id",
                "The batch was harvested for a different provider",
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO fruit_purchase_receipts (fruit_purchase_order_id, batch_id, price_per_kg)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(id)
        .bind(input.batch_id)
        .bind(input.price_per_kg)
        .execute(&mut *tx)
        .await
        .map_err(|e| match AppError::on_duplicate("fruit purchase receipt")(e) {
            AppError::Conflict { resource, .. } => AppError::Conflict {
                resource,
                message: "The batch is already on a fruit purchase order".to_string(),
            },
            other => other,
        })?;

        tx.commit().await?;

        tracing::info!(fruit_purchase_order_id = %id, batch_id = %input.batch_id, "batch added to fruit purchase");
        self.get(organization_id, id).await
    }

    pub async fn remove_receipt(&self, organization_id: Uuid, id: Uuid, receipt_id: Uuid) -> AppResult<FruitPurchaseDetail> {
        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;

        let result = sqlx::query("DELETE FROM fruit_purchase_receipts WHERE id = $1 AND fruit_purchase_order_id = $2")
            .bind(receipt_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Fruit receipt"));
        }

        load_money(&mut tx, KIND, id).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn set_status(&self, organization_id: Uuid, id: Uuid, next: DocumentStatus) -> AppResult<FruitPurchaseDetail> {
        let mut tx = self.db.begin().await?;
        transition_order(&mut tx, organization_id, KIND, id, next).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }
}
