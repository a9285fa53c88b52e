//! Service order service: contracted work such as transport or maintenance

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::order_money::{ensure_editable, load_money, lock_document, transition_order, OrderMoney};
use super::sequence::next_ooid;
use super::CatalogService;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{line_amount, validate_service_period, DocumentStatus, OrderKind, ProviderCategory, StatusFlow};

const KIND: OrderKind = OrderKind::ServiceOrder;

#[derive(Clone)]
pub struct ServiceOrderService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceOrder {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub provider_id: Uuid,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub currency: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOrder {
    pub fn folio(&self) -> String {
        SequenceScope::ServiceOrder.folio(self.ooid)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceOrderLine {
    pub id: Uuid,
    pub service_order_id: Uuid,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct ServiceOrderDetail {
    #[serde(flatten)]
    pub order: ServiceOrder,
    pub folio: String,
    pub lines: Vec<ServiceOrderLine>,
    #[serde(flatten)]
    pub money: OrderMoney,
}

#[derive(Debug, Deserialize)]
pub struct ServiceOrderLineInput {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceOrderInput {
    pub provider_id: Uuid,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub currency: Option<String>,
    #[serde(default)]
    pub lines: Vec<ServiceOrderLineInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceOrderFilter {
    pub status: Option<String>,
    pub provider_id: Option<Uuid>,
}

const SELECT_ORDER: &str = r#"
    SELECT id, organization_id, ooid, provider_id, description, start_date, end_date, status,
           currency, created_by, created_at, updated_at
    FROM service_orders
"#;

fn check_line(line: &ServiceOrderLineInput) -> AppResult<()> {
    if line.description.trim().is_empty() {
        return Err(AppError::validation("description", "Line description is required"));
    }
    line_amount(line.quantity, line.unit_price)?;
    Ok(())
}

impl ServiceOrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &ServiceOrderFilter) -> AppResult<Vec<ServiceOrder>> {
        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR provider_id = $3)
            ORDER BY ooid DESC
            "#,
            SELECT_ORDER
        );
        let orders = sqlx::query_as::<_, ServiceOrder>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.provider_id)
            .fetch_all(&self.db)
            .await?;

        Ok(orders)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<ServiceOrderDetail> {
        let mut conn = self.db.acquire().await?;

        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_ORDER);
        let order = sqlx::query_as::<_, ServiceOrder>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::not_found("Service order"))?;

        let lines = sqlx::query_as::<_, ServiceOrderLine>(
            r#"
            SELECT id, service_order_id, description, quantity, unit_price
            FROM service_order_lines
            WHERE service_order_id = $1
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        let money = load_money(&mut conn, KIND, id).await?;

        Ok(ServiceOrderDetail {
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
        input: CreateServiceOrderInput,
    ) -> AppResult<ServiceOrderDetail> {
        if input.description.trim().is_empty() {
            return Err(AppError::validation("description", "Description is required"));
        }
        validate_service_period(input.start_date, input.end_date)?;
        for line in &input.lines {
            check_line(line)?;
        }
        CatalogService::new(self.db.clone())
            .ensure_provider(organization_id, input.provider_id, Some(ProviderCategory::ServiceProvider))
            .await?;

        let mut tx = self.db.begin().await?;
        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::ServiceOrder).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO service_orders
                (organization_id, ooid, provider_id, description, start_date, end_date, status, currency, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, 'USD'), $9)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.provider_id)
        .bind(input.description.trim())
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(DocumentStatus::Open.as_str())
        .bind(&input.currency)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            insert_line(&mut tx, id, line).await?;
        }

        tx.commit().await?;

        tracing::info!(folio = %SequenceScope::ServiceOrder.folio(ooid), "service order created");
        self.get(organization_id, id).await
    }

    pub async fn add_line(&self, organization_id: Uuid, id: Uuid, input: ServiceOrderLineInput) -> AppResult<ServiceOrderDetail> {
        check_line(&input)?;

        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;
        insert_line(&mut tx, id, &input).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn remove_line(&self, organization_id: Uuid, id: Uuid, line_id: Uuid) -> AppResult<ServiceOrderDetail> {
        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, KIND.table(), id).await?)?;

        let result = sqlx::query("DELETE FROM service_order_lines WHERE id = $1 AND service_order_id = $2")
            .bind(line_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Service order line"));
        }

        load_money(&mut tx, KIND, id).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn set_status(&self, organization_id: Uuid, id: Uuid, next: DocumentStatus) -> AppResult<ServiceOrderDetail> {
        let mut tx = self.db.begin().await?;
        transition_order(&mut tx, organization_id, KIND, id, next).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }
}

async fn insert_line(conn: &mut PgConnection, service_order_id: Uuid, line: &ServiceOrderLineInput) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO service_order_lines (service_order_id, description, quantity, unit_price)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(service_order_id)
    .bind(line.description.trim())
    .bind(line.quantity)
    .bind(line.unit_price)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
