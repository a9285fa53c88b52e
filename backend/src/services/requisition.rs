//! Requisition service: internal requests for supplies

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::inventory::check_line_quantity;
use super::order_money::{ensure_editable, lock_document};
use super::parse_status;
use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{validate_positive, DocumentStatus, StatusFlow};

const TABLE: &str = "requisitions";

#[derive(Clone)]
pub struct RequisitionService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Requisition {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub status: String,
    pub comments: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Requisition {
    pub fn folio(&self) -> String {
        SequenceScope::Requisition.folio(self.ooid)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RequisitionLine {
    pub id: Uuid,
    pub requisition_id: Uuid,
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RequisitionDetail {
    #[serde(flatten)]
    pub requisition: Requisition,
    pub folio: String,
    pub lines: Vec<RequisitionLine>,
}

#[derive(Debug, Deserialize)]
pub struct RequisitionLineInput {
    pub supply_id: Uuid,
    pub quantity: Decimal,
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRequisitionInput {
    pub comments: Option<String>,
    #[serde(default)]
    pub lines: Vec<RequisitionLineInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RequisitionFilter {
    pub status: Option<String>,
}

impl RequisitionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &RequisitionFilter) -> AppResult<Vec<Requisition>> {
        let requisitions = sqlx::query_as::<_, Requisition>(
            r#"
            SELECT id, organization_id, ooid, status, comments, created_by, created_at, updated_at
            FROM requisitions
            WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY ooid DESC
            "#,
        )
        .bind(organization_id)
        .bind(&filter.status)
        .fetch_all(&self.db)
        .await?;

        Ok(requisitions)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<RequisitionDetail> {
        let requisition = sqlx::query_as::<_, Requisition>(
            r#"
            SELECT id, organization_id, ooid, status, comments, created_by, created_at, updated_at
            FROM requisitions
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Requisition"))?;

        let lines = sqlx::query_as::<_, RequisitionLine>(
            "SELECT id, requisition_id, supply_id, quantity, comments FROM requisition_lines WHERE requisition_id = $1",
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        Ok(RequisitionDetail {
            folio: requisition.folio(),
            requisition,
            lines,
        })
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: CreateRequisitionInput,
    ) -> AppResult<RequisitionDetail> {
        for line in &input.lines {
            validate_positive(line.quantity).map_err(|msg| AppError::validation("quantity", msg))?;
        }

        let mut tx = self.db.begin().await?;
        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::Requisition).await?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO requisitions (organization_id, ooid, status, comments, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(DocumentStatus::Open.as_str())
        .bind(&input.comments)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            insert_line(&mut tx, organization_id, id, line).await?;
        }

        tx.commit().await?;

        tracing::info!(folio = %SequenceScope::Requisition.folio(ooid), lines = input.lines.len(), "requisition created");
        self.get(organization_id, id).await
    }

    pub async fn add_line(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: RequisitionLineInput,
    ) -> AppResult<RequisitionDetail> {
        validate_positive(input.quantity).map_err(|msg| AppError::validation("quantity", msg))?;

        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, TABLE, id).await?)?;
        insert_line(&mut tx, organization_id, id, &input).await?;
        tx.commit().await?;

        self.get(organization_id, id).await
    }

    pub async fn remove_line(&self, organization_id: Uuid, id: Uuid, line_id: Uuid) -> AppResult<RequisitionDetail> {
        let mut tx = self.db.begin().await?;
        ensure_editable(lock_document(&mut tx, organization_id, TABLE, id).await?)?;

        let result = sqlx::query("DELETE FROM requisition_lines WHERE id = $1 AND requisition_id = $2")
            .bind(line_id)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Requisition line"));
        }

        tx.commit().await?;
        self.get(organization_id, id).await
    }

    /// Move the requisition along its workflow; `ready` needs at least one line
    pub async fn set_status(&self, organization_id: Uuid, id: Uuid, next: DocumentStatus) -> AppResult<RequisitionDetail> {
        let mut tx = self.db.begin().await?;
        let next = lock_document(&mut tx, organization_id, TABLE, id).await?.transition(next)?;

        if next == DocumentStatus::Ready {
            let lines = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requisition_lines WHERE requisition_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            if lines == 0 {
                return Err(AppError::validation("lines", "A requisition needs at least one line"));
            }
        }

        sqlx::query("UPDATE requisitions SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(requisition_id = %id, status = next.as_str(), "requisition status changed");
        self.get(organization_id, id).await
    }
}

/// Check that a requisition can back a purchase order
pub async fn ensure_ready(conn: &mut sqlx::PgConnection, organization_id: Uuid, id: Uuid) -> AppResult<()> {
    let status = sqlx::query_scalar::<_, String>(
        "SELECT status FROM requisitions WHERE id = $1 AND organization_id = $2",
    )
    .bind(id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Requisition"))?;

    if parse_status(&status, DocumentStatus::from_str)? != DocumentStatus::Ready {
        return Err(AppError::validation(
            "requisition_id",
            format!("requisition must be ready to be ordered, it is {}", status),
        ));
    }
    Ok(())
}

async fn insert_line(
    conn: &mut sqlx::PgConnection,
    organization_id: Uuid,
    requisition_id: Uuid,
    line: &RequisitionLineInput,
) -> AppResult<()> {
    check_line_quantity(&mut *conn, organization_id, line.supply_id, line.quantity).await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO requisition_lines (requisition_id, supply_id, quantity, comments)
        SELECT $1, s.id, $3, $4 FROM supplies s WHERE s.id = $2 AND s.organization_id = $5
        "#,
    )
    .bind(requisition_id)
    .bind(line.supply_id)
    .bind(line.quantity)
    .bind(&line.comments)
    .bind(organization_id)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() == 0 {
        return Err(AppError::not_found("Supply"));
    }
    Ok(())
}
