//! Receiving service: incoming products, weighing sets and acceptance decisions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::batch::{create_for_incoming, recalculate};
use super::parse_status;
use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{
    ensure_batch_weight_unpriced, BatchStatus, DocumentStatus, HarvestStatus, IncomingStatus, StatusFlow,
    WeighingReading,
};

/// Receiving service
#[derive(Clone)]
pub struct ReceivingService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct IncomingProduct {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub schedule_harvest_id: Uuid,
    pub status: String,
    pub received_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncomingProduct {
    pub fn folio(&self) -> String {
        SequenceScope::IncomingProduct.folio(self.ooid)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WeighingSet {
    pub id: Uuid,
    pub incoming_product_id: Uuid,
    pub gross_weight_kg: Decimal,
    pub platform_tare_kg: Decimal,
    pub container_count: i32,
    pub container_tare_kg: Decimal,
    pub net_weight_kg: Decimal,
    pub weighed_at: DateTime<Utc>,
}

/// Incoming product with its weighings and resulting batch
#[derive(Debug, Serialize)]
pub struct IncomingDetail {
    #[serde(flatten)]
    pub incoming: IncomingProduct,
    pub folio: String,
    pub weighing_sets: Vec<WeighingSet>,
    pub net_weight_kg: Decimal,
    pub batch_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub schedule_harvest_id: Uuid,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionInput {
    pub status: IncomingStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IncomingFilter {
    pub status: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedIncoming {
    id: Uuid,
    status: String,
    product_id: Uuid,
    batch_id: Option<Uuid>,
    batch_status: Option<String>,
}

const SELECT_INCOMING: &str = r#"
    SELECT id, organization_id, ooid, schedule_harvest_id, status, received_at, notes, created_at, updated_at
    FROM incoming_products
"#;

/// Lock an incoming product with the facts needed to change its weighings
async fn lock_incoming(
    conn: &mut PgConnection,
    organization_id: Uuid,
    incoming_id: Uuid,
) -> AppResult<LockedIncoming> {
    sqlx::query_as::<_, LockedIncoming>(
        r#"
        SELECT ip.id, ip.status, sh.product_id, b.id AS batch_id, b.status AS batch_status
        FROM incoming_products ip
        JOIN schedule_harvests sh ON sh.id = ip.schedule_harvest_id
        LEFT JOIN batches b ON b.incoming_product_id = ip.id
        WHERE ip.id = $1 AND ip.organization_id = $2
        FOR UPDATE OF ip
        "#,
    )
    .bind(incoming_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Incoming product"))
}

/// Lock the fruit purchase order pricing a batch, if any, and refuse weight
/// changes once that order has left `open`
async fn ensure_weight_unpriced(conn: &mut PgConnection, batch_id: Uuid) -> AppResult<()> {
    let status = sqlx::query_scalar::<_, String>(
        r#"
        SELECT o.status
        FROM fruit_purchase_receipts r
        JOIN fruit_purchase_orders o ON o.id = r.fruit_purchase_order_id
        WHERE r.batch_id = $1
        FOR UPDATE OF o
        "#,
    )
    .bind(batch_id)
    .fetch_optional(&mut *conn)
    .await?;

    let status = status
        .map(|s| parse_status(&s, DocumentStatus::from_str))
        .transpose()?;
    if let Err(e) = ensure_batch_weight_unpriced(status) {
        tracing::warn!(%batch_id, "weighing change rejected on priced batch");
        return Err(e.into());
    }
    Ok(())
}

/// Weighings may change while pending, or while accepted with the batch still open
fn ensure_weighable(incoming: &LockedIncoming) -> AppResult<()> {
    let status = parse_status(&incoming.status, IncomingStatus::from_str)?;
    if !status.accepts_weighing() {
        return Err(AppError::InvalidStateTransition(format!(
            "weighings of a {} incoming product cannot change",
            status.as_str()
        )));
    }
    if let Some(batch_status) = &incoming.batch_status {
        if parse_status(batch_status, BatchStatus::from_str)? != BatchStatus::Open {
            return Err(AppError::InvalidStateTransition(format!(
                "the batch of this incoming product is {}",
                batch_status
            )));
        }
    }
    Ok(())
}

impl ReceivingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &IncomingFilter) -> AppResult<Vec<IncomingProduct>> {
        if let Some(status) = &filter.status {
            parse_status(status, IncomingStatus::from_str)
                .map_err(|_| AppError::validation("status", "Unknown incoming status"))?;
        }

        let query = format!(
            "{} WHERE organization_id = $1 AND ($2::text IS NULL OR status = $2) ORDER BY ooid DESC",
            SELECT_INCOMING
        );
        let incoming = sqlx::query_as::<_, IncomingProduct>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .fetch_all(&self.db)
            .await?;

        Ok(incoming)
    }

    pub async fn get_detail(&self, organization_id: Uuid, id: Uuid) -> AppResult<IncomingDetail> {
        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_INCOMING);
        let incoming = sqlx::query_as::<_, IncomingProduct>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Incoming product"))?;

        let weighing_sets = sqlx::query_as::<_, WeighingSet>(
            r#"
            SELECT id, incoming_product_id, gross_weight_kg, platform_tare_kg, container_count,
                   container_tare_kg, net_weight_kg, weighed_at
            FROM weighing_sets
            WHERE incoming_product_id = $1
            ORDER BY weighed_at
            "#,
        )
        .bind(id)
        .fetch_all(&self.db)
        .await?;

        let batch_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM batches WHERE incoming_product_id = $1")
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(IncomingDetail {
            folio: incoming.folio(),
            incoming,
            net_weight_kg: weighing_sets.iter().map(|w| w.net_weight_kg).sum(),
            weighing_sets,
            batch_id,
        })
    }

    /// Receive the fruit of a `ready` schedule; the schedule is closed
    pub async fn receive(&self, organization_id: Uuid, input: ReceiveInput) -> AppResult<IncomingProduct> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM schedule_harvests WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(input.schedule_harvest_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Schedule harvest"))?;

        let current = parse_status(&status, HarvestStatus::from_str)?;
        if current != HarvestStatus::Ready {
            tracing::warn!(schedule_harvest_id = %input.schedule_harvest_id, status = %status, "receive rejected");
            return Err(AppError::InvalidStateTransition(format!(
                "schedule harvest must be ready to be received, it is {}",
                status
            )));
        }
        let closed = current.transition(HarvestStatus::Closed)?;

        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::IncomingProduct).await?;

        let incoming = sqlx::query_as::<_, IncomingProduct>(
            r#"
            INSERT INTO incoming_products (organization_id, ooid, schedule_harvest_id, status, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, organization_id, ooid, schedule_harvest_id, status, received_at, notes, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.schedule_harvest_id)
        .bind(IncomingStatus::Pending.as_str())
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE schedule_harvests SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(input.schedule_harvest_id)
            .bind(closed.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(folio = %incoming.folio(), "fruit received");
        Ok(incoming)
    }

    /// Record a weighing set and reconcile the batch if there is one
    pub async fn add_weighing(
        &self,
        organization_id: Uuid,
        incoming_id: Uuid,
        reading: WeighingReading,
    ) -> AppResult<WeighingSet> {
        let net = reading.net_weight_kg()?;

        let mut tx = self.db.begin().await?;
        let incoming = lock_incoming(&mut tx, organization_id, incoming_id).await?;
        ensure_weighable(&incoming)?;

        let set = sqlx::query_as::<_, WeighingSet>(
            r#"
            INSERT INTO weighing_sets
                (organization_id, incoming_product_id, gross_weight_kg, platform_tare_kg,
                 container_count, container_tare_kg, net_weight_kg)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, incoming_product_id, gross_weight_kg, platform_tare_kg, container_count,
                      container_tare_kg, net_weight_kg, weighed_at
            "#,
        )
        .bind(organization_id)
        .bind(incoming.id)
        .bind(reading.gross_weight_kg)
        .bind(reading.platform_tare_kg)
        .bind(reading.container_count)
        .bind(reading.container_tare_kg)
        .bind(net)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(batch_id) = incoming.batch_id {
            ensure_weight_unpriced(&mut tx, batch_id).await?;
            recalculate(&mut tx, organization_id, batch_id).await?;
        }

        tx.commit().await?;

        tracing::info!(%incoming_id, net_weight_kg = %net, "weighing set recorded");
        Ok(set)
    }

    /// Remove a weighing set; rejected if the batch has already used that weight
    pub async fn remove_weighing(&self, organization_id: Uuid, incoming_id: Uuid, set_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;
        let incoming = lock_incoming(&mut tx, organization_id, incoming_id).await?;
        ensure_weighable(&incoming)?;

        let result = sqlx::query("DELETE FROM weighing_sets WHERE id = $1 AND incoming_product_id = $2")
            .bind(set_id)
            .bind(incoming.id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Weighing set"));
        }

        if let Some(batch_id) = incoming.batch_id {
            ensure_weight_unpriced(&mut tx, batch_id).await?;
            recalculate(&mut tx, organization_id, batch_id).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Accept, quarantine or reject an incoming product.
    ///
    /// Accepting requires at least one weighing set and creates the batch.
    pub async fn decide(
        &self,
        organization_id: Uuid,
        incoming_id: Uuid,
        input: DecisionInput,
    ) -> AppResult<IncomingDetail> {
        let mut tx = self.db.begin().await?;
        let incoming = lock_incoming(&mut tx, organization_id, incoming_id).await?;

        let next = parse_status(&incoming.status, IncomingStatus::from_str)?.transition(input.status)?;

        if next == IncomingStatus::Accepted {
            let weighings = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM weighing_sets WHERE incoming_product_id = $1",
            )
            .bind(incoming.id)
            .fetch_one(&mut *tx)
            .await?;

            if weighings == 0 {
                return Err(AppError::validation(
                    "status",
                    "an incoming product needs at least one weighing set to be accepted",
                ));
            }
        }

        sqlx::query(
            r#"
            UPDATE incoming_products SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(incoming.id)
        .bind(next.as_str())
        .bind(&input.notes)
        .execute(&mut *tx)
        .await?;

        if next == IncomingStatus::Accepted {
            let batch_id = create_for_incoming(&mut tx, organization_id, incoming.id, incoming.product_id).await?;
            tracing::info!(%incoming_id, %batch_id, "incoming product accepted");
        } else {
            tracing::info!(%incoming_id, status = next.as_str(), "incoming product decision recorded");
        }

        tx.commit().await?;

        self.get_detail(organization_id, incoming_id).await
    }
}
