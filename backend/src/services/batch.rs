//! Batch service: weight reconciliation, merging and status changes
//!
//! Stored batch weights are a cache of `BatchWeights::reconcile`. Every
//! write that touches a weighing set, sample, package or merge calls
//! [`recalculate`] inside its own transaction, so a change that would
//! leave a batch (or its parent) below zero is rolled back with it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::parse_status;
use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{
    food_safety_standing, validate_merge, BatchStatus, BatchWeightSources, BatchWeights,
    FoodSafetyStanding, MergeCandidate, SampleStatus, StatusFlow,
};

/// Batch service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Batch {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub incoming_product_id: Uuid,
    pub product_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub status: String,
    pub received_weight_kg: Decimal,
    pub available_weight_kg: Decimal,
    pub transferred_weight_kg: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn folio(&self) -> String {
        SequenceScope::Batch.folio(self.ooid)
    }
}

/// Batch with its children and the full weight breakdown
#[derive(Debug, Serialize)]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub folio: String,
    pub weights: BatchWeights,
    pub children: Vec<Batch>,
    pub food_safety: FoodSafetyStanding,
}

/// List filter for `GET /batches`
#[derive(Debug, Default, Deserialize)]
pub struct BatchFilter {
    pub status: Option<String>,
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct MergeInput {
    pub child_ids: Vec<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct LockedBatch {
    id: Uuid,
    incoming_product_id: Uuid,
    parent_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct MergeRow {
    id: Uuid,
    product_id: Uuid,
    status: String,
    parent_id: Option<Uuid>,
    has_children: bool,
}

const SELECT_BATCH: &str = r#"
    SELECT id, organization_id, ooid, incoming_product_id, product_id, parent_id, status,
           received_weight_kg, available_weight_kg, transferred_weight_kg, created_at, updated_at
    FROM batches
"#;

/// Create the batch of a freshly accepted incoming product
pub async fn create_for_incoming(
    conn: &mut PgConnection,
    organization_id: Uuid,
    incoming_product_id: Uuid,
    product_id: Uuid,
) -> AppResult<Uuid> {
    let ooid = next_ooid(&mut *conn, organization_id, SequenceScope::Batch).await?;

    let batch_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO batches (organization_id, ooid, incoming_product_id, product_id, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(organization_id)
    .bind(ooid)
    .bind(incoming_product_id)
    .bind(product_id)
    .bind(BatchStatus::Open.as_str())
    .fetch_one(&mut *conn)
    .await?;

    recalculate(conn, organization_id, batch_id).await?;
    Ok(batch_id)
}

/// Recompute and store a batch's weights, then its parent's.
pub async fn recalculate(
    conn: &mut PgConnection,
    organization_id: Uuid,
    batch_id: Uuid,
) -> AppResult<BatchWeights> {
    let (weights, parent_id) = reconcile_one(&mut *conn, organization_id, batch_id).await?;
    if let Some(parent_id) = parent_id {
        reconcile_one(&mut *conn, organization_id, parent_id).await?;
    }
    Ok(weights)
}

async fn reconcile_one(
    conn: &mut PgConnection,
    organization_id: Uuid,
    batch_id: Uuid,
) -> AppResult<(BatchWeights, Option<Uuid>)> {
    let batch = sqlx::query_as::<_, LockedBatch>(
        r#"
        SELECT id, incoming_product_id, parent_id
        FROM batches
        WHERE id = $1 AND organization_id = $2
        FOR UPDATE
        "#,
    )
    .bind(batch_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Batch"))?;

    let sources = load_sources(&mut *conn, &batch).await?;
    let weights = BatchWeights::reconcile(&sources).map_err(|e| {
        tracing::warn!(%batch_id, error = %e, "batch weight change rejected");
        e
    })?;

    sqlx::query(
        r#"
        UPDATE batches
        SET received_weight_kg = $2, available_weight_kg = $3, transferred_weight_kg = $4, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(batch.id)
    .bind(weights.received_kg)
    .bind(weights.available_kg)
    .bind(weights.transferred_kg)
    .execute(&mut *conn)
    .await?;

    Ok((weights, batch.parent_id))
}

async fn load_sources(conn: &mut PgConnection, batch: &LockedBatch) -> AppResult<BatchWeightSources> {
    let weighing_nets_kg = sqlx::query_scalar::<_, Decimal>(
        "SELECT net_weight_kg FROM weighing_sets WHERE incoming_product_id = $1",
    )
    .bind(batch.incoming_product_id)
    .fetch_all(&mut *conn)
    .await?;

    let sample_weights_kg = sqlx::query_scalar::<_, Decimal>(
        "SELECT sample_weight_kg FROM food_safety_samples WHERE batch_id = $1",
    )
    .bind(batch.id)
    .fetch_all(&mut *conn)
    .await?;

    let packaged_weights_kg = sqlx::query_scalar::<_, Decimal>(
        "SELECT packaged_weight_kg FROM packing_packages WHERE batch_id = $1",
    )
    .bind(batch.id)
    .fetch_all(&mut *conn)
    .await?;

    let children_transferred_kg = sqlx::query_scalar::<_, Decimal>(
        "SELECT transferred_weight_kg FROM batches WHERE parent_id = $1",
    )
    .bind(batch.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(BatchWeightSources {
        weighing_nets_kg,
        sample_weights_kg,
        packaged_weights_kg,
        children_transferred_kg,
        is_merged_child: batch.parent_id.is_some(),
    })
}

/// Lock a batch that is about to lose weight and check it can give it
pub async fn lock_drawable(
    conn: &mut PgConnection,
    organization_id: Uuid,
    batch_id: Uuid,
) -> AppResult<Batch> {
    let query = format!(
        "{} WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        SELECT_BATCH
    );
    let batch = sqlx::query_as::<_, Batch>(&query)
        .bind(batch_id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Batch"))?;

    if parse_status(&batch.status, BatchStatus::from_str)? != BatchStatus::Open {
        return Err(AppError::InvalidStateTransition(format!(
            "batch {} is {}",
            batch.folio(),
            batch.status
        )));
    }
    if batch.parent_id.is_some() {
        return Err(AppError::validation(
            "batch_id",
            format!("batch {} is merged into another batch", batch.folio()),
        ));
    }
    Ok(batch)
}

impl BatchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, organization_id: Uuid, filter: &BatchFilter) -> AppResult<Vec<Batch>> {
        if let Some(status) = &filter.status {
            parse_status(status, BatchStatus::from_str)
                .map_err(|_| AppError::validation("status", "Unknown batch status"))?;
        }

        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR product_id = $3)
              AND (NOT $4 OR available_weight_kg > 0)
            ORDER BY ooid DESC
            "#,
            SELECT_BATCH
        );

        let batches = sqlx::query_as::<_, Batch>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.product_id)
            .bind(filter.available_only)
            .fetch_all(&self.db)
            .await?;

        Ok(batches)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<Batch> {
        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_BATCH);
        sqlx::query_as::<_, Batch>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Batch"))
    }

    /// Batch with children, weight breakdown and food-safety standing
    pub async fn get_detail(&self, organization_id: Uuid, id: Uuid) -> AppResult<BatchDetail> {
        let batch = self.get(organization_id, id).await?;

        let mut conn = self.db.acquire().await?;
        let sources = load_sources(
            &mut conn,
            &LockedBatch {
                id: batch.id,
                incoming_product_id: batch.incoming_product_id,
                parent_id: batch.parent_id,
            },
        )
        .await?;
        let weights = BatchWeights::reconcile(&sources)?;

        let query = format!("{} WHERE parent_id = $1 ORDER BY ooid", SELECT_BATCH);
        let children = sqlx::query_as::<_, Batch>(&query)
            .bind(batch.id)
            .fetch_all(&mut *conn)
            .await?;

        let results = sqlx::query_scalar::<_, String>(
            "SELECT status FROM food_safety_samples WHERE batch_id = $1",
        )
        .bind(batch.id)
        .fetch_all(&mut *conn)
        .await?
        .iter()
        .map(|s| parse_status(s, SampleStatus::from_str))
        .collect::<AppResult<Vec<_>>>()?;

        Ok(BatchDetail {
            folio: batch.folio(),
            batch,
            weights,
            children,
            food_safety: food_safety_standing(&results),
        })
    }

    /// Merge `child_ids` into `parent_id`
    pub async fn merge(&self, organization_id: Uuid, parent_id: Uuid, input: MergeInput) -> AppResult<BatchDetail> {
        let mut ids = input.child_ids.clone();
        ids.push(parent_id);

        let mut tx = self.db.begin().await?;

        let rows = sqlx::query_as::<_, MergeRow>(
            r#"
            SELECT b.id, b.product_id, b.status, b.parent_id,
                   EXISTS (SELECT 1 FROM batches c WHERE c.parent_id = b.id) AS has_children
            FROM batches b
            WHERE b.organization_id = $1 AND b.id = ANY($2)
            ORDER BY b.id
            FOR UPDATE
            "#,
        )
        .bind(organization_id)
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let candidate = |id: Uuid| -> AppResult<MergeCandidate> {
            let row = rows
                .iter()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::not_found("Batch"))?;
            Ok(MergeCandidate {
                id: row.id,
                product_id: row.product_id,
                status: parse_status(&row.status, BatchStatus::from_str)?,
                parent_id: row.parent_id,
                has_children: row.has_children,
            })
        };

        let parent = candidate(parent_id)?;
        let children = input
            .child_ids
            .iter()
            .map(|id| candidate(*id))
            .collect::<AppResult<Vec<_>>>()?;

        validate_merge(&parent, &children).map_err(|e| {
            tracing::warn!(%parent_id, error = %e, "batch merge rejected");
            e
        })?;

        sqlx::query("UPDATE batches SET parent_id = $1, updated_at = NOW() WHERE id = ANY($2)")
            .bind(parent_id)
            .bind(&input.child_ids)
            .execute(&mut *tx)
            .await?;

        for child_id in &input.child_ids {
            reconcile_one(&mut tx, organization_id, *child_id).await?;
        }
        let (weights, _) = reconcile_one(&mut tx, organization_id, parent_id).await?;

        tx.commit().await?;

        tracing::info!(
            %parent_id,
            children = input.child_ids.len(),
            available_kg = %weights.available_kg,
            "batches merged"
        );

        self.get_detail(organization_id, parent_id).await
    }

    /// Close or cancel a batch
    pub async fn set_status(&self, organization_id: Uuid, id: Uuid, next: BatchStatus) -> AppResult<Batch> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM batches WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Batch"))?;

        let next = parse_status(&status, BatchStatus::from_str)?.transition(next)?;

        if next == BatchStatus::Canceled {
            let packed = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM packing_packages WHERE batch_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
            if packed > 0 {
                return Err(AppError::InvalidStateTransition(
                    "a batch with packed fruit cannot be canceled".to_string(),
                ));
            }
        }

        let batch = sqlx::query_as::<_, Batch>(
            r#"
            UPDATE batches SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, ooid, incoming_product_id, product_id, parent_id, status,
                      received_weight_kg, available_weight_kg, transferred_weight_kg, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(folio = %batch.folio(), status = next.as_str(), "batch status changed");
        Ok(batch)
    }
}
