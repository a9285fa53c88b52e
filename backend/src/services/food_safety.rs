//! Food-safety sampling service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::batch::{lock_drawable, recalculate};
use super::parse_status;
use crate::error::{AppError, AppResult};
use shared::{validate_sample_weight, SampleStatus, StatusFlow};

#[derive(Clone)]
pub struct FoodSafetyService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FoodSafetySample {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub batch_id: Uuid,
    pub sample_weight_kg: Decimal,
    pub status: String,
    pub laboratory: Option<String>,
    pub notes: Option<String>,
    pub sampled_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct TakeSampleInput {
    pub batch_id: Uuid,
    pub sample_weight_kg: Decimal,
    pub laboratory: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SampleResultInput {
    pub status: SampleStatus,
    pub notes: Option<String>,
}

impl FoodSafetyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_for_batch(&self, organization_id: Uuid, batch_id: Uuid) -> AppResult<Vec<FoodSafetySample>> {
        let samples = sqlx::query_as::<_, FoodSafetySample>(
            r#"
            SELECT id, organization_id, batch_id, sample_weight_kg, status, laboratory, notes, sampled_at, resolved_at
            FROM food_safety_samples
            WHERE organization_id = $1 AND batch_id = $2
            ORDER BY sampled_at
            "#,
        )
        .bind(organization_id)
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(samples)
    }

    /// Take a sample; its weight leaves the batch
    pub async fn take_sample(&self, organization_id: Uuid, input: TakeSampleInput) -> AppResult<FoodSafetySample> {
        validate_sample_weight(input.sample_weight_kg)
            .map_err(|msg| AppError::validation("sample_weight_kg", msg))?;

        let mut tx = self.db.begin().await?;
        let batch = lock_drawable(&mut tx, organization_id, input.batch_id).await?;

        let sample = sqlx::query_as::<_, FoodSafetySample>(
            r#"
            INSERT INTO food_safety_samples (organization_id, batch_id, sample_weight_kg, status, laboratory, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, batch_id, sample_weight_kg, status, laboratory, notes, sampled_at, resolved_at
            "#,
        )
        .bind(organization_id)
        .bind(batch.id)
        .bind(input.sample_weight_kg)
        .bind(SampleStatus::Pending.as_str())
        .bind(&input.laboratory)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        recalculate(&mut tx, organization_id, batch.id).await?;
        tx.commit().await?;

        tracing::info!(folio = %batch.folio(), weight_kg = %input.sample_weight_kg, "food safety sample taken");
        Ok(sample)
    }

    /// Record the laboratory result of a pending sample
    pub async fn record_result(
        &self,
        organization_id: Uuid,
        sample_id: Uuid,
        input: SampleResultInput,
    ) -> AppResult<FoodSafetySample> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM food_safety_samples WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(sample_id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Food safety sample"))?;

        let next = parse_status(&status, SampleStatus::from_str)?.transition(input.status)?;

        let sample = sqlx::query_as::<_, FoodSafetySample>(
            r#"
            UPDATE food_safety_samples
            SET status = $2, notes = COALESCE($3, notes), resolved_at = NOW()
            WHERE id = $1
            RETURNING id, organization_id, batch_id, sample_weight_kg, status, laboratory, notes, sampled_at, resolved_at
            "#,
        )
        .bind(sample_id)
        .bind(next.as_str())
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        if next == SampleStatus::Failed {
            tracing::warn!(batch_id = %sample.batch_id, %sample_id, "food safety sample failed");
        } else {
            tracing::info!(batch_id = %sample.batch_id, %sample_id, "food safety sample passed");
        }
        Ok(sample)
    }
}
