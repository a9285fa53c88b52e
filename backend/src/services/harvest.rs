//! Harvest scheduling service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{validate_schedule, HarvestStatus, StatusFlow};

/// Harvest service for scheduling fruit pickups
#[derive(Clone)]
pub struct HarvestService {
    db: PgPool,
    allow_past_dates: bool,
}

/// Scheduled harvest
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ScheduleHarvest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub orchard_id: Uuid,
    pub provider_id: Uuid,
    pub product_id: Uuid,
    pub harvest_date: NaiveDate,
    pub estimated_weight_kg: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleHarvest {
    pub fn folio(&self) -> String {
        SequenceScope::ScheduleHarvest.folio(self.ooid)
    }

    pub fn current_status(&self) -> AppResult<HarvestStatus> {
        HarvestStatus::from_str(&self.status)
            .ok_or_else(|| AppError::Internal(format!("Unknown harvest status '{}'", self.status)))
    }
}

/// Input for scheduling a harvest
#[derive(Debug, Deserialize)]
pub struct ScheduleHarvestInput {
    pub orchard_id: Uuid,
    pub provider_id: Uuid,
    pub product_id: Uuid,
    pub harvest_date: NaiveDate,
    pub estimated_weight_kg: Decimal,
    pub notes: Option<String>,
}

/// Input for editing an open schedule
#[derive(Debug, Deserialize)]
pub struct UpdateScheduleInput {
    pub harvest_date: Option<NaiveDate>,
    pub estimated_weight_kg: Option<Decimal>,
    pub notes: Option<String>,
}

/// List filter
#[derive(Debug, Default, Deserialize)]
pub struct HarvestFilter {
    pub status: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

const SELECT_SCHEDULE: &str = r#"
    SELECT id, organization_id, ooid, orchard_id, provider_id, product_id, harvest_date,
           estimated_weight_kg, status, notes, created_by, created_at, updated_at
    FROM schedule_harvests
"#;

impl HarvestService {
    pub fn new(db: PgPool, allow_past_dates: bool) -> Self {
        Self { db, allow_past_dates }
    }

    fn check_plan(&self, harvest_date: NaiveDate, estimated_weight_kg: Decimal) -> AppResult<()> {
        validate_schedule(harvest_date, estimated_weight_kg, Utc::now().date_naive(), self.allow_past_dates)
            .map_err(|msg| {
                let field = if estimated_weight_kg <= Decimal::ZERO {
                    "estimated_weight_kg"
                } else {
                    "harvest_date"
                };
                AppError::validation(field, msg)
            })
    }

    pub async fn list(&self, organization_id: Uuid, filter: &HarvestFilter) -> AppResult<Vec<ScheduleHarvest>> {
        if let Some(status) = &filter.status {
            if HarvestStatus::from_str(status).is_none() {
                return Err(AppError::validation("status", "Unknown harvest status"));
            }
        }

        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::date IS NULL OR harvest_date >= $3)
              AND ($4::date IS NULL OR harvest_date <= $4)
            ORDER BY harvest_date DESC, ooid DESC
            "#,
            SELECT_SCHEDULE
        );

        let schedules = sqlx::query_as::<_, ScheduleHarvest>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.from)
            .bind(filter.to)
            .fetch_all(&self.db)
            .await?;

        Ok(schedules)
    }

    pub async fn get(&self, organization_id: Uuid, id: Uuid) -> AppResult<ScheduleHarvest> {
        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_SCHEDULE);
        sqlx::query_as::<_, ScheduleHarvest>(&query)
            .bind(id)
            .bind(organization_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Schedule harvest"))
    }

    /// Schedule a harvest; it starts `open` with the next ooid
    pub async fn create(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        input: ScheduleHarvestInput,
    ) -> AppResult<ScheduleHarvest> {
        self.check_plan(input.harvest_date, input.estimated_weight_kg)?;

        self.ensure_references(organization_id, &input).await?;

        let mut tx = self.db.begin().await?;
        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::ScheduleHarvest).await?;

        let schedule = sqlx::query_as::<_, ScheduleHarvest>(
            r#"
            INSERT INTO schedule_harvests
                (organization_id, ooid, orchard_id, provider_id, product_id, harvest_date,
                 estimated_weight_kg, status, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, organization_id, ooid, orchard_id, provider_id, product_id, harvest_date,
                      estimated_weight_kg, status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.orchard_id)
        .bind(input.provider_id)
        .bind(input.product_id)
        .bind(input.harvest_date)
        .bind(input.estimated_weight_kg)
        .bind(HarvestStatus::Open.as_str())
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%organization_id, folio = %schedule.folio(), "harvest scheduled");
        Ok(schedule)
    }

    /// Edit the plan while the schedule is still open
    pub async fn update(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: UpdateScheduleInput,
    ) -> AppResult<ScheduleHarvest> {
        let existing = self.get(organization_id, id).await?;
        if !existing.current_status()?.is_editable() {
            return Err(AppError::InvalidStateTransition(format!(
                "schedule harvest {} is {} and can no longer be edited",
                existing.folio(),
                existing.status
            )));
        }

        let harvest_date = input.harvest_date.unwrap_or(existing.harvest_date);
        let estimated = input.estimated_weight_kg.unwrap_or(existing.estimated_weight_kg);
        self.check_plan(harvest_date, estimated)?;

        let schedule = sqlx::query_as::<_, ScheduleHarvest>(
            r#"
            UPDATE schedule_harvests
            SET harvest_date = $3, estimated_weight_kg = $4, notes = COALESCE($5, notes), updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, ooid, orchard_id, provider_id, product_id, harvest_date,
                      estimated_weight_kg, status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(harvest_date)
        .bind(estimated)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        Ok(schedule)
    }

    /// Move a schedule along its workflow (`ready` or `canceled`).
    ///
    /// `closed` is reached only by receiving the fruit.
    pub async fn set_status(
        &self,
        organization_id: Uuid,
        id: Uuid,
        next: HarvestStatus,
    ) -> AppResult<ScheduleHarvest> {
        if next == HarvestStatus::Closed {
            return Err(AppError::InvalidStateTransition(
                "a schedule harvest is closed by receiving its fruit".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM schedule_harvests WHERE id = $1 AND organization_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found("Schedule harvest"))?;

        let current = HarvestStatus::from_str(&status)
            .ok_or_else(|| AppError::Internal(format!("Unknown harvest status '{}'", status)))?;
        let next = current.transition(next)?;

        let schedule = sqlx::query_as::<_, ScheduleHarvest>(
            r#"
            UPDATE schedule_harvests SET status = $3, updated_at = NOW()
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, ooid, orchard_id, provider_id, product_id, harvest_date,
                      estimated_weight_kg, status, notes, created_by, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(next.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(folio = %schedule.folio(), status = next.as_str(), "schedule harvest status changed");
        Ok(schedule)
    }

    async fn ensure_references(&self, organization_id: Uuid, input: &ScheduleHarvestInput) -> AppResult<()> {
        let (orchards, providers, products) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM orchards WHERE id = $2 AND organization_id = $1 AND is_enabled),
                (SELECT COUNT(*) FROM providers WHERE id = $3 AND organization_id = $1 AND is_enabled
                                                  AND category = 'fruit_producer'),
                (SELECT COUNT(*) FROM products WHERE id = $4 AND organization_id = $1 AND is_enabled)
            "#,
        )
        .bind(organization_id)
        .bind(input.orchard_id)
        .bind(input.provider_id)
        .bind(input.product_id)
        .fetch_one(&self.db)
        .await?;

        if orchards == 0 {
            return Err(AppError::validation("orchard_id", "Orchard not found or disabled"));
        }
        if providers == 0 {
            return Err(AppError::validation(
                "provider_id",
                "Provider not found, disabled or not a fruit producer",
            ));
        }
        if products == 0 {
            return Err(AppError::validation("product_id", "Product not found or disabled"));
        }
        Ok(())
    }
}
