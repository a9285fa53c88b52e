//! Packing service: packages drawn from batches and the pallets they ship on

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::batch::{lock_drawable, recalculate};
use super::parse_status;
use super::sequence::next_ooid;
use crate::error::{AppError, AppResult};
use shared::folio::SequenceScope;
use shared::{packaged_weight_kg, PackageStatus, PalletStatus, PalletTotals, StatusFlow};

#[derive(Clone)]
pub struct PackingService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PackingPackage {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub batch_id: Uuid,
    pub market_id: Uuid,
    pub pallet_id: Option<Uuid>,
    pub package_count: i32,
    pub weight_per_package_kg: Decimal,
    pub packaged_weight_kg: Decimal,
    pub status: String,
    pub packed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PackingPallet {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub ooid: i64,
    pub market_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl PackingPallet {
    pub fn folio(&self) -> String {
        SequenceScope::PackingPallet.folio(self.ooid)
    }
}

#[derive(Debug, Serialize)]
pub struct PalletDetail {
    #[serde(flatten)]
    pub pallet: PackingPallet,
    pub folio: String,
    pub packages: Vec<PackingPackage>,
    pub totals: PalletTotals,
}

#[derive(Debug, Deserialize)]
pub struct CreatePackageInput {
    pub batch_id: Uuid,
    pub market_id: Uuid,
    pub package_count: i32,
    pub weight_per_package_kg: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreatePalletInput {
    pub market_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AssignPackagesInput {
    pub package_ids: Vec<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PackageFilter {
    pub batch_id: Option<Uuid>,
    pub market_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PalletFilter {
    pub status: Option<String>,
    pub market_id: Option<Uuid>,
}

const SELECT_PACKAGE: &str = r#"
    SELECT id, organization_id, batch_id, market_id, pallet_id, package_count,
           weight_per_package_kg, packaged_weight_kg, status, packed_at
    FROM packing_packages
"#;

const SELECT_PALLET: &str = r#"
    SELECT id, organization_id, ooid, market_id, status, created_at, closed_at
    FROM packing_pallets
"#;

async fn ensure_market(conn: &mut PgConnection, organization_id: Uuid, market_id: Uuid) -> AppResult<()> {
    let enabled = sqlx::query_scalar::<_, bool>(
        "SELECT is_enabled FROM markets WHERE id = $1 AND organization_id = $2",
    )
    .bind(market_id)
    .bind(organization_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Market"))?;

    if !enabled {
        return Err(AppError::validation("market_id", "Market is disabled"));
    }
    Ok(())
}

async fn lock_open_pallet(
    conn: &mut PgConnection,
    organization_id: Uuid,
    pallet_id: Uuid,
) -> AppResult<PackingPallet> {
    let query = format!("{} WHERE id = $1 AND organization_id = $2 FOR UPDATE", SELECT_PALLET);
    let pallet = sqlx::query_as::<_, PackingPallet>(&query)
        .bind(pallet_id)
        .bind(organization_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Packing pallet"))?;

    if parse_status(&pallet.status, PalletStatus::from_str)?.is_terminal() {
        return Err(AppError::InvalidStateTransition(format!(
            "pallet {} is closed",
            pallet.folio()
        )));
    }
    Ok(pallet)
}

impl PackingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ---- packages ----------------------------------------------------------

    pub async fn list_packages(&self, organization_id: Uuid, filter: &PackageFilter) -> AppResult<Vec<PackingPackage>> {
        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::uuid IS NULL OR batch_id = $2)
              AND ($3::uuid IS NULL OR market_id = $3)
              AND ($4::text IS NULL OR status = $4)
            ORDER BY packed_at DESC
            "#,
            SELECT_PACKAGE
        );

        let packages = sqlx::query_as::<_, PackingPackage>(&query)
            .bind(organization_id)
            .bind(filter.batch_id)
            .bind(filter.market_id)
            .bind(&filter.status)
            .fetch_all(&self.db)
            .await?;

        Ok(packages)
    }

    /// Pack fruit from a batch; the packed weight leaves the batch
    pub async fn create_package(&self, organization_id: Uuid, input: CreatePackageInput) -> AppResult<PackingPackage> {
        let weight = packaged_weight_kg(input.package_count, input.weight_per_package_kg)
            .map_err(|msg| AppError::validation("package_count", msg))?;

        let mut tx = self.db.begin().await?;
        ensure_market(&mut tx, organization_id, input.market_id).await?;
        let batch = lock_drawable(&mut tx, organization_id, input.batch_id).await?;

        let package = sqlx::query_as::<_, PackingPackage>(
            r#"
            INSERT INTO packing_packages
                (organization_id, batch_id, market_id, package_count, weight_per_package_kg,
                 packaged_weight_kg, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, organization_id, batch_id, market_id, pallet_id, package_count,
                      weight_per_package_kg, packaged_weight_kg, status, packed_at
            "#,
        )
        .bind(organization_id)
        .bind(batch.id)
        .bind(input.market_id)
        .bind(input.package_count)
        .bind(input.weight_per_package_kg)
        .bind(weight)
        .bind(PackageStatus::Ready.as_str())
        .fetch_one(&mut *tx)
        .await?;

        recalculate(&mut tx, organization_id, batch.id).await?;
        tx.commit().await?;

        tracing::info!(folio = %batch.folio(), packaged_kg = %weight, "packages packed");
        Ok(package)
    }

    /// Delete a package that is not on a pallet, returning its weight to the batch
    pub async fn delete_package(&self, organization_id: Uuid, package_id: Uuid) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let query = format!("{} WHERE id = $1 AND organization_id = $2 FOR UPDATE", SELECT_PACKAGE);
        let package = sqlx::query_as::<_, PackingPackage>(&query)
            .bind(package_id)
            .bind(organization_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Packing package"))?;

        if parse_status(&package.status, PackageStatus::from_str)? == PackageStatus::Palletized {
            return Err(AppError::InvalidStateTransition(
                "a palletized package cannot be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM packing_packages WHERE id = $1")
            .bind(package_id)
            .execute(&mut *tx)
            .await?;

        recalculate(&mut tx, organization_id, package.batch_id).await?;
        tx.commit().await?;

        tracing::info!(%package_id, batch_id = %package.batch_id, "package deleted");
        Ok(())
    }

    // ---- pallets -----------------------------------------------------------

    pub async fn list_pallets(&self, organization_id: Uuid, filter: &PalletFilter) -> AppResult<Vec<PackingPallet>> {
        let query = format!(
            r#"{}
            WHERE organization_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR market_id = $3)
            ORDER BY ooid DESC
            "#,
            SELECT_PALLET
        );

        let pallets = sqlx::query_as::<_, PackingPallet>(&query)
            .bind(organization_id)
            .bind(&filter.status)
            .bind(filter.market_id)
            .fetch_all(&self.db)
            .await?;

        Ok(pallets)
    }

    pub async fn get_pallet(&self, organization_id: Uuid, pallet_id: Uuid) -> AppResult<PalletDetail> {
        let query = format!("{} WHERE id = $1 AND organization_id = $2", SELECT_PALLET);
        let pallet = sqlx::query_as::<_, PackingPallet>(&query)
            .bind(pallet_id)
            .bind(organization_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("Packing pallet"))?;

        let query = format!("{} WHERE pallet_id = $1 ORDER BY packed_at", SELECT_PACKAGE);
        let packages = sqlx::query_as::<_, PackingPackage>(&query)
            .bind(pallet_id)
            .fetch_all(&self.db)
            .await?;

        let lines: Vec<(i32, Decimal)> = packages
            .iter()
            .map(|p| (p.package_count, p.weight_per_package_kg))
            .collect();

        Ok(PalletDetail {
            folio: pallet.folio(),
            pallet,
            totals: PalletTotals::from_packages(&lines),
            packages,
        })
    }

    pub async fn create_pallet(&self, organization_id: Uuid, input: CreatePalletInput) -> AppResult<PackingPallet> {
        let mut tx = self.db.begin().await?;
        ensure_market(&mut tx, organization_id, input.market_id).await?;
        let ooid = next_ooid(&mut tx, organization_id, SequenceScope::PackingPallet).await?;

        let pallet = sqlx::query_as::<_, PackingPallet>(
            r#"
            INSERT INTO packing_pallets (organization_id, ooid, market_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, ooid, market_id, status, created_at, closed_at
            "#,
        )
        .bind(organization_id)
        .bind(ooid)
        .bind(input.market_id)
        .bind(PalletStatus::Open.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(folio = %pallet.folio(), "pallet opened");
        Ok(pallet)
    }

    /// Put ready packages of the pallet's market onto an open pallet
    pub async fn assign_packages(
        &self,
        organization_id: Uuid,
        pallet_id: Uuid,
        input: AssignPackagesInput,
    ) -> AppResult<PalletDetail> {
        if input.package_ids.is_empty() {
            return Err(AppError::validation("package_ids", "At least one package is required"));
        }

        let mut tx = self.db.begin().await?;
        let pallet = lock_open_pallet(&mut tx, organization_id, pallet_id).await?;

        let query = format!(
            "{} WHERE organization_id = $1 AND id = ANY($2) ORDER BY id FOR UPDATE",
            SELECT_PACKAGE
        );
        let packages = sqlx::query_as::<_, PackingPackage>(&query)
            .bind(organization_id)
            .bind(&input.package_ids)
            .fetch_all(&mut *tx)
            .await?;

        if packages.len() != input.package_ids.len() {
            return Err(AppError::not_found("Packing package"));
        }
        for package in &packages {
            if parse_status(&package.status, PackageStatus::from_str)? != PackageStatus::Ready {
                return Err(AppError::validation(
                    "package_ids",
                    format!("package {} is already on a pallet", package.id),
                ));
            }
            if package.market_id != pallet.market_id {
                return Err(AppError::validation(
                    "package_ids",
                    format!("package {} is packed for a different market", package.id),
                ));
            }
        }

        sqlx::query(
            "UPDATE packing_packages SET pallet_id = $1, status = $2 WHERE id = ANY($3)",
        )
        .bind(pallet.id)
        .bind(PackageStatus::Palletized.as_str())
        .bind(&input.package_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(folio = %pallet.folio(), packages = input.package_ids.len(), "packages palletized");
        self.get_pallet(organization_id, pallet_id).await
    }

    /// Take a package back off an open pallet
    pub async fn unassign_package(&self, organization_id: Uuid, pallet_id: Uuid, package_id: Uuid) -> AppResult<PalletDetail> {
        let mut tx = self.db.begin().await?;
        let pallet = lock_open_pallet(&mut tx, organization_id, pallet_id).await?;

        let result = sqlx::query(
            "UPDATE packing_packages SET pallet_id = NULL, status = $3 WHERE id = $1 AND pallet_id = $2",
        )
        .bind(package_id)
        .bind(pallet.id)
        .bind(PackageStatus::Ready.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Packing package"));
        }

        tx.commit().await?;
        self.get_pallet(organization_id, pallet_id).await
    }

    /// Close a pallet; it must hold at least one package
    pub async fn close_pallet(&self, organization_id: Uuid, pallet_id: Uuid) -> AppResult<PalletDetail> {
        let mut tx = self.db.begin().await?;
        let pallet = lock_open_pallet(&mut tx, organization_id, pallet_id).await?;
        let next = parse_status(&pallet.status, PalletStatus::from_str)?.transition(PalletStatus::Closed)?;

        let lines = sqlx::query_as::<_, (i32, Decimal)>(
            "SELECT package_count, weight_per_package_kg FROM packing_packages WHERE pallet_id = $1",
        )
        .bind(pallet.id)
        .fetch_all(&mut *tx)
        .await?;

        let totals = PalletTotals::from_packages(&lines);
        if !totals.can_close() {
            return Err(AppError::validation("packages", "A pallet needs at least one package to close"));
        }

        sqlx::query("UPDATE packing_pallets SET status = $2, closed_at = NOW() WHERE id = $1")
            .bind(pallet.id)
            .bind(next.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            folio = %pallet.folio(),
            packages = totals.package_count,
            net_weight_kg = %totals.net_weight_kg,
            "pallet closed"
        );
        self.get_pallet(organization_id, pallet_id).await
    }
}
