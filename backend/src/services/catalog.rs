//! Catalog service: markets, job positions, orchards, providers, products and supplies

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::{validate_name, validate_non_negative, validate_tax_id, GpsCoordinates, ProviderCategory, SupplyUnit};

/// Catalog service
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Query filter shared by the catalog list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct CatalogFilter {
    pub enabled: Option<bool>,
    /// Providers only
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Market {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub country: Option<String>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MarketInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub country: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobPosition {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct JobPositionInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Orchard {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub code: String,
    pub name: String,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrchardInput {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub provider_id: Option<Uuid>,
    pub location: Option<GpsCoordinates>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub tax_id: Option<String>,
    pub category: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProviderInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub tax_id: Option<String>,
    pub category: ProviderCategory,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Supply {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub unit: String,
    pub minimum_stock: Decimal,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SupplyInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub unit: SupplyUnit,
    #[serde(default)]
    pub minimum_stock: Decimal,
}

/// Enable or disable a catalog entry
#[derive(Debug, Deserialize)]
pub struct SetEnabledInput {
    pub is_enabled: bool,
}

/// Catalog tables that support enable/disable
#[derive(Debug, Clone, Copy)]
pub enum CatalogKind {
    Market,
    JobPosition,
    Orchard,
    Provider,
    Product,
    Supply,
}

impl CatalogKind {
    fn table(&self) -> &'static str {
        match self {
            CatalogKind::Market => "markets",
            CatalogKind::JobPosition => "job_positions",
            CatalogKind::Orchard => "orchards",
            CatalogKind::Provider => "providers",
            CatalogKind::Product => "products",
            CatalogKind::Supply => "supplies",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CatalogKind::Market => "Market",
            CatalogKind::JobPosition => "Job position",
            CatalogKind::Orchard => "Orchard",
            CatalogKind::Provider => "Provider",
            CatalogKind::Product => "Product",
            CatalogKind::Supply => "Supply",
        }
    }
}

fn check_name(name: &str) -> AppResult<String> {
    validate_name(name).map_err(|msg| AppError::validation("name", msg))?;
    Ok(name.trim().to_string())
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ---- markets -----------------------------------------------------------

    pub async fn list_markets(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<Market>> {
        let markets = sqlx::query_as::<_, Market>(
            r#"
            SELECT id, organization_id, name, country, is_enabled, created_at
            FROM markets
            WHERE organization_id = $1 AND ($2::bool IS NULL OR is_enabled = $2)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .fetch_all(&self.db)
        .await?;

        Ok(markets)
    }

    pub async fn create_market(&self, organization_id: Uuid, input: MarketInput) -> AppResult<Market> {
        input.validate()?;
        let name = check_name(&input.name)?;

        let market = sqlx::query_as::<_, Market>(
            r#"
            INSERT INTO markets (organization_id, name, country)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, country, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(&name)
        .bind(&input.country)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("market"))?;

        Ok(market)
    }

    pub async fn update_market(&self, organization_id: Uuid, id: Uuid, input: MarketInput) -> AppResult<Market> {
        input.validate()?;
        let name = check_name(&input.name)?;

        sqlx::query_as::<_, Market>(
            r#"
            UPDATE markets SET name = $3, country = $4
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, country, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&name)
        .bind(&input.country)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("market"))?
        .ok_or_else(|| AppError::not_found("Market"))
    }

    // ---- job positions -----------------------------------------------------

    pub async fn list_job_positions(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<JobPosition>> {
        let positions = sqlx::query_as::<_, JobPosition>(
            r#"
            SELECT id, organization_id, name, is_enabled, created_at
            FROM job_positions
            WHERE organization_id = $1 AND ($2::bool IS NULL OR is_enabled = $2)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .fetch_all(&self.db)
        .await?;

        Ok(positions)
    }

    pub async fn create_job_position(&self, organization_id: Uuid, input: JobPositionInput) -> AppResult<JobPosition> {
        input.validate()?;
        let name = check_name(&input.name)?;

        let position = sqlx::query_as::<_, JobPosition>(
            r#"
            INSERT INTO job_positions (organization_id, name)
            VALUES ($1, $2)
            RETURNING id, organization_id, name, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(&name)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("job position"))?;

        Ok(position)
    }

    pub async fn update_job_position(
        &self,
        organization_id: Uuid,
        id: Uuid,
        input: JobPositionInput,
    ) -> AppResult<JobPosition> {
        input.validate()?;
        let name = check_name(&input.name)?;

        sqlx::query_as::<_, JobPosition>(
            r#"
            UPDATE job_positions SET name = $3
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&name)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("job position"))?
        .ok_or_else(|| AppError::not_found("Job position"))
    }

    // ---- orchards ----------------------------------------------------------

    pub async fn list_orchards(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<Orchard>> {
        let orchards = sqlx::query_as::<_, Orchard>(
            r#"
            SELECT id, organization_id, provider_id, code, name, latitude, longitude, is_enabled, created_at
            FROM orchards
            WHERE organization_id = $1 AND ($2::bool IS NULL OR is_enabled = $2)
            ORDER BY code
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .fetch_all(&self.db)
        .await?;

        Ok(orchards)
    }

    pub async fn create_orchard(&self, organization_id: Uuid, input: OrchardInput) -> AppResult<Orchard> {
        input.validate()?;
        let name = check_name(&input.name)?;
        if let Some(location) = &input.location {
            if !location.is_valid() {
                return Err(AppError::validation("location", "Coordinates are out of range"));
            }
        }
        if let Some(provider_id) = input.provider_id {
            self.ensure_provider(organization_id, provider_id, Some(ProviderCategory::FruitProducer))
                .await?;
        }

        let orchard = sqlx::query_as::<_, Orchard>(
            r#"
            INSERT INTO orchards (organization_id, provider_id, code, name, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, organization_id, provider_id, code, name, latitude, longitude, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(input.provider_id)
        .bind(input.code.trim())
        .bind(&name)
        .bind(input.location.as_ref().map(|l| l.latitude))
        .bind(input.location.as_ref().map(|l| l.longitude))
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("orchard"))?;

        Ok(orchard)
    }

    pub async fn update_orchard(&self, organization_id: Uuid, id: Uuid, input: OrchardInput) -> AppResult<Orchard> {
        input.validate()?;
        let name = check_name(&input.name)?;
        if let Some(location) = &input.location {
            if !location.is_valid() {
                return Err(AppError::validation("location", "Coordinates are out of range"));
            }
        }
        if let Some(provider_id) = input.provider_id {
            self.ensure_provider(organization_id, provider_id, Some(ProviderCategory::FruitProducer))
                .await?;
        }

        sqlx::query_as::<_, Orchard>(
            r#"
            UPDATE orchards SET provider_id = $3, code = $4, name = $5, latitude = $6, longitude = $7
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, provider_id, code, name, latitude, longitude, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(input.provider_id)
        .bind(input.code.trim())
        .bind(&name)
        .bind(input.location.as_ref().map(|l| l.latitude))
        .bind(input.location.as_ref().map(|l| l.longitude))
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("orchard"))?
        .ok_or_else(|| AppError::not_found("Orchard"))
    }

    // ---- providers ---------------------------------------------------------

    pub async fn list_providers(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<Provider>> {
        if let Some(category) = &filter.category {
            if ProviderCategory::from_str(category).is_none() {
                return Err(AppError::validation("category", "Unknown provider category"));
            }
        }

        let providers = sqlx::query_as::<_, Provider>(
            r#"
            SELECT id, organization_id, name, tax_id, category, is_enabled, created_at
            FROM providers
            WHERE organization_id = $1
              AND ($2::bool IS NULL OR is_enabled = $2)
              AND ($3::text IS NULL OR category = $3)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .bind(&filter.category)
        .fetch_all(&self.db)
        .await?;

        Ok(providers)
    }

    pub async fn create_provider(&self, organization_id: Uuid, input: ProviderInput) -> AppResult<Provider> {
        input.validate()?;
        let name = check_name(&input.name)?;
        if let Some(tax_id) = &input.tax_id {
            validate_tax_id(tax_id).map_err(|msg| AppError::validation("tax_id", msg))?;
        }

        let provider = sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (organization_id, name, tax_id, category)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, name, tax_id, category, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(&name)
        .bind(&input.tax_id)
        .bind(input.category.as_str())
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("provider"))?;

        Ok(provider)
    }

    pub async fn update_provider(&self, organization_id: Uuid, id: Uuid, input: ProviderInput) -> AppResult<Provider> {
        input.validate()?;
        let name = check_name(&input.name)?;
        if let Some(tax_id) = &input.tax_id {
            validate_tax_id(tax_id).map_err(|msg| AppError::validation("tax_id", msg))?;
        }

        sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers SET name = $3, tax_id = $4, category = $5
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, tax_id, category, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&name)
        .bind(&input.tax_id)
        .bind(input.category.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("provider"))?
        .ok_or_else(|| AppError::not_found("Provider"))
    }

    /// Check that a provider exists, is enabled and (optionally) belongs to a category
    pub async fn ensure_provider(
        &self,
        organization_id: Uuid,
        provider_id: Uuid,
        category: Option<ProviderCategory>,
    ) -> AppResult<()> {
        let row = sqlx::query_as::<_, (String, bool)>(
            "SELECT category, is_enabled FROM providers WHERE id = $1 AND organization_id = $2",
        )
        .bind(provider_id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Provider"))?;

        if !row.1 {
            return Err(AppError::validation("provider_id", "Provider is disabled"));
        }
        if let Some(expected) = category {
            if row.0 != expected.as_str() {
                return Err(AppError::validation(
                    "provider_id",
                    format!("Provider must be a {}", expected.as_str()),
                ));
            }
        }
        Ok(())
    }

    // ---- products ----------------------------------------------------------

    pub async fn list_products(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, organization_id, name, kind, is_enabled, created_at
            FROM products
            WHERE organization_id = $1 AND ($2::bool IS NULL OR is_enabled = $2)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    pub async fn create_product(&self, organization_id: Uuid, input: ProductInput) -> AppResult<Product> {
        input.validate()?;
        let name = check_name(&input.name)?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (organization_id, name, kind)
            VALUES ($1, $2, $3)
            RETURNING id, organization_id, name, kind, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(&name)
        .bind(&input.kind)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("product"))?;

        Ok(product)
    }

    pub async fn update_product(&self, organization_id: Uuid, id: Uuid, input: ProductInput) -> AppResult<Product> {
        input.validate()?;
        let name = check_name(&input.name)?;

        sqlx::query_as::<_, Product>(
            r#"
            UPDATE products SET name = $3, kind = $4
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, kind, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&name)
        .bind(&input.kind)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("product"))?
        .ok_or_else(|| AppError::not_found("Product"))
    }

    // ---- supplies ----------------------------------------------------------

    pub async fn list_supplies(&self, organization_id: Uuid, filter: &CatalogFilter) -> AppResult<Vec<Supply>> {
        let supplies = sqlx::query_as::<_, Supply>(
            r#"
            SELECT id, organization_id, name, unit, minimum_stock, is_enabled, created_at
            FROM supplies
            WHERE organization_id = $1 AND ($2::bool IS NULL OR is_enabled = $2)
            ORDER BY name
            "#,
        )
        .bind(organization_id)
        .bind(filter.enabled)
        .fetch_all(&self.db)
        .await?;

        Ok(supplies)
    }

    pub async fn create_supply(&self, organization_id: Uuid, input: SupplyInput) -> AppResult<Supply> {
        input.validate()?;
        let name = check_name(&input.name)?;
        validate_non_negative(input.minimum_stock)
            .map_err(|msg| AppError::validation("minimum_stock", msg))?;

        let supply = sqlx::query_as::<_, Supply>(
            r#"
            INSERT INTO supplies (organization_id, name, unit, minimum_stock)
            VALUES ($1, $2, $3, $4)
            RETURNING id, organization_id, name, unit, minimum_stock, is_enabled, created_at
            "#,
        )
        .bind(organization_id)
        .bind(&name)
        .bind(input.unit.as_str())
        .bind(input.minimum_stock)
        .fetch_one(&self.db)
        .await
        .map_err(AppError::on_duplicate("supply"))?;

        Ok(supply)
    }

    pub async fn get_supply(&self, organization_id: Uuid, id: Uuid) -> AppResult<Supply> {
        sqlx::query_as::<_, Supply>(
            r#"
            SELECT id, organization_id, name, unit, minimum_stock, is_enabled, created_at
            FROM supplies
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("Supply"))
    }

    /// Rename a supply or change its minimum stock; the unit is fixed once stock has moved
    pub async fn update_supply(&self, organization_id: Uuid, id: Uuid, input: SupplyInput) -> AppResult<Supply> {
        input.validate()?;
        let name = check_name(&input.name)?;
        validate_non_negative(input.minimum_stock)
            .map_err(|msg| AppError::validation("minimum_stock", msg))?;

        let current = self.get_supply(organization_id, id).await?;
        if current.unit != input.unit.as_str() {
            let moved = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM inventory_transactions WHERE supply_id = $1)",
            )
            .bind(id)
            .fetch_one(&self.db)
            .await?;
            if moved {
                return Err(AppError::validation(
                    "unit",
                    "The unit of a supply with inventory movements cannot change",
                ));
            }
        }

        sqlx::query_as::<_, Supply>(
            r#"
            UPDATE supplies SET name = $3, unit = $4, minimum_stock = $5
            WHERE id = $1 AND organization_id = $2
            RETURNING id, organization_id, name, unit, minimum_stock, is_enabled, created_at
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .bind(&name)
        .bind(input.unit.as_str())
        .bind(input.minimum_stock)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::on_duplicate("supply"))?
        .ok_or_else(|| AppError::not_found("Supply"))
    }

    // ---- shared ------------------------------------------------------------

    /// Enable or disable any catalog entry
    pub async fn set_enabled(
        &self,
        organization_id: Uuid,
        kind: CatalogKind,
        id: Uuid,
        is_enabled: bool,
    ) -> AppResult<()> {
        let query = format!(
            "UPDATE {} SET is_enabled = $3 WHERE id = $1 AND organization_id = $2",
            kind.table()
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(organization_id)
            .bind(is_enabled)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(kind.label()));
        }

        tracing::info!(%organization_id, %id, table = kind.table(), is_enabled, "catalog entry toggled");
        Ok(())
    }
}
