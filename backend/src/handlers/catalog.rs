//! Catalog HTTP handlers: markets, job positions, orchards, providers, products, supplies

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{AuthUser, CurrentUser};
use crate::services::catalog::{
    CatalogFilter, CatalogKind, JobPosition, JobPositionInput, Market, MarketInput, Orchard,
    OrchardInput, Product, ProductInput, Provider, ProviderInput, SetEnabledInput, Supply, SupplyInput,
};
use crate::services::CatalogService;
use crate::AppState;

async fn toggle(
    state: &AppState,
    user: &AuthUser,
    kind: CatalogKind,
    id: Uuid,
    input: SetEnabledInput,
) -> AppResult<StatusCode> {
    user.require(Resource::Catalog, Action::Edit)?;
    CatalogService::new(state.db.clone())
        .set_enabled(user.organization_id, kind, id, input.is_enabled)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- markets ---------------------------------------------------------------

pub async fn list_markets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<Market>>> {
    user.require(Resource::Catalog, Action::View)?;
    let markets = CatalogService::new(state.db.clone())
        .list_markets(user.organization_id, &filter)
        .await?;
    Ok(Json(markets))
}

pub async fn create_market(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<MarketInput>,
) -> AppResult<(StatusCode, Json<Market>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let market = CatalogService::new(state.db.clone())
        .create_market(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(market)))
}

pub async fn update_market(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<MarketInput>,
) -> AppResult<Json<Market>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let market = CatalogService::new(state.db.clone())
        .update_market(user.organization_id, id, input)
        .await?;
    Ok(Json(market))
}

pub async fn set_market_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::Market, id, input).await
}

// ---- job positions ---------------------------------------------------------

pub async fn list_job_positions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<JobPosition>>> {
    user.require(Resource::Catalog, Action::View)?;
    let positions = CatalogService::new(state.db.clone())
        .list_job_positions(user.organization_id, &filter)
        .await?;
    Ok(Json(positions))
}

pub async fn create_job_position(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<JobPositionInput>,
) -> AppResult<(StatusCode, Json<JobPosition>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let position = CatalogService::new(state.db.clone())
        .create_job_position(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(position)))
}

pub async fn update_job_position(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<JobPositionInput>,
) -> AppResult<Json<JobPosition>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let position = CatalogService::new(state.db.clone())
        .update_job_position(user.organization_id, id, input)
        .await?;
    Ok(Json(position))
}

pub async fn set_job_position_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::JobPosition, id, input).await
}

// ---- orchards --------------------------------------------------------------

pub async fn list_orchards(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<Orchard>>> {
    user.require(Resource::Catalog, Action::View)?;
    let orchards = CatalogService::new(state.db.clone())
        .list_orchards(user.organization_id, &filter)
        .await?;
    Ok(Json(orchards))
}

pub async fn create_orchard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<OrchardInput>,
) -> AppResult<(StatusCode, Json<Orchard>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let orchard = CatalogService::new(state.db.clone())
        .create_orchard(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(orchard)))
}

pub async fn update_orchard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<OrchardInput>,
) -> AppResult<Json<Orchard>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let orchard = CatalogService::new(state.db.clone())
        .update_orchard(user.organization_id, id, input)
        .await?;
    Ok(Json(orchard))
}

pub async fn set_orchard_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::Orchard, id, input).await
}

// ---- providers -------------------------------------------------------------

pub async fn list_providers(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<Provider>>> {
    user.require(Resource::Catalog, Action::View)?;
    let providers = CatalogService::new(state.db.clone())
        .list_providers(user.organization_id, &filter)
        .await?;
    Ok(Json(providers))
}

pub async fn create_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProviderInput>,
) -> AppResult<(StatusCode, Json<Provider>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let provider = CatalogService::new(state.db.clone())
        .create_provider(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn update_provider(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProviderInput>,
) -> AppResult<Json<Provider>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let provider = CatalogService::new(state.db.clone())
        .update_provider(user.organization_id, id, input)
        .await?;
    Ok(Json(provider))
}

pub async fn set_provider_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::Provider, id, input).await
}

// ---- products --------------------------------------------------------------

pub async fn list_products(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<Product>>> {
    user.require(Resource::Catalog, Action::View)?;
    let products = CatalogService::new(state.db.clone())
        .list_products(user.organization_id, &filter)
        .await?;
    Ok(Json(products))
}

pub async fn create_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let product = CatalogService::new(state.db.clone())
        .create_product(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let product = CatalogService::new(state.db.clone())
        .update_product(user.organization_id, id, input)
        .await?;
    Ok(Json(product))
}

pub async fn set_product_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::Product, id, input).await
}

// ---- supplies --------------------------------------------------------------

pub async fn list_supplies(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<CatalogFilter>,
) -> AppResult<Json<Vec<Supply>>> {
    user.require(Resource::Catalog, Action::View)?;
    let supplies = CatalogService::new(state.db.clone())
        .list_supplies(user.organization_id, &filter)
        .await?;
    Ok(Json(supplies))
}

pub async fn get_supply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Supply>> {
    user.require(Resource::Catalog, Action::View)?;
    let supply = CatalogService::new(state.db.clone())
        .get_supply(user.organization_id, id)
        .await?;
    Ok(Json(supply))
}

pub async fn create_supply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<SupplyInput>,
) -> AppResult<(StatusCode, Json<Supply>)> {
    user.require(Resource::Catalog, Action::Edit)?;
    let supply = CatalogService::new(state.db.clone())
        .create_supply(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(supply)))
}

pub async fn update_supply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SupplyInput>,
) -> AppResult<Json<Supply>> {
    user.require(Resource::Catalog, Action::Edit)?;
    let supply = CatalogService::new(state.db.clone())
        .update_supply(user.organization_id, id, input)
        .await?;
    Ok(Json(supply))
}

pub async fn set_supply_enabled(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SetEnabledInput>,
) -> AppResult<StatusCode> {
    toggle(&state, &user, CatalogKind::Supply, id, input).await
}
