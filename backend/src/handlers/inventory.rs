//! Supply inventory HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::fifo::{FifoLot, KardexLine};
use shared::{Action, Resource, SupplyBalance};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    AdjustmentFilter, AdjustmentInventory, AdjustmentResult, ConsumeInput, ConsumptionResult,
    CreateAdjustmentInput, CreateStorehouseEntryInput, EntryFilter, InventoryTransaction,
    StorehouseEntry, StorehouseEntryDetail,
};
use crate::services::InventoryService;
use crate::AppState;

/// Receive supplies against a ready purchase order
pub async fn create_storehouse_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateStorehouseEntryInput>,
) -> AppResult<(StatusCode, Json<StorehouseEntryDetail>)> {
    user.require(Resource::Inventory, Action::Edit)?;
    let entry = InventoryService::new(state.db.clone())
        .create_storehouse_entry(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_storehouse_entries(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<EntryFilter>,
) -> AppResult<Json<Vec<StorehouseEntry>>> {
    user.require(Resource::Inventory, Action::View)?;
    let entries = InventoryService::new(state.db.clone())
        .list_storehouse_entries(user.organization_id, &filter)
        .await?;
    Ok(Json(entries))
}

pub async fn get_storehouse_entry(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StorehouseEntryDetail>> {
    user.require(Resource::Inventory, Action::View)?;
    let entry = InventoryService::new(state.db.clone())
        .get_storehouse_entry(user.organization_id, id)
        .await?;
    Ok(Json(entry))
}

/// Consume supplies first-in-first-out
pub async fn consume_supply(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ConsumeInput>,
) -> AppResult<Json<ConsumptionResult>> {
    user.require(Resource::Inventory, Action::Edit)?;
    let result = InventoryService::new(state.db.clone())
        .consume(user.organization_id, user.user_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn create_adjustment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateAdjustmentInput>,
) -> AppResult<(StatusCode, Json<AdjustmentResult>)> {
    user.require(Resource::Inventory, Action::Approve)?;
    let result = InventoryService::new(state.db.clone())
        .create_adjustment(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<AdjustmentFilter>,
) -> AppResult<Json<Vec<AdjustmentInventory>>> {
    user.require(Resource::Inventory, Action::View)?;
    let adjustments = InventoryService::new(state.db.clone())
        .list_adjustments(user.organization_id, &filter)
        .await?;
    Ok(Json(adjustments))
}

/// Stock position of every enabled supply
pub async fn list_balances(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Json<Vec<SupplyBalance>>> {
    user.require(Resource::Inventory, Action::View)?;
    let balances = InventoryService::new(state.db.clone())
        .balances(user.organization_id)
        .await?;
    Ok(Json(balances))
}

pub async fn get_balance(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supply_id): Path<Uuid>,
) -> AppResult<Json<SupplyBalance>> {
    user.require(Resource::Inventory, Action::View)?;
    let balance = InventoryService::new(state.db.clone())
        .balance(user.organization_id, supply_id)
        .await?;
    Ok(Json(balance))
}

pub async fn get_kardex(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supply_id): Path<Uuid>,
) -> AppResult<Json<Vec<KardexLine>>> {
    user.require(Resource::Inventory, Action::View)?;
    let lines = InventoryService::new(state.db.clone())
        .kardex(user.organization_id, supply_id)
        .await?;
    Ok(Json(lines))
}

pub async fn get_open_lots(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supply_id): Path<Uuid>,
) -> AppResult<Json<Vec<FifoLot>>> {
    user.require(Resource::Inventory, Action::View)?;
    let lots = InventoryService::new(state.db.clone())
        .open_lots(user.organization_id, supply_id)
        .await?;
    Ok(Json(lots))
}

pub async fn list_supply_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(supply_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryTransaction>>> {
    user.require(Resource::Inventory, Action::View)?;
    let transactions = InventoryService::new(state.db.clone())
        .transactions(user.organization_id, supply_id)
        .await?;
    Ok(Json(transactions))
}
