//! Packing HTTP handlers: packages and pallets

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::packing::{
    AssignPackagesInput, CreatePackageInput, CreatePalletInput, PackageFilter, PackingPackage,
    PackingPallet, PalletDetail, PalletFilter,
};
use crate::services::PackingService;
use crate::AppState;

pub async fn list_packages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PackageFilter>,
) -> AppResult<Json<Vec<PackingPackage>>> {
    user.require(Resource::Packing, Action::View)?;
    let packages = PackingService::new(state.db.clone())
        .list_packages(user.organization_id, &filter)
        .await?;
    Ok(Json(packages))
}

/// Pack fruit from a batch; the packed weight leaves the batch
pub async fn create_package(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePackageInput>,
) -> AppResult<(StatusCode, Json<PackingPackage>)> {
    user.require(Resource::Packing, Action::Edit)?;
    let package = PackingService::new(state.db.clone())
        .create_package(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(package)))
}

pub async fn delete_package(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    user.require(Resource::Packing, Action::Edit)?;
    PackingService::new(state.db.clone())
        .delete_package(user.organization_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_pallets(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PalletFilter>,
) -> AppResult<Json<Vec<PackingPallet>>> {
    user.require(Resource::Packing, Action::View)?;
    let pallets = PackingService::new(state.db.clone())
        .list_pallets(user.organization_id, &filter)
        .await?;
    Ok(Json(pallets))
}

pub async fn get_pallet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PalletDetail>> {
    user.require(Resource::Packing, Action::View)?;
    let pallet = PackingService::new(state.db.clone())
        .get_pallet(user.organization_id, id)
        .await?;
    Ok(Json(pallet))
}

pub async fn create_pallet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePalletInput>,
) -> AppResult<(StatusCode, Json<PackingPallet>)> {
    user.require(Resource::Packing, Action::Edit)?;
    let pallet = PackingService::new(state.db.clone())
        .create_pallet(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(pallet)))
}

/// Put ready packages onto an open pallet
pub async fn assign_packages(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<AssignPackagesInput>,
) -> AppResult<Json<PalletDetail>> {
    user.require(Resource::Packing, Action::Edit)?;
    let pallet = PackingService::new(state.db.clone())
        .assign_packages(user.organization_id, id, input)
        .await?;
    Ok(Json(pallet))
}

pub async fn unassign_package(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, package_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<PalletDetail>> {
    user.require(Resource::Packing, Action::Edit)?;
    let pallet = PackingService::new(state.db.clone())
        .unassign_package(user.organization_id, id, package_id)
        .await?;
    Ok(Json(pallet))
}

pub async fn close_pallet(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PalletDetail>> {
    user.require(Resource::Packing, Action::Approve)?;
    let pallet = PackingService::new(state.db.clone())
        .close_pallet(user.organization_id, id)
        .await?;
    Ok(Json(pallet))
}
