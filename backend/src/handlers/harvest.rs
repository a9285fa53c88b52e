//! Schedule harvest HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, HarvestStatus, Resource};
use uuid::Uuid;

use super::StatusInput;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::harvest::{HarvestFilter, ScheduleHarvest, ScheduleHarvestInput, UpdateScheduleInput};
use crate::services::HarvestService;
use crate::AppState;

fn service(state: &AppState) -> HarvestService {
    HarvestService::new(state.db.clone(), state.config.harvest.allow_past_dates)
}

/// List schedule harvests, newest first
pub async fn list_harvests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<HarvestFilter>,
) -> AppResult<Json<Vec<ScheduleHarvest>>> {
    user.require(Resource::Harvest, Action::View)?;
    let harvests = service(&state)
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(harvests))
}

pub async fn get_harvest(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ScheduleHarvest>> {
    user.require(Resource::Harvest, Action::View)?;
    let harvest = service(&state)
        .get(user.organization_id, id)
        .await?;
    Ok(Json(harvest))
}

/// Schedule a new harvest
pub async fn create_harvest(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ScheduleHarvestInput>,
) -> AppResult<(StatusCode, Json<ScheduleHarvest>)> {
    user.require(Resource::Harvest, Action::Edit)?;
    let harvest = service(&state)
        .create(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(harvest)))
}

pub async fn update_harvest(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateScheduleInput>,
) -> AppResult<Json<ScheduleHarvest>> {
    user.require(Resource::Harvest, Action::Edit)?;
    let harvest = service(&state)
        .update(user.organization_id, id, input)
        .await?;
    Ok(Json(harvest))
}

/// Mark a schedule ready for receiving, or cancel it
pub async fn set_harvest_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<HarvestStatus>>,
) -> AppResult<Json<ScheduleHarvest>> {
    user.require(Resource::Harvest, Action::Approve)?;
    let harvest = service(&state)
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(harvest))
}
