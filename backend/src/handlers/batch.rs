//! Batch HTTP handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{Action, BatchStatus, Resource};
use uuid::Uuid;

use super::StatusInput;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::batch::{Batch, BatchDetail, BatchFilter, MergeInput};
use crate::services::BatchService;
use crate::AppState;

pub async fn list_batches(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<BatchFilter>,
) -> AppResult<Json<Vec<Batch>>> {
    user.require(Resource::Batch, Action::View)?;
    let batches = BatchService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(batches))
}

/// Batch with its weights, merged children and food safety standing
pub async fn get_batch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BatchDetail>> {
    user.require(Resource::Batch, Action::View)?;
    let detail = BatchService::new(state.db.clone())
        .get_detail(user.organization_id, id)
        .await?;
    Ok(Json(detail))
}

/// Merge batches into this one
pub async fn merge_batches(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<MergeInput>,
) -> AppResult<Json<BatchDetail>> {
    user.require(Resource::Batch, Action::Edit)?;
    let detail = BatchService::new(state.db.clone())
        .merge(user.organization_id, id, input)
        .await?;
    Ok(Json(detail))
}

pub async fn set_batch_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<BatchStatus>>,
) -> AppResult<Json<Batch>> {
    user.require(Resource::Batch, Action::Approve)?;
    let batch = BatchService::new(state.db.clone())
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(batch))
}
