//! Food safety sampling HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Action, Resource};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::food_safety::{FoodSafetySample, SampleResultInput, TakeSampleInput};
use crate::services::FoodSafetyService;
use crate::AppState;

pub async fn list_batch_samples(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<FoodSafetySample>>> {
    user.require(Resource::FoodSafety, Action::View)?;
    let samples = FoodSafetyService::new(state.db.clone())
        .list_for_batch(user.organization_id, batch_id)
        .await?;
    Ok(Json(samples))
}

/// Take a sample from a batch; its weight leaves the batch
pub async fn take_sample(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<TakeSampleInput>,
) -> AppResult<(StatusCode, Json<FoodSafetySample>)> {
    user.require(Resource::FoodSafety, Action::Edit)?;
    let sample = FoodSafetyService::new(state.db.clone())
        .take_sample(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(sample)))
}

pub async fn record_sample_result(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<SampleResultInput>,
) -> AppResult<Json<FoodSafetySample>> {
    user.require(Resource::FoodSafety, Action::Approve)?;
    let sample = FoodSafetyService::new(state.db.clone())
        .record_result(user.organization_id, id, input)
        .await?;
    Ok(Json(sample))
}
