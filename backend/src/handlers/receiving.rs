//! Incoming product HTTP handlers: receiving, weighing and acceptance

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, Resource, WeighingReading};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::receiving::{
    DecisionInput, IncomingDetail, IncomingFilter, IncomingProduct, ReceiveInput, WeighingSet,
};
use crate::services::ReceivingService;
use crate::AppState;

pub async fn list_incoming(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<IncomingFilter>,
) -> AppResult<Json<Vec<IncomingProduct>>> {
    user.require(Resource::Receiving, Action::View)?;
    let incoming = ReceivingService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(incoming))
}

/// Incoming product with its weighing sets
pub async fn get_incoming(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<IncomingDetail>> {
    user.require(Resource::Receiving, Action::View)?;
    let detail = ReceivingService::new(state.db.clone())
        .get_detail(user.organization_id, id)
        .await?;
    Ok(Json(detail))
}

/// Receive the fruit of a ready schedule harvest
pub async fn receive_incoming(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<ReceiveInput>,
) -> AppResult<(StatusCode, Json<IncomingProduct>)> {
    user.require(Resource::Receiving, Action::Edit)?;
    let incoming = ReceivingService::new(state.db.clone())
        .receive(user.organization_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(incoming)))
}

pub async fn add_weighing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(reading): Json<WeighingReading>,
) -> AppResult<(StatusCode, Json<WeighingSet>)> {
    user.require(Resource::Receiving, Action::Edit)?;
    let set = ReceivingService::new(state.db.clone())
        .add_weighing(user.organization_id, id, reading)
        .await?;
    Ok((StatusCode::CREATED, Json(set)))
}

pub async fn remove_weighing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, set_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    user.require(Resource::Receiving, Action::Edit)?;
    ReceivingService::new(state.db.clone())
        .remove_weighing(user.organization_id, id, set_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Accept or reject an incoming product; accepting creates its batch
pub async fn decide_incoming(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<DecisionInput>,
) -> AppResult<Json<IncomingDetail>> {
    user.require(Resource::Receiving, Action::Approve)?;
    let detail = ReceivingService::new(state.db.clone())
        .decide(user.organization_id, id, input)
        .await?;
    Ok(Json(detail))
}
