//! Purchasing HTTP handlers: requisitions, purchase, service and fruit purchase orders
//!
//! Charges, deductions and payments live under `/orders/:kind/:order_id`,
//! where `kind` is `purchase_order`, `service_order` or `fruit_purchase_order`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::{Action, DocumentStatus, OrderKind, Resource};
use uuid::Uuid;

use super::StatusInput;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::fruit_purchase::{
    CreateFruitPurchaseInput, FruitPurchaseDetail, FruitPurchaseFilter, FruitPurchaseOrder, ReceiptInput,
};
use crate::services::order_money::{AdjustmentInput, AdjustmentKind, OrderMoney, PaymentInput};
use crate::services::purchase_order::{
    CreatePurchaseOrderInput, PurchaseOrder, PurchaseOrderDetail, PurchaseOrderFilter, PurchaseOrderLineInput,
};
use crate::services::requisition::{
    CreateRequisitionInput, Requisition, RequisitionDetail, RequisitionFilter, RequisitionLineInput,
};
use crate::services::service_order::{
    CreateServiceOrderInput, ServiceOrder, ServiceOrderDetail, ServiceOrderFilter, ServiceOrderLineInput,
};
use crate::services::{
    FruitPurchaseService, OrderMoneyService, PurchaseOrderService, RequisitionService, ServiceOrderService,
};
use crate::AppState;

// ---- requisitions ----------------------------------------------------------

pub async fn list_requisitions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<RequisitionFilter>,
) -> AppResult<Json<Vec<Requisition>>> {
    user.require(Resource::Purchasing, Action::View)?;
    let requisitions = RequisitionService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(requisitions))
}

pub async fn get_requisition(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RequisitionDetail>> {
    user.require(Resource::Purchasing, Action::View)?;
    let requisition = RequisitionService::new(state.db.clone())
        .get(user.organization_id, id)
        .await?;
    Ok(Json(requisition))
}

pub async fn create_requisition(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateRequisitionInput>,
) -> AppResult<(StatusCode, Json<RequisitionDetail>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let requisition = RequisitionService::new(state.db.clone())
        .create(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(requisition)))
}

pub async fn add_requisition_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<RequisitionLineInput>,
) -> AppResult<Json<RequisitionDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let requisition = RequisitionService::new(state.db.clone())
        .add_line(user.organization_id, id, input)
        .await?;
    Ok(Json(requisition))
}

pub async fn remove_requisition_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RequisitionDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let requisition = RequisitionService::new(state.db.clone())
        .remove_line(user.organization_id, id, line_id)
        .await?;
    Ok(Json(requisition))
}

pub async fn set_requisition_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<DocumentStatus>>,
) -> AppResult<Json<RequisitionDetail>> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let requisition = RequisitionService::new(state.db.clone())
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(requisition))
}

// ---- purchase orders -------------------------------------------------------

pub async fn list_purchase_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<PurchaseOrderFilter>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    user.require(Resource::Purchasing, Action::View)?;
    let orders = PurchaseOrderService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(orders))
}

/// Purchase order with its lines, money records and totals
pub async fn get_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Resource::Purchasing, Action::View)?;
    let order = PurchaseOrderService::new(state.db.clone())
        .get(user.organization_id, id)
        .await?;
    Ok(Json(order))
}

pub async fn create_purchase_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreatePurchaseOrderInput>,
) -> AppResult<(StatusCode, Json<PurchaseOrderDetail>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = PurchaseOrderService::new(state.db.clone())
        .create(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn add_purchase_order_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<PurchaseOrderLineInput>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = PurchaseOrderService::new(state.db.clone())
        .add_line(user.organization_id, id, input)
        .await?;
    Ok(Json(order))
}

pub async fn remove_purchase_order_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = PurchaseOrderService::new(state.db.clone())
        .remove_line(user.organization_id, id, line_id)
        .await?;
    Ok(Json(order))
}

pub async fn set_purchase_order_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<DocumentStatus>>,
) -> AppResult<Json<PurchaseOrderDetail>> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let order = PurchaseOrderService::new(state.db.clone())
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(order))
}

// ---- service orders --------------------------------------------------------

pub async fn list_service_orders(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<ServiceOrderFilter>,
) -> AppResult<Json<Vec<ServiceOrder>>> {
    user.require(Resource::Purchasing, Action::View)?;
    let orders = ServiceOrderService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(orders))
}

pub async fn get_service_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ServiceOrderDetail>> {
    user.require(Resource::Purchasing, Action::View)?;
    let order = ServiceOrderService::new(state.db.clone())
        .get(user.organization_id, id)
        .await?;
    Ok(Json(order))
}

pub async fn create_service_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateServiceOrderInput>,
) -> AppResult<(StatusCode, Json<ServiceOrderDetail>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = ServiceOrderService::new(state.db.clone())
        .create(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn add_service_order_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ServiceOrderLineInput>,
) -> AppResult<Json<ServiceOrderDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = ServiceOrderService::new(state.db.clone())
        .add_line(user.organization_id, id, input)
        .await?;
    Ok(Json(order))
}

pub async fn remove_service_order_line(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ServiceOrderDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = ServiceOrderService::new(state.db.clone())
        .remove_line(user.organization_id, id, line_id)
        .await?;
    Ok(Json(order))
}

pub async fn set_service_order_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<DocumentStatus>>,
) -> AppResult<Json<ServiceOrderDetail>> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let order = ServiceOrderService::new(state.db.clone())
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(order))
}

// ---- fruit purchase orders -------------------------------------------------

pub async fn list_fruit_purchases(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(filter): Query<FruitPurchaseFilter>,
) -> AppResult<Json<Vec<FruitPurchaseOrder>>> {
    user.require(Resource::Purchasing, Action::View)?;
    let orders = FruitPurchaseService::new(state.db.clone())
        .list(user.organization_id, &filter)
        .await?;
    Ok(Json(orders))
}

pub async fn get_fruit_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<FruitPurchaseDetail>> {
    user.require(Resource::Purchasing, Action::View)?;
    let order = FruitPurchaseService::new(state.db.clone())
        .get(user.organization_id, id)
        .await?;
    Ok(Json(order))
}

pub async fn create_fruit_purchase(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(input): Json<CreateFruitPurchaseInput>,
) -> AppResult<(StatusCode, Json<FruitPurchaseDetail>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = FruitPurchaseService::new(state.db.clone())
        .create(user.organization_id, user.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Price a received batch on the order
pub async fn add_fruit_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<ReceiptInput>,
) -> AppResult<Json<FruitPurchaseDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = FruitPurchaseService::new(state.db.clone())
        .add_receipt(user.organization_id, id, input)
        .await?;
    Ok(Json(order))
}

pub async fn remove_fruit_receipt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, receipt_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<FruitPurchaseDetail>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let order = FruitPurchaseService::new(state.db.clone())
        .remove_receipt(user.organization_id, id, receipt_id)
        .await?;
    Ok(Json(order))
}

pub async fn set_fruit_purchase_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<StatusInput<DocumentStatus>>,
) -> AppResult<Json<FruitPurchaseDetail>> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let order = FruitPurchaseService::new(state.db.clone())
        .set_status(user.organization_id, id, input.status)
        .await?;
    Ok(Json(order))
}

// ---- order money -----------------------------------------------------------

/// Charges, deductions, payments and totals of any order
pub async fn get_order_money(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id)): Path<(OrderKind, Uuid)>,
) -> AppResult<Json<OrderMoney>> {
    user.require(Resource::Purchasing, Action::View)?;
    let money = OrderMoneyService::new(state.db.clone())
        .get(user.organization_id, kind, order_id)
        .await?;
    Ok(Json(money))
}

pub async fn add_order_charge(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id)): Path<(OrderKind, Uuid)>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<(StatusCode, Json<OrderMoney>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let money = OrderMoneyService::new(state.db.clone())
        .add_adjustment(user.organization_id, kind, AdjustmentKind::Charge, order_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(money)))
}

pub async fn remove_order_charge(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id, charge_id)): Path<(OrderKind, Uuid, Uuid)>,
) -> AppResult<Json<OrderMoney>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let money = OrderMoneyService::new(state.db.clone())
        .remove_adjustment(user.organization_id, kind, AdjustmentKind::Charge, order_id, charge_id)
        .await?;
    Ok(Json(money))
}

pub async fn add_order_deduction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id)): Path<(OrderKind, Uuid)>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<(StatusCode, Json<OrderMoney>)> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let money = OrderMoneyService::new(state.db.clone())
        .add_adjustment(user.organization_id, kind, AdjustmentKind::Deduction, order_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(money)))
}

pub async fn remove_order_deduction(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id, deduction_id)): Path<(OrderKind, Uuid, Uuid)>,
) -> AppResult<Json<OrderMoney>> {
    user.require(Resource::Purchasing, Action::Edit)?;
    let money = OrderMoneyService::new(state.db.clone())
        .remove_adjustment(user.organization_id, kind, AdjustmentKind::Deduction, order_id, deduction_id)
        .await?;
    Ok(Json(money))
}

/// Record a payment; it may not push the paid amount past the total
pub async fn add_order_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id)): Path<(OrderKind, Uuid)>,
    Json(input): Json<PaymentInput>,
) -> AppResult<(StatusCode, Json<OrderMoney>)> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let money = OrderMoneyService::new(state.db.clone())
        .add_payment(user.organization_id, user.user_id, kind, order_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(money)))
}

pub async fn cancel_order_payment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((kind, order_id, payment_id)): Path<(OrderKind, Uuid, Uuid)>,
) -> AppResult<Json<OrderMoney>> {
    user.require(Resource::Purchasing, Action::Approve)?;
    let money = OrderMoneyService::new(state.db.clone())
        .cancel_payment(user.organization_id, kind, order_id, payment_id)
        .await?;
    Ok(Json(money))
}
