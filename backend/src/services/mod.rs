//! Business logic services for the packhouse platform

pub mod auth;
pub mod batch;
pub mod catalog;
pub mod food_safety;
pub mod fruit_purchase;
pub mod harvest;
pub mod inventory;
pub mod order_money;
pub mod packing;
pub mod purchase_order;
pub mod receiving;
pub mod requisition;
pub mod sequence;
pub mod service_order;

pub use auth::AuthService;
pub use batch::BatchService;
pub use catalog::CatalogService;
pub use food_safety::FoodSafetyService;
pub use fruit_purchase::FruitPurchaseService;
pub use harvest::HarvestService;
pub use inventory::InventoryService;
pub use order_money::OrderMoneyService;
pub use packing::PackingService;
pub use purchase_order::PurchaseOrderService;
pub use receiving::ReceivingService;
pub use requisition::RequisitionService;
pub use service_order::ServiceOrderService;

use crate::error::{AppError, AppResult};

/// Parse a status column; an unknown value means the row was written outside the service
pub(crate) fn parse_status<T>(value: &str, parse: fn(&str) -> Option<T>) -> AppResult<T> {
    parse(value).ok_or_else(|| AppError::Internal(format!("unknown stored value '{}'", value)))
}
