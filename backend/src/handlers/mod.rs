//! HTTP handlers
//!
//! Handlers check the caller's permission, build the service they need
//! and hand the rest to it.

pub mod auth;
pub mod batch;
pub mod catalog;
pub mod food_safety;
pub mod harvest;
pub mod health;
pub mod inventory;
pub mod packing;
pub mod purchasing;
pub mod receiving;

pub use auth::*;
pub use batch::*;
pub use catalog::*;
pub use food_safety::*;
pub use harvest::*;
pub use health::*;
pub use inventory::*;
pub use packing::*;
pub use purchasing::*;
pub use receiving::*;

use serde::Deserialize;

/// Body of every `PUT .../status` request
#[derive(Debug, Deserialize)]
pub struct StatusInput<T> {
    pub status: T,
}
