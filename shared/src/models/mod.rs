//! Domain models for the packhouse platform

mod batch;
mod catalog;
mod food_safety;
mod harvest;
mod inventory;
mod organization;
mod packing;
mod purchasing;
mod receiving;
mod status;

pub use batch::*;
pub use catalog::*;
pub use food_safety::*;
pub use harvest::*;
pub use inventory::*;
pub use organization::*;
pub use packing::*;
pub use purchasing::*;
pub use receiving::*;
pub use status::*;
