//! Shared types and business rules for the packhouse platform
//!
//! This crate holds everything that does not need a database: domain
//! enums and their workflows, the FIFO inventory ledger, batch weight
//! reconciliation, order money rules and folio numbering. The backend
//! wraps these rules in transactions; the WASM crate exposes them to
//! front-end widgets.

pub mod fifo;
pub mod folio;
pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
