//! Batch models, weight reconciliation and merge rules
//!
//! A batch's weights are never edited directly. They are derived from the
//! records hanging off it:
//!
//! * received = net weight of every weighing set of its incoming product
//! * sampled = weight taken by food-safety samples
//! * packaged = weight put into packing packages
//! * merged in = stock transferred from merged child batches
//!
//! `available = received + merged_in - sampled - packaged`. A batch merged
//! into a parent reports zero available; its stock is counted by the parent.

use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::receiving::WeightError;
use super::status::StatusFlow;

/// Batch lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Open,
    Closed,
    Canceled,
}

impl BatchStatus {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(BatchStatus::Open),
            "closed" => Some(BatchStatus::Closed),
            "canceled" => Some(BatchStatus::Canceled),
            _ => None,
        }
    }
}

impl StatusFlow for BatchStatus {
    const ENTITY: &'static str = "batch";

    fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Open => "open",
            BatchStatus::Closed => "closed",
            BatchStatus::Canceled => "canceled",
        }
    }

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (BatchStatus::Open, BatchStatus::Closed) | (BatchStatus::Open, BatchStatus::Canceled)
        )
    }

    fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Open)
    }
}

/// Records a batch's weights are derived from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchWeightSources {
    pub weighing_nets_kg: Vec<Decimal>,
    pub sample_weights_kg: Vec<Decimal>,
    pub packaged_weights_kg: Vec<Decimal>,
    /// Stock transferred in by each merged child
    pub children_transferred_kg: Vec<Decimal>,
    /// Whether this batch has itself been merged into a parent
    pub is_merged_child: bool,
}

/// Reconciled weights of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchWeights {
    pub received_kg: Decimal,
    pub sampled_kg: Decimal,
    pub packaged_kg: Decimal,
    pub merged_in_kg: Decimal,
    /// Stock usable from this batch
    pub available_kg: Decimal,
    /// Stock handed to the parent batch (merged children only)
    pub transferred_kg: Decimal,
}

impl BatchWeights {
    /// Derive the weights, rejecting any state that leaves the batch negative
    pub fn reconcile(sources: &BatchWeightSources) -> Result<Self, WeightError> {
        let received_kg: Decimal = sources.weighing_nets_kg.iter().sum();
        let sampled_kg: Decimal = sources.sample_weights_kg.iter().sum();
        let packaged_kg: Decimal = sources.packaged_weights_kg.iter().sum();
        let merged_in_kg: Decimal = sources.children_transferred_kg.iter().sum();

        let inflow = received_kg + merged_in_kg;
        let outflow = sampled_kg + packaged_kg;
        if outflow > inflow {
            return Err(WeightError::Overdrawn {
                available: inflow,
                requested: outflow,
            });
        }

        let own_available = inflow - outflow;
        let (available_kg, transferred_kg) = if sources.is_merged_child {
            (Decimal::ZERO, own_available)
        } else {
            (own_available, Decimal::ZERO)
        };

        Ok(Self {
            received_kg,
            sampled_kg,
            packaged_kg,
            merged_in_kg,
            available_kg,
            transferred_kg,
        })
    }

    /// Check that `kg` more can be drawn from the batch
    pub fn ensure_can_draw(&self, kg: Decimal) -> Result<(), WeightError> {
        if kg > self.available_kg {
            return Err(WeightError::Overdrawn {
                available: self.available_kg,
                requested: kg,
            });
        }
        Ok(())
    }
}

/// Errors raised when merging batches
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("at least one child batch is required")]
    NoChildren,

    #[error("batch {0} is listed more than once")]
    Duplicate(Uuid),

    #[error("a batch cannot be merged into itself")]
    SelfMerge,

    #[error("batch {0} is not open")]
    NotOpen(Uuid),

    #[error("batch {0} is already merged into another batch")]
    AlreadyMerged(Uuid),

    #[error("batch {0} has merged children and cannot become a child")]
    ChildHasChildren(Uuid),

    #[error("batch {0} holds a different product")]
    ProductMismatch(Uuid),
}

/// The facts about a batch needed to validate a merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeCandidate {
    pub id: Uuid,
    pub product_id: Uuid,
    pub status: BatchStatus,
    pub parent_id: Option<Uuid>,
    pub has_children: bool,
}

/// Validate merging `children` into `parent`
pub fn validate_merge(parent: &MergeCandidate, children: &[MergeCandidate]) -> Result<(), MergeError> {
    if children.is_empty() {
        return Err(MergeError::NoChildren);
    }
    if parent.status != BatchStatus::Open {
        return Err(MergeError::NotOpen(parent.id));
    }
    if parent.parent_id.is_some() {
        return Err(MergeError::AlreadyMerged(parent.id));
    }

    let mut seen = HashSet::new();
    for child in children {
        if !seen.insert(child.id) {
            return Err(MergeError::Duplicate(child.id));
        }
        if child.id == parent.id {
            return Err(MergeError::SelfMerge);
        }
        if child.status != BatchStatus::Open {
            return Err(MergeError::NotOpen(child.id));
        }
        if child.parent_id.is_some() {
            return Err(MergeError::AlreadyMerged(child.id));
        }
        if child.has_children {
            return Err(MergeError::ChildHasChildren(child.id));
        }
        if child.product_id != parent.product_id {
            return Err(MergeError::ProductMismatch(child.id));
        }
    }

    Ok(())
}
