//! Positional Sibling Matcher
//!
//! Finds an already-materialized child of a parent at a logical position so a re-run of that
//! step becomes another variant of the same record.
//!
//! Two strategies, in order:
//! 1. Slot identity: a child carrying the same `pair_shot_generation_id`. Authoritative.
//! 2. Ordinal: the most recently created child at the same ordinal, tried only when the task
//!    supplied no slot reference at all. A slot reference that fails to match means the ordinal now
//!    belongs to a different logical slot, so ordinal matching is skipped.

use crate::error::StorageError;
use crate::model::Generation;
use crate::store::GenerationStore;
use crate::types::GenerationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    SlotIdentity,
    Ordinal,
}

/// Logical position of a step within its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub slot: Option<GenerationId>,
    pub ordinal: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SiblingMatch {
    pub sibling: Generation,
    pub strategy: MatchStrategy,
}

pub async fn find_sibling(
    store: &dyn GenerationStore,
    parent_id: GenerationId,
    position: Position,
) -> Result<Option<SiblingMatch>, StorageError> {
    if let Some(slot) = position.slot {
        return Ok(store
            .find_child_by_slot(parent_id, slot)
            .await?
            .map(|sibling| SiblingMatch {
                sibling,
                strategy: MatchStrategy::SlotIdentity,
            }));
    }

    match position.ordinal {
        Some(ordinal) => Ok(store
            .find_latest_child_at_ordinal(parent_id, ordinal)
            .await?
            .map(|sibling| SiblingMatch {
                sibling,
                strategy: MatchStrategy::Ordinal,
            })),
        None => Ok(None),
    }
}
