//! Event schema for completion telemetry.

use crate::matcher::MatchStrategy;
use crate::registry::{CollapsePolicy, CompletionBehavior};
use crate::types::{GenerationId, ShotId, TaskId, VariantId, VariantType};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Decision points reached while processing one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionEvent {
    ConfigResolved {
        task_id: TaskId,
        task_type: String,
        behavior: CompletionBehavior,
        registered: bool,
    },
    BehaviorChosen {
        task_id: TaskId,
        handler: String,
    },
    FallbackTriggered {
        task_id: TaskId,
        from: String,
        to: String,
        reason: String,
    },
    StaleReferenceCleared {
        task_id: TaskId,
        field: String,
        reference: GenerationId,
    },
    SingleItemCollapse {
        task_id: TaskId,
        parent_generation_id: GenerationId,
        policy: CollapsePolicy,
    },
    SiblingMatched {
        task_id: TaskId,
        generation_id: GenerationId,
        strategy: MatchStrategy,
    },
    GenerationCreated {
        task_id: TaskId,
        generation_id: GenerationId,
        #[serde(skip_serializing_if = "Option::is_none")]
        parent_generation_id: Option<GenerationId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        child_order: Option<i64>,
    },
    VariantCreated {
        task_id: TaskId,
        generation_id: GenerationId,
        variant_id: VariantId,
        variant_type: VariantType,
        is_primary: bool,
    },
    ShotLinkFailed {
        task_id: TaskId,
        shot_id: ShotId,
        generation_id: GenerationId,
        error: String,
    },
    EditSourceMissing {
        task_id: TaskId,
        task_type: String,
        reason: String,
    },
    TaskConsumed {
        task_id: TaskId,
    },
}

impl CompletionEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CompletionEvent::ConfigResolved { .. } => "config_resolved",
            CompletionEvent::BehaviorChosen { .. } => "behavior_chosen",
            CompletionEvent::FallbackTriggered { .. } => "fallback_triggered",
            CompletionEvent::StaleReferenceCleared { .. } => "stale_reference_cleared",
            CompletionEvent::SingleItemCollapse { .. } => "single_item_collapse",
            CompletionEvent::SiblingMatched { .. } => "sibling_matched",
            CompletionEvent::GenerationCreated { .. } => "generation_created",
            CompletionEvent::VariantCreated { .. } => "variant_created",
            CompletionEvent::ShotLinkFailed { .. } => "shot_link_failed",
            CompletionEvent::EditSourceMissing { .. } => "edit_source_missing",
            CompletionEvent::TaskConsumed { .. } => "task_consumed",
        }
    }

    pub fn task_id(&self) -> TaskId {
        match self {
            CompletionEvent::ConfigResolved { task_id, .. }
            | CompletionEvent::BehaviorChosen { task_id, .. }
            | CompletionEvent::FallbackTriggered { task_id, .. }
            | CompletionEvent::StaleReferenceCleared { task_id, .. }
            | CompletionEvent::SingleItemCollapse { task_id, .. }
            | CompletionEvent::SiblingMatched { task_id, .. }
            | CompletionEvent::GenerationCreated { task_id, .. }
            | CompletionEvent::VariantCreated { task_id, .. }
            | CompletionEvent::ShotLinkFailed { task_id, .. }
            | CompletionEvent::EditSourceMissing { task_id, .. }
            | CompletionEvent::TaskConsumed { task_id } => *task_id,
        }
    }
}

/// Timestamped event as carried on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub ts: String,
    pub event: CompletionEvent,
}

impl EventEnvelope {
    pub fn with_now(event: CompletionEvent) -> Self {
        Self {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            event,
        }
    }
}
