//! Persisted record shapes and the completion signal payload.

use crate::error::{CompletionError, StorageError};
use crate::params::ParamBag;
use crate::types::{
    ContentKind, GenerationId, ProjectId, ShotId, TaskId, TaskType, VariantId, VariantType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A top-level or child output record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub id: GenerationId,
    pub project_id: ProjectId,
    pub kind: ContentKind,
    pub params: ParamBag,
    pub based_on: Option<GenerationId>,
    pub parent_generation_id: Option<GenerationId>,
    pub is_child: bool,
    pub child_order: Option<i64>,
    pub pair_shot_generation_id: Option<GenerationId>,
    pub tasks: Vec<TaskId>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a generation before the store assigns identity and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGeneration {
    pub project_id: ProjectId,
    pub kind: ContentKind,
    pub params: ParamBag,
    pub based_on: Option<GenerationId>,
    pub parent_generation_id: Option<GenerationId>,
    pub child_order: Option<i64>,
    pub pair_shot_generation_id: Option<GenerationId>,
    pub tasks: Vec<TaskId>,
    pub name: Option<String>,
}

impl NewGeneration {
    pub fn top_level(project_id: ProjectId, kind: ContentKind, params: ParamBag) -> Self {
        Self {
            project_id,
            kind,
            params,
            based_on: None,
            parent_generation_id: None,
            child_order: None,
            pair_shot_generation_id: None,
            tasks: Vec::new(),
            name: None,
        }
    }

    pub fn child(
        project_id: ProjectId,
        kind: ContentKind,
        params: ParamBag,
        parent_generation_id: GenerationId,
        child_order: Option<i64>,
    ) -> Self {
        Self {
            parent_generation_id: Some(parent_generation_id),
            child_order,
            ..Self::top_level(project_id, kind, params)
        }
    }

    pub fn with_task(mut self, task_id: TaskId) -> Self {
        if !self.tasks.contains(&task_id) {
            self.tasks.push(task_id);
        }
        self
    }

    pub fn with_based_on(mut self, based_on: Option<GenerationId>) -> Self {
        self.based_on = based_on;
        self
    }

    pub fn with_slot(mut self, slot: Option<GenerationId>) -> Self {
        self.pair_shot_generation_id = slot;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Materialize the record. Child-marking is derived from the parent reference.
    pub fn into_generation(self, id: GenerationId, created_at: DateTime<Utc>) -> Generation {
        Generation {
            id,
            project_id: self.project_id,
            kind: self.kind,
            params: self.params,
            based_on: self.based_on,
            is_child: self.parent_generation_id.is_some(),
            parent_generation_id: self.parent_generation_id,
            child_order: self.child_order,
            pair_shot_generation_id: self.pair_shot_generation_id,
            tasks: self.tasks,
            name: self.name,
            created_at,
        }
    }
}

impl Generation {
    /// Check record invariants before a write.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.is_child != self.parent_generation_id.is_some() {
            return Err(StorageError::InvalidRecord(format!(
                "generation {} is_child={} but parent reference is {:?}",
                self.id, self.is_child, self.parent_generation_id
            )));
        }
        if self.parent_generation_id == Some(self.id) {
            return Err(StorageError::InvalidRecord(format!(
                "generation {} cannot be its own parent",
                self.id
            )));
        }
        Ok(())
    }
}

/// One concrete rendering attached to a generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub generation_id: GenerationId,
    pub location: String,
    pub thumbnail_url: Option<String>,
    pub params: ParamBag,
    pub is_primary: bool,
    pub variant_type: VariantType,
    pub name: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields of a variant before the store assigns identity and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewVariant {
    pub generation_id: GenerationId,
    pub location: String,
    pub thumbnail_url: Option<String>,
    pub params: ParamBag,
    pub is_primary: bool,
    pub variant_type: VariantType,
    pub name: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
}

impl NewVariant {
    pub fn into_variant(self, id: VariantId, created_at: DateTime<Utc>) -> Variant {
        Variant {
            id,
            generation_id: self.generation_id,
            location: self.location,
            thumbnail_url: self.thumbnail_url,
            params: self.params,
            is_primary: self.is_primary,
            variant_type: self.variant_type,
            name: self.name,
            viewed_at: self.viewed_at,
            created_at,
        }
    }

    /// Provenance task recorded in the variant's params, if any.
    pub fn source_task_id(&self) -> Option<TaskId> {
        crate::params::fields::SOURCE_TASK_ID.uuid(&self.params)
    }
}

/// Placement of a generation inside a shot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotLink {
    pub shot_id: ShotId,
    pub generation_id: GenerationId,
    pub position: Option<i64>,
}

/// Payload delivered when a task finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSignal {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub project_id: ProjectId,
    #[serde(default)]
    pub params: ParamBag,
    #[serde(default)]
    pub content_kind: Option<ContentKind>,
    #[serde(default)]
    pub tool_type: Option<String>,
    pub output_location: String,
    #[serde(default)]
    pub thumbnail_location: Option<String>,
}

impl CompletionSignal {
    pub fn validate(&self) -> Result<(), CompletionError> {
        if self.output_location.trim().is_empty() {
            return Err(CompletionError::InvalidSignal(format!(
                "task {} reported no output location",
                self.task_id
            )));
        }
        Ok(())
    }
}
