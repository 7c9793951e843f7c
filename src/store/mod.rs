//! Generation Store
//!
//! Storage collaborator for generations, variants, shot links and task consumption flags.
//! The engine owns no locking: every method is a point operation, and read-then-write sequences
//! built on top of them carry only the isolation the backend provides.

pub mod memory;
pub mod persistence;

pub use memory::MemoryGenerationStore;
pub use persistence::SledGenerationStore;

use crate::error::StorageError;
use crate::model::{Generation, NewGeneration, NewVariant, ShotLink, Variant};
use crate::types::{GenerationId, ShotId, TaskId};
use async_trait::async_trait;

/// Storage collaborator interface
#[async_trait]
pub trait GenerationStore: Send + Sync {
    async fn get_generation(&self, id: GenerationId) -> Result<Option<Generation>, StorageError>;

    /// Most recently created generation whose task list contains `task_id`.
    async fn find_generation_by_task_id(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Generation>, StorageError>;

    /// Persist a new generation. Rejected writes surface as `StorageError`.
    async fn insert_generation(&self, record: NewGeneration) -> Result<Generation, StorageError>;

    /// Record that `task_id` contributed to an existing generation.
    async fn append_task(
        &self,
        generation_id: GenerationId,
        task_id: TaskId,
    ) -> Result<(), StorageError>;

    /// Children of `parent_id` in creation order.
    async fn list_children(&self, parent_id: GenerationId)
        -> Result<Vec<Generation>, StorageError>;

    async fn create_variant(&self, variant: NewVariant) -> Result<Variant, StorageError>;

    /// Variants of a generation in creation order.
    async fn list_variants(&self, generation_id: GenerationId)
        -> Result<Vec<Variant>, StorageError>;

    /// Variant whose provenance names `task_id`, if one was written.
    async fn find_variant_by_source_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Variant>, StorageError>;

    /// Place a generation in a shot; `insert_at_current_position` assigns the next slot.
    async fn link_generation_to_shot(
        &self,
        shot_id: ShotId,
        generation_id: GenerationId,
        insert_at_current_position: bool,
    ) -> Result<ShotLink, StorageError>;

    async fn list_shot_links(&self, shot_id: ShotId) -> Result<Vec<ShotLink>, StorageError>;

    async fn shot_exists(&self, shot_id: ShotId) -> Result<bool, StorageError> {
        match self.list_shot_links(shot_id).await {
            Ok(_) => Ok(true),
            Err(StorageError::ShotNotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn mark_task_generation_created(&self, task_id: TaskId) -> Result<(), StorageError>;

    async fn is_task_generation_created(&self, task_id: TaskId) -> Result<bool, StorageError>;

    async fn count_variants(&self, generation_id: GenerationId) -> Result<usize, StorageError> {
        Ok(self.list_variants(generation_id).await?.len())
    }

    /// Child of `parent_id` carrying slot reference `slot`.
    async fn find_child_by_slot(
        &self,
        parent_id: GenerationId,
        slot: GenerationId,
    ) -> Result<Option<Generation>, StorageError> {
        Ok(self
            .list_children(parent_id)
            .await?
            .into_iter()
            .rev()
            .find(|child| child.pair_shot_generation_id == Some(slot)))
    }

    /// Most recently created child of `parent_id` at `ordinal`.
    async fn find_latest_child_at_ordinal(
        &self,
        parent_id: GenerationId,
        ordinal: i64,
    ) -> Result<Option<Generation>, StorageError> {
        Ok(self
            .list_children(parent_id)
            .await?
            .into_iter()
            .rev()
            .find(|child| child.child_order == Some(ordinal)))
    }
}
