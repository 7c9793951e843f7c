//! In-memory generation store.

use crate::error::StorageError;
use crate::model::{Generation, NewGeneration, NewVariant, ShotLink, Variant};
use crate::store::GenerationStore;
use crate::types::{GenerationId, ShotId, TaskId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    generations: HashMap<GenerationId, Generation>,
    /// Creation order
    generation_order: Vec<GenerationId>,
    variants: Vec<Variant>,
    shots: HashMap<ShotId, Vec<ShotLink>>,
    consumed: HashSet<TaskId>,
}

/// Generation store held entirely in memory.
#[derive(Default)]
pub struct MemoryGenerationStore {
    inner: RwLock<Inner>,
    reject_writes: AtomicBool,
}

impl MemoryGenerationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shot so generations can be linked to it.
    pub fn add_shot(&self, shot_id: ShotId) {
        self.inner.write().shots.entry(shot_id).or_default();
    }

    /// Make every subsequent write fail with `StorageError::Rejected`.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub fn generation_count(&self) -> usize {
        self.inner.read().generations.len()
    }

    pub fn all_generations(&self) -> Vec<Generation> {
        let inner = self.inner.read();
        inner
            .generation_order
            .iter()
            .filter_map(|id| inner.generations.get(id).cloned())
            .collect()
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected(
                "store is rejecting writes".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationStore for MemoryGenerationStore {
    async fn get_generation(&self, id: GenerationId) -> Result<Option<Generation>, StorageError> {
        Ok(self.inner.read().generations.get(&id).cloned())
    }

    async fn find_generation_by_task_id(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Generation>, StorageError> {
        let inner = self.inner.read();
        Ok(inner
            .generation_order
            .iter()
            .rev()
            .filter_map(|id| inner.generations.get(id))
            .find(|generation| generation.tasks.contains(&task_id))
            .cloned())
    }

    async fn insert_generation(&self, record: NewGeneration) -> Result<Generation, StorageError> {
        self.check_writable()?;
        let generation = record.into_generation(Uuid::new_v4(), Utc::now());
        generation.validate()?;

        let mut inner = self.inner.write();
        if let Some(parent_id) = generation.parent_generation_id {
            if !inner.generations.contains_key(&parent_id) {
                return Err(StorageError::GenerationNotFound(parent_id));
            }
        }
        inner.generation_order.push(generation.id);
        inner.generations.insert(generation.id, generation.clone());
        Ok(generation)
    }

    async fn append_task(
        &self,
        generation_id: GenerationId,
        task_id: TaskId,
    ) -> Result<(), StorageError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        let generation = inner
            .generations
            .get_mut(&generation_id)
            .ok_or(StorageError::GenerationNotFound(generation_id))?;
        if !generation.tasks.contains(&task_id) {
            generation.tasks.push(task_id);
        }
        Ok(())
    }

    async fn list_children(
        &self,
        parent_id: GenerationId,
    ) -> Result<Vec<Generation>, StorageError> {
        let inner = self.inner.read();
        Ok(inner
            .generation_order
            .iter()
            .filter_map(|id| inner.generations.get(id))
            .filter(|generation| generation.parent_generation_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn create_variant(&self, variant: NewVariant) -> Result<Variant, StorageError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if !inner.generations.contains_key(&variant.generation_id) {
            return Err(StorageError::GenerationNotFound(variant.generation_id));
        }
        let variant = variant.into_variant(Uuid::new_v4(), Utc::now());
        inner.variants.push(variant.clone());
        Ok(variant)
    }

    async fn list_variants(
        &self,
        generation_id: GenerationId,
    ) -> Result<Vec<Variant>, StorageError> {
        Ok(self
            .inner
            .read()
            .variants
            .iter()
            .filter(|variant| variant.generation_id == generation_id)
            .cloned()
            .collect())
    }

    async fn find_variant_by_source_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Variant>, StorageError> {
        let source = task_id.to_string();
        Ok(self
            .inner
            .read()
            .variants
            .iter()
            .rev()
            .find(|variant| {
                variant
                    .params
                    .get("source_task_id")
                    .and_then(|value| value.as_str())
                    == Some(source.as_str())
            })
            .cloned())
    }

    async fn link_generation_to_shot(
        &self,
        shot_id: ShotId,
        generation_id: GenerationId,
        insert_at_current_position: bool,
    ) -> Result<ShotLink, StorageError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if !inner.generations.contains_key(&generation_id) {
            return Err(StorageError::GenerationNotFound(generation_id));
        }
        let links = inner
            .shots
            .get_mut(&shot_id)
            .ok_or(StorageError::ShotNotFound(shot_id))?;
        let position = if insert_at_current_position {
            Some(next_position(links))
        } else {
            None
        };
        let link = ShotLink {
            shot_id,
            generation_id,
            position,
        };
        links.push(link.clone());
        Ok(link)
    }

    async fn list_shot_links(&self, shot_id: ShotId) -> Result<Vec<ShotLink>, StorageError> {
        self.inner
            .read()
            .shots
            .get(&shot_id)
            .cloned()
            .ok_or(StorageError::ShotNotFound(shot_id))
    }

    async fn mark_task_generation_created(&self, task_id: TaskId) -> Result<(), StorageError> {
        self.check_writable()?;
        self.inner.write().consumed.insert(task_id);
        Ok(())
    }

    async fn is_task_generation_created(&self, task_id: TaskId) -> Result<bool, StorageError> {
        Ok(self.inner.read().consumed.contains(&task_id))
    }
}

/// Next free position after the highest positioned link.
pub(crate) fn next_position(links: &[ShotLink]) -> i64 {
    links
        .iter()
        .filter_map(|link| link.position)
        .max()
        .map(|max| max + 1)
        .unwrap_or(0)
}
