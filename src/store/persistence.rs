//! Persistence layer for the Generation Store
//!
//! Records are stored as JSON (their parameter bags are free-form). Secondary indexes are
//! bincode-encoded id lists kept under prefixed keys:
//!
//! - `gen:<id>` / `var:<id>`: generation and variant records
//! - `task_gen:<task>`: generations a task contributed to, oldest first
//! - `children:<parent>`: child generation ids, oldest first
//! - `gen_vars:<generation>`: variant ids, oldest first
//! - `src_var:<task>`: variant written on behalf of a task
//! - `shot:<shot>`: shot links
//! - `consumed:<task>`: task consumption flag

use crate::error::StorageError;
use crate::model::{Generation, NewGeneration, NewVariant, ShotLink, Variant};
use crate::store::memory::next_position;
use crate::store::GenerationStore;
use crate::types::{GenerationId, ShotId, TaskId, VariantId};
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

/// Sled-based implementation of GenerationStore
pub struct SledGenerationStore {
    db: sled::Db,
}

fn key(prefix: &str, id: &Uuid) -> String {
    format!("{}:{}", prefix, id)
}

impl SledGenerationStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::backend("Failed to open sled database", e))?;
        Ok(Self { db })
    }

    /// Register a shot so generations can be linked to it.
    pub fn add_shot(&self, shot_id: ShotId) -> Result<(), StorageError> {
        let shot_key = key("shot", &shot_id);
        if self.get_raw(&shot_key)?.is_none() {
            self.put_index::<Vec<ShotLink>>(&shot_key, &Vec::new())?;
        }
        Ok(())
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::backend("Failed to flush database", e))?;
        Ok(())
    }

    fn get_raw(&self, key: &str) -> Result<Option<sled::IVec>, StorageError> {
        self.db
            .get(key.as_bytes())
            .map_err(|e| StorageError::backend(&format!("Failed to read {}", key), e))
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.db
            .insert(key.as_bytes(), value)
            .map_err(|e| StorageError::Rejected(format!("Failed to write {}: {}", key, e)))?;
        Ok(())
    }

    fn get_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get_raw(key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StorageError::Serialization(format!("Failed to decode {}: {}", key, e))
            }),
            None => Ok(None),
        }
    }

    fn put_record<T: Serialize>(&self, key: &str, record: &T) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(record).map_err(|e| {
            StorageError::Serialization(format!("Failed to encode {}: {}", key, e))
        })?;
        self.put_raw(key, bytes)
    }

    fn get_index<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StorageError> {
        match self.get_raw(key)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| {
                StorageError::Serialization(format!("Failed to decode index {}: {}", key, e))
            }),
            None => Ok(T::default()),
        }
    }

    fn put_index<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let bytes = bincode::serialize(value).map_err(|e| {
            StorageError::Serialization(format!("Failed to encode index {}: {}", key, e))
        })?;
        self.put_raw(key, bytes)
    }

    fn push_to_index(&self, key: &str, id: Uuid) -> Result<(), StorageError> {
        let mut ids: Vec<Uuid> = self.get_index(key)?;
        if !ids.contains(&id) {
            ids.push(id);
            self.put_index(key, &ids)?;
        }
        Ok(())
    }

    fn load_generations(&self, ids: &[GenerationId]) -> Result<Vec<Generation>, StorageError> {
        let mut generations = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(generation) = self.get_record(&key("gen", id))? {
                generations.push(generation);
            }
        }
        Ok(generations)
    }
}

#[async_trait]
impl GenerationStore for SledGenerationStore {
    async fn get_generation(&self, id: GenerationId) -> Result<Option<Generation>, StorageError> {
        self.get_record(&key("gen", &id))
    }

    async fn find_generation_by_task_id(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Generation>, StorageError> {
        let ids: Vec<GenerationId> = self.get_index(&key("task_gen", &task_id))?;
        for id in ids.iter().rev() {
            if let Some(generation) = self.get_record(&key("gen", id))? {
                return Ok(Some(generation));
            }
        }
        Ok(None)
    }

    async fn insert_generation(&self, record: NewGeneration) -> Result<Generation, StorageError> {
        let generation = record.into_generation(Uuid::new_v4(), Utc::now());
        generation.validate()?;
        if let Some(parent_id) = generation.parent_generation_id {
            if self.get_raw(&key("gen", &parent_id))?.is_none() {
                return Err(StorageError::GenerationNotFound(parent_id));
            }
        }

        self.put_record(&key("gen", &generation.id), &generation)?;
        for task_id in &generation.tasks {
            self.push_to_index(&key("task_gen", task_id), generation.id)?;
        }
        if let Some(parent_id) = generation.parent_generation_id {
            self.push_to_index(&key("children", &parent_id), generation.id)?;
        }
        Ok(generation)
    }

    async fn append_task(
        &self,
        generation_id: GenerationId,
        task_id: TaskId,
    ) -> Result<(), StorageError> {
        let gen_key = key("gen", &generation_id);
        let mut generation: Generation = self
            .get_record(&gen_key)?
            .ok_or(StorageError::GenerationNotFound(generation_id))?;
        if !generation.tasks.contains(&task_id) {
            generation.tasks.push(task_id);
            self.put_record(&gen_key, &generation)?;
        }
        self.push_to_index(&key("task_gen", &task_id), generation_id)
    }

    async fn list_children(
        &self,
        parent_id: GenerationId,
    ) -> Result<Vec<Generation>, StorageError> {
        let ids: Vec<GenerationId> = self.get_index(&key("children", &parent_id))?;
        self.load_generations(&ids)
    }

    async fn create_variant(&self, variant: NewVariant) -> Result<Variant, StorageError> {
        if self.get_raw(&key("gen", &variant.generation_id))?.is_none() {
            return Err(StorageError::GenerationNotFound(variant.generation_id));
        }
        let source_task = variant.source_task_id();
        let variant = variant.into_variant(Uuid::new_v4(), Utc::now());

        self.put_record(&key("var", &variant.id), &variant)?;
        self.push_to_index(&key("gen_vars", &variant.generation_id), variant.id)?;
        if let Some(task_id) = source_task {
            self.put_index(&key("src_var", &task_id), &variant.id)?;
        }
        Ok(variant)
    }

    async fn list_variants(
        &self,
        generation_id: GenerationId,
    ) -> Result<Vec<Variant>, StorageError> {
        let ids: Vec<VariantId> = self.get_index(&key("gen_vars", &generation_id))?;
        let mut variants = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(variant) = self.get_record(&key("var", id))? {
                variants.push(variant);
            }
        }
        Ok(variants)
    }

    async fn find_variant_by_source_task(
        &self,
        task_id: TaskId,
    ) -> Result<Option<Variant>, StorageError> {
        match self.get_raw(&key("src_var", &task_id))? {
            Some(bytes) => {
                let variant_id: VariantId = bincode::deserialize(&bytes).map_err(|e| {
                    StorageError::Serialization(format!("Failed to decode variant id: {}", e))
                })?;
                self.get_record(&key("var", &variant_id))
            }
            None => Ok(None),
        }
    }

    async fn link_generation_to_shot(
        &self,
        shot_id: ShotId,
        generation_id: GenerationId,
        insert_at_current_position: bool,
    ) -> Result<ShotLink, StorageError> {
        if self.get_raw(&key("gen", &generation_id))?.is_none() {
            return Err(StorageError::GenerationNotFound(generation_id));
        }
        let shot_key = key("shot", &shot_id);
        if self.get_raw(&shot_key)?.is_none() {
            return Err(StorageError::ShotNotFound(shot_id));
        }
        let mut links: Vec<ShotLink> = self.get_index(&shot_key)?;
        let position = if insert_at_current_position {
            Some(next_position(&links))
        } else {
            None
        };
        let link = ShotLink {
            shot_id,
            generation_id,
            position,
        };
        links.push(link.clone());
        self.put_index(&shot_key, &links)?;
        Ok(link)
    }

    async fn list_shot_links(&self, shot_id: ShotId) -> Result<Vec<ShotLink>, StorageError> {
        let shot_key = key("shot", &shot_id);
        if self.get_raw(&shot_key)?.is_none() {
            return Err(StorageError::ShotNotFound(shot_id));
        }
        self.get_index(&shot_key)
    }

    async fn mark_task_generation_created(&self, task_id: TaskId) -> Result<(), StorageError> {
        self.put_raw(&key("consumed", &task_id), vec![1])
    }

    async fn is_task_generation_created(&self, task_id: TaskId) -> Result<bool, StorageError> {
        self.db
            .contains_key(key("consumed", &task_id).as_bytes())
            .map_err(|e| StorageError::backend("Failed to check task flag", e))
    }
}
