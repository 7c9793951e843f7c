//! Generation/Variant Persistence
//!
//! Thin writer over the storage collaborator. Owns no routing policy: callers decide what to write,
//! this module writes it, stamps provenance, and reports each record through the event sink.

use crate::error::StorageError;
use crate::model::{Generation, NewGeneration, NewVariant, Variant};
use crate::params::{self, fields, FieldChain, ParamBag, ShotPlacement};
use crate::store::GenerationStore;
use crate::telemetry::{CompletionEvent, EventSink};
use crate::types::{ContentKind, GenerationId, ProjectId, TaskId, VariantType};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Fields of a variant the caller decides.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSpec {
    pub location: String,
    pub thumbnail_url: Option<String>,
    pub params: ParamBag,
    pub is_primary: bool,
    pub variant_type: VariantType,
    pub name: Option<String>,
    pub viewed_at: Option<DateTime<Utc>>,
}

impl VariantSpec {
    pub fn new(
        location: impl Into<String>,
        thumbnail_url: Option<String>,
        params: ParamBag,
        variant_type: VariantType,
    ) -> Self {
        Self {
            location: location.into(),
            thumbnail_url,
            params,
            is_primary: false,
            variant_type,
            name: None,
            viewed_at: None,
        }
    }

    pub fn primary(mut self, is_primary: bool) -> Self {
        self.is_primary = is_primary;
        self
    }

    pub fn named(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn viewed(mut self, viewed_at: Option<DateTime<Utc>>) -> Self {
        self.viewed_at = viewed_at;
        self
    }
}

/// Resolved parent of an orchestrated step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentResolution {
    pub parent: Generation,
    pub created: bool,
}

/// Writes generations and variants, reporting each write to the event sink.
#[derive(Clone)]
pub struct GenerationWriter {
    store: Arc<dyn GenerationStore>,
    sink: Arc<dyn EventSink>,
}

impl GenerationWriter {
    pub fn new(store: Arc<dyn GenerationStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    pub fn store(&self) -> &dyn GenerationStore {
        self.store.as_ref()
    }

    pub fn shared_store(&self) -> Arc<dyn GenerationStore> {
        Arc::clone(&self.store)
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    /// Insert a generation and its first variant, aborting on the first failed write.
    pub async fn create_generation_with_variant(
        &self,
        task_id: TaskId,
        record: NewGeneration,
        initial: VariantSpec,
    ) -> Result<(Generation, Variant), StorageError> {
        let generation = self.store.insert_generation(record).await?;
        info!(
            %task_id,
            generation_id = %generation.id,
            parent = ?generation.parent_generation_id,
            child_order = ?generation.child_order,
            "Generation created"
        );
        self.sink.emit(CompletionEvent::GenerationCreated {
            task_id,
            generation_id: generation.id,
            parent_generation_id: generation.parent_generation_id,
            child_order: generation.child_order,
        });
        let variant = self.add_variant(task_id, generation.id, initial).await?;
        Ok((generation, variant))
    }

    /// Append a variant to an existing generation. The task id is stamped as provenance.
    pub async fn add_variant(
        &self,
        task_id: TaskId,
        generation_id: GenerationId,
        spec: VariantSpec,
    ) -> Result<Variant, StorageError> {
        let mut variant_params = spec.params;
        variant_params.insert(fields::SOURCE_TASK_ID.name, task_id.to_string());
        let variant = self
            .store
            .create_variant(NewVariant {
                generation_id,
                location: spec.location,
                thumbnail_url: spec.thumbnail_url,
                params: variant_params,
                is_primary: spec.is_primary,
                variant_type: spec.variant_type,
                name: spec.name,
                viewed_at: spec.viewed_at,
            })
            .await?;
        debug!(
            %task_id,
            %generation_id,
            variant_id = %variant.id,
            variant_type = %variant.variant_type,
            is_primary = variant.is_primary,
            "Variant created"
        );
        self.sink.emit(CompletionEvent::VariantCreated {
            task_id,
            generation_id,
            variant_id: variant.id,
            variant_type: variant.variant_type.clone(),
            is_primary: variant.is_primary,
        });
        Ok(variant)
    }

    /// Record that `task_id` contributed to `generation_id`.
    pub async fn record_contribution(
        &self,
        generation_id: GenerationId,
        task_id: TaskId,
    ) -> Result<(), StorageError> {
        self.store.append_task(generation_id, task_id).await
    }

    /// Resolve the orchestrator's aggregate record, creating it on first need.
    ///
    /// An explicit parent reference in `params` wins when it still exists; a stale one is cleared
    /// from `params` and resolution continues through the orchestrator task id. Without either,
    /// there is no parent and `None` is returned.
    pub async fn get_or_create_parent_generation(
        &self,
        task_id: TaskId,
        orchestrator_task_id: Option<TaskId>,
        project_id: ProjectId,
        kind: ContentKind,
        params: &mut ParamBag,
    ) -> Result<Option<ParentResolution>, StorageError> {
        if let Some(reference) = fields::PARENT_GENERATION_ID.uuid(params) {
            match self.store.get_generation(reference).await? {
                Some(parent) => {
                    return Ok(Some(ParentResolution {
                        parent,
                        created: false,
                    }))
                }
                None => {
                    warn!(%task_id, %reference, "Parent generation reference is stale, clearing");
                    self.clear_reference(task_id, params, &fields::PARENT_GENERATION_ID, reference);
                }
            }
        }

        let Some(orchestrator_task_id) = orchestrator_task_id else {
            return Ok(None);
        };

        if let Some(parent) = self
            .store
            .find_generation_by_task_id(orchestrator_task_id)
            .await?
        {
            return Ok(Some(ParentResolution {
                parent,
                created: false,
            }));
        }

        let parent_params = params::orchestrator_details(params);
        let name = fields::GENERATION_NAME.str(params).map(str::to_string);
        let record = NewGeneration::top_level(project_id, kind, parent_params)
            .with_task(orchestrator_task_id)
            .with_name(name);
        let parent = self.store.insert_generation(record).await?;
        info!(
            %task_id,
            %orchestrator_task_id,
            generation_id = %parent.id,
            "Parent generation created"
        );
        self.sink.emit(CompletionEvent::GenerationCreated {
            task_id: orchestrator_task_id,
            generation_id: parent.id,
            parent_generation_id: None,
            child_order: None,
        });
        Ok(Some(ParentResolution {
            parent,
            created: true,
        }))
    }

    /// The task's `based_on` source, cleared from `params` when it names no stored generation.
    pub async fn resolve_based_on(
        &self,
        task_id: TaskId,
        params: &mut ParamBag,
    ) -> Result<Option<GenerationId>, StorageError> {
        let Some(reference) = params::extract_based_on(params) else {
            return Ok(None);
        };
        if self.store.get_generation(reference).await?.is_some() {
            return Ok(Some(reference));
        }
        warn!(%task_id, %reference, "Based-on generation not found, clearing");
        self.clear_reference(task_id, params, &fields::BASED_ON, reference);
        Ok(None)
    }

    /// The task's shot placement, with a shot reference that names no registered shot cleared
    /// from `params` and dropped from the placement.
    pub async fn resolve_shot(
        &self,
        task_id: TaskId,
        params: &mut ParamBag,
    ) -> Result<ShotPlacement, StorageError> {
        let mut placement = params::extract_shot_and_position(params);
        if let Some(shot_id) = placement.shot_id {
            if !self.store.shot_exists(shot_id).await? {
                warn!(%task_id, %shot_id, "Shot not found, clearing");
                self.clear_reference(task_id, params, &fields::SHOT_ID, shot_id);
                placement.shot_id = None;
            }
        }
        Ok(placement)
    }

    fn clear_reference(
        &self,
        task_id: TaskId,
        params: &mut ParamBag,
        field: &FieldChain<'_>,
        reference: Uuid,
    ) {
        params::clear_field(params, field);
        self.sink.emit(CompletionEvent::StaleReferenceCleared {
            task_id,
            field: field.name.to_string(),
            reference,
        });
    }

    /// Best-effort shot placement. Failures are reported, never returned.
    pub async fn link_to_shot(
        &self,
        task_id: TaskId,
        generation_id: GenerationId,
        placement: ShotPlacement,
    ) {
        let Some(shot_id) = placement.shot_id else {
            return;
        };
        match self
            .store
            .link_generation_to_shot(shot_id, generation_id, placement.insert_at_current_position)
            .await
        {
            Ok(link) => {
                debug!(%task_id, %shot_id, %generation_id, position = ?link.position, "Linked to shot")
            }
            Err(err) => {
                warn!(%task_id, %shot_id, %generation_id, error = %err, "Shot link failed");
                self.sink.emit(CompletionEvent::ShotLinkFailed {
                    task_id,
                    shot_id,
                    generation_id,
                    error: err.to_string(),
                });
            }
        }
    }

    /// Set the task's "generation already created" flag.
    pub async fn mark_consumed(&self, task_id: TaskId) -> Result<(), StorageError> {
        self.store.mark_task_generation_created(task_id).await?;
        self.sink.emit(CompletionEvent::TaskConsumed { task_id });
        Ok(())
    }
}
