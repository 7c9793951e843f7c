//! Shared fixtures: an in-memory store, a recording sink and signal builders.

use gencomplete::model::{CompletionSignal, Generation, NewGeneration, Variant};
use gencomplete::telemetry::RecordingSink;
use gencomplete::types::{ContentKind, ProjectId, TaskType};
use gencomplete::{
    CompletionDispatcher, CompletionRegistry, GenerationStore, MemoryGenerationStore, ParamBag,
};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub store: Arc<MemoryGenerationStore>,
    pub sink: Arc<RecordingSink>,
    pub dispatcher: CompletionDispatcher,
    pub project: ProjectId,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(MemoryGenerationStore::new());
        let sink = Arc::new(RecordingSink::new());
        let dispatcher =
            CompletionDispatcher::new(store.clone(), Arc::new(CompletionRegistry::builtin()))
                .with_sink(sink.clone());
        Self {
            store,
            sink,
            dispatcher,
            project: Uuid::new_v4(),
        }
    }

    pub fn signal(&self, task_type: &str, params: Value) -> CompletionSignal {
        self.signal_for(Uuid::new_v4(), task_type, params)
    }

    pub fn signal_for(&self, task_id: Uuid, task_type: &str, params: Value) -> CompletionSignal {
        CompletionSignal {
            task_id,
            task_type: TaskType::from(task_type),
            project_id: self.project,
            params: ParamBag::from_value(params),
            content_kind: None,
            tool_type: None,
            output_location: format!("s3://outputs/{}.mp4", task_id),
            thumbnail_location: Some(format!("s3://thumbs/{}.jpg", task_id)),
        }
    }

    /// Top-level generation with one original primary variant, as a prior completion leaves it.
    pub async fn seed_generation(&self, kind: ContentKind) -> Generation {
        let signal = CompletionSignal {
            content_kind: Some(kind),
            ..self.signal("text_to_image", json!({ "prompt": "harbor at dusk" }))
        };
        self.dispatcher.complete(&signal).await.unwrap().generation
    }

    /// Parent record an orchestrator created before any of its steps finished.
    pub async fn seed_parent(&self, orchestrator_task: Uuid) -> Generation {
        self.store
            .insert_generation(
                NewGeneration::top_level(self.project, ContentKind::Video, ParamBag::new())
                    .with_task(orchestrator_task),
            )
            .await
            .unwrap()
    }

    pub async fn variants(&self, generation: &Generation) -> Vec<Variant> {
        self.store.list_variants(generation.id).await.unwrap()
    }

    pub async fn children(&self, parent: &Generation) -> Vec<Generation> {
        self.store.list_children(parent.id).await.unwrap()
    }

    pub async fn reload(&self, generation: &Generation) -> Generation {
        self.store
            .get_generation(generation.id)
            .await
            .unwrap()
            .unwrap()
    }
}
