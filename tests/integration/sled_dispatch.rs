//! Dispatch against the sled-backed store, including reopen.

use gencomplete::model::CompletionSignal;
use gencomplete::telemetry::NullSink;
use gencomplete::types::TaskType;
use gencomplete::{
    CompletionDispatcher, CompletionRegistry, Disposition, GenerationStore, ParamBag,
    SledGenerationStore,
};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

fn signal(project: Uuid, task_type: &str, params: serde_json::Value) -> CompletionSignal {
    let task_id = Uuid::new_v4();
    CompletionSignal {
        task_id,
        task_type: TaskType::from(task_type),
        project_id: project,
        params: ParamBag::from_value(params),
        content_kind: None,
        tool_type: None,
        output_location: format!("s3://outputs/{}.mp4", task_id),
        thumbnail_location: None,
    }
}

#[tokio::test]
async fn travel_run_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let project = Uuid::new_v4();
    let orchestrator = Uuid::new_v4();

    let parent_id = {
        let store = Arc::new(SledGenerationStore::new(temp_dir.path()).unwrap());
        let dispatcher =
            CompletionDispatcher::new(store.clone(), Arc::new(CompletionRegistry::builtin()))
                .with_sink(Arc::new(NullSink));

        for index in 0..2 {
            let outcome = dispatcher
                .complete(&signal(
                    project,
                    "travel_segment",
                    json!({
                        "orchestrator_task_id": orchestrator,
                        "segment_index": index,
                        "orchestrator_details": { "num_new_segments_to_generate": 2 },
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(outcome.disposition, Disposition::ChildGeneration);
        }

        let stitch = dispatcher
            .complete(&signal(
                project,
                "travel_stitch",
                json!({ "orchestrator_task_id": orchestrator }),
            ))
            .await
            .unwrap();
        assert_eq!(stitch.disposition, Disposition::ParentVariant);
        store.flush().unwrap();
        stitch.generation.id
    };

    let store = SledGenerationStore::new(temp_dir.path()).unwrap();
    let parent = store.get_generation(parent_id).await.unwrap().unwrap();
    assert!(parent.tasks.contains(&orchestrator));
    assert!(store.is_task_generation_created(orchestrator).await.unwrap());

    let children = store.list_children(parent_id).await.unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].child_order, Some(0));
    assert_eq!(children[1].child_order, Some(1));

    let found = store
        .find_generation_by_task_id(orchestrator)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, parent_id);
    assert_eq!(store.count_variants(parent_id).await.unwrap(), 1);
}

#[tokio::test]
async fn sled_redelivery_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(SledGenerationStore::new(temp_dir.path()).unwrap());
    let dispatcher =
        CompletionDispatcher::new(store.clone(), Arc::new(CompletionRegistry::builtin()));
    let completion = signal(Uuid::new_v4(), "text_to_image", json!({}));

    let first = dispatcher.complete(&completion).await.unwrap();
    let second = dispatcher.complete(&completion).await.unwrap();
    assert_eq!(second.disposition, Disposition::Regenerated);
    assert_eq!(first.generation.id, second.generation.id);
    assert_eq!(store.list_variants(first.generation.id).await.unwrap().len(), 2);
}
