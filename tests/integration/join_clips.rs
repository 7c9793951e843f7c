//! Join-clips runs from first segment to final stitch.

use super::test_utils::Harness;
use gencomplete::types::VariantType;
use gencomplete::{Disposition, GenerationStore};
use serde_json::json;
use uuid::Uuid;

fn join_step(orchestrator: Uuid, index: i64, total: i64) -> serde_json::Value {
    json!({
        "orchestrator_task_id": orchestrator,
        "join_index": index,
        "is_first_join": index == 0,
        "is_last_join": index == total - 1,
        "orchestrator_details": {
            "orchestrator_task_id": orchestrator,
            "generation_name": "Coastline reel",
            "tool_type": "join-clips",
        },
    })
}

#[tokio::test]
async fn two_clip_join_collapses_onto_orchestrator() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();

    let outcome = h
        .dispatcher
        .complete(&h.signal("join_clips_segment", join_step(orchestrator, 0, 1)))
        .await
        .unwrap();

    assert_eq!(outcome.disposition, Disposition::CollapsedToParent);
    assert!(h.store.is_task_generation_created(orchestrator).await.unwrap());
    assert!(h.children(&outcome.generation).await.is_empty());
    assert_eq!(outcome.generation.name.as_deref(), Some("Coastline reel"));
    assert_eq!(
        outcome.generation.params.get("tool_type"),
        Some(&json!("join-clips"))
    );
    assert_eq!(h.store.generation_count(), 1);
}

#[tokio::test]
async fn multi_clip_join_builds_children_then_stitches_parent() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();

    let mut child_ids = Vec::new();
    for index in 0..3 {
        let outcome = h
            .dispatcher
            .complete(&h.signal("join_clips_segment", join_step(orchestrator, index, 3)))
            .await
            .unwrap();
        assert_eq!(outcome.disposition, Disposition::ChildGeneration);
        assert_eq!(outcome.generation.child_order, Some(index));
        child_ids.push(outcome.generation.id);
    }
    assert!(!h.store.is_task_generation_created(orchestrator).await.unwrap());

    let stitch = h.signal(
        "join_final_stitch",
        json!({ "orchestrator_task_id_ref": orchestrator }),
    );
    let outcome = h.dispatcher.complete(&stitch).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::ParentVariant);
    assert_eq!(outcome.consumed_orchestrator, Some(orchestrator));
    assert_eq!(outcome.variant.variant_type, VariantType::JoinFinalStitch);
    assert!(outcome.variant.is_primary);

    let parent = outcome.generation;
    let children: Vec<Uuid> = h.children(&parent).await.into_iter().map(|c| c.id).collect();
    assert_eq!(children, child_ids);
    assert_eq!(h.variants(&parent).await.len(), 1);
    assert!(h.store.is_task_generation_created(orchestrator).await.unwrap());
    assert!(h.reload(&parent).await.tasks.contains(&stitch.task_id));
}

#[tokio::test]
async fn travel_stitch_lands_on_existing_parent() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;

    let stitch = h.signal(
        "travel_stitch",
        json!({ "orchestrator_details": { "orchestrator_task_id": orchestrator } }),
    );
    let outcome = h.dispatcher.complete(&stitch).await.unwrap();
    assert_eq!(outcome.generation.id, parent.id);
    assert_eq!(outcome.variant.variant_type, VariantType::TravelStitch);
    assert_eq!(h.store.generation_count(), 1);
}
