//! Single-item runs: the orchestrator's record receives the step's output directly.

use super::test_utils::Harness;
use gencomplete::collapse::SINGLE_ITEM_KEY;
use gencomplete::model::NewGeneration;
use gencomplete::types::{ContentKind, VariantType};
use gencomplete::{Disposition, GenerationStore, ParamBag};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn single_segment_travel_stamps_parent_and_creates_child() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;
    let signal = h.signal(
        "travel_segment",
        json!({
            "orchestrator_task_id": orchestrator,
            "segment_index": 0,
            "orchestrator_details": { "num_new_segments_to_generate": 1 },
        }),
    );

    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::ChildGeneration);
    assert_eq!(outcome.generation.parent_generation_id, Some(parent.id));
    assert!(outcome.generation.params.get(SINGLE_ITEM_KEY).is_some());
    assert!(outcome.variant.viewed_at.is_some());

    let parent_variants = h.variants(&parent).await;
    assert_eq!(parent_variants.len(), 1);
    assert_eq!(parent_variants[0].variant_type, VariantType::TravelSegment);
    assert!(parent_variants[0].is_primary);
    assert_eq!(parent_variants[0].params.get(SINGLE_ITEM_KEY), Some(&json!(true)));
    assert_eq!(parent_variants[0].location, signal.output_location);

    assert_eq!(h.children(&parent).await.len(), 1);
    assert!(h.sink.event_types().contains(&"single_item_collapse"));
}

#[tokio::test]
async fn later_segments_never_collapse() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;
    let signal = h.signal(
        "travel_segment",
        json!({
            "orchestrator_task_id": orchestrator,
            "segment_index": 1,
            "num_new_segments_to_generate": 1,
        }),
    );

    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::ChildGeneration);
    assert!(h.variants(&parent).await.is_empty());
    assert!(outcome.variant.viewed_at.is_none());
}

#[tokio::test]
async fn collapse_is_not_primary_when_parent_already_has_output() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;
    let details = json!({
        "orchestrator_task_id": orchestrator,
        "segment_index": 0,
        "orchestrator_details": { "num_new_segments_to_generate": 1 },
    });

    h.dispatcher
        .complete(&h.signal("travel_segment", details.clone()))
        .await
        .unwrap();
    h.dispatcher
        .complete(&h.signal("travel_segment", details))
        .await
        .unwrap();

    let parent_variants = h.variants(&parent).await;
    assert_eq!(parent_variants.len(), 2);
    assert!(parent_variants[0].is_primary);
    assert!(!parent_variants[1].is_primary);
}

#[tokio::test]
async fn single_join_writes_only_to_parent() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let signal = h.signal(
        "join_clips_segment",
        json!({
            "orchestrator_task_id": orchestrator,
            "join_index": 0,
            "is_first_join": true,
            "is_last_join": true,
            "orchestrator_details": { "generation_name": "Beach cut" },
        }),
    );

    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::CollapsedToParent);
    assert_eq!(outcome.consumed_orchestrator, Some(orchestrator));
    assert!(outcome.generation.tasks.contains(&orchestrator));
    assert!(outcome.generation.tasks.contains(&signal.task_id));
    assert_eq!(outcome.variant.variant_type, VariantType::JoinClipsSegment);
    assert!(outcome.variant.is_primary);
    assert_eq!(outcome.variant.name.as_deref(), Some("Beach cut"));

    assert!(h.children(&outcome.generation).await.is_empty());
    assert!(h.store.is_task_generation_created(orchestrator).await.unwrap());
    assert!(h.store.is_task_generation_created(signal.task_id).await.unwrap());
}

#[tokio::test]
async fn regenerating_only_segment_updates_parent_too() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;
    let child = h
        .store
        .insert_generation(NewGeneration::child(
            h.project,
            ContentKind::Video,
            ParamBag::new(),
            parent.id,
            Some(0),
        ))
        .await
        .unwrap();

    let signal = h.signal(
        "individual_travel_segment",
        json!({
            "child_generation_id": child.id,
            "make_primary_variant": false,
            "orchestrator_details": { "num_new_segments_to_generate": 1 },
        }),
    );
    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::ChildVariant);
    assert_eq!(outcome.generation.id, child.id);

    let child_variants = h.variants(&child).await;
    let parent_variants = h.variants(&parent).await;
    assert_eq!(child_variants.len(), 1);
    assert_eq!(parent_variants.len(), 1);
    assert_eq!(parent_variants[0].location, child_variants[0].location);
    assert_eq!(parent_variants[0].variant_type, VariantType::IndividualSegment);
    assert!(!parent_variants[0].is_primary);
    assert!(!child_variants[0].is_primary);
}
