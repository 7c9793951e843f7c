//! Re-runs of an orchestrated step land on the existing child at the same position.

use super::test_utils::Harness;
use gencomplete::matcher::MatchStrategy;
use gencomplete::telemetry::CompletionEvent;
use gencomplete::types::VariantType;
use gencomplete::Disposition;
use serde_json::json;
use uuid::Uuid;

fn segment(orchestrator: Uuid, index: i64, slot: Option<Uuid>) -> serde_json::Value {
    let mut params = json!({
        "orchestrator_task_id": orchestrator,
        "segment_index": index,
        "orchestrator_details": { "num_new_segments_to_generate": 4 },
    });
    if let Some(slot) = slot {
        params["pair_shot_generation_id"] = json!(slot);
    }
    params
}

#[tokio::test]
async fn rerun_at_same_ordinal_becomes_sibling_variant() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;

    let first = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 2, None)))
        .await
        .unwrap();
    let rerun_signal = h.signal("travel_segment", segment(orchestrator, 2, None));
    let rerun = h.dispatcher.complete(&rerun_signal).await.unwrap();

    assert_eq!(rerun.disposition, Disposition::SiblingVariant);
    assert_eq!(rerun.generation.id, first.generation.id);
    assert_eq!(rerun.variant.variant_type, VariantType::TravelSegment);
    assert!(!rerun.variant.is_primary);
    assert_eq!(h.children(&parent).await.len(), 1);
    assert_eq!(h.variants(&first.generation).await.len(), 2);
    assert!(h
        .reload(&first.generation)
        .await
        .tasks
        .contains(&rerun_signal.task_id));
}

#[tokio::test]
async fn slot_identity_wins_over_ordinal() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    h.seed_parent(orchestrator).await;
    let slot_a = Uuid::new_v4();
    let slot_b = Uuid::new_v4();

    let a = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 0, Some(slot_a))))
        .await
        .unwrap();
    let b = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 1, Some(slot_b))))
        .await
        .unwrap();

    // Slot A's step now reports ordinal 1; it still belongs to slot A.
    let rerun = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 1, Some(slot_a))))
        .await
        .unwrap();
    assert_eq!(rerun.disposition, Disposition::SiblingVariant);
    assert_eq!(rerun.generation.id, a.generation.id);
    assert_ne!(rerun.generation.id, b.generation.id);

    let strategies: Vec<MatchStrategy> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|event| match event {
            CompletionEvent::SiblingMatched { strategy, .. } => Some(strategy),
            _ => None,
        })
        .collect();
    assert_eq!(strategies, vec![MatchStrategy::SlotIdentity]);
}

#[tokio::test]
async fn rearranged_slot_never_lands_on_previous_occupant() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    let parent = h.seed_parent(orchestrator).await;
    let old_slot = Uuid::new_v4();
    let new_slot = Uuid::new_v4();

    let old = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 1, Some(old_slot))))
        .await
        .unwrap();

    // Timeline rearranged: ordinal 1 now belongs to a different slot.
    let fresh = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 1, Some(new_slot))))
        .await
        .unwrap();
    assert_eq!(fresh.disposition, Disposition::ChildGeneration);
    assert_ne!(fresh.generation.id, old.generation.id);
    assert_eq!(fresh.generation.pair_shot_generation_id, Some(new_slot));
    assert_eq!(h.variants(&old.generation).await.len(), 1);
    assert_eq!(h.children(&parent).await.len(), 2);
}

#[tokio::test]
async fn ordinal_match_picks_most_recent_child() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    h.seed_parent(orchestrator).await;

    h.dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 3, Some(Uuid::new_v4()))))
        .await
        .unwrap();
    let newer = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 3, Some(Uuid::new_v4()))))
        .await
        .unwrap();

    let rerun = h
        .dispatcher
        .complete(&h.signal("travel_segment", segment(orchestrator, 3, None)))
        .await
        .unwrap();
    assert_eq!(rerun.disposition, Disposition::SiblingVariant);
    assert_eq!(rerun.generation.id, newer.generation.id);
}

#[tokio::test]
async fn segment_params_are_sliced_from_expanded_arrays() {
    let h = Harness::new();
    let orchestrator = Uuid::new_v4();
    h.seed_parent(orchestrator).await;
    let signal = h.signal(
        "travel_segment",
        json!({
            "orchestrator_task_id": orchestrator,
            "segment_index": 1,
            "orchestrator_details": {
                "num_new_segments_to_generate": 3,
                "base_prompts_expanded": ["dawn", "noon", "dusk"],
            },
        }),
    );

    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.generation.child_order, Some(1));
    assert_eq!(outcome.generation.params.get("base_prompts"), Some(&json!("noon")));
    assert!(outcome.generation.params.get("orchestrator_details").is_none());
    assert_eq!(
        outcome.generation.params.get("tool_type"),
        Some(&json!("travel-between-images"))
    );
}
