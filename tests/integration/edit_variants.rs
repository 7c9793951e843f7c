//! Edits and upscales become variants of their source generation.

use super::test_utils::Harness;
use gencomplete::telemetry::CompletionEvent;
use gencomplete::types::{ContentKind, VariantType};
use gencomplete::{Disposition, GenerationStore};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn edit_tags_follow_task_type() {
    let h = Harness::new();
    let source = h.seed_generation(ContentKind::Image).await;

    let cases = [
        ("image_edit", VariantType::Edit),
        ("image_inpaint", VariantType::Inpaint),
        ("annotated_image_edit", VariantType::AnnotatedEdit),
        ("qwen_image_style", VariantType::MagicEdit),
    ];
    for (task_type, expected) in cases {
        let signal = h.signal(task_type, json!({ "based_on": source.id }));
        let outcome = h.dispatcher.edit_variant(&signal).await.unwrap().unwrap();
        assert_eq!(outcome.disposition, Disposition::EditVariant);
        assert_eq!(outcome.generation.id, source.id);
        assert_eq!(outcome.variant.variant_type, expected, "{}", task_type);
        assert!(!outcome.variant.is_primary);
    }

    let variants = h.variants(&source).await;
    assert_eq!(variants.len(), 5);
    assert!(variants[0].is_primary);
    assert_eq!(h.store.generation_count(), 1);
}

#[tokio::test]
async fn edit_without_source_writes_nothing() {
    let h = Harness::new();
    let signal = h.signal("image_inpaint", json!({ "prompt": "remove the boat" }));

    let outcome = h.dispatcher.edit_variant(&signal).await.unwrap();
    assert!(outcome.is_none());
    assert_eq!(h.store.generation_count(), 0);
    assert!(h
        .store
        .find_variant_by_source_task(signal.task_id)
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        h.sink.events().last(),
        Some(CompletionEvent::EditSourceMissing { .. })
    ));
}

#[tokio::test]
async fn edit_with_stale_source_is_reported() {
    let h = Harness::new();
    let signal = h.signal("image_edit", json!({ "based_on": Uuid::new_v4() }));
    assert!(h.dispatcher.edit_variant(&signal).await.unwrap().is_none());
    assert!(h.sink.event_types().contains(&"edit_source_missing"));
}

#[tokio::test]
async fn redelivered_edit_is_not_duplicated() {
    let h = Harness::new();
    let source = h.seed_generation(ContentKind::Image).await;
    let signal = h.signal("magic_edit", json!({ "based_on": source.id }));

    let first = h.dispatcher.complete(&signal).await.unwrap();
    let second = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(first.variant.id, second.variant.id);
    assert_eq!(h.variants(&source).await.len(), 2);
    assert!(h.store.is_task_generation_created(signal.task_id).await.unwrap());
}

#[tokio::test]
async fn upscale_becomes_primary_with_provenance() {
    let h = Harness::new();
    let target = h.seed_generation(ContentKind::Image).await;
    let signal = h.signal(
        "image_upscale",
        json!({ "generation_id": target.id, "upscale_factor": 4 }),
    );

    let outcome = h.dispatcher.upscale_variant(&signal).await.unwrap().unwrap();
    assert_eq!(outcome.disposition, Disposition::Upscaled);
    assert_eq!(outcome.generation.id, target.id);
    assert_eq!(outcome.variant.variant_type, VariantType::Upscaled);
    assert!(outcome.variant.is_primary);

    let params = &outcome.variant.params;
    assert_eq!(params.get("upscale_factor"), Some(&json!(4)));
    assert_eq!(
        params.get("upscaled_from_generation_id"),
        Some(&json!(target.id.to_string()))
    );
    assert_eq!(params.get("prompt"), Some(&json!("harbor at dusk")));
    assert_eq!(
        params.get("source_task_id"),
        Some(&json!(signal.task_id.to_string()))
    );
}

#[tokio::test]
async fn upscale_without_target_returns_none() {
    let h = Harness::new();
    let signal = h.signal("video_upscale", json!({}));
    assert!(h.dispatcher.upscale_variant(&signal).await.unwrap().is_none());
    assert!(h.sink.events().is_empty());
}

#[tokio::test]
async fn failed_edit_still_completes_as_standalone() {
    let h = Harness::new();
    let signal = h.signal("image_edit", json!({}));
    let outcome = h.dispatcher.complete(&signal).await.unwrap();
    assert_eq!(outcome.disposition, Disposition::NewGeneration);
    assert_eq!(outcome.variant.variant_type, VariantType::Original);
}
