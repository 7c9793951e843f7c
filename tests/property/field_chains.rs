//! Property-based tests for field precedence along chains

use gencomplete::params::{self, fields};
use gencomplete::ParamBag;
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

proptest! {
    /// The orchestrator id resolves in order: reference field, detail block, top-level field.
    #[test]
    fn orchestrator_id_follows_precedence(
        by_ref in proptest::option::of(uuid_strategy()),
        in_details in proptest::option::of(uuid_strategy()),
        top_level in proptest::option::of(uuid_strategy()),
    ) {
        let mut root = Map::new();
        if let Some(id) = by_ref {
            root.insert("orchestrator_task_id_ref".to_string(), json!(id.to_string()));
        }
        if let Some(id) = in_details {
            root.insert(
                "orchestrator_details".to_string(),
                json!({ "orchestrator_task_id": id.to_string() }),
            );
        }
        if let Some(id) = top_level {
            root.insert("orchestrator_task_id".to_string(), json!(id.to_string()));
        }
        let bag = ParamBag::from_value(Value::Object(root));

        let expected = by_ref.or(in_details).or(top_level);
        prop_assert_eq!(params::extract_orchestrator_task_id(&bag), expected);
    }

    /// Unparseable or null entries are skipped rather than ending the search.
    #[test]
    fn malformed_entries_fall_through(fallback in uuid_strategy(), junk in "[a-z]{0,12}") {
        let bag = ParamBag::from_value(json!({
            "based_on": junk,
            "orchestrator_details": { "based_on": fallback.to_string() },
        }));
        prop_assert_eq!(params::extract_based_on(&bag), Some(fallback));

        let nulled = ParamBag::from_value(json!({
            "shot_id": null,
            "orchestrator_details": { "shot_id": fallback.to_string() },
        }));
        prop_assert_eq!(params::extract_shot_and_position(&nulled).shot_id, Some(fallback));
    }

    /// The configured order field wins over the generic fallbacks.
    #[test]
    fn configured_order_field_wins(configured in -5i64..50, generic in -5i64..50) {
        let bag = ParamBag::from_value(json!({
            "join_index": configured,
            "child_order": generic,
        }));
        prop_assert_eq!(params::child_ordinal(&bag, "join_index"), Some(configured));
        prop_assert_eq!(params::child_ordinal(&bag, "segment_index"), Some(generic));
    }

    /// Clearing a field removes it from every location it can be read from.
    #[test]
    fn cleared_field_is_unreadable(id in uuid_strategy()) {
        let mut bag = ParamBag::from_value(json!({
            "parent_generation_id": id.to_string(),
            "orchestrator_details": { "parent_generation_id": id.to_string(), "keep": 1 },
        }));
        params::clear_field(&mut bag, &fields::PARENT_GENERATION_ID);
        prop_assert_eq!(fields::PARENT_GENERATION_ID.uuid(&bag), None);
        prop_assert_eq!(bag.get_path("orchestrator_details.keep"), Some(&json!(1)));
    }
}
