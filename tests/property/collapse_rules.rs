//! Property-based tests for single-item detection

use gencomplete::collapse::{detect, SINGLE_ITEM_KEY};
use gencomplete::registry::{CollapsePolicy, CompletionRegistry};
use gencomplete::types::TaskType;
use gencomplete::ParamBag;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    /// The count rule fires only at ordinal 0 and only when the declared count is exactly one.
    #[test]
    fn count_rule_requires_first_ordinal_and_single_count(
        count in 0i64..6,
        ordinal in proptest::option::of(0i64..6),
        nested in any::<bool>(),
    ) {
        let config = CompletionRegistry::builtin()
            .resolve(&TaskType::TravelSegment)
            .clone();
        let params = if nested {
            ParamBag::from_value(json!({
                "orchestrator_details": { "num_new_segments_to_generate": count }
            }))
        } else {
            ParamBag::from_value(json!({ "num_new_segments_to_generate": count }))
        };

        let decision = detect(&params, &config, ordinal);
        let expected = ordinal == Some(0) && count == 1;
        prop_assert_eq!(decision.is_single_item, expected);
        prop_assert_eq!(decision.extra_params.get(SINGLE_ITEM_KEY).is_some(), expected);
        if expected {
            prop_assert_eq!(decision.single_item_policy(), Some(CollapsePolicy::VariantAndChild));
        } else {
            prop_assert_eq!(decision.single_item_policy(), None);
        }
    }

    /// The flag rule needs both flags true, regardless of ordinal.
    #[test]
    fn flag_rule_requires_both_flags(
        first in any::<bool>(),
        last in any::<bool>(),
        as_strings in any::<bool>(),
        ordinal in proptest::option::of(0i64..10),
    ) {
        let config = CompletionRegistry::builtin()
            .resolve(&TaskType::JoinClipsSegment)
            .clone();
        let params = if as_strings {
            ParamBag::from_value(json!({
                "is_first_join": first.to_string(),
                "is_last_join": last.to_string(),
            }))
        } else {
            ParamBag::from_value(json!({ "is_first_join": first, "is_last_join": last }))
        };

        let decision = detect(&params, &config, ordinal);
        prop_assert_eq!(decision.is_single_item, first && last);
        if first && last {
            prop_assert_eq!(decision.policy, Some(CollapsePolicy::VariantOnly));
        }
    }

    /// Task types without a rule never collapse.
    #[test]
    fn unruled_types_never_collapse(count in 0i64..3, ordinal in proptest::option::of(0i64..3)) {
        let config = CompletionRegistry::builtin()
            .resolve(&TaskType::TravelStitch)
            .clone();
        let params = ParamBag::from_value(json!({
            "num_new_segments_to_generate": count,
            "is_first_join": true,
            "is_last_join": true,
        }));
        prop_assert!(!detect(&params, &config, ordinal).is_single_item);
    }
}
