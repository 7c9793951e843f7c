//! Single-Item Collapse Detector
//!
//! An orchestrated run declared with N steps may turn out to have exactly one. When that happens
//! the orchestrator's own record should carry the result directly. Detection is driven by the
//! rule in the task type's [`CompletionConfig`]; the policy applied is carried by the same rule.

use crate::params::{fields, FieldChain, ParamBag};
use crate::registry::{CollapsePolicy, CompletionConfig, SingleItemRule};
use serde_json::Value;

/// Params key marking a record or variant produced by a collapsed run.
pub const SINGLE_ITEM_KEY: &str = "single_item_collapse";
/// Params key naming which rule triggered the collapse.
pub const COLLAPSE_RULE_KEY: &str = "collapse_rule";

/// Outcome of single-item detection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollapseDecision {
    pub is_single_item: bool,
    pub policy: Option<CollapsePolicy>,
    /// Metadata to merge into the params of records written under this decision
    pub extra_params: ParamBag,
}

impl CollapseDecision {
    pub fn not_single() -> Self {
        Self {
            is_single_item: false,
            policy: None,
            extra_params: ParamBag::new(),
        }
    }

    fn single(policy: CollapsePolicy, rule: &str) -> Self {
        let mut extra_params = ParamBag::new();
        extra_params.insert(SINGLE_ITEM_KEY, true);
        extra_params.insert(COLLAPSE_RULE_KEY, rule);
        Self {
            is_single_item: true,
            policy: Some(policy),
            extra_params,
        }
    }

    /// Policy to apply, present only when the run collapsed.
    pub fn single_item_policy(&self) -> Option<CollapsePolicy> {
        if self.is_single_item {
            self.policy
        } else {
            None
        }
    }
}

/// Decide whether this step is the only unit of its run.
pub fn detect(params: &ParamBag, config: &CompletionConfig, ordinal: Option<i64>) -> CollapseDecision {
    match &config.single_item {
        None => CollapseDecision::not_single(),
        Some(SingleItemRule::Count {
            count_field,
            expected,
            policy,
        }) => {
            if ordinal != Some(0) {
                return CollapseDecision::not_single();
            }
            match expected_count(params, count_field) {
                Some(count) if count == *expected => CollapseDecision::single(*policy, "count"),
                _ => CollapseDecision::not_single(),
            }
        }
        Some(SingleItemRule::Flags {
            first_flag,
            last_flag,
            policy,
        }) => {
            let first = flag(params, first_flag);
            let last = flag(params, last_flag);
            if first && last {
                CollapseDecision::single(*policy, "flags")
            } else {
                CollapseDecision::not_single()
            }
        }
    }
}

/// The run's declared unit count: the orchestrator's detail block first, then the task itself.
fn expected_count(params: &ParamBag, count_field: &str) -> Option<i64> {
    let nested = format!("{}.{}", fields::ORCHESTRATOR_DETAILS_KEY, count_field);
    let paths = [nested.as_str(), count_field];
    FieldChain::new(count_field, &paths).i64(params)
}

fn flag(params: &ParamBag, name: &str) -> bool {
    params
        .get(name)
        .map(|value| matches!(value, Value::Bool(true)) || value.as_str() == Some("true"))
        .unwrap_or(false)
}
