//! Completion Config Registry
//!
//! Declarative table mapping each task type to the completion behavior that materializes its
//! output. Adding a task type is a data change: a new entry here or under `[task_types]` in the
//! engine config. The registry is built once at startup and shared read-only.

use crate::error::CompletionError;
use crate::types::{TaskType, VariantType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default parameter holding a step's ordinal.
pub const DEFAULT_CHILD_ORDER_FIELD: &str = "segment_index";

/// How a finished task is reflected in the generation/variant model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompletionBehavior {
    VariantOnParent,
    VariantOnChild,
    ChildGeneration,
    StandaloneGeneration,
}

impl CompletionBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionBehavior::VariantOnParent => "variant_on_parent",
            CompletionBehavior::VariantOnChild => "variant_on_child",
            CompletionBehavior::ChildGeneration => "child_generation",
            CompletionBehavior::StandaloneGeneration => "standalone_generation",
        }
    }
}

/// What happens when an orchestrated run collapses to a single unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollapsePolicy {
    /// Stamp a variant on the parent and stop.
    VariantOnly,
    /// Stamp a variant on the parent, then create the child as usual.
    VariantAndChild,
}

/// Rule deciding whether a run has exactly one unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SingleItemRule {
    /// Only evaluated at ordinal 0: `count_field` (orchestrator details first) equals `expected`.
    Count {
        count_field: String,
        #[serde(default = "default_expected_count")]
        expected: i64,
        policy: CollapsePolicy,
    },
    /// Both flags are true on the task's parameters.
    Flags {
        first_flag: String,
        last_flag: String,
        policy: CollapsePolicy,
    },
}

impl SingleItemRule {
    pub fn policy(&self) -> CollapsePolicy {
        match self {
            SingleItemRule::Count { policy, .. } | SingleItemRule::Flags { policy, .. } => *policy,
        }
    }
}

fn default_expected_count() -> i64 {
    1
}

fn default_variant_type() -> VariantType {
    VariantType::Original
}

fn default_child_order_field() -> String {
    DEFAULT_CHILD_ORDER_FIELD.to_string()
}

/// Completion behavior plus the parameters it needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionConfig {
    pub behavior: CompletionBehavior,

    /// Tag stamped on variants appended by this behavior
    #[serde(default = "default_variant_type")]
    pub variant_type: VariantType,

    /// Tool classification used when the task carries none
    #[serde(default)]
    pub tool_type: Option<String>,

    #[serde(default = "default_child_order_field")]
    pub child_order_field: String,

    /// Enables the positional sibling matcher
    #[serde(default)]
    pub check_existing_at_position: bool,

    #[serde(default)]
    pub single_item: Option<SingleItemRule>,
}

impl CompletionConfig {
    /// Default for unregistered task types.
    pub fn standalone() -> Self {
        Self {
            behavior: CompletionBehavior::StandaloneGeneration,
            variant_type: default_variant_type(),
            tool_type: None,
            child_order_field: default_child_order_field(),
            check_existing_at_position: false,
            single_item: None,
        }
    }

    fn orchestrated(behavior: CompletionBehavior, variant_type: VariantType, tool: &str) -> Self {
        Self {
            behavior,
            variant_type,
            tool_type: Some(tool.to_string()),
            ..Self::standalone()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.child_order_field.trim().is_empty() {
            return Err("child_order_field cannot be empty".to_string());
        }
        let positional = matches!(
            self.behavior,
            CompletionBehavior::ChildGeneration | CompletionBehavior::VariantOnChild
        );
        if self.check_existing_at_position && !positional {
            return Err(format!(
                "check_existing_at_position requires child_generation or variant_on_child, got {}",
                self.behavior.as_str()
            ));
        }
        if self.single_item.is_some() && !positional {
            return Err(format!(
                "single_item detection requires child_generation or variant_on_child, got {}",
                self.behavior.as_str()
            ));
        }
        match &self.single_item {
            Some(SingleItemRule::Count { count_field, .. }) if count_field.trim().is_empty() => {
                Err("count rule needs a count_field".to_string())
            }
            Some(SingleItemRule::Flags {
                first_flag,
                last_flag,
                ..
            }) if first_flag.trim().is_empty() || last_flag.trim().is_empty() => {
                Err("flag rule needs both first_flag and last_flag".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Task type → completion config.
#[derive(Debug, Clone)]
pub struct CompletionRegistry {
    entries: HashMap<TaskType, CompletionConfig>,
    fallback: CompletionConfig,
}

impl Default for CompletionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CompletionRegistry {
    /// The built-in table.
    pub fn builtin() -> Self {
        let travel_count_rule = SingleItemRule::Count {
            count_field: "num_new_segments_to_generate".to_string(),
            expected: 1,
            policy: CollapsePolicy::VariantAndChild,
        };

        let mut entries = HashMap::new();
        entries.insert(
            TaskType::TravelSegment,
            CompletionConfig {
                check_existing_at_position: true,
                single_item: Some(travel_count_rule.clone()),
                ..CompletionConfig::orchestrated(
                    CompletionBehavior::ChildGeneration,
                    VariantType::TravelSegment,
                    "travel-between-images",
                )
            },
        );
        entries.insert(
            TaskType::IndividualTravelSegment,
            CompletionConfig {
                check_existing_at_position: true,
                single_item: Some(travel_count_rule),
                ..CompletionConfig::orchestrated(
                    CompletionBehavior::VariantOnChild,
                    VariantType::IndividualSegment,
                    "travel-between-images",
                )
            },
        );
        entries.insert(
            TaskType::TravelStitch,
            CompletionConfig::orchestrated(
                CompletionBehavior::VariantOnParent,
                VariantType::TravelStitch,
                "travel-between-images",
            ),
        );
        entries.insert(
            TaskType::JoinClipsSegment,
            CompletionConfig {
                child_order_field: "join_index".to_string(),
                single_item: Some(SingleItemRule::Flags {
                    first_flag: "is_first_join".to_string(),
                    last_flag: "is_last_join".to_string(),
                    policy: CollapsePolicy::VariantOnly,
                }),
                ..CompletionConfig::orchestrated(
                    CompletionBehavior::ChildGeneration,
                    VariantType::JoinClipsSegment,
                    "join-clips",
                )
            },
        );
        entries.insert(
            TaskType::JoinFinalStitch,
            CompletionConfig::orchestrated(
                CompletionBehavior::VariantOnParent,
                VariantType::JoinFinalStitch,
                "join-clips",
            ),
        );

        Self {
            entries,
            fallback: CompletionConfig::standalone(),
        }
    }

    /// Built-in table with configured entries layered on top.
    pub fn with_overrides(
        overrides: &HashMap<String, CompletionConfig>,
    ) -> Result<Self, CompletionError> {
        let mut registry = Self::builtin();
        for (task_type, config) in overrides {
            config.validate().map_err(|e| {
                CompletionError::ConfigError(format!("task type '{}': {}", task_type, e))
            })?;
            registry
                .entries
                .insert(TaskType::from(task_type.as_str()), config.clone());
        }
        Ok(registry)
    }

    /// Config for a task type; unregistered types resolve to standalone generation.
    pub fn resolve(&self, task_type: &TaskType) -> &CompletionConfig {
        self.entries.get(task_type).unwrap_or(&self.fallback)
    }

    pub fn is_registered(&self, task_type: &TaskType) -> bool {
        self.entries.contains_key(task_type)
    }

    /// Entries sorted by task type name.
    pub fn entries(&self) -> Vec<(&TaskType, &CompletionConfig)> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        entries
    }
}
