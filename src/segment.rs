//! Per-step parameter slicing and generation parameter assembly.

use crate::params::{fields, ParamBag};
use crate::types::{ContentKind, ShotId, TaskId};
use serde_json::Value;

/// Suffix marking per-step arrays in the orchestrator's detail block.
const EXPANDED_SUFFIX: &str = "_expanded";
/// Per-segment overrides supplied alongside a single step.
const INDIVIDUAL_SEGMENT_KEY: &str = "individual_segment_params";

/// Parameters for one orchestrated step.
///
/// Every `<name>_expanded` array in the orchestrator detail block contributes its element at
/// `ordinal` as `<name>`, unless the task already set `<name>` itself. Per-segment overrides are
/// applied last. The shared detail block is not copied into the result.
pub fn extract_segment_specific_params(
    params: &ParamBag,
    orchestrator_detail: &ParamBag,
    ordinal: i64,
) -> ParamBag {
    let mut result = params.clone();
    result.remove(fields::ORCHESTRATOR_DETAILS_KEY);

    if let Ok(index) = usize::try_from(ordinal) {
        for (key, value) in orchestrator_detail.iter() {
            let Some(base) = key.strip_suffix(EXPANDED_SUFFIX) else {
                continue;
            };
            if base.is_empty() || result.contains_key(base) {
                continue;
            }
            if let Some(element) = value.as_array().and_then(|items| items.get(index)) {
                result.insert(base, element.clone());
            }
        }
    }

    if let Some(overrides) = params.object(INDIVIDUAL_SEGMENT_KEY) {
        result.merge(&overrides);
    }
    result
}

/// Parameter bag recorded on a generation or variant produced by a task.
pub fn build_generation_params(
    params: &ParamBag,
    tool_type: Option<&str>,
    kind: ContentKind,
    shot_id: Option<ShotId>,
    thumbnail_location: Option<&str>,
    task_id: TaskId,
) -> ParamBag {
    let mut result = params.clone();
    if let Some(tool_type) = tool_type {
        result.insert("tool_type", tool_type);
    }
    result.insert("content_type", kind.as_str());
    if let Some(shot_id) = shot_id {
        result.insert("shot_id", shot_id.to_string());
    }
    match thumbnail_location {
        Some(thumbnail) => result.insert("thumbnail_url", thumbnail),
        None => {
            result.remove("thumbnail_url");
        }
    }
    result.insert("source_task_id", Value::String(task_id.to_string()));
    result
}
