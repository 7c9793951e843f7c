//! Parameter bags
//!
//! Task and generation parameters arrive as free-form JSON objects. `ParamBag` keeps that shape at
//! the boundary, while every logical field the engine reads is declared once as a [`FieldChain`]:
//! an ordered list of dotted paths tried first to last. The first path holding a usable value wins.

use crate::types::{GenerationId, ShotId, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Semi-structured key/value document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(Map<String, Value>);

impl ParamBag {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Build from any JSON value; non-objects produce an empty bag.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Resolve a dotted path such as `orchestrator_details.shot_id`.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.0.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Nested object at `key` as its own bag.
    pub fn object(&self, key: &str) -> Option<ParamBag> {
        self.0
            .get(key)
            .and_then(Value::as_object)
            .map(|map| ParamBag(map.clone()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Remove the value at a dotted path. Intermediate objects are left in place.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };
        let Some(parents) = parents else {
            return self.0.remove(leaf);
        };
        let mut segments = parents.split('.');
        let first = segments.next()?;
        let mut current = self.0.get_mut(first)?;
        for segment in segments {
            current = current.as_object_mut()?.get_mut(segment)?;
        }
        current.as_object_mut()?.remove(leaf)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Shallow overlay: keys in `other` replace keys in `self`.
    pub fn merge(&mut self, other: &ParamBag) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ParamBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// One logical field readable from several locations, in precedence order.
#[derive(Debug, Clone, Copy)]
pub struct FieldChain<'a> {
    pub name: &'a str,
    pub paths: &'a [&'a str],
}

impl<'a> FieldChain<'a> {
    pub const fn new(name: &'a str, paths: &'a [&'a str]) -> Self {
        Self { name, paths }
    }

    /// First non-null value along the chain.
    pub fn value<'b>(&self, bag: &'b ParamBag) -> Option<&'b Value> {
        self.paths
            .iter()
            .filter_map(|path| bag.get_path(path))
            .find(|value| !value.is_null())
    }

    /// First non-empty string along the chain.
    pub fn str<'b>(&self, bag: &'b ParamBag) -> Option<&'b str> {
        self.paths
            .iter()
            .filter_map(|path| bag.get_path(path))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
    }

    /// First value that parses as a UUID.
    pub fn uuid(&self, bag: &ParamBag) -> Option<Uuid> {
        self.paths
            .iter()
            .filter_map(|path| bag.get_path(path))
            .filter_map(Value::as_str)
            .find_map(|s| Uuid::parse_str(s.trim()).ok())
    }

    /// First integer, accepting numeric strings.
    pub fn i64(&self, bag: &ParamBag) -> Option<i64> {
        self.paths
            .iter()
            .filter_map(|path| bag.get_path(path))
            .find_map(value_as_i64)
    }

    /// First boolean, accepting `"true"`/`"false"` strings.
    pub fn bool(&self, bag: &ParamBag) -> Option<bool> {
        self.paths
            .iter()
            .filter_map(|path| bag.get_path(path))
            .find_map(value_as_bool)
    }
}

pub(crate) fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Field chains read by the engine.
pub mod fields {
    use super::FieldChain;

    /// Key of the orchestrator's shared detail block.
    pub const ORCHESTRATOR_DETAILS_KEY: &str = "orchestrator_details";

    pub const ORCHESTRATOR_TASK_ID: FieldChain<'static> = FieldChain::new(
        "orchestrator_task_id",
        &[
            "orchestrator_task_id_ref",
            "orchestrator_details.orchestrator_task_id",
            "orchestrator_task_id",
        ],
    );

    pub const PARENT_GENERATION_ID: FieldChain<'static> = FieldChain::new(
        "parent_generation_id",
        &[
            "parent_generation_id",
            "orchestrator_details.parent_generation_id",
        ],
    );

    pub const BASED_ON: FieldChain<'static> =
        FieldChain::new("based_on", &["based_on", "orchestrator_details.based_on"]);

    pub const SHOT_ID: FieldChain<'static> =
        FieldChain::new("shot_id", &["shot_id", "orchestrator_details.shot_id"]);

    pub const ADD_IN_POSITION: FieldChain<'static> = FieldChain::new(
        "add_in_position",
        &["add_in_position", "orchestrator_details.add_in_position"],
    );

    pub const PAIR_SHOT_GENERATION_ID: FieldChain<'static> = FieldChain::new(
        "pair_shot_generation_id",
        &[
            "pair_shot_generation_id",
            "individual_segment_params.pair_shot_generation_id",
        ],
    );

    pub const CHILD_GENERATION_ID: FieldChain<'static> = FieldChain::new(
        "child_generation_id",
        &[
            "child_generation_id",
            "individual_segment_params.child_generation_id",
        ],
    );

    pub const MAKE_PRIMARY_VARIANT: FieldChain<'static> =
        FieldChain::new("make_primary_variant", &["make_primary_variant"]);

    pub const GENERATION_NAME: FieldChain<'static> = FieldChain::new(
        "generation_name",
        &["generation_name", "orchestrator_details.generation_name"],
    );

    pub const UPSCALE_TARGET: FieldChain<'static> =
        FieldChain::new("generation_id", &["generation_id", "source_generation_id"]);

    /// Provenance key stamped on every variant the engine writes.
    pub const SOURCE_TASK_ID: FieldChain<'static> =
        FieldChain::new("source_task_id", &["source_task_id"]);

    pub const TOOL_TYPE: FieldChain<'static> =
        FieldChain::new("tool_type", &["tool_type", "orchestrator_details.tool_type"]);

    /// Generic ordinal names tried after the configured child-order field.
    pub const FALLBACK_ORDINAL_FIELDS: [&str; 2] = ["child_order", "sequence_index"];
}

/// Requested shot placement for a new generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotPlacement {
    pub shot_id: Option<ShotId>,
    pub insert_at_current_position: bool,
}

pub fn extract_orchestrator_task_id(params: &ParamBag) -> Option<TaskId> {
    fields::ORCHESTRATOR_TASK_ID.uuid(params)
}

pub fn extract_based_on(params: &ParamBag) -> Option<GenerationId> {
    fields::BASED_ON.uuid(params)
}

pub fn extract_shot_and_position(params: &ParamBag) -> ShotPlacement {
    ShotPlacement {
        shot_id: fields::SHOT_ID.uuid(params),
        insert_at_current_position: fields::ADD_IN_POSITION.bool(params).unwrap_or(false),
    }
}

/// The orchestrator's shared detail block, or an empty bag.
pub fn orchestrator_details(params: &ParamBag) -> ParamBag {
    params
        .object(fields::ORCHESTRATOR_DETAILS_KEY)
        .unwrap_or_default()
}

/// This step's ordinal: the configured field (top-level, then inside the per-segment block),
/// then the generic fallback names.
pub fn child_ordinal(params: &ParamBag, order_field: &str) -> Option<i64> {
    let nested = format!("individual_segment_params.{}", order_field);
    let mut paths: Vec<&str> = vec![order_field, nested.as_str()];
    paths.extend(fields::FALLBACK_ORDINAL_FIELDS);
    FieldChain::new("child_order", &paths).i64(params)
}

pub fn slot_reference(params: &ParamBag) -> Option<GenerationId> {
    fields::PAIR_SHOT_GENERATION_ID.uuid(params)
}

pub fn child_reference(params: &ParamBag) -> Option<GenerationId> {
    fields::CHILD_GENERATION_ID.uuid(params)
}

pub fn upscale_target(params: &ParamBag) -> Option<GenerationId> {
    fields::UPSCALE_TARGET.uuid(params)
}

/// Drop every location of a field so a stale reference is not carried forward.
pub fn clear_field(params: &mut ParamBag, field: &FieldChain<'_>) {
    for path in field.paths {
        params.remove_path(path);
    }
}
