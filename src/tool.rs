//! Tool classification
//!
//! Every generation records which tool produced it. A task may name its tool explicitly
//! (`tool_type` in its params); that override is accepted only when the tool is on the allow-list.
//! Otherwise the tool comes from the task type's completion config, then from the built-in
//! default for the task type.

use crate::params::{fields, ParamBag};
use crate::types::{ContentKind, TaskType};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Generation,
    Orchestrated,
    Edit,
    Upscale,
}

impl ToolCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolCategory::Generation => "generation",
            ToolCategory::Orchestrated => "orchestrated",
            ToolCategory::Edit => "edit",
            ToolCategory::Upscale => "upscale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ToolSpec {
    category: ToolCategory,
    content_kind: ContentKind,
}

/// Effective tool for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResolution {
    pub tool_type: String,
    pub category: ToolCategory,
    pub content_kind: ContentKind,
}

pub const TRAVEL_TOOL: &str = "travel-between-images";
pub const JOIN_TOOL: &str = "join-clips";
pub const IMAGE_GENERATION_TOOL: &str = "image-generation";
pub const EDIT_TOOL: &str = "edit-images";
pub const MAGIC_EDIT_TOOL: &str = "magic-edit";
pub const IMAGE_UPSCALE_TOOL: &str = "image-upscale";
pub const VIDEO_UPSCALE_TOOL: &str = "video-upscale";

/// Known tools and which tool overrides callers may request.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolSpec>,
    allowed_overrides: HashSet<String>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolRegistry {
    /// Built-in tools; every known tool may be requested as an override.
    pub fn builtin() -> Self {
        let tools: HashMap<String, ToolSpec> = [
            (TRAVEL_TOOL, ToolCategory::Orchestrated, ContentKind::Video),
            (JOIN_TOOL, ToolCategory::Orchestrated, ContentKind::Video),
            (IMAGE_GENERATION_TOOL, ToolCategory::Generation, ContentKind::Image),
            (EDIT_TOOL, ToolCategory::Edit, ContentKind::Image),
            (MAGIC_EDIT_TOOL, ToolCategory::Edit, ContentKind::Image),
            (IMAGE_UPSCALE_TOOL, ToolCategory::Upscale, ContentKind::Image),
            (VIDEO_UPSCALE_TOOL, ToolCategory::Upscale, ContentKind::Video),
        ]
        .into_iter()
        .map(|(name, category, content_kind)| {
            (
                name.to_string(),
                ToolSpec {
                    category,
                    content_kind,
                },
            )
        })
        .collect();
        let allowed_overrides = tools.keys().cloned().collect();
        Self {
            tools,
            allowed_overrides,
        }
    }

    /// Restrict overrides to `allowed`. An empty list keeps the built-in allow-list.
    pub fn with_allowed_overrides<I, S>(mut self, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = allowed.into_iter().map(Into::into).collect();
        if !allowed.is_empty() {
            self.allowed_overrides = allowed;
        }
        self
    }

    pub fn is_override_allowed(&self, tool_type: &str) -> bool {
        self.allowed_overrides.contains(tool_type)
    }

    /// Built-in tool for a task type, if it has one.
    pub fn default_for(task_type: &TaskType) -> Option<&'static str> {
        match task_type {
            TaskType::TravelSegment
            | TaskType::IndividualTravelSegment
            | TaskType::TravelStitch => Some(TRAVEL_TOOL),
            TaskType::JoinClipsSegment | TaskType::JoinFinalStitch => Some(JOIN_TOOL),
            TaskType::ImageEdit
            | TaskType::ImageInpaint
            | TaskType::AnnotatedImageEdit => Some(EDIT_TOOL),
            TaskType::MagicEdit | TaskType::QwenImageEdit | TaskType::QwenImageStyle => {
                Some(MAGIC_EDIT_TOOL)
            }
            TaskType::ImageUpscale => Some(IMAGE_UPSCALE_TOOL),
            TaskType::VideoUpscale => Some(VIDEO_UPSCALE_TOOL),
            TaskType::Other(_) => None,
        }
    }

    /// Resolve the effective tool: allowed override, then `configured`, then the built-in default.
    pub fn resolve_tool_type(
        &self,
        task_type: &TaskType,
        params: &ParamBag,
        configured: Option<&str>,
    ) -> Option<ToolResolution> {
        let requested = fields::TOOL_TYPE.str(params);
        let accepted = match requested {
            Some(tool) if self.is_override_allowed(tool) => Some(tool),
            Some(tool) => {
                debug!(task_type = %task_type, tool, "Tool override not on allow-list, ignoring");
                None
            }
            None => None,
        };

        let tool_type = accepted
            .or(configured)
            .or_else(|| Self::default_for(task_type))?;
        Some(self.describe(task_type, tool_type))
    }

    fn describe(&self, task_type: &TaskType, tool_type: &str) -> ToolResolution {
        let spec = self.tools.get(tool_type).copied().unwrap_or_else(|| {
            let fallback = Self::default_for(task_type).and_then(|name| self.tools.get(name));
            ToolSpec {
                category: fallback
                    .map(|spec| spec.category)
                    .unwrap_or(ToolCategory::Generation),
                content_kind: fallback
                    .map(|spec| spec.content_kind)
                    .unwrap_or_default(),
            }
        });
        ToolResolution {
            tool_type: tool_type.to_string(),
            category: spec.category,
            content_kind: spec.content_kind,
        }
    }
}
