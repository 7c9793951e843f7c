//! Core identifiers and tags shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type GenerationId = Uuid;
pub type VariantId = Uuid;
pub type TaskId = Uuid;
pub type ShotId = Uuid;
pub type ProjectId = Uuid;

/// Kind of media a generation holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    #[default]
    Image,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Image => "image",
            ContentKind::Video => "video",
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            other => Err(format!("Unknown content kind: {}", other)),
        }
    }
}

/// Task type tag. Unrecognised strings are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    TravelSegment,
    IndividualTravelSegment,
    TravelStitch,
    JoinClipsSegment,
    JoinFinalStitch,
    ImageEdit,
    ImageInpaint,
    AnnotatedImageEdit,
    MagicEdit,
    QwenImageEdit,
    QwenImageStyle,
    ImageUpscale,
    VideoUpscale,
    Other(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::TravelSegment => "travel_segment",
            TaskType::IndividualTravelSegment => "individual_travel_segment",
            TaskType::TravelStitch => "travel_stitch",
            TaskType::JoinClipsSegment => "join_clips_segment",
            TaskType::JoinFinalStitch => "join_final_stitch",
            TaskType::ImageEdit => "image_edit",
            TaskType::ImageInpaint => "image_inpaint",
            TaskType::AnnotatedImageEdit => "annotated_image_edit",
            TaskType::MagicEdit => "magic_edit",
            TaskType::QwenImageEdit => "qwen_image_edit",
            TaskType::QwenImageStyle => "qwen_image_style",
            TaskType::ImageUpscale => "image_upscale",
            TaskType::VideoUpscale => "video_upscale",
            TaskType::Other(name) => name.as_str(),
        }
    }

    /// Variant tag for edit-family tasks, `None` for everything else.
    pub fn edit_variant_type(&self) -> Option<VariantType> {
        match self {
            TaskType::ImageEdit => Some(VariantType::Edit),
            TaskType::ImageInpaint => Some(VariantType::Inpaint),
            TaskType::AnnotatedImageEdit => Some(VariantType::AnnotatedEdit),
            TaskType::MagicEdit | TaskType::QwenImageEdit | TaskType::QwenImageStyle => {
                Some(VariantType::MagicEdit)
            }
            _ => None,
        }
    }

    pub fn is_upscale(&self) -> bool {
        matches!(self, TaskType::ImageUpscale | TaskType::VideoUpscale)
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "travel_segment" => TaskType::TravelSegment,
            "individual_travel_segment" => TaskType::IndividualTravelSegment,
            "travel_stitch" => TaskType::TravelStitch,
            "join_clips_segment" => TaskType::JoinClipsSegment,
            "join_final_stitch" => TaskType::JoinFinalStitch,
            "image_edit" => TaskType::ImageEdit,
            "image_inpaint" => TaskType::ImageInpaint,
            "annotated_image_edit" => TaskType::AnnotatedImageEdit,
            "magic_edit" => TaskType::MagicEdit,
            "qwen_image_edit" => TaskType::QwenImageEdit,
            "qwen_image_style" => TaskType::QwenImageStyle,
            "image_upscale" => TaskType::ImageUpscale,
            "video_upscale" => TaskType::VideoUpscale,
            _ => TaskType::Other(value),
        }
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        TaskType::from(value.to_string())
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification tag stamped on a variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VariantType {
    Original,
    Regenerated,
    Edit,
    Inpaint,
    AnnotatedEdit,
    MagicEdit,
    TravelSegment,
    IndividualSegment,
    TravelStitch,
    JoinClipsSegment,
    JoinFinalStitch,
    Upscaled,
    Custom(String),
}

impl VariantType {
    pub fn as_str(&self) -> &str {
        match self {
            VariantType::Original => "original",
            VariantType::Regenerated => "regenerated",
            VariantType::Edit => "edit",
            VariantType::Inpaint => "inpaint",
            VariantType::AnnotatedEdit => "annotated_edit",
            VariantType::MagicEdit => "magic_edit",
            VariantType::TravelSegment => "travel_segment",
            VariantType::IndividualSegment => "individual_segment",
            VariantType::TravelStitch => "travel_stitch",
            VariantType::JoinClipsSegment => "join_clips_segment",
            VariantType::JoinFinalStitch => "join_final_stitch",
            VariantType::Upscaled => "upscaled",
            VariantType::Custom(tag) => tag.as_str(),
        }
    }
}

impl From<String> for VariantType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "original" => VariantType::Original,
            "regenerated" => VariantType::Regenerated,
            "edit" => VariantType::Edit,
            "inpaint" => VariantType::Inpaint,
            "annotated_edit" => VariantType::AnnotatedEdit,
            "magic_edit" => VariantType::MagicEdit,
            "travel_segment" => VariantType::TravelSegment,
            "individual_segment" => VariantType::IndividualSegment,
            "travel_stitch" => VariantType::TravelStitch,
            "join_clips_segment" => VariantType::JoinClipsSegment,
            "join_final_stitch" => VariantType::JoinFinalStitch,
            "upscaled" => VariantType::Upscaled,
            _ => VariantType::Custom(value),
        }
    }
}

impl From<VariantType> for String {
    fn from(value: VariantType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
