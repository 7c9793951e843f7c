//! Task Dump Recovery
//!
//! Rebuilds generation records from an exported dump of task rows by replaying each finished task
//! through the dispatcher, oldest first. Orchestrated runs come back with their parent, children
//! and ordinals because the replay takes the same path the live completions took. Tasks whose
//! output is already recorded are skipped, so a dump can be replayed more than once.

use crate::dispatch::{CompletionDispatcher, Disposition};
use crate::error::CompletionError;
use crate::model::CompletionSignal;
use crate::params::{FieldChain, ParamBag};
use crate::store::GenerationStore;
use crate::types::{GenerationId, ProjectId, TaskId, TaskType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

const PROJECT_ID: FieldChain<'static> =
    FieldChain::new("project_id", &["project_id", "orchestrator_details.project_id"]);

/// One exported task row. `params` may be an object or a JSON-encoded string.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub task_type: TaskType,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output_location: Option<String>,
    #[serde(default)]
    pub thumbnail_location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn is_finished(&self) -> bool {
        self.status.as_deref().map_or(true, |status| {
            status.eq_ignore_ascii_case("complete") || status.eq_ignore_ascii_case("completed")
        })
    }

    /// Completion signal for this row, or the reason it cannot be replayed.
    pub fn to_signal(&self) -> Result<CompletionSignal, String> {
        if !self.is_finished() {
            return Err(format!(
                "status {}",
                self.status.as_deref().unwrap_or_default()
            ));
        }
        let output_location = self
            .output_location
            .as_deref()
            .map(str::trim)
            .filter(|location| !location.is_empty())
            .ok_or_else(|| "no output location".to_string())?;
        let params = match &self.params {
            Value::String(encoded) => serde_json::from_str(encoded)
                .map(ParamBag::from_value)
                .map_err(|e| format!("params are not valid JSON: {}", e))?,
            Value::Null => ParamBag::new(),
            other => ParamBag::from_value(other.clone()),
        };
        let project_id = self
            .project_id
            .or_else(|| PROJECT_ID.uuid(&params))
            .ok_or_else(|| "no project id".to_string())?;
        Ok(CompletionSignal {
            task_id: self.id,
            task_type: self.task_type.clone(),
            project_id,
            params,
            content_kind: None,
            tool_type: None,
            output_location: output_location.to_string(),
            thumbnail_location: self.thumbnail_location.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayedTask {
    pub task_id: TaskId,
    pub task_type: String,
    /// `None` on a dry run
    pub disposition: Option<Disposition>,
    pub generation_id: Option<GenerationId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedTask {
    pub task_id: TaskId,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryReport {
    pub dry_run: bool,
    pub replayed: Vec<ReplayedTask>,
    pub skipped: Vec<SkippedTask>,
}

/// Read a dump holding either an array of task rows or a single row.
pub fn load_task_dump(path: &Path) -> Result<Vec<TaskRecord>, CompletionError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CompletionError::InvalidSignal(format!("cannot read {}: {}", path.display(), e))
    })?;
    let parse_error = |e: serde_json::Error| {
        CompletionError::InvalidSignal(format!("cannot parse {}: {}", path.display(), e))
    };
    match serde_json::from_str::<Value>(&raw).map_err(parse_error)? {
        rows @ Value::Array(_) => serde_json::from_value(rows).map_err(parse_error),
        row => Ok(vec![serde_json::from_value(row).map_err(parse_error)?]),
    }
}

/// Replay `records` oldest first. A persistence failure aborts the replay.
pub async fn recover(
    dispatcher: &CompletionDispatcher,
    mut records: Vec<TaskRecord>,
    dry_run: bool,
) -> Result<RecoveryReport, CompletionError> {
    records.sort_by_key(|record| record.created_at);
    let mut report = RecoveryReport {
        dry_run,
        ..RecoveryReport::default()
    };

    for record in &records {
        let signal = match record.to_signal() {
            Ok(signal) => signal,
            Err(reason) => {
                debug!(task_id = %record.id, %reason, "Skipping task row");
                report.skipped.push(SkippedTask {
                    task_id: record.id,
                    reason,
                });
                continue;
            }
        };
        if let Some(existing) = dispatcher
            .store()
            .find_variant_by_source_task(signal.task_id)
            .await?
        {
            report.skipped.push(SkippedTask {
                task_id: signal.task_id,
                reason: format!("already recorded on generation {}", existing.generation_id),
            });
            continue;
        }

        let (disposition, generation_id) = if dry_run {
            (None, None)
        } else {
            let outcome = dispatcher.complete(&signal).await?;
            (Some(outcome.disposition), Some(outcome.generation.id))
        };
        report.replayed.push(ReplayedTask {
            task_id: signal.task_id,
            task_type: signal.task_type.to_string(),
            disposition,
            generation_id,
        });
    }

    info!(
        dry_run,
        replayed = report.replayed.len(),
        skipped = report.skipped.len(),
        "Task dump replayed"
    );
    Ok(report)
}
