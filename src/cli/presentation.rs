//! CLI presentation: text tables and JSON for command results.

use crate::config::EngineConfig;
use crate::dispatch::CompletionOutcome;
use crate::error::CompletionError;
use crate::model::{Generation, Variant};
use crate::recover::RecoveryReport;
use crate::registry::{CompletionRegistry, SingleItemRule};
use crate::telemetry::EventEnvelope;
use comfy_table::presets::{UTF8_BORDERS_ONLY, UTF8_FULL};
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde_json::json;

fn to_json(value: &serde_json::Value) -> Result<String, CompletionError> {
    serde_json::to_string_pretty(value).map_err(|e| {
        CompletionError::Storage(crate::error::StorageError::Serialization(e.to_string()))
    })
}

fn short(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn primary_marker(variant: &Variant) -> String {
    if variant.is_primary {
        "primary".green().to_string()
    } else {
        "-".dimmed().to_string()
    }
}

fn variant_table(variants: &[Variant]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Variant", "Type", "Primary", "Viewed", "Location", "Created"]);
    for variant in variants {
        table.add_row(vec![
            short(&variant.id),
            variant.variant_type.to_string(),
            primary_marker(variant),
            variant
                .viewed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            variant.location.clone(),
            variant.created_at.to_rfc3339(),
        ]);
    }
    table
}

fn generation_summary(generation: &Generation) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.add_row(vec!["Generation".to_string(), generation.id.to_string()]);
    table.add_row(vec!["Kind".to_string(), generation.kind.as_str().to_string()]);
    if let Some(name) = &generation.name {
        table.add_row(vec!["Name".to_string(), name.clone()]);
    }
    if let Some(parent) = generation.parent_generation_id {
        table.add_row(vec!["Parent".to_string(), parent.to_string()]);
    }
    if let Some(order) = generation.child_order {
        table.add_row(vec!["Ordinal".to_string(), order.to_string()]);
    }
    if let Some(slot) = generation.pair_shot_generation_id {
        table.add_row(vec!["Slot".to_string(), slot.to_string()]);
    }
    if let Some(based_on) = generation.based_on {
        table.add_row(vec!["Based on".to_string(), based_on.to_string()]);
    }
    table.add_row(vec!["Tasks".to_string(), generation.tasks.len().to_string()]);
    table
}

pub fn format_outcome(
    outcome: &CompletionOutcome,
    events: &[EventEnvelope],
    format: &str,
) -> Result<String, CompletionError> {
    if format == "json" {
        return to_json(&json!({
            "disposition": outcome.disposition,
            "generation": outcome.generation,
            "variant": outcome.variant,
            "consumed_orchestrator": outcome.consumed_orchestrator,
            "events": events,
        }));
    }

    let mut out = format!(
        "{} variant {} on generation {}\n",
        outcome.disposition.as_str().bold(),
        short(&outcome.variant.id),
        outcome.generation.id
    );
    out.push_str(&generation_summary(&outcome.generation).to_string());
    out.push('\n');
    out.push_str(&variant_table(std::slice::from_ref(&outcome.variant)).to_string());
    if let Some(orchestrator) = outcome.consumed_orchestrator {
        out.push_str(&format!("\nOrchestrator task {} marked consumed", orchestrator));
    }
    if !events.is_empty() {
        out.push_str("\n\nEvents:\n");
        for envelope in events {
            out.push_str(&format!(
                "  {} {}\n",
                envelope.ts.dimmed(),
                envelope.event.event_type()
            ));
        }
    }
    Ok(out)
}

pub fn format_generation(
    generation: &Generation,
    variants: &[Variant],
    format: &str,
) -> Result<String, CompletionError> {
    if format == "json" {
        return to_json(&json!({ "generation": generation, "variants": variants }));
    }
    Ok(format!(
        "{}\n{}",
        generation_summary(generation),
        variant_table(variants)
    ))
}

/// Children with their variant counts.
pub fn format_children(
    parent: &Generation,
    children: &[(Generation, usize)],
    format: &str,
) -> Result<String, CompletionError> {
    if format == "json" {
        let rows: Vec<serde_json::Value> = children
            .iter()
            .map(|(child, variants)| {
                json!({
                    "id": child.id,
                    "child_order": child.child_order,
                    "pair_shot_generation_id": child.pair_shot_generation_id,
                    "variants": variants,
                    "created_at": child.created_at,
                })
            })
            .collect();
        return to_json(&json!({ "parent": parent.id, "children": rows }));
    }

    if children.is_empty() {
        return Ok(format!("Generation {} has no children", parent.id));
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Ordinal", "Child", "Slot", "Variants", "Created"]);
    for (child, variants) in children {
        table.add_row(vec![
            child
                .child_order
                .map(|o| o.to_string())
                .unwrap_or_else(|| "-".to_string()),
            child.id.to_string(),
            child
                .pair_shot_generation_id
                .map(|s| short(&s))
                .unwrap_or_else(|| "-".to_string()),
            variants.to_string(),
            child.created_at.to_rfc3339(),
        ]);
    }
    Ok(table.to_string())
}

pub fn format_recovery(report: &RecoveryReport, format: &str) -> Result<String, CompletionError> {
    if format == "json" {
        let value = serde_json::to_value(report).map_err(|e| {
            CompletionError::Storage(crate::error::StorageError::Serialization(e.to_string()))
        })?;
        return to_json(&value);
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Task", "Type", "Result", "Generation"]);
    for task in &report.replayed {
        table.add_row(vec![
            short(&task.task_id),
            task.task_type.clone(),
            task.disposition
                .map(|d| d.as_str().to_string())
                .unwrap_or_else(|| "would replay".dimmed().to_string()),
            task.generation_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    for task in &report.skipped {
        table.add_row(vec![
            short(&task.task_id),
            "-".to_string(),
            format!("skipped: {}", task.reason).yellow().to_string(),
            "-".to_string(),
        ]);
    }
    let verb = if report.dry_run { "Would replay" } else { "Replayed" };
    Ok(format!(
        "{}\n{} {} task(s), skipped {}",
        table,
        verb,
        report.replayed.len(),
        report.skipped.len()
    ))
}

pub fn format_types(registry: &CompletionRegistry, format: &str) -> Result<String, CompletionError> {
    if format == "json" {
        let rows: Vec<serde_json::Value> = registry
            .entries()
            .into_iter()
            .map(|(task_type, config)| json!({ "task_type": task_type, "config": config }))
            .collect();
        return to_json(&serde_json::Value::Array(rows));
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Task type",
        "Behavior",
        "Variant tag",
        "Order field",
        "Position match",
        "Single item",
    ]);
    for (task_type, config) in registry.entries() {
        let single_item = match &config.single_item {
            Some(SingleItemRule::Count {
                count_field,
                expected,
                policy,
            }) => format!("{} == {} -> {:?}", count_field, expected, policy),
            Some(SingleItemRule::Flags {
                first_flag,
                last_flag,
                policy,
            }) => format!("{} && {} -> {:?}", first_flag, last_flag, policy),
            None => "-".to_string(),
        };
        table.add_row(vec![
            task_type.to_string(),
            config.behavior.as_str().to_string(),
            config.variant_type.to_string(),
            config.child_order_field.clone(),
            if config.check_existing_at_position {
                "yes".to_string()
            } else {
                "no".to_string()
            },
            single_item,
        ]);
    }
    Ok(format!(
        "{}\nUnregistered task types use standalone_generation.",
        table
    ))
}

pub fn format_config(config: &EngineConfig) -> Result<String, CompletionError> {
    toml::to_string_pretty(config)
        .map_err(|e| CompletionError::ConfigError(format!("Failed to render config: {}", e)))
}
