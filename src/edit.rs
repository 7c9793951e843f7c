//! Edit/Upscale Variant Handlers
//!
//! Outputs of these tasks are always secondary renderings of a named source generation, so they
//! bypass the completion config table. `Ok(None)` is a reported failure: the source reference is
//! missing or points nowhere, and no variant was written.

use crate::dispatch::{CompletionOutcome, Disposition, TaskContext};
use crate::error::StorageError;
use crate::model::{Generation, Variant};
use crate::params::{self, ParamBag};
use crate::persistence::GenerationWriter;
use crate::telemetry::CompletionEvent;
use crate::types::{GenerationId, TaskId, VariantType};
use tracing::{debug, warn};

/// Task params copied onto an upscaled variant as provenance.
const UPSCALE_PROVENANCE_KEYS: [&str; 4] = [
    "upscale_factor",
    "upscale_model",
    "scale",
    "noise_reduction",
];

/// Append a non-primary edit variant to the `based_on` source.
pub(crate) async fn complete_edit(
    writer: &GenerationWriter,
    ctx: &TaskContext<'_>,
) -> Result<Option<CompletionOutcome>, StorageError> {
    let task_id = ctx.task_id();
    let Some(variant_type) = ctx.signal.task_type.edit_variant_type() else {
        return Ok(None);
    };
    let Some(source_id) = params::extract_based_on(&ctx.params) else {
        report_missing(writer, ctx, "no based_on reference");
        return Ok(None);
    };
    let Some(source) = writer.store().get_generation(source_id).await? else {
        report_missing(writer, ctx, &format!("source generation {} not found", source_id));
        return Ok(None);
    };

    if let Some(existing) = already_written(writer, ctx, &source).await? {
        return Ok(Some(CompletionOutcome::new(
            source,
            existing,
            Disposition::EditVariant,
        )));
    }

    let variant_params = ctx.generation_params(&ctx.params);
    let variant = writer
        .add_variant(
            task_id,
            source.id,
            ctx.output_variant(variant_params, variant_type)
                .primary(false)
                .named(ctx.generation_name()),
        )
        .await?;
    let source = contributed(writer, source, task_id).await?;
    Ok(Some(CompletionOutcome::new(
        source,
        variant,
        Disposition::EditVariant,
    )))
}

/// Append a primary `upscaled` variant to the target generation.
///
/// The variant's params start from the target's own params; upscale provenance is layered on top.
pub(crate) async fn complete_upscale(
    writer: &GenerationWriter,
    ctx: &TaskContext<'_>,
) -> Result<Option<CompletionOutcome>, StorageError> {
    let task_id = ctx.task_id();
    let Some(target_id) = params::upscale_target(&ctx.params) else {
        debug!(%task_id, "Upscale task names no target generation, nothing to do");
        return Ok(None);
    };
    let Some(target) = writer.store().get_generation(target_id).await? else {
        report_missing(writer, ctx, &format!("target generation {} not found", target_id));
        return Ok(None);
    };

    if let Some(existing) = already_written(writer, ctx, &target).await? {
        return Ok(Some(CompletionOutcome::new(
            target,
            existing,
            Disposition::Upscaled,
        )));
    }

    let mut variant_params = target.params.clone();
    variant_params.merge(&upscale_provenance(ctx, target.id));
    let variant = writer
        .add_variant(
            task_id,
            target.id,
            ctx.output_variant(variant_params, VariantType::Upscaled)
                .primary(true),
        )
        .await?;
    let target = contributed(writer, target, task_id).await?;
    Ok(Some(CompletionOutcome::new(
        target,
        variant,
        Disposition::Upscaled,
    )))
}

fn upscale_provenance(ctx: &TaskContext<'_>, target_id: GenerationId) -> ParamBag {
    let mut provenance = ParamBag::new();
    for key in UPSCALE_PROVENANCE_KEYS {
        if let Some(value) = ctx.params.get(key) {
            provenance.insert(key, value.clone());
        }
    }
    provenance.insert("upscaled_from_generation_id", target_id.to_string());
    provenance.insert("upscale_task_id", ctx.task_id().to_string());
    if let Some(tool_type) = &ctx.tool_type {
        provenance.insert("upscale_tool_type", tool_type.as_str());
    }
    if let Some(thumbnail) = &ctx.signal.thumbnail_location {
        provenance.insert("thumbnail_url", thumbnail.as_str());
    }
    provenance
}

/// Variant this task already wrote on `owner`, if the signal is a re-delivery.
async fn already_written(
    writer: &GenerationWriter,
    ctx: &TaskContext<'_>,
    owner: &Generation,
) -> Result<Option<Variant>, StorageError> {
    let existing = writer
        .store()
        .find_variant_by_source_task(ctx.task_id())
        .await?
        .filter(|variant| variant.generation_id == owner.id);
    if let Some(variant) = &existing {
        debug!(
            task_id = %ctx.task_id(),
            variant_id = %variant.id,
            "Variant for task already exists, skipping"
        );
    }
    Ok(existing)
}

async fn contributed(
    writer: &GenerationWriter,
    mut generation: Generation,
    task_id: TaskId,
) -> Result<Generation, StorageError> {
    writer.record_contribution(generation.id, task_id).await?;
    if !generation.tasks.contains(&task_id) {
        generation.tasks.push(task_id);
    }
    Ok(generation)
}

fn report_missing(writer: &GenerationWriter, ctx: &TaskContext<'_>, reason: &str) {
    warn!(
        task_id = %ctx.task_id(),
        task_type = %ctx.signal.task_type,
        reason,
        "Edit source missing"
    );
    writer.sink().emit(CompletionEvent::EditSourceMissing {
        task_id: ctx.task_id(),
        task_type: ctx.signal.task_type.to_string(),
        reason: reason.to_string(),
    });
}
