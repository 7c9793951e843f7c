//! `child_generation`: ordinary orchestrated steps.
//!
//! Order of operations: resolve the parent, compute the ordinal, apply single-item collapse,
//! slice this step's params, try the positional sibling matcher, then create the child.

use super::{CompletionOutcome, Disposition, Handled, TaskContext};
use crate::collapse::{self, CollapseDecision};
use crate::error::StorageError;
use crate::matcher::{self, Position};
use crate::model::{Generation, NewGeneration, Variant};
use crate::params::{self, ParamBag};
use crate::persistence::GenerationWriter;
use crate::registry::CollapsePolicy;
use crate::segment::extract_segment_specific_params;
use crate::telemetry::CompletionEvent;
use crate::types::VariantType;
use chrono::Utc;
use tracing::debug;

pub(crate) async fn handle(
    writer: &GenerationWriter,
    ctx: &mut TaskContext<'_>,
) -> Result<Handled, StorageError> {
    let task_id = ctx.task_id();
    let orchestrator_task_id = params::extract_orchestrator_task_id(&ctx.params);
    let Some(resolution) = writer
        .get_or_create_parent_generation(
            task_id,
            orchestrator_task_id,
            ctx.signal.project_id,
            ctx.kind,
            &mut ctx.params,
        )
        .await?
    else {
        return Ok(Handled::NotApplicable(
            "no parent generation for orchestrated step".to_string(),
        ));
    };
    let parent = resolution.parent;
    let based_on = writer.resolve_based_on(task_id, &mut ctx.params).await?;

    let ordinal = params::child_ordinal(&ctx.params, &ctx.config.child_order_field);
    let decision = collapse::detect(&ctx.params, ctx.config, ordinal);

    let details = params::orchestrator_details(&ctx.params);
    let segment_params = match ordinal {
        Some(ordinal) => extract_segment_specific_params(&ctx.params, &details, ordinal),
        None => ctx.params.clone(),
    };
    let generation_params = ctx.generation_params(&segment_params);

    if let Some(policy) = decision.single_item_policy() {
        let variant = stamp_parent(writer, ctx, &parent, &generation_params, &decision).await?;
        writer.sink().emit(CompletionEvent::SingleItemCollapse {
            task_id,
            parent_generation_id: parent.id,
            policy,
        });
        if policy == CollapsePolicy::VariantOnly {
            let mut parent = parent;
            writer.record_contribution(parent.id, task_id).await?;
            if !parent.tasks.contains(&task_id) {
                parent.tasks.push(task_id);
            }
            return Ok(Handled::Done(
                CompletionOutcome::new(parent, variant, Disposition::CollapsedToParent)
                    .consuming(orchestrator_task_id),
            ));
        }
    }

    let slot = params::slot_reference(&ctx.params);
    if ctx.config.check_existing_at_position {
        let position = Position { slot, ordinal };
        if let Some(found) = matcher::find_sibling(writer.store(), parent.id, position).await? {
            let mut sibling = found.sibling;
            writer.sink().emit(CompletionEvent::SiblingMatched {
                task_id,
                generation_id: sibling.id,
                strategy: found.strategy,
            });
            let variant = writer
                .add_variant(
                    task_id,
                    sibling.id,
                    ctx.output_variant(generation_params, ctx.config.variant_type.clone()),
                )
                .await?;
            writer.record_contribution(sibling.id, task_id).await?;
            if !sibling.tasks.contains(&task_id) {
                sibling.tasks.push(task_id);
            }
            return Ok(Handled::Done(CompletionOutcome::new(
                sibling,
                variant,
                Disposition::SiblingVariant,
            )));
        }
        debug!(%task_id, parent_id = %parent.id, ?ordinal, ?slot, "No sibling at position");
    }

    let mut child_params = generation_params;
    let mut viewed_at = None;
    if decision.is_single_item {
        child_params.merge(&decision.extra_params);
        viewed_at = Some(Utc::now());
    }
    let record = NewGeneration::child(
        ctx.signal.project_id,
        ctx.kind,
        child_params.clone(),
        parent.id,
        ordinal,
    )
    .with_task(task_id)
    .with_slot(slot)
    .with_based_on(based_on)
    .with_name(ctx.generation_name());
    let (child, variant) = writer
        .create_generation_with_variant(
            task_id,
            record,
            ctx.output_variant(child_params, VariantType::Original)
                .primary(true)
                .viewed(viewed_at),
        )
        .await?;

    Ok(Handled::Done(CompletionOutcome::new(
        child,
        variant,
        Disposition::ChildGeneration,
    )))
}

/// Variant on the parent for a single-item run; primary when it is the parent's first.
async fn stamp_parent(
    writer: &GenerationWriter,
    ctx: &TaskContext<'_>,
    parent: &Generation,
    generation_params: &ParamBag,
    decision: &CollapseDecision,
) -> Result<Variant, StorageError> {
    let is_first = writer.store().count_variants(parent.id).await? == 0;
    let mut variant_params = generation_params.clone();
    variant_params.merge(&decision.extra_params);
    writer
        .add_variant(
            ctx.task_id(),
            parent.id,
            ctx.output_variant(variant_params, ctx.config.variant_type.clone())
                .primary(is_first)
                .named(ctx.generation_name()),
        )
        .await
}
