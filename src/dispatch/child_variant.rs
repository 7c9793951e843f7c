//! `variant_on_child`: regeneration of one already-materialized step.
//!
//! Needs an explicit child reference. When the run has a single unit, the same variant is also
//! written to the child's parent so the top-level view updates.

use super::{CompletionOutcome, Disposition, Handled, TaskContext};
use crate::collapse;
use crate::error::StorageError;
use crate::params::{self, fields};
use crate::persistence::GenerationWriter;
use crate::telemetry::CompletionEvent;
use tracing::{debug, warn};

pub(crate) async fn handle(
    writer: &GenerationWriter,
    ctx: &mut TaskContext<'_>,
) -> Result<Handled, StorageError> {
    let task_id = ctx.task_id();
    let Some(child_id) = params::child_reference(&ctx.params) else {
        return Ok(Handled::NotApplicable("no child reference".to_string()));
    };

    let Some(mut child) = writer.store().get_generation(child_id).await? else {
        warn!(%task_id, %child_id, "Referenced child generation not found, clearing");
        params::clear_field(&mut ctx.params, &fields::CHILD_GENERATION_ID);
        writer.sink().emit(CompletionEvent::StaleReferenceCleared {
            task_id,
            field: fields::CHILD_GENERATION_ID.name.to_string(),
            reference: child_id,
        });
        return Ok(Handled::NotApplicable(
            "child reference is stale".to_string(),
        ));
    };

    let is_primary = fields::MAKE_PRIMARY_VARIANT.bool(&ctx.params).unwrap_or(true);
    let ordinal = child
        .child_order
        .or_else(|| params::child_ordinal(&ctx.params, &ctx.config.child_order_field));
    let decision = collapse::detect(&ctx.params, ctx.config, ordinal);

    let variant_params = ctx.generation_params(&ctx.params);
    let variant = writer
        .add_variant(
            task_id,
            child.id,
            ctx.output_variant(variant_params.clone(), ctx.config.variant_type.clone())
                .primary(is_primary),
        )
        .await?;
    writer.record_contribution(child.id, task_id).await?;
    if !child.tasks.contains(&task_id) {
        child.tasks.push(task_id);
    }

    if let (Some(policy), Some(parent_id)) =
        (decision.single_item_policy(), child.parent_generation_id)
    {
        match writer.store().get_generation(parent_id).await? {
            Some(parent) => {
                let mut parent_params = variant_params;
                parent_params.merge(&decision.extra_params);
                writer
                    .add_variant(
                        task_id,
                        parent.id,
                        ctx.output_variant(parent_params, ctx.config.variant_type.clone())
                            .primary(is_primary),
                    )
                    .await?;
                writer.sink().emit(CompletionEvent::SingleItemCollapse {
                    task_id,
                    parent_generation_id: parent.id,
                    policy,
                });
            }
            None => {
                debug!(%task_id, %parent_id, "Parent of regenerated child missing, skipping propagation")
            }
        }
    }

    Ok(Handled::Done(CompletionOutcome::new(
        child,
        variant,
        Disposition::ChildVariant,
    )))
}
