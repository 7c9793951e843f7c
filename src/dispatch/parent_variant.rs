//! `variant_on_parent`: final aggregation steps land on the orchestrator's own record.

use super::{CompletionOutcome, Disposition, Handled, TaskContext};
use crate::error::StorageError;
use crate::params;
use crate::persistence::GenerationWriter;

pub(crate) async fn handle(
    writer: &GenerationWriter,
    ctx: &mut TaskContext<'_>,
) -> Result<Handled, StorageError> {
    let task_id = ctx.task_id();
    let orchestrator_task_id = params::extract_orchestrator_task_id(&ctx.params);
    let explicit_parent = params::fields::PARENT_GENERATION_ID.uuid(&ctx.params);
    if orchestrator_task_id.is_none() && explicit_parent.is_none() {
        return Ok(Handled::NotApplicable(
            "no orchestrator reference".to_string(),
        ));
    }

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
            "parent generation could not be resolved".to_string(),
        ));
    };

    let mut parent = resolution.parent;
    let variant_params = ctx.generation_params(&ctx.params);
    let variant = writer
        .add_variant(
            task_id,
            parent.id,
            ctx.output_variant(variant_params, ctx.config.variant_type.clone())
                .primary(true)
                .named(ctx.generation_name()),
        )
        .await?;
    writer.record_contribution(parent.id, task_id).await?;
    if !parent.tasks.contains(&task_id) {
        parent.tasks.push(task_id);
    }

    Ok(Handled::Done(
        CompletionOutcome::new(parent, variant, Disposition::ParentVariant)
            .consuming(orchestrator_task_id),
    ))
}
