//! `standalone_generation`: independent top-level record for ordinary tasks.

use super::{CompletionOutcome, Disposition, TaskContext};
use crate::error::StorageError;
use crate::model::NewGeneration;
use crate::persistence::GenerationWriter;
use crate::types::VariantType;

pub(crate) async fn handle(
    writer: &GenerationWriter,
    ctx: &mut TaskContext<'_>,
) -> Result<CompletionOutcome, StorageError> {
    let task_id = ctx.task_id();

    let based_on = writer.resolve_based_on(task_id, &mut ctx.params).await?;
    let generation_params = ctx.generation_params(&ctx.params);
    let record = NewGeneration::top_level(ctx.signal.project_id, ctx.kind, generation_params.clone())
        .with_task(task_id)
        .with_based_on(based_on)
        .with_name(ctx.generation_name());
    let (generation, variant) = writer
        .create_generation_with_variant(
            task_id,
            record,
            ctx.output_variant(generation_params, VariantType::Original)
                .primary(true),
        )
        .await?;

    writer
        .link_to_shot(task_id, generation.id, ctx.placement)
        .await;

    Ok(CompletionOutcome::new(
        generation,
        variant,
        Disposition::NewGeneration,
    ))
}
