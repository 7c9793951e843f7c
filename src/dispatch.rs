//! Completion Dispatcher
//!
//! Turns one completion signal into exactly one outcome on the generation/variant model:
//!
//! 1. Edit and upscale task types go to their own handlers first.
//! 2. Idempotency: a generation already listing this task id receives a primary `regenerated`
//!    variant and nothing else is created.
//! 3. The task type's configured behavior runs. A handler that finds its inputs missing reports
//!    "not applicable" and the dispatcher falls back to a less specific behavior, ending at
//!    standalone generation, so no completion is dropped.
//! 4. The task is marked consumed.

pub mod child_generation;
pub mod child_variant;
pub mod parent_variant;
pub mod standalone;

use crate::edit;
use crate::error::{CompletionError, StorageError};
use crate::model::{CompletionSignal, Generation, Variant};
use crate::params::{self, ParamBag, ShotPlacement};
use crate::persistence::{GenerationWriter, VariantSpec};
use crate::registry::{CompletionBehavior, CompletionConfig, CompletionRegistry};
use crate::segment::build_generation_params;
use crate::store::GenerationStore;
use crate::telemetry::{CompletionEvent, EventSink, TracingSink};
use crate::tool::ToolRegistry;
use crate::types::{ContentKind, TaskId, VariantType};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// How a completion was reflected in the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// New top-level generation with its original variant.
    NewGeneration,
    /// New child generation under an orchestrator's parent.
    ChildGeneration,
    /// Re-delivery: regenerated variant on the task's existing generation.
    Regenerated,
    /// Variant on the orchestrator's parent.
    ParentVariant,
    /// Single-item run written only to the parent.
    CollapsedToParent,
    /// Alternative rendering of an existing sibling at the same position.
    SiblingVariant,
    /// Variant on an explicitly referenced child.
    ChildVariant,
    EditVariant,
    Upscaled,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::NewGeneration => "new_generation",
            Disposition::ChildGeneration => "child_generation",
            Disposition::Regenerated => "regenerated",
            Disposition::ParentVariant => "parent_variant",
            Disposition::CollapsedToParent => "collapsed_to_parent",
            Disposition::SiblingVariant => "sibling_variant",
            Disposition::ChildVariant => "child_variant",
            Disposition::EditVariant => "edit_variant",
            Disposition::Upscaled => "upscaled",
        }
    }
}

/// Result of one completion.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    /// Generation that received the output
    pub generation: Generation,
    pub variant: Variant,
    pub disposition: Disposition,
    /// Orchestrator task marked consumed alongside this task, when the run's result landed on
    /// its parent.
    pub consumed_orchestrator: Option<TaskId>,
}

impl CompletionOutcome {
    pub(crate) fn new(generation: Generation, variant: Variant, disposition: Disposition) -> Self {
        Self {
            generation,
            variant,
            disposition,
            consumed_orchestrator: None,
        }
    }

    pub(crate) fn consuming(mut self, orchestrator_task_id: Option<TaskId>) -> Self {
        self.consumed_orchestrator = orchestrator_task_id;
        self
    }
}

/// What a behavior handler did.
#[derive(Debug)]
pub(crate) enum Handled {
    Done(CompletionOutcome),
    /// Preconditions absent; the reason is reported with the fallback.
    NotApplicable(String),
}

/// Per-completion working state shared by the handlers.
#[derive(Debug, Clone)]
pub(crate) struct TaskContext<'a> {
    pub signal: &'a CompletionSignal,
    pub config: &'a CompletionConfig,
    /// Working copy of the task params; stale references are cleared here.
    pub params: ParamBag,
    pub kind: ContentKind,
    pub tool_type: Option<String>,
    pub placement: ShotPlacement,
}

impl<'a> TaskContext<'a> {
    pub fn task_id(&self) -> TaskId {
        self.signal.task_id
    }

    /// Generation params for this task built over `base`.
    pub fn generation_params(&self, base: &ParamBag) -> ParamBag {
        build_generation_params(
            base,
            self.tool_type.as_deref(),
            self.kind,
            self.placement.shot_id,
            self.signal.thumbnail_location.as_deref(),
            self.signal.task_id,
        )
    }

    /// Variant carrying this task's output.
    pub fn output_variant(&self, params: ParamBag, variant_type: VariantType) -> VariantSpec {
        VariantSpec::new(
            self.signal.output_location.clone(),
            self.signal.thumbnail_location.clone(),
            params,
            variant_type,
        )
    }

    pub fn generation_name(&self) -> Option<String> {
        params::fields::GENERATION_NAME
            .str(&self.params)
            .map(str::to_string)
    }
}

/// Routes completion signals to behavior handlers.
#[derive(Clone)]
pub struct CompletionDispatcher {
    writer: GenerationWriter,
    registry: Arc<CompletionRegistry>,
    tools: Arc<ToolRegistry>,
}

impl CompletionDispatcher {
    pub fn new(store: Arc<dyn GenerationStore>, registry: Arc<CompletionRegistry>) -> Self {
        Self {
            writer: GenerationWriter::new(store, Arc::new(TracingSink)),
            registry,
            tools: Arc::new(ToolRegistry::builtin()),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.writer = GenerationWriter::new(self.writer.shared_store(), sink);
        self
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn registry(&self) -> &CompletionRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn GenerationStore {
        self.writer.store()
    }

    /// Full completion: edit/upscale handlers first, then config-driven dispatch.
    pub async fn complete(
        &self,
        signal: &CompletionSignal,
    ) -> Result<CompletionOutcome, CompletionError> {
        let handled = if signal.task_type.is_upscale() {
            self.upscale_variant(signal).await?
        } else if signal.task_type.edit_variant_type().is_some() {
            self.edit_variant(signal).await?
        } else {
            None
        };
        if let Some(outcome) = handled {
            self.writer.mark_consumed(signal.task_id).await?;
            return Ok(outcome);
        }
        self.dispatch(signal).await
    }

    /// Edit handler alone. `None` reports that no variant was written.
    pub async fn edit_variant(
        &self,
        signal: &CompletionSignal,
    ) -> Result<Option<CompletionOutcome>, CompletionError> {
        signal.validate()?;
        let ctx = self
            .prepare(signal, self.registry.resolve(&signal.task_type))
            .await?;
        let outcome = edit::complete_edit(&self.writer, &ctx).await?;
        if outcome.is_none() {
            debug!(task_id = %signal.task_id, task_type = %signal.task_type, "Edit variant not written");
        }
        Ok(outcome)
    }

    /// Upscale handler alone. `None` when there was no target to upscale.
    pub async fn upscale_variant(
        &self,
        signal: &CompletionSignal,
    ) -> Result<Option<CompletionOutcome>, CompletionError> {
        signal.validate()?;
        let ctx = self
            .prepare(signal, self.registry.resolve(&signal.task_type))
            .await?;
        Ok(edit::complete_upscale(&self.writer, &ctx).await?)
    }

    /// Config-driven dispatch for one completion.
    pub async fn dispatch(
        &self,
        signal: &CompletionSignal,
    ) -> Result<CompletionOutcome, CompletionError> {
        signal.validate()?;
        let task_id = signal.task_id;
        let config = self.registry.resolve(&signal.task_type);
        self.writer.sink().emit(CompletionEvent::ConfigResolved {
            task_id,
            task_type: signal.task_type.to_string(),
            behavior: config.behavior,
            registered: self.registry.is_registered(&signal.task_type),
        });

        let mut ctx = self.prepare(signal, config).await?;

        if let Some(outcome) = self.complete_existing(&ctx).await? {
            self.finalize(&outcome, task_id).await?;
            return Ok(outcome);
        }

        let outcome = self.route(&mut ctx).await?;
        self.finalize(&outcome, task_id).await?;
        info!(
            %task_id,
            disposition = outcome.disposition.as_str(),
            generation_id = %outcome.generation.id,
            variant_id = %outcome.variant.id,
            "Completion processed"
        );
        Ok(outcome)
    }

    /// Working context with stale shot references already cleared.
    async fn prepare<'a>(
        &self,
        signal: &'a CompletionSignal,
        config: &'a CompletionConfig,
    ) -> Result<TaskContext<'a>, StorageError> {
        let mut ctx = self.context(signal, config);
        ctx.placement = self.writer.resolve_shot(signal.task_id, &mut ctx.params).await?;
        Ok(ctx)
    }

    fn context<'a>(
        &self,
        signal: &'a CompletionSignal,
        config: &'a CompletionConfig,
    ) -> TaskContext<'a> {
        let resolution =
            self.tools
                .resolve_tool_type(&signal.task_type, &signal.params, config.tool_type.as_deref());
        let tool_type = signal
            .tool_type
            .clone()
            .or_else(|| resolution.as_ref().map(|r| r.tool_type.clone()));
        let kind = signal
            .content_kind
            .or_else(|| resolution.as_ref().map(|r| r.content_kind))
            .unwrap_or_default();
        TaskContext {
            signal,
            config,
            params: signal.params.clone(),
            kind,
            tool_type,
            placement: params::extract_shot_and_position(&signal.params),
        }
    }

    /// Re-delivery of a task that already produced a generation.
    async fn complete_existing(
        &self,
        ctx: &TaskContext<'_>,
    ) -> Result<Option<CompletionOutcome>, CompletionError> {
        let task_id = ctx.task_id();
        let Some(existing) = self
            .writer
            .store()
            .find_generation_by_task_id(task_id)
            .await?
        else {
            return Ok(None);
        };

        debug!(%task_id, generation_id = %existing.id, "Task already has a generation, adding regenerated variant");
        let params = ctx.generation_params(&ctx.params);
        let variant = self
            .writer
            .add_variant(
                task_id,
                existing.id,
                ctx.output_variant(params, VariantType::Regenerated)
                    .primary(true),
            )
            .await?;
        self.writer
            .link_to_shot(task_id, existing.id, ctx.placement)
            .await;
        Ok(Some(CompletionOutcome::new(
            existing,
            variant,
            Disposition::Regenerated,
        )))
    }

    async fn route(&self, ctx: &mut TaskContext<'_>) -> Result<CompletionOutcome, CompletionError> {
        let mut behavior = ctx.config.behavior;
        loop {
            self.writer.sink().emit(CompletionEvent::BehaviorChosen {
                task_id: ctx.task_id(),
                handler: behavior.as_str().to_string(),
            });
            let handled = match behavior {
                CompletionBehavior::VariantOnParent => {
                    parent_variant::handle(&self.writer, ctx).await?
                }
                CompletionBehavior::VariantOnChild => {
                    child_variant::handle(&self.writer, ctx).await?
                }
                CompletionBehavior::ChildGeneration => {
                    child_generation::handle(&self.writer, ctx).await?
                }
                CompletionBehavior::StandaloneGeneration => {
                    return Ok(standalone::handle(&self.writer, ctx).await?);
                }
            };
            match handled {
                Handled::Done(outcome) => return Ok(outcome),
                Handled::NotApplicable(reason) => {
                    let next = fallback_for(behavior);
                    debug!(
                        task_id = %ctx.task_id(),
                        from = behavior.as_str(),
                        to = next.as_str(),
                        %reason,
                        "Behavior not applicable, falling back"
                    );
                    self.writer.sink().emit(CompletionEvent::FallbackTriggered {
                        task_id: ctx.task_id(),
                        from: behavior.as_str().to_string(),
                        to: next.as_str().to_string(),
                        reason,
                    });
                    behavior = next;
                }
            }
        }
    }

    async fn finalize(
        &self,
        outcome: &CompletionOutcome,
        task_id: TaskId,
    ) -> Result<(), CompletionError> {
        self.writer.mark_consumed(task_id).await?;
        if let Some(orchestrator_task_id) = outcome.consumed_orchestrator {
            self.writer.mark_consumed(orchestrator_task_id).await?;
        }
        Ok(())
    }
}

/// Next, less specific behavior when a handler is not applicable.
fn fallback_for(behavior: CompletionBehavior) -> CompletionBehavior {
    match behavior {
        CompletionBehavior::VariantOnChild => CompletionBehavior::ChildGeneration,
        _ => CompletionBehavior::StandaloneGeneration,
    }
}
