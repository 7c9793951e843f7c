//! CLI route: single route table and run context. Dispatches to the engine and presentation.

use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_children, format_config, format_generation, format_outcome, format_recovery,
    format_types,
};
use crate::config::{ConfigLoader, EngineConfig};
use crate::dispatch::CompletionDispatcher;
use crate::error::{CompletionError, StorageError};
use crate::model::CompletionSignal;
use crate::recover;
use crate::store::{GenerationStore, SledGenerationStore};
use crate::telemetry::{EventBus, EventEnvelope};
use crate::types::{GenerationId, ShotId, TaskId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

/// Runtime context for CLI execution: config, store and dispatcher.
pub struct RunContext {
    config: EngineConfig,
    store: Arc<SledGenerationStore>,
    dispatcher: CompletionDispatcher,
    runtime: Runtime,
}

impl RunContext {
    /// Load config (explicit file or layered sources), open the store and build the dispatcher.
    pub fn new(
        workdir: &Path,
        config_path: Option<&Path>,
        store_override: Option<PathBuf>,
    ) -> Result<Self, CompletionError> {
        let mut config = match config_path {
            Some(path) => ConfigLoader::load_with_file(path)?,
            None => ConfigLoader::load(workdir)?,
        };
        if let Some(store_path) = store_override {
            config.storage.store_path = store_path;
        }
        config.ensure_valid()?;

        std::fs::create_dir_all(&config.storage.store_path).map_err(StorageError::IoError)?;
        let store = Arc::new(SledGenerationStore::new(&config.storage.store_path)?);
        let registry = Arc::new(config.completion_registry()?);
        let dispatcher = CompletionDispatcher::new(store.clone(), registry)
            .with_tools(Arc::new(config.tool_registry()));
        let runtime = Runtime::new().map_err(StorageError::IoError)?;

        info!(store_path = %config.storage.store_path.display(), "Run context ready");
        Ok(Self {
            config,
            store,
            dispatcher,
            runtime,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, CompletionError> {
        match command {
            Commands::Complete {
                payload,
                events,
                format,
            } => self.handle_complete(payload, *events, format),
            Commands::Show { task, format } => self.handle_show(*task, format),
            Commands::Children { parent, format } => self.handle_children(*parent, format),
            Commands::Recover {
                tasks,
                dry_run,
                format,
            } => self.handle_recover(tasks, *dry_run, format),
            Commands::AddShot { shot } => self.handle_add_shot(*shot),
            Commands::Types { format } => format_types(self.dispatcher.registry(), format),
            Commands::Config => format_config(&self.config),
        }
    }

    fn handle_complete(
        &self,
        payload: &Path,
        collect_events: bool,
        format: &str,
    ) -> Result<String, CompletionError> {
        let signal = read_signal(payload)?;

        let (dispatcher, receiver) = if collect_events {
            let (bus, receiver) = EventBus::new_pair();
            (
                self.dispatcher.clone().with_sink(Arc::new(bus)),
                Some(receiver),
            )
        } else {
            (self.dispatcher.clone(), None)
        };

        let outcome = self.runtime.block_on(dispatcher.complete(&signal))?;
        self.store.flush()?;

        let events: Vec<EventEnvelope> = receiver
            .map(|rx| rx.try_iter().collect())
            .unwrap_or_default();
        format_outcome(&outcome, &events, format)
    }

    fn handle_show(&self, task: TaskId, format: &str) -> Result<String, CompletionError> {
        self.runtime.block_on(async {
            let store: &dyn GenerationStore = &*self.store;
            let consumed = store.is_task_generation_created(task).await?;
            let Some(generation) = store.find_generation_by_task_id(task).await? else {
                return Ok(format!(
                    "No generation records task {} (consumed: {})",
                    task, consumed
                ));
            };
            let variants = store.list_variants(generation.id).await?;
            format_generation(&generation, &variants, format)
        })
    }

    fn handle_children(
        &self,
        parent_id: GenerationId,
        format: &str,
    ) -> Result<String, CompletionError> {
        self.runtime.block_on(async {
            let store: &dyn GenerationStore = &*self.store;
            let parent = store
                .get_generation(parent_id)
                .await?
                .ok_or(StorageError::GenerationNotFound(parent_id))?;
            let mut children = Vec::new();
            for child in store.list_children(parent_id).await? {
                let variants = store.count_variants(child.id).await?;
                children.push((child, variants));
            }
            children.sort_by_key(|(child, _)| (child.child_order, child.created_at));
            format_children(&parent, &children, format)
        })
    }

    fn handle_recover(
        &self,
        tasks: &Path,
        dry_run: bool,
        format: &str,
    ) -> Result<String, CompletionError> {
        let records = recover::load_task_dump(tasks)?;
        let report = self
            .runtime
            .block_on(recover::recover(&self.dispatcher, records, dry_run))?;
        if !dry_run {
            self.store.flush()?;
        }
        format_recovery(&report, format)
    }

    fn handle_add_shot(&self, shot: ShotId) -> Result<String, CompletionError> {
        self.store.add_shot(shot)?;
        self.store.flush()?;
        Ok(format!("Shot {} registered", shot))
    }
}

fn read_signal(path: &Path) -> Result<CompletionSignal, CompletionError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        CompletionError::InvalidSignal(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        CompletionError::InvalidSignal(format!("cannot parse {}: {}", path.display(), e))
    })
}
