//! Gencomplete: Generation Completion Engine
//!
//! Turns finished generation tasks into generation and variant records. A declarative registry
//! maps each task type to a completion behavior; the dispatcher routes each completion signal
//! through that behavior, detects single-item runs, matches siblings by position and records
//! edits and upscales as variants of their source.

pub mod cli;
pub mod collapse;
pub mod config;
pub mod dispatch;
pub mod edit;
pub mod error;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod params;
pub mod persistence;
pub mod recover;
pub mod registry;
pub mod segment;
pub mod store;
pub mod telemetry;
pub mod tool;
pub mod types;

pub use dispatch::{CompletionDispatcher, CompletionOutcome, Disposition};
pub use error::{CompletionError, StorageError};
pub use model::{CompletionSignal, Generation, Variant};
pub use params::ParamBag;
pub use registry::{CompletionBehavior, CompletionConfig, CompletionRegistry};
pub use store::{GenerationStore, MemoryGenerationStore, SledGenerationStore};
