//! Workers: one delegated component per workflow capability
//!
//! Each worker implements [`Worker`] and is described by a
//! [`WorkerDescriptor`] in the [`WorkerRegistry`]. The orchestrator builds
//! live workers from the descriptors at startup.

pub mod analyst;
pub mod critic;
pub mod qa;
pub mod refinery;
pub mod registry;
pub mod steward;

pub use analyst::AnalystSquad;
pub use critic::Critic;
pub use qa::QAAgent;
pub use refinery::Refinery;
pub use registry::{builtin_descriptors, WorkerDescriptor, WorkerFactory, WorkerRegistry};
pub use steward::Steward;

use crate::config::Settings;
use crate::data::{DataCatalog, DatasetMetadata, Table};
use crate::error::{ErrorCode, FlowError};
use crate::llm::{LanguageModel, LlmError};
use crate::sandbox::{ExecutionError, GeneratedCodeExecutor, PlanError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

pub const STEWARD: &str = "Steward";
pub const REFINERY: &str = "Refinery";
pub const ANALYST_SQUAD: &str = "AnalystSquad";
pub const CRITIC: &str = "Critic";
pub const QA_AGENT: &str = "QAAgent";

/// Key of the descriptive statistics inside [`Insights::findings`]
pub const INITIAL_SCAN: &str = "Initial_Scan";
/// Key of the model narrative inside [`Insights::findings`]
pub const DEEP_DIVE: &str = "Deep_Dive";

/// Failure reported by a worker
///
/// Every rendering starts with `Error` so the text can be shown to the
/// operator as-is.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Error: {0} worker unavailable")]
    Unavailable(String),

    #[error("Error: failed to construct {worker}: {message}")]
    Construction { worker: String, message: String },

    #[error("Error: {worker} cannot handle {task} tasks")]
    UnsupportedTask { worker: String, task: &'static str },

    #[error("Error: {worker} returned {found} instead of {expected}")]
    UnexpectedOutput {
        worker: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Error loading data: {0}")]
    Data(String),

    #[error("Error reading metadata: {0}")]
    Metadata(String),

    #[error("Error from language model: {0}")]
    Model(#[from] LlmError),

    #[error("Error during cleaning: {0}")]
    Plan(#[from] PlanError),

    #[error("Error during cleaning: {0}")]
    Cleaning(#[source] ExecutionError),

    #[error("Error executing code: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Error writing output: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn code(&self) -> u16 {
        match self {
            WorkerError::Unavailable(_) => ErrorCode::WORKER_UNAVAILABLE,
            WorkerError::Construction { .. } => ErrorCode::WORKER_CONSTRUCTION_FAILED,
            WorkerError::UnsupportedTask { .. } | WorkerError::UnexpectedOutput { .. } => {
                ErrorCode::WORKER_UNSUPPORTED_TASK
            }
            WorkerError::Model(LlmError::Timeout(_)) => ErrorCode::WORKFLOW_MODEL_TIMEOUT,
            WorkerError::Model(_) => ErrorCode::WORKFLOW_MODEL_FAILED,
            WorkerError::Plan(e) => e.code(),
            WorkerError::Cleaning(e) | WorkerError::Execution(e) => e.code(),
            _ => ErrorCode::WORKER_DELEGATION_FAILED,
        }
    }
}

impl From<crate::data::TableError> for WorkerError {
    fn from(err: crate::data::TableError) -> Self {
        WorkerError::Data(err.to_string())
    }
}

impl From<WorkerError> for FlowError {
    fn from(err: WorkerError) -> Self {
        let worker = match &err {
            WorkerError::Unavailable(name)
            | WorkerError::Construction { worker: name, .. }
            | WorkerError::UnsupportedTask { worker: name, .. }
            | WorkerError::UnexpectedOutput { worker: name, .. } => Some(name.clone()),
            _ => None,
        };
        let text = err.to_string();
        let message = text
            .strip_prefix("Error: ")
            .or_else(|| text.strip_prefix("Error "))
            .unwrap_or(&text);
        FlowError::workflow_with_code(err.code(), message, worker)
    }
}

/// Schema passed along with the analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetContext {
    pub schema: Value,
}

/// Structured result of the analysis stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub findings: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_metadata: Option<DatasetContext>,
}

/// Work handed to a worker
#[derive(Debug, Clone)]
pub enum WorkerTask {
    Ingest { path: String },
    Clean { path: PathBuf },
    Analyze { path: PathBuf, schema: DatasetMetadata },
    Report { insights: Insights },
    Answer { question: String, path: PathBuf },
}

impl WorkerTask {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerTask::Ingest { .. } => "ingest",
            WorkerTask::Clean { .. } => "clean",
            WorkerTask::Analyze { .. } => "analyze",
            WorkerTask::Report { .. } => "report",
            WorkerTask::Answer { .. } => "answer",
        }
    }
}

/// What a worker produced
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerOutput {
    Profile(String),
    Cleaned(PathBuf),
    Insights(Insights),
    Report(String),
    Answer(String),
}

impl WorkerOutput {
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerOutput::Profile(_) => "profile",
            WorkerOutput::Cleaned(_) => "cleaned path",
            WorkerOutput::Insights(_) => "insights",
            WorkerOutput::Report(_) => "report",
            WorkerOutput::Answer(_) => "answer",
        }
    }
}

/// A delegated workflow capability
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError>;

    /// Error for a task this worker does not perform
    fn unsupported(&self, task: &WorkerTask) -> WorkerError {
        WorkerError::UnsupportedTask {
            worker: self.name().to_string(),
            task: task.kind(),
        }
    }
}

/// Log a named processing step of a worker
pub(crate) fn log_step(worker: &str, step: &str, details: &str) {
    info!(worker, "STEP: {} | {}", step, details);
}

/// Run blocking file work on the blocking pool
pub(crate) async fn blocking_io<T, F>(work: F) -> Result<T, WorkerError>
where
    F: FnOnce() -> Result<T, WorkerError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| WorkerError::Io(std::io::Error::other(e)))?
}

pub(crate) async fn read_table(path: &Path) -> Result<Table, WorkerError> {
    let path = path.to_path_buf();
    blocking_io(move || Ok(Table::read_path(&path)?)).await
}

/// Write `table` to `path`, creating the parent directory
pub(crate) async fn write_table(table: Table, path: &Path) -> Result<(), WorkerError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let path = path.to_path_buf();
    blocking_io(move || Ok(table.write_path(&path)?)).await
}

/// Shared collaborators handed to worker factories
#[derive(Clone)]
pub struct WorkerDeps {
    pub settings: Arc<Settings>,
    pub model: Arc<dyn LanguageModel>,
    pub catalog: DataCatalog,
    pub executor: GeneratedCodeExecutor,
}

impl WorkerDeps {
    pub fn new(settings: Arc<Settings>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            catalog: DataCatalog::new(settings.data_dir.clone()),
            executor: GeneratedCodeExecutor::new(settings.executor),
            settings,
            model,
        }
    }
}
