//! The workflow state machine
//!
//! [`Orchestrator::route`] reads the session stage, classifies the input,
//! delegates to a worker and records the outcome. Nothing it does can fail
//! the caller: every error becomes response text and leaves the session as
//! it was.

pub mod refs;

pub use refs::{WorkflowRefs, CLEANING_RESULT, CURRENT_FILE, FINAL_REPORT, INSIGHTS};

use crate::data::DataCatalog;
use crate::error::FlowError;
use crate::session::{MessageRole, SessionManager};
use crate::workers::{
    blocking_io, Worker, WorkerDeps, WorkerError, WorkerOutput, WorkerRegistry, WorkerTask,
    ANALYST_SQUAD, CRITIC, QA_AGENT, REFINERY, STEWARD,
};
use crate::workflow::{classify_trigger, Trigger, WorkflowStage};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const RESET_MESSAGE: &str = "System reset.";
pub const NO_FILES_MESSAGE: &str = "No files found. Please add a CSV.";

/// Why a stage handler did not complete
#[derive(Error, Debug)]
enum RouteError {
    #[error("Error: No {0}.")]
    MissingReference(&'static str),

    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("{}", .0.user_message())]
    Session(#[from] FlowError),
}

pub struct Orchestrator {
    manager: SessionManager,
    workers: BTreeMap<String, Arc<dyn Worker>>,
    catalog: DataCatalog,
    refs: WorkflowRefs,
}

impl Orchestrator {
    /// Build every registered worker and hydrate from the session context
    pub fn new(manager: SessionManager, registry: &WorkerRegistry, deps: &WorkerDeps) -> Self {
        let workers = registry.instantiate_all(deps);
        for name in workers.keys() {
            info!("Loaded worker: {}", name);
        }
        let mut orchestrator = Self {
            manager,
            workers,
            catalog: deps.catalog.clone(),
            refs: WorkflowRefs::default(),
        };
        orchestrator.hydrate();
        orchestrator
    }

    /// Re-derive working references from the session context
    pub fn hydrate(&mut self) {
        self.refs = WorkflowRefs::from_context(self.manager.context());
        if !self.refs.is_empty() {
            info!(
                "State hydrated: File={}",
                self.refs.current_file.as_deref().unwrap_or("none")
            );
        }
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut SessionManager {
        &mut self.manager
    }

    pub fn refs(&self) -> &WorkflowRefs {
        &self.refs
    }

    pub fn stage(&self) -> WorkflowStage {
        self.manager.stage()
    }

    /// Names of the workers that constructed successfully
    pub fn worker_names(&self) -> Vec<&str> {
        self.workers.keys().map(String::as_str).collect()
    }

    /// Handle one line of operator input and produce the reply
    pub async fn route(&mut self, input: &str) -> String {
        let stage = self.manager.stage();
        info!("STEP: Routing | Current State: {}, Input: {}", stage, input);

        match classify_trigger(stage, input) {
            Trigger::ListDatasets => self.list_datasets(),
            Trigger::Ingest(file) => self.ingest(&file).await.unwrap_or_else(render_failure),
            Trigger::Clean => self
                .clean()
                .await
                .unwrap_or_else(|e| format!("Refinery failed: {}", render_failure(e))),
            Trigger::Analyze => self.analyze().await.unwrap_or_else(render_failure),
            Trigger::Report => self.report().await.unwrap_or_else(render_failure),
            Trigger::Reset => self.reset().unwrap_or_else(render_failure),
            Trigger::Fallback if stage == WorkflowStage::Idle => stage.default_prompt().to_string(),
            Trigger::Fallback => self.qa_fallback(input, stage.default_prompt()).await,
        }
    }

    fn list_datasets(&self) -> String {
        match self.catalog.list_files() {
            Ok(files) if !files.is_empty() => {
                let listing: Vec<String> = files.iter().map(|f| format!("- {}", f)).collect();
                format!(
                    "Available files:\n{}\n\nPlease type filename.",
                    listing.join("\n")
                )
            }
            Ok(_) => NO_FILES_MESSAGE.to_string(),
            Err(e) => {
                warn!("Could not list {}: {}", self.catalog.data_dir().display(), e);
                NO_FILES_MESSAGE.to_string()
            }
        }
    }

    async fn ingest(&mut self, file: &str) -> Result<String, RouteError> {
        info!("STEP: Delegating | {} -> {}", STEWARD, file);
        let output = self
            .delegate(STEWARD, WorkerTask::Ingest {
                path: file.to_string(),
            })
            .await?;
        let WorkerOutput::Profile(profile) = output else {
            return Err(unexpected(STEWARD, "profile", &output));
        };

        self.manager
            .add_message(MessageRole::System, format!("Data Profile: {}", profile));
        self.manager
            .set_context(CURRENT_FILE, Value::String(file.to_string()));
        self.manager.set_display_name(format!("Analysis of {}", file));
        self.manager.set_stage(WorkflowStage::Ingesting)?;
        self.refs.current_file = Some(file.to_string());

        Ok(format!(
            "✅ **Steward Analysis Complete**\n\n{}\n\n---\n**System:** Ready to clean? (Type 'clean')",
            profile
        ))
    }

    async fn clean(&mut self) -> Result<String, RouteError> {
        info!("STEP: Delegating | {}", REFINERY);
        let file = self
            .refs
            .current_file
            .clone()
            .ok_or(RouteError::MissingReference("file"))?;
        let path = self.resolve_dataset(&file);

        let output = self.delegate(REFINERY, WorkerTask::Clean { path }).await?;
        let WorkerOutput::Cleaned(cleaned) = output else {
            return Err(unexpected(REFINERY, "cleaned path", &output));
        };
        let cleaned_text = cleaned.display().to_string();

        self.manager
            .add_message(MessageRole::System, format!("Cleaned File: {}", cleaned_text));
        self.manager
            .set_context(CLEANING_RESULT, Value::String(cleaned_text.clone()));
        self.manager.set_stage(WorkflowStage::Cleaning)?;
        self.refs.cleaning_result = Some(cleaned);

        Ok(format!(
            "Refinery finished. Saved to: {}\n\nProceed to analysis?",
            cleaned_text
        ))
    }

    async fn analyze(&mut self) -> Result<String, RouteError> {
        info!("STEP: Context Compaction | Preparing analysis");
        let cleaned = self
            .refs
            .cleaning_result
            .clone()
            .ok_or(RouteError::MissingReference("cleaned data"))?;
        let catalog = self.catalog.clone();
        let name = cleaned.to_string_lossy().into_owned();
        let schema = blocking_io(move || Ok(catalog.get_metadata(&name))).await?;

        info!("STEP: Delegating | {}", ANALYST_SQUAD);
        let output = self
            .delegate(ANALYST_SQUAD, WorkerTask::Analyze {
                path: cleaned,
                schema,
            })
            .await?;
        let WorkerOutput::Insights(insights) = output else {
            return Err(unexpected(ANALYST_SQUAD, "insights", &output));
        };

        let value = serde_json::to_value(&insights).unwrap_or(Value::Null);
        self.manager.add_message(
            MessageRole::System,
            format!("Analysis Insights: {}", value),
        );
        self.manager.set_context(INSIGHTS, value);
        self.manager.set_stage(WorkflowStage::Analyzing)?;
        self.refs.insights = Some(insights);

        Ok("Analyst Squad finished.\n\nProceed to report?".to_string())
    }

    async fn report(&mut self) -> Result<String, RouteError> {
        info!("STEP: Delegating | {}", CRITIC);
        let insights = self
            .refs
            .insights
            .clone()
            .ok_or(RouteError::MissingReference("insights"))?;

        let output = self.delegate(CRITIC, WorkerTask::Report { insights }).await?;
        let WorkerOutput::Report(report) = output else {
            return Err(unexpected(CRITIC, "report", &output));
        };

        self.manager
            .add_message(MessageRole::Assistant, report.clone());
        self.manager
            .set_context(FINAL_REPORT, Value::String(report.clone()));
        self.manager.set_stage(WorkflowStage::Reporting)?;

        Ok(format!(
            "FINAL REPORT:\n\n{}\n\n(Ask questions or type 'reset')",
            report
        ))
    }

    fn reset(&mut self) -> Result<String, RouteError> {
        self.manager.set_stage(WorkflowStage::Idle)?;
        self.manager.clear_context();
        self.refs = WorkflowRefs::default();
        Ok(RESET_MESSAGE.to_string())
    }

    /// Answer free text against the best available file, else restate the prompt
    async fn qa_fallback(&self, question: &str, default_prompt: &str) -> String {
        let Some(path) = self.qa_target() else {
            return default_prompt.to_string();
        };
        let Some(agent) = self.workers.get(QA_AGENT) else {
            return default_prompt.to_string();
        };

        info!("STEP: Routing | Delegating to {}", QA_AGENT);
        let answer = match agent
            .handle(WorkerTask::Answer {
                question: question.to_string(),
                path,
            })
            .await
        {
            Ok(WorkerOutput::Answer(answer)) => answer,
            Ok(other) => unexpected(QA_AGENT, "answer", &other).to_string(),
            Err(e) => e.to_string(),
        };
        format!("💡 **Q&A Insight:**\n{}\n\n{}", answer, default_prompt)
    }

    /// Cleaned artifact if present on disk, else the ingested file
    fn qa_target(&self) -> Option<PathBuf> {
        let current = self.refs.current_file.as_deref()?;
        if let Some(cleaned) = &self.refs.cleaning_result {
            if cleaned.is_file() {
                return Some(cleaned.clone());
            }
        }
        self.catalog.resolve(current)
    }

    /// Path handed to workers for a dataset name; falls back to the data
    /// directory so the worker reports the missing file
    fn resolve_dataset(&self, name: &str) -> PathBuf {
        self.catalog
            .resolve(name)
            .unwrap_or_else(|| self.catalog.data_dir().join(Path::new(name)))
    }

    async fn delegate(&self, name: &str, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        let worker = self
            .workers
            .get(name)
            .ok_or_else(|| WorkerError::Unavailable(name.to_string()))?;
        worker.handle(task).await
    }
}

fn unexpected(worker: &str, expected: &'static str, found: &WorkerOutput) -> RouteError {
    RouteError::Worker(WorkerError::UnexpectedOutput {
        worker: worker.to_string(),
        expected,
        found: found.kind(),
    })
}

fn render_failure(err: RouteError) -> String {
    warn!("Stage handler failed: {}", err);
    err.to_string()
}
