//! Cleaning: audit, model-authored plan, sandboxed execution

use super::{
    log_step, read_table, write_table, Worker, WorkerError, WorkerOutput, WorkerTask, REFINERY,
};
use crate::data::{null_counts, Table, CLEANED_PREFIX};
use crate::llm::LanguageModel;
use crate::sandbox::{GeneratedCodeExecutor, TransformationPlan, SNIPPET_REFERENCE};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::error;

pub struct Refinery {
    model: Arc<dyn LanguageModel>,
    executor: GeneratedCodeExecutor,
    /// Output directory for inputs given without a parent directory
    fallback_dir: PathBuf,
}

impl Refinery {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        executor: GeneratedCodeExecutor,
        fallback_dir: PathBuf,
    ) -> Self {
        Self {
            model,
            executor,
            fallback_dir,
        }
    }

    /// Clean the table at `path` and return where the result was written
    pub async fn clean(&self, path: &Path) -> Result<PathBuf, WorkerError> {
        log_step(REFINERY, "Start Cleaning", &format!("Cleaning {}", path.display()));
        let table = read_table(path).await?;

        let prompt = cleaning_prompt(&table)?;
        let response = self.model.generate(&prompt).await?;

        let plan = TransformationPlan::from_response(&response)?;
        log_step(REFINERY, "Plan Generated", &plan.explanation);

        let outcome = self
            .executor
            .execute(&plan.code, &table)
            .map_err(|e| {
                error!("Cleaning failed: {}", e);
                WorkerError::Cleaning(e)
            })?;

        let target = self.cleaned_path(path);
        write_table(outcome.table, &target).await?;

        log_step(
            REFINERY,
            "Success",
            &format!("Cleaned data saved to {}", target.display()),
        );
        Ok(target)
    }

    fn cleaned_path(&self, source: &Path) -> PathBuf {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = match source.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => self.fallback_dir.clone(),
        };
        dir.join(format!("{}{}", CLEANED_PREFIX, name))
    }
}

fn cleaning_prompt(table: &Table) -> Result<String, WorkerError> {
    let mut dtypes = BTreeMap::new();
    for column in table.columns() {
        dtypes.insert(column.clone(), table.column_type(column)?.dtype_name());
    }
    let nulls = serde_json::to_string(&null_counts(table)).unwrap_or_default();
    let dtypes = serde_json::to_string(&dtypes).unwrap_or_default();

    Ok(format!(
        "You are a data cleaning expert.\n\n\
         TASK: write a cleaning plan for the loaded table.\n\n\
         CONTEXT:\n\
         - Audit: Nulls: {nulls}\n\
         - Types: {dtypes}\n\
         - Columns: {columns:?}\n\n\
         The code must use only this statement language:\n{reference}\n\n\
         Fix nulls, type mismatches and duplicates. Check the column names above.\n\
         Output a JSON object with the keys \"explanation\" and \"code\", for example:\n\
         {{\"explanation\": \"Filled missing ages with the median\", \"code\": \"fill_null(\\\"age\\\", median)\"}}\n\n\
         Return ONLY the JSON object.",
        nulls = nulls,
        dtypes = dtypes,
        columns = table.columns(),
        reference = SNIPPET_REFERENCE,
    ))
}

#[async_trait]
impl Worker for Refinery {
    fn name(&self) -> &str {
        REFINERY
    }

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        match task {
            WorkerTask::Clean { path } => self.clean(&path).await.map(WorkerOutput::Cleaned),
            other => Err(self.unsupported(&other)),
        }
    }
}
