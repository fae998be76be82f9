//! Ingestion: metadata extraction and the data profile

use super::{blocking_io, log_step, Worker, WorkerError, WorkerOutput, WorkerTask, STEWARD};
use crate::data::{DataCatalog, DatasetMetadata};
use crate::llm::LanguageModel;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub struct Steward {
    model: Arc<dyn LanguageModel>,
    catalog: DataCatalog,
}

impl Steward {
    pub fn new(model: Arc<dyn LanguageModel>, catalog: DataCatalog) -> Self {
        Self { model, catalog }
    }

    /// Profile the dataset at `path` (a name in the data directory or a path)
    pub async fn ingest(&self, path: &str) -> Result<String, WorkerError> {
        log_step(STEWARD, "Ingestion", &format!("Reading file: {}", path));

        let catalog = self.catalog.clone();
        let name = path.to_string();
        let metadata = blocking_io(move || Ok(catalog.get_metadata(&name))).await?;
        if let DatasetMetadata::Error { error } = &metadata {
            return Err(WorkerError::Metadata(error.clone()));
        }

        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let profile = self
            .model
            .generate(&profile_prompt(&filename, &metadata))
            .await?;

        log_step(STEWARD, "Profile Created", "Data profile generated");
        Ok(profile)
    }
}

fn profile_prompt(filename: &str, metadata: &DatasetMetadata) -> String {
    format!(
        "You are a Data Steward. Create a data profile for the file '{filename}'.\n\n\
         Metadata extracted:\n{metadata}\n\n\
         Infer the domain from the file name and columns, then answer in markdown:\n\n\
         ## Data Profile for '{filename}'\n\n\
         ### 1. Domain Context\n\
         [What this data likely represents]\n\n\
         ### 2. Column Analysis\n\
         [Key columns, expected types and meaning]\n\n\
         ### 3. Potential Quality Pitfalls\n\
         [Specific issues to watch for, e.g. negative prices or mixed date formats]\n",
        filename = filename,
        metadata = metadata.to_json(),
    )
}

#[async_trait]
impl Worker for Steward {
    fn name(&self) -> &str {
        STEWARD
    }

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        match task {
            WorkerTask::Ingest { path } => self.ingest(&path).await.map(WorkerOutput::Profile),
            other => Err(self.unsupported(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use tempfile::TempDir;

    fn setup(responses: &[&str]) -> (TempDir, Arc<ScriptedModel>, Steward) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("sales.csv"),
            "region,amount\nnorth,10\nsouth,20\n",
        )
        .unwrap();
        let model = Arc::new(ScriptedModel::with_responses(responses.iter().copied()));
        let steward = Steward::new(model.clone(), DataCatalog::new(dir.path()));
        (dir, model, steward)
    }

    #[tokio::test]
    async fn test_ingest_returns_model_profile() {
        let (_dir, model, steward) = setup(&["## Data Profile for 'sales.csv'"]);
        let output = steward
            .handle(WorkerTask::Ingest {
                path: "sales.csv".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            output,
            WorkerOutput::Profile("## Data Profile for 'sales.csv'".to_string())
        );
        let prompts = model.prompts().await;
        assert!(prompts[0].contains("'sales.csv'"));
        assert!(prompts[0].contains("region"));
        assert!(prompts[0].contains("Potential Quality Pitfalls"));
    }

    #[tokio::test]
    async fn test_missing_file_fails_without_model_call() {
        let (_dir, model, steward) = setup(&[]);
        let err = steward.ingest("ghost.csv").await.unwrap_err();
        assert!(matches!(err, WorkerError::Metadata(ref m) if m == "File not found"));
        assert!(model.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_other_tasks() {
        let (_dir, _model, steward) = setup(&[]);
        let err = steward
            .handle(WorkerTask::Report {
                insights: crate::workers::Insights {
                    findings: Default::default(),
                    dataset_metadata: None,
                },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::UnsupportedTask { task: "report", .. }));
    }
}
