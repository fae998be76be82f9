//! Analysis: descriptive statistics plus a model-written deep dive

use super::{
    log_step, read_table, DatasetContext, Insights, Worker, WorkerError, WorkerOutput,
    WorkerTask, ANALYST_SQUAD, DEEP_DIVE, INITIAL_SCAN,
};
use crate::data::{describe, DatasetMetadata};
use crate::llm::LanguageModel;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub struct AnalystSquad {
    model: Arc<dyn LanguageModel>,
}

impl AnalystSquad {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        path: &Path,
        schema: &DatasetMetadata,
    ) -> Result<Insights, WorkerError> {
        log_step(ANALYST_SQUAD, "Initial Scan", &path.display().to_string());
        let table = read_table(path).await?;

        let scan = json!({
            "rows": table.num_rows(),
            "columns": describe(&table),
        });
        let schema = schema.to_json();

        let narrative = self
            .model
            .generate(&deep_dive_prompt(&scan, &schema))
            .await?;
        log_step(ANALYST_SQUAD, "Deep Dive", "Narrative generated");

        let mut findings = BTreeMap::new();
        findings.insert(INITIAL_SCAN.to_string(), scan);
        findings.insert(DEEP_DIVE.to_string(), Value::String(narrative));

        Ok(Insights {
            findings,
            dataset_metadata: Some(DatasetContext { schema }),
        })
    }
}

fn deep_dive_prompt(scan: &Value, schema: &Value) -> String {
    format!(
        "You are a lead data analyst.\n\n\
         Descriptive statistics:\n{scan}\n\n\
         Schema:\n{schema}\n\n\
         Identify the most interesting distributions, relationships and trends. \
         Explain anomalies and propose hypotheses that could explain them. \
         Answer in concise markdown.",
        scan = serde_json::to_string_pretty(scan).unwrap_or_default(),
        schema = serde_json::to_string_pretty(schema).unwrap_or_default(),
    )
}

#[async_trait]
impl Worker for AnalystSquad {
    fn name(&self) -> &str {
        ANALYST_SQUAD
    }

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        match task {
            WorkerTask::Analyze { path, schema } => self
                .analyze(&path, &schema)
                .await
                .map(WorkerOutput::Insights),
            other => Err(self.unsupported(&other)),
        }
    }
}
