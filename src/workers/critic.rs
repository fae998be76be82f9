use super::{log_step, Insights, Worker, WorkerError, WorkerOutput, WorkerTask, CRITIC};
use crate::llm::LanguageModel;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns analysis findings into the final report
pub struct Critic {
    model: Arc<dyn LanguageModel>,
}

impl Critic {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn evaluate_and_report(&self, insights: &Insights) -> Result<String, WorkerError> {
        log_step(CRITIC, "Critique", "Reviewing insights");
        let report = self.model.generate(&report_prompt(insights)).await?;
        log_step(CRITIC, "Report", &format!("{} characters", report.len()));
        Ok(report)
    }
}

fn report_prompt(insights: &Insights) -> String {
    let findings = serde_json::to_string_pretty(&insights.findings).unwrap_or_default();
    let schema = insights
        .dataset_metadata
        .as_ref()
        .map(|meta| {
            format!(
                "\nDataset Schema:\n{}\n",
                serde_json::to_string_pretty(&meta.schema).unwrap_or_default()
            )
        })
        .unwrap_or_default();

    format!(
        "You are a Chief Data Officer.\n\n\
         INPUT DATA (Analysis Findings):\n{findings}\n{schema}\n\
         TASK: Write a strategic data report for executives.\n\
         Combine the Initial_Scan statistics with the Deep_Dive narrative into one story.\n\n\
         Structure (markdown):\n\
         # Executive Summary\n\
         ## Strategic Deep Dive\n\
         ## Operational Recommendations\n",
        findings = findings,
        schema = schema,
    )
}

#[async_trait]
impl Worker for Critic {
    fn name(&self) -> &str {
        CRITIC
    }

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        match task {
            WorkerTask::Report { insights } => self
                .evaluate_and_report(&insights)
                .await
                .map(WorkerOutput::Report),
            other => Err(self.unsupported(&other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedModel;
    use crate::workers::{DatasetContext, INITIAL_SCAN};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_prompt_includes_findings_and_schema() {
        let model = Arc::new(ScriptedModel::with_responses(["# Executive Summary\nAll good."]));
        let critic = Critic::new(model.clone());
        let mut findings = BTreeMap::new();
        findings.insert(INITIAL_SCAN.to_string(), json!({"rows": 42}));
        let insights = Insights {
            findings,
            dataset_metadata: Some(DatasetContext {
                schema: json!({"columns": ["region"]}),
            }),
        };

        let output = critic
            .handle(WorkerTask::Report { insights })
            .await
            .unwrap();
        assert_eq!(
            output,
            WorkerOutput::Report("# Executive Summary\nAll good.".to_string())
        );

        let prompt = &model.prompts().await[0];
        assert!(prompt.contains("\"rows\": 42"));
        assert!(prompt.contains("Dataset Schema"));
        assert!(prompt.contains("Operational Recommendations"));
    }

    #[tokio::test]
    async fn test_schema_section_omitted_without_metadata() {
        let model = Arc::new(ScriptedModel::with_responses(["report"]));
        let critic = Critic::new(model.clone());
        let insights = Insights {
            findings: BTreeMap::new(),
            dataset_metadata: None,
        };
        critic.evaluate_and_report(&insights).await.unwrap();
        assert!(!model.prompts().await[0].contains("Dataset Schema"));
    }
}
