//! Ad-hoc questions answered by running model-written snippets

use super::{log_step, read_table, Worker, WorkerError, WorkerOutput, WorkerTask, QA_AGENT};
use crate::data::Table;
use crate::llm::LanguageModel;
use crate::sandbox::{extract_code_block, CapturedOutput, GeneratedCodeExecutor, SNIPPET_REFERENCE};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Marker the model uses to decline questions unrelated to the data
pub const REFUSAL_MARKER: &str = "only answer questions about the dataset";
pub const NO_CODE_ANSWER: &str = "Could not generate executable code to answer your question.";
pub const SILENT_CODE_ANSWER: &str = "Code ran but printed nothing.";

const SAMPLE_ROWS: usize = 5;

pub struct QAAgent {
    model: Arc<dyn LanguageModel>,
    executor: GeneratedCodeExecutor,
}

impl QAAgent {
    pub fn new(model: Arc<dyn LanguageModel>, executor: GeneratedCodeExecutor) -> Self {
        Self { model, executor }
    }

    pub async fn answer_question(&self, question: &str, path: &Path) -> Result<String, WorkerError> {
        log_step(QA_AGENT, "Q&A", &format!("Analyzing: {}", question));
        let table = read_table(path).await?;

        let response = self.model.generate(&qa_prompt(&table, question)).await?;
        if response.contains(REFUSAL_MARKER) {
            log_step(QA_AGENT, "Q&A", "Question deemed irrelevant");
            return Ok(response.replace("```", "").trim().to_string());
        }

        let Some(code) = extract_code_block(&response) else {
            return Ok(NO_CODE_ANSWER.to_string());
        };
        log_step(QA_AGENT, "Code Gen", &code);

        let outcome = self.executor.execute(&code, &table)?;
        Ok(match outcome.output {
            CapturedOutput::Empty => SILENT_CODE_ANSWER.to_string(),
            CapturedOutput::Text(text) => text,
        })
    }
}

fn qa_prompt(table: &Table, question: &str) -> String {
    format!(
        "You are a data analyst.\n\
         CONTEXT: Columns: {columns:?}\n\
         Sample:\n{sample}\n\
         QUESTION: {question}\n\n\
         INSTRUCTIONS:\n\
         1. Decide whether the question is about this dataset.\n\
         2. If it is not, reply exactly: \"I can only answer questions about the dataset.\"\n\
         3. Otherwise write code in this statement language:\n{reference}\n\
         Print the answer as a complete sentence and wrap the code in ``` fences.",
        columns = table.columns(),
        sample = table.head_text(SAMPLE_ROWS),
        question = question,
        reference = SNIPPET_REFERENCE,
    )
}

#[async_trait]
impl Worker for QAAgent {
    fn name(&self) -> &str {
        QA_AGENT
    }

    async fn handle(&self, task: WorkerTask) -> Result<WorkerOutput, WorkerError> {
        match task {
            WorkerTask::Answer { question, path } => self
                .answer_question(&question, &path)
                .await
                .map(WorkerOutput::Answer),
            other => Err(self.unsupported(&other)),
        }
    }
}
