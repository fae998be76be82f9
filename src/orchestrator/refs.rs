use crate::workers::Insights;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Context key of the ingested dataset name
pub const CURRENT_FILE: &str = "current_file";
/// Context key of the cleaned artifact path
pub const CLEANING_RESULT: &str = "cleaning_result";
/// Context key of the analysis result
pub const INSIGHTS: &str = "insights";
/// Context key of the final report text
pub const FINAL_REPORT: &str = "final_report";

/// Working references carried between stages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowRefs {
    pub current_file: Option<String>,
    pub cleaning_result: Option<PathBuf>,
    pub insights: Option<Insights>,
}

impl WorkflowRefs {
    /// Re-derive references from a session context
    pub fn from_context(context: &BTreeMap<String, Value>) -> Self {
        let current_file = context
            .get(CURRENT_FILE)
            .and_then(Value::as_str)
            .map(str::to_string);
        let cleaning_result = context
            .get(CLEANING_RESULT)
            .and_then(Value::as_str)
            .map(PathBuf::from);
        let insights = context.get(INSIGHTS).and_then(|value| {
            serde_json::from_value(value.clone())
                .map_err(|e| warn!("Ignoring unreadable insights in session context: {}", e))
                .ok()
        });

        Self {
            current_file,
            cleaning_result,
            insights,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current_file.is_none() && self.cleaning_result.is_none() && self.insights.is_none()
    }
}
