use super::WorkflowStage;

/// File extensions accepted as datasets
pub const TABULAR_EXTENSIONS: &[&str] = &[".csv", ".tsv"];

/// What an operator input asks the orchestrator to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// List the datasets in the catalog
    ListDatasets,
    /// Ingest the named dataset
    Ingest(String),
    Clean,
    Analyze,
    Report,
    /// Clear the workflow back to `Idle`
    Reset,
    /// Not a trigger for the current stage
    Fallback,
}

impl Trigger {
    /// Whether this trigger moves the session to another stage
    pub fn advances(&self) -> bool {
        !matches!(self, Trigger::ListDatasets | Trigger::Fallback)
    }
}

/// Whether `name` ends in one of the recognised tabular extensions
pub fn is_tabular_file(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    TABULAR_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Classify an operator input for the given stage
///
/// Matching is case-insensitive and substring based. `"yes"` advances every
/// middle stage; `reset` is only recognised in `Reporting`.
pub fn classify_trigger(stage: WorkflowStage, input: &str) -> Trigger {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    match stage {
        WorkflowStage::Idle => {
            if lower == "start" {
                Trigger::ListDatasets
            } else if is_tabular_file(trimmed) {
                Trigger::Ingest(trimmed.to_string())
            } else {
                Trigger::Fallback
            }
        }
        WorkflowStage::Ingesting if lower.contains("clean") || lower.contains("yes") => {
            Trigger::Clean
        }
        WorkflowStage::Cleaning if lower.contains("analyze") || lower.contains("yes") => {
            Trigger::Analyze
        }
        WorkflowStage::Analyzing if lower.contains("report") || lower.contains("yes") => {
            Trigger::Report
        }
        WorkflowStage::Reporting if lower.contains("reset") => Trigger::Reset,
        _ => Trigger::Fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowStage::*;

    #[test]
    fn test_idle_triggers() {
        assert_eq!(classify_trigger(Idle, "start"), Trigger::ListDatasets);
        assert_eq!(classify_trigger(Idle, "  START "), Trigger::ListDatasets);
        assert_eq!(
            classify_trigger(Idle, "sales.csv"),
            Trigger::Ingest("sales.csv".to_string())
        );
        assert_eq!(
            classify_trigger(Idle, "Q3 Numbers.TSV"),
            Trigger::Ingest("Q3 Numbers.TSV".to_string())
        );
        assert_eq!(classify_trigger(Idle, "start now"), Trigger::Fallback);
        assert_eq!(classify_trigger(Idle, "sales.xlsx"), Trigger::Fallback);
    }

    #[test]
    fn test_keywords_are_substrings() {
        assert_eq!(classify_trigger(Ingesting, "clean please"), Trigger::Clean);
        assert_eq!(classify_trigger(Ingesting, "Yes"), Trigger::Clean);
        assert_eq!(classify_trigger(Cleaning, "let's ANALYZE"), Trigger::Analyze);
        assert_eq!(classify_trigger(Analyzing, "full report"), Trigger::Report);
        assert_eq!(classify_trigger(Reporting, "please reset"), Trigger::Reset);
    }

    #[test]
    fn test_keywords_of_other_stages_fall_back() {
        assert_eq!(
            classify_trigger(Cleaning, "why do 12 rows have nulls"),
            Trigger::Fallback
        );
        assert_eq!(classify_trigger(Ingesting, "report"), Trigger::Fallback);
        assert_eq!(classify_trigger(Idle, "reset"), Trigger::Fallback);
        assert_eq!(classify_trigger(Reporting, "yes"), Trigger::Fallback);
    }

    #[test]
    fn test_yes_advances_middle_stages_only() {
        let advancing: Vec<_> = WorkflowStage::ALL
            .into_iter()
            .filter(|stage| classify_trigger(*stage, "yes").advances())
            .collect();
        assert_eq!(advancing, vec![Ingesting, Cleaning, Analyzing]);
    }
}
