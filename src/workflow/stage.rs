use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One state of the workflow state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStage {
    /// No dataset selected
    #[default]
    Idle,
    /// A dataset has been profiled
    Ingesting,
    /// A cleaned artifact exists
    Cleaning,
    /// Insights have been produced
    Analyzing,
    /// The final report has been delivered
    Reporting,
}

impl WorkflowStage {
    pub const ALL: [WorkflowStage; 5] = [
        WorkflowStage::Idle,
        WorkflowStage::Ingesting,
        WorkflowStage::Cleaning,
        WorkflowStage::Analyzing,
        WorkflowStage::Reporting,
    ];

    /// The stage reached by this stage's advancing trigger
    pub fn next(self) -> WorkflowStage {
        match self {
            WorkflowStage::Idle => WorkflowStage::Ingesting,
            WorkflowStage::Ingesting => WorkflowStage::Cleaning,
            WorkflowStage::Cleaning => WorkflowStage::Analyzing,
            WorkflowStage::Analyzing => WorkflowStage::Reporting,
            WorkflowStage::Reporting => WorkflowStage::Idle,
        }
    }

    /// Whether moving from `self` to `target` is an edge of the state machine
    ///
    /// Staying put is always allowed. The only backward edge is the reset
    /// from `Reporting` to `Idle`.
    pub fn can_transition_to(self, target: WorkflowStage) -> bool {
        self == target || self.next() == target
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStage::Idle => "IDLE",
            WorkflowStage::Ingesting => "INGESTING",
            WorkflowStage::Cleaning => "CLEANING",
            WorkflowStage::Analyzing => "ANALYZING",
            WorkflowStage::Reporting => "REPORTING",
        }
    }

    /// Prompt shown when input does not advance the stage
    pub fn default_prompt(self) -> &'static str {
        match self {
            WorkflowStage::Idle => "Type 'start' to begin.",
            WorkflowStage::Ingesting => "Data ingested. Ready to clean?",
            WorkflowStage::Cleaning => "Data cleaned. Ready to analyze?",
            WorkflowStage::Analyzing => "Analysis done. Ready for report?",
            WorkflowStage::Reporting => "Ask questions or type 'reset'.",
        }
    }
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown workflow stage: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges_only() {
        use WorkflowStage::*;
        assert!(Idle.can_transition_to(Ingesting));
        assert!(Ingesting.can_transition_to(Cleaning));
        assert!(Cleaning.can_transition_to(Analyzing));
        assert!(Analyzing.can_transition_to(Reporting));
        assert!(Reporting.can_transition_to(Idle));

        assert!(!Idle.can_transition_to(Cleaning));
        assert!(!Ingesting.can_transition_to(Reporting));
        assert!(!Cleaning.can_transition_to(Ingesting));
        assert!(!Analyzing.can_transition_to(Idle));
    }

    #[test]
    fn test_every_stage_may_stay() {
        for stage in WorkflowStage::ALL {
            assert!(stage.can_transition_to(stage));
        }
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        let json = serde_json::to_string(&WorkflowStage::Analyzing).unwrap();
        assert_eq!(json, "\"ANALYZING\"");
        let parsed: WorkflowStage = serde_json::from_str("\"REPORTING\"").unwrap();
        assert_eq!(parsed, WorkflowStage::Reporting);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!("cleaning".parse::<WorkflowStage>(), Ok(WorkflowStage::Cleaning));
        assert!("done".parse::<WorkflowStage>().is_err());
    }
}
