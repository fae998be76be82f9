//! Workflow stages and input classification
//!
//! Five stages, one forward edge out of each, and a reset edge from the
//! final stage back to the start. Keyword matching on operator input lives
//! in [`trigger`].

pub mod stage;
pub mod trigger;

pub use stage::WorkflowStage;
pub use trigger::{classify_trigger, is_tabular_file, Trigger, TABULAR_EXTENSIONS};
