//! Execution of externally authored transformation code
//!
//! Code arrives as a small snippet language (see `snippet.pest`) and is run
//! by [`GeneratedCodeExecutor`] against a copy of a [`crate::data::Table`].

pub mod error;
pub mod executor;
pub mod plan;
pub mod program;

pub use error::ExecutionError;
pub use executor::{
    capture_active, CapturedOutput, ExecutionOutcome, ExecutorLimits, GeneratedCodeExecutor,
};
pub use plan::{extract_code_block, extract_json_object, PlanError, TransformationPlan};
pub use program::Program;

/// Reference card included in prompts that ask for snippet code
pub const SNIPPET_REFERENCE: &str = r#"Statements (one per line):
  drop_column("c")            drop_nulls() / drop_nulls("c")    drop_duplicates()
  fill_null("c", value)       fill_null("c", mean|median|mode)
  cast("c", "int"|"float"|"text"|"bool")
  filter("c", "==|!=|>|>=|<|<=", value)
  rename("old", "new")        strip("c")  lower("c")  upper("c")
  print(expr, ...)
Expressions: "text", 12, 3.5, true, null,
  mean("c") median("c") sum("c") min("c") max("c") count_null("c") unique("c") count() columns()"#;
