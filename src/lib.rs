//! # tabflow
//!
//! A guided workflow over tabular datasets: an operator picks a file, and the
//! session moves through ingestion, cleaning, analysis and reporting, each
//! stage delegated to a worker backed by a language model.
//!
//! ## Usage
//!
//! ```bash
//! tabflow run [--session <id> | --resume]
//! tabflow sessions list
//! tabflow datasets
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging, startup wiring and fatal error reporting
//! - `cli` - Argument parsing and command implementations
//! - `config` - Settings from TOML files and the environment
//! - `data` - In-memory tables, the dataset catalog and column statistics
//! - `error` - Unified error type with numeric codes
//! - `llm` - Language model clients
//! - `orchestrator` - The workflow state machine
//! - `sandbox` - Restricted execution of model-written transformation code
//! - `session` - Session records, storage and the active-session manager
//! - `workers` - The worker contract, registry and built-in workers
//! - `workflow` - Stages and input classification
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod sandbox;
pub mod session;
pub mod workers;
pub mod workflow;

pub use error::{FlowError, Result};
