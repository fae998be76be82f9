//! Tabular data: the in-memory table, the dataset catalog and column
//! statistics

pub mod catalog;
pub mod stats;
pub mod table;

pub use catalog::{DataCatalog, DatasetMetadata, CLEANED_PREFIX};
pub use stats::{describe, null_counts, ColumnStats, NumericSummary};
pub use table::{Cell, ColumnType, Table, TableError};
