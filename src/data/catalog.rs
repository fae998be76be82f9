use super::table::{Table, TableError};
use crate::workflow::is_tabular_file;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prefix of cleaned artifacts written next to their source
pub const CLEANED_PREFIX: &str = "cleaned_";

/// Number of rows included in a metadata sample
const SAMPLE_ROWS: usize = 5;

/// Metadata answer: either a schema preview or an error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatasetMetadata {
    Schema {
        columns: Vec<String>,
        dtypes: BTreeMap<String, String>,
        sample: Vec<serde_json::Map<String, Value>>,
    },
    Error {
        error: String,
    },
}

impl DatasetMetadata {
    pub fn error(message: impl Into<String>) -> Self {
        DatasetMetadata::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DatasetMetadata::Error { .. })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Read-only view of the data directory
#[derive(Debug, Clone)]
pub struct DataCatalog {
    data_dir: PathBuf,
}

impl DataCatalog {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Tabular files in the data directory, sorted, without cleaned artifacts
    pub fn list_files(&self) -> std::io::Result<Vec<String>> {
        if !self.data_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_tabular_file(&name) && !name.starts_with(CLEANED_PREFIX) {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Locate a dataset: an existing path as given, else inside the data directory
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Some(direct);
        }
        let in_store = self.data_dir.join(name);
        in_store.is_file().then_some(in_store)
    }

    /// Columns, dtypes and a sample of the first rows
    pub fn get_metadata(&self, name: &str) -> DatasetMetadata {
        if !is_tabular_file(name) {
            return DatasetMetadata::error("Unsupported file format");
        }
        let Some(path) = self.resolve(name) else {
            return DatasetMetadata::error("File not found");
        };

        match Self::read_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => DatasetMetadata::error(e.to_string()),
        }
    }

    fn read_metadata(path: &Path) -> Result<DatasetMetadata, TableError> {
        let table = Table::read_path_limited(path, Some(SAMPLE_ROWS))?;
        let mut dtypes = BTreeMap::new();
        for column in table.columns() {
            let dtype = table.column_type(column)?;
            dtypes.insert(column.clone(), dtype.dtype_name().to_string());
        }
        Ok(DatasetMetadata::Schema {
            columns: table.columns().to_vec(),
            dtypes,
            sample: table.sample_records(SAMPLE_ROWS),
        })
    }
}
