use crate::error::{ErrorCode, FlowError};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Strings read as missing values
const NULL_MARKERS: &[&str] = &["", "na", "n/a", "nan", "null", "none", "-"];

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    #[error("Cannot convert '{value}' in column '{column}' to {target}")]
    Conversion {
        column: String,
        value: String,
        target: ColumnType,
    },

    #[error("Column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl From<TableError> for FlowError {
    fn from(err: TableError) -> Self {
        let code = match &err {
            TableError::Io(_) => ErrorCode::STORAGE_IO_ERROR,
            TableError::Csv(_) | TableError::RaggedRow { .. } => {
                ErrorCode::STORAGE_DESERIALIZATION_ERROR
            }
            TableError::UnsupportedFormat(_) => ErrorCode::STORAGE_GENERIC,
            _ => return FlowError::execution_with_code(ErrorCode::EXEC_RUNTIME, err.to_string()),
        };
        FlowError::storage_with_code(code, err.to_string(), None).with_source(err)
    }
}

/// Inferred type of a column, named the way dataframe libraries print them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    Float,
    Bool,
    Text,
    /// Every value is null
    Empty,
}

impl ColumnType {
    pub fn dtype_name(self) -> &'static str {
        match self {
            ColumnType::Int => "int64",
            ColumnType::Float => "float64",
            ColumnType::Bool => "bool",
            ColumnType::Text => "object",
            ColumnType::Empty => "float64",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "int" | "integer" | "int64" => Some(ColumnType::Int),
            "float" | "double" | "float64" | "number" => Some(ColumnType::Float),
            "bool" | "boolean" => Some(ColumnType::Bool),
            "text" | "str" | "string" | "object" => Some(ColumnType::Text),
            _ => None,
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::Float | ColumnType::Empty)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::Text => "text",
            ColumnType::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// A single table value
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl Cell {
    /// Infer a cell from raw CSV text
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if NULL_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
            return Cell::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Cell::Float(f);
            }
        }
        match trimmed.to_lowercase().as_str() {
            "true" => Cell::Bool(true),
            "false" => Cell::Bool(false),
            _ => Cell::Text(raw.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn type_of(&self) -> Option<ColumnType> {
        match self {
            Cell::Null => None,
            Cell::Int(_) => Some(ColumnType::Int),
            Cell::Float(_) => Some(ColumnType::Float),
            Cell::Bool(_) => Some(ColumnType::Bool),
            Cell::Text(_) => Some(ColumnType::Text),
        }
    }

    /// Convert to `target`, `None` when the value cannot be represented
    pub fn cast(&self, target: ColumnType) -> Option<Cell> {
        if self.is_null() {
            return Some(Cell::Null);
        }
        match target {
            ColumnType::Int => match self {
                Cell::Int(i) => Some(Cell::Int(*i)),
                Cell::Float(f) if f.fract() == 0.0 => Some(Cell::Int(*f as i64)),
                Cell::Bool(b) => Some(Cell::Int(i64::from(*b))),
                Cell::Text(s) => s.trim().parse::<i64>().ok().map(Cell::Int),
                _ => None,
            },
            ColumnType::Float | ColumnType::Empty => match self {
                Cell::Bool(b) => Some(Cell::Float(if *b { 1.0 } else { 0.0 })),
                Cell::Text(s) => s.trim().parse::<f64>().ok().map(Cell::Float),
                other => other.as_f64().map(Cell::Float),
            },
            ColumnType::Bool => match self {
                Cell::Bool(b) => Some(Cell::Bool(*b)),
                Cell::Int(0) => Some(Cell::Bool(false)),
                Cell::Int(1) => Some(Cell::Bool(true)),
                Cell::Text(s) => match s.trim().to_lowercase().as_str() {
                    "true" | "yes" | "1" => Some(Cell::Bool(true)),
                    "false" | "no" | "0" => Some(Cell::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            ColumnType::Text => Some(Cell::Text(self.to_string())),
        }
    }

    /// Ordering used by filters and min/max; `None` for incomparable types
    pub fn compare(&self, other: &Cell) -> Option<Ordering> {
        match (self, other) {
            (Cell::Text(a), Cell::Text(b)) => Some(a.cmp(b)),
            (Cell::Bool(a), Cell::Bool(b)) => Some(a.cmp(b)),
            (a, b) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        }
    }

    /// Loose equality: numbers compare by value regardless of int/float
    pub fn loosely_equals(&self, other: &Cell) -> bool {
        match (self, other) {
            (Cell::Null, Cell::Null) => true,
            (Cell::Null, _) | (_, Cell::Null) => false,
            (a, b) => a.compare(b) == Some(Ordering::Equal),
        }
    }

    /// Text written to CSV files
    pub fn to_csv_field(&self) -> String {
        match self {
            Cell::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Int(i) => Value::from(*i),
            Cell::Float(f) => Value::from(*f),
            Cell::Bool(b) => Value::from(*b),
            Cell::Text(s) => Value::from(s.as_str()),
        }
    }

    fn dedup_key(&self) -> String {
        match self {
            Cell::Null => "n:".to_string(),
            Cell::Int(i) => format!("i:{}", i),
            Cell::Float(f) => format!("f:{}", f.to_bits()),
            Cell::Bool(b) => format!("b:{}", b),
            Cell::Text(s) => format!("t:{}", s),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => f.write_str("null"),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// A small row-oriented table
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        for (index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TableError::RaggedRow {
                    row: index + 1,
                    found: row.len(),
                    expected: columns.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    fn delimiter_for(path: &Path) -> Result<u8, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(b','),
            Some("tsv") => Ok(b'\t'),
            _ => Err(TableError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Read a whole CSV or TSV file
    pub fn read_path(path: &Path) -> Result<Self, TableError> {
        Self::read_path_limited(path, None)
    }

    /// Read at most `limit` data rows
    pub fn read_path_limited(path: &Path, limit: Option<usize>) -> Result<Self, TableError> {
        let delimiter = Self::delimiter_for(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(false)
            .from_path(path)?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            if limit.is_some_and(|max| rows.len() >= max) {
                break;
            }
            let record = record?;
            rows.push(record.iter().map(Cell::infer).collect());
        }

        Self::new(columns, rows)
    }

    /// Write the table, choosing the delimiter from the extension
    pub fn write_path(&self, path: &Path) -> Result<(), TableError> {
        let delimiter = Self::delimiter_for(path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_csv_field))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::ColumnNotFound(name.to_string()))
    }

    pub fn column_values(&self, name: &str) -> Result<Vec<&Cell>, TableError> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Infer a column's type from its non-null values
    pub fn column_type(&self, name: &str) -> Result<ColumnType, TableError> {
        let mut inferred: Option<ColumnType> = None;
        for cell in self.column_values(name)? {
            let Some(ty) = cell.type_of() else { continue };
            inferred = Some(match (inferred, ty) {
                (None, t) => t,
                (Some(a), b) if a == b => a,
                (Some(ColumnType::Int), ColumnType::Float)
                | (Some(ColumnType::Float), ColumnType::Int) => ColumnType::Float,
                _ => ColumnType::Text,
            });
        }
        Ok(inferred.unwrap_or(ColumnType::Empty))
    }

    /// Non-null numeric values of a column
    pub fn numeric_values(&self, name: &str) -> Result<Vec<f64>, TableError> {
        if !self.column_type(name)?.is_numeric() {
            return Err(TableError::NotNumeric {
                column: name.to_string(),
            });
        }
        Ok(self
            .column_values(name)?
            .into_iter()
            .filter_map(Cell::as_f64)
            .collect())
    }

    pub fn drop_column(&mut self, name: &str) -> Result<(), TableError> {
        let index = self.column_index(name)?;
        self.columns.remove(index);
        for row in &mut self.rows {
            row.remove(index);
        }
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        let index = self.column_index(from)?;
        if from != to && self.columns.iter().any(|c| c == to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        self.columns[index] = to.to_string();
        Ok(())
    }

    /// Drop rows with a null in `column`, or in any column when `None`
    pub fn drop_nulls(&mut self, column: Option<&str>) -> Result<usize, TableError> {
        let before = self.rows.len();
        match column {
            Some(name) => {
                let index = self.column_index(name)?;
                self.rows.retain(|row| !row[index].is_null());
            }
            None => self.rows.retain(|row| !row.iter().any(Cell::is_null)),
        }
        Ok(before - self.rows.len())
    }

    /// Remove exact duplicate rows, keeping the first occurrence
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<String> = row.iter().map(Cell::dedup_key).collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }

    pub fn fill_nulls(&mut self, name: &str, value: &Cell) -> Result<usize, TableError> {
        let index = self.column_index(name)?;
        let mut filled = 0;
        for row in &mut self.rows {
            if row[index].is_null() {
                row[index] = value.clone();
                filled += 1;
            }
        }
        Ok(filled)
    }

    pub fn cast_column(&mut self, name: &str, target: ColumnType) -> Result<(), TableError> {
        let index = self.column_index(name)?;
        let mut converted = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let cell = &row[index];
            let value = cell.cast(target).ok_or_else(|| TableError::Conversion {
                column: name.to_string(),
                value: cell.to_string(),
                target,
            })?;
            converted.push(value);
        }
        for (row, value) in self.rows.iter_mut().zip(converted) {
            row[index] = value;
        }
        Ok(())
    }

    /// Keep only rows whose `name` cell satisfies `keep`
    pub fn retain_rows<F>(&mut self, name: &str, mut keep: F) -> Result<usize, TableError>
    where
        F: FnMut(&Cell) -> bool,
    {
        let index = self.column_index(name)?;
        let before = self.rows.len();
        self.rows.retain(|row| keep(&row[index]));
        Ok(before - self.rows.len())
    }

    /// Rewrite text cells of a column; other cells are left alone
    pub fn map_text<F>(&mut self, name: &str, f: F) -> Result<(), TableError>
    where
        F: Fn(&str) -> String,
    {
        let index = self.column_index(name)?;
        for row in &mut self.rows {
            if let Cell::Text(s) = &row[index] {
                row[index] = Cell::Text(f(s));
            }
        }
        Ok(())
    }

    /// First `n` rows as JSON objects keyed by column
    pub fn sample_records(&self, n: usize) -> Vec<serde_json::Map<String, Value>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(Cell::to_json))
                    .collect()
            })
            .collect()
    }

    /// Plain-text preview of the first `n` rows
    pub fn head_text(&self, n: usize) -> String {
        let mut out = self.columns.join(" | ");
        for row in self.rows.iter().take(n) {
            out.push('\n');
            let fields: Vec<String> = row.iter().map(Cell::to_string).collect();
            out.push_str(&fields.join(" | "));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Table {
        Table::new(
            vec!["name".into(), "age".into(), "city".into()],
            vec![
                vec![Cell::Text("Ann".into()), Cell::Int(30), Cell::Text(" Oslo ".into())],
                vec![Cell::Text("Bob".into()), Cell::Null, Cell::Text("Rome".into())],
                vec![Cell::Text("Ann".into()), Cell::Int(30), Cell::Text(" Oslo ".into())],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_infer_cells() {
        assert_eq!(Cell::infer(""), Cell::Null);
        assert_eq!(Cell::infer("NaN"), Cell::Null);
        assert_eq!(Cell::infer("42"), Cell::Int(42));
        assert_eq!(Cell::infer("4.5"), Cell::Float(4.5));
        assert_eq!(Cell::infer("True"), Cell::Bool(true));
        assert_eq!(Cell::infer("abc"), Cell::Text("abc".into()));
    }

    #[test]
    fn test_column_types() {
        let table = Table::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![Cell::Int(1), Cell::Int(1), Cell::Null],
                vec![Cell::Float(2.5), Cell::Text("x".into()), Cell::Null],
            ],
        )
        .unwrap();
        assert_eq!(table.column_type("a").unwrap(), ColumnType::Float);
        assert_eq!(table.column_type("b").unwrap(), ColumnType::Text);
        assert_eq!(table.column_type("c").unwrap(), ColumnType::Empty);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::new(vec!["a".into()], vec![vec![]]).unwrap_err();
        assert!(matches!(err, TableError::RaggedRow { row: 1, .. }));
    }

    #[test]
    fn test_mutations() {
        let mut table = sample();
        assert_eq!(table.drop_duplicates(), 1);
        assert_eq!(table.drop_nulls(Some("age")).unwrap(), 1);
        table.map_text("city", |s| s.trim().to_string()).unwrap();
        assert_eq!(table.rows()[0][2], Cell::Text("Oslo".into()));
        table.rename_column("city", "town").unwrap();
        table.drop_column("name").unwrap();
        assert_eq!(table.columns(), &["age".to_string(), "town".to_string()]);
    }

    #[test]
    fn test_cast_failure_leaves_column_unchanged() {
        let mut table = sample();
        let err = table.cast_column("name", ColumnType::Int).unwrap_err();
        assert!(err.to_string().contains("Cannot convert 'Ann'"));
        assert_eq!(table, sample());
    }

    #[test]
    fn test_csv_round_trip_with_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.csv");
        sample().write_path(&path).unwrap();

        let loaded = Table::read_path(&path).unwrap();
        assert_eq!(loaded.num_rows(), 3);
        assert_eq!(loaded.rows()[1][1], Cell::Null);
        assert_eq!(loaded.columns(), sample().columns());

        let head = Table::read_path_limited(&path, Some(1)).unwrap();
        assert_eq!(head.num_rows(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = Table::read_path(Path::new("data.xlsx")).unwrap_err();
        assert!(matches!(err, TableError::UnsupportedFormat(_)));
    }
}
