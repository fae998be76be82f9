//! Per-column statistics used by the cleaning audit and the analysis stage

use super::table::{Cell, ColumnType, Table};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStats {
    pub name: String,
    pub dtype: String,
    pub non_null: usize,
    pub nulls: usize,
    pub unique: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation; zero for fewer than two values
fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

pub fn summarize(values: &[f64]) -> Option<NumericSummary> {
    let mean = mean(values)?;
    Some(NumericSummary {
        count: values.len(),
        mean,
        std: std_dev(values, mean),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        median: median(values)?,
    })
}

/// Most frequent non-null value; ties go to the value seen first
pub fn mode(cells: &[&Cell]) -> Option<Cell> {
    let mut counts: Vec<(&Cell, usize)> = Vec::new();
    for cell in cells.iter().filter(|c| !c.is_null()) {
        match counts.iter_mut().find(|(seen, _)| seen.loosely_equals(cell)) {
            Some((_, n)) => *n += 1,
            None => counts.push((cell, 1)),
        }
    }
    let best = counts.iter().map(|(_, n)| *n).max()?;
    counts
        .into_iter()
        .find(|(_, n)| *n == best)
        .map(|(cell, _)| cell.clone())
}

pub fn null_counts(table: &Table) -> BTreeMap<String, usize> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let nulls = table.rows().iter().filter(|row| row[i].is_null()).count();
            (name.clone(), nulls)
        })
        .collect()
}

pub fn describe(table: &Table) -> Vec<ColumnStats> {
    table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let cells: Vec<&Cell> = table.rows().iter().map(|row| &row[i]).collect();
            let nulls = cells.iter().filter(|c| c.is_null()).count();
            let unique: HashSet<String> = cells
                .iter()
                .filter(|c| !c.is_null())
                .map(|c| c.to_string())
                .collect();
            let dtype = table.column_type(name).unwrap_or(ColumnType::Text);
            let numeric = match dtype {
                ColumnType::Int | ColumnType::Float => {
                    let values: Vec<f64> = cells.iter().filter_map(|c| c.as_f64()).collect();
                    summarize(&values)
                }
                _ => None,
            };

            ColumnStats {
                name: name.clone(),
                dtype: dtype.dtype_name().to_string(),
                non_null: cells.len() - nulls,
                nulls,
                unique: unique.len(),
                numeric,
            }
        })
        .collect()
}
