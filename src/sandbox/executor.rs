//! Evaluator for transformation snippets
//!
//! The evaluator only knows the operations listed in
//! [`super::program::STATEMENTS`] and [`super::program::AGGREGATES`]; there is
//! no path from a snippet to the filesystem, the network, the environment or
//! other processes. Each call works on a private copy of the table and a
//! private output buffer.

use super::program::{Expr, Program, Statement};
use super::ExecutionError;
use crate::data::stats::{mean, median, mode};
use crate::data::{Cell, ColumnType, Table};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorLimits {
    /// Maximum number of statements in one snippet
    pub max_statements: usize,
    /// Maximum bytes a snippet may print
    pub max_output_bytes: usize,
}

impl Default for ExecutorLimits {
    fn default() -> Self {
        Self {
            max_statements: 200,
            max_output_bytes: 64 * 1024,
        }
    }
}

/// Text printed by a snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapturedOutput {
    /// The snippet ran but printed nothing
    Empty,
    Text(String),
}

impl CapturedOutput {
    fn from_buffer(buffer: String) -> Self {
        let trimmed = buffer.trim();
        if trimmed.is_empty() {
            CapturedOutput::Empty
        } else {
            CapturedOutput::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CapturedOutput::Empty)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CapturedOutput::Empty => None,
            CapturedOutput::Text(text) => Some(text),
        }
    }
}

/// Successful run: the transformed table and what was printed
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub table: Table,
    pub output: CapturedOutput,
}

thread_local! {
    static ACTIVE_CAPTURE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Installs a fresh output buffer for the current thread and restores the
/// previous one when dropped
struct CaptureGuard {
    previous: Option<String>,
}

impl CaptureGuard {
    fn install() -> Self {
        let previous = ACTIVE_CAPTURE.with(|slot| slot.replace(Some(String::new())));
        Self { previous }
    }

    fn take(&self) -> String {
        ACTIVE_CAPTURE.with(|slot| slot.borrow_mut().take().unwrap_or_default())
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE_CAPTURE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Whether a capture buffer is installed on this thread
pub fn capture_active() -> bool {
    ACTIVE_CAPTURE.with(|slot| slot.borrow().is_some())
}

fn emit(line: &str, limit: usize) -> Result<(), ExecutionError> {
    ACTIVE_CAPTURE.with(|slot| {
        let mut slot = slot.borrow_mut();
        let buffer = slot
            .as_mut()
            .ok_or_else(|| ExecutionError::Runtime("print outside of a capture".to_string()))?;
        if buffer.len() + line.len() + 1 > limit {
            return Err(ExecutionError::LimitExceeded(format!(
                "output larger than {} bytes",
                limit
            )));
        }
        buffer.push_str(line);
        buffer.push('\n');
        Ok(())
    })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Value produced by an expression
#[derive(Debug, Clone, PartialEq)]
enum Value {
    Cell(Cell),
    List(Vec<String>),
    Strategy(String),
}

impl Value {
    fn render(&self) -> String {
        match self {
            Value::Cell(cell) => cell.to_string(),
            Value::List(items) => format!("[{}]", items.join(", ")),
            Value::Strategy(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op.trim() {
            "==" => Some(CompareOp::Eq),
            "!=" => Some(CompareOp::Ne),
            ">" => Some(CompareOp::Gt),
            ">=" => Some(CompareOp::Ge),
            "<" => Some(CompareOp::Lt),
            "<=" => Some(CompareOp::Le),
            _ => None,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

/// Runs snippets against tables under [`ExecutorLimits`]
#[derive(Debug, Clone, Default)]
pub struct GeneratedCodeExecutor {
    limits: ExecutorLimits,
}

impl GeneratedCodeExecutor {
    pub fn new(limits: ExecutorLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> ExecutorLimits {
        self.limits
    }

    /// Parse and check a snippet without running it
    pub fn compile(&self, code: &str) -> Result<Program, ExecutionError> {
        let program = Program::parse(code)?;
        if program.len() > self.limits.max_statements {
            return Err(ExecutionError::LimitExceeded(format!(
                "{} statements, at most {} allowed",
                program.len(),
                self.limits.max_statements
            )));
        }
        program.check_allowed()?;
        Ok(program)
    }

    /// Run `code` against a copy of `table`
    ///
    /// The caller's table is never modified. On failure no output is
    /// returned.
    pub fn execute(&self, code: &str, table: &Table) -> Result<ExecutionOutcome, ExecutionError> {
        let program = self.compile(code)?;
        self.run(&program, table)
    }

    pub fn run(&self, program: &Program, table: &Table) -> Result<ExecutionOutcome, ExecutionError> {
        let guard = CaptureGuard::install();
        let mut working = table.clone();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            program
                .statements()
                .iter()
                .try_for_each(|statement| self.apply(statement, &mut working))
        }));

        let buffer = guard.take();
        drop(guard);

        match result {
            Ok(Ok(())) => {
                debug!("Snippet ran {} statements", program.len());
                Ok(ExecutionOutcome {
                    table: working,
                    output: CapturedOutput::from_buffer(buffer),
                })
            }
            Ok(Err(e)) => Err(e),
            Err(payload) => Err(ExecutionError::Panicked(panic_message(payload))),
        }
    }

    fn apply(&self, statement: &Statement, table: &mut Table) -> Result<(), ExecutionError> {
        self.dispatch(statement, table).map_err(|e| match e {
            ExecutionError::Runtime(message) => {
                ExecutionError::Runtime(format!("line {}: {}", statement.line, message))
            }
            other => other,
        })
    }

    fn dispatch(&self, statement: &Statement, table: &mut Table) -> Result<(), ExecutionError> {
        let name = statement.name.as_str();
        let args = &statement.args;

        match name {
            "print" => {
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    match eval(arg, table)? {
                        Value::Strategy(strategy) => {
                            return Err(ExecutionError::args(
                                name,
                                format!("'{}' is a fill strategy, not a value", strategy),
                            ))
                        }
                        value => parts.push(value.render()),
                    }
                }
                emit(&parts.join(" "), self.limits.max_output_bytes)
            }
            "drop_column" => {
                arity(name, args, 1)?;
                table.drop_column(&text_arg(name, args, 0, table)?)?;
                Ok(())
            }
            "drop_nulls" => match args.len() {
                0 => table.drop_nulls(None).map(drop).map_err(Into::into),
                1 => {
                    let column = text_arg(name, args, 0, table)?;
                    table.drop_nulls(Some(&column)).map(drop).map_err(Into::into)
                }
                n => Err(ExecutionError::args(name, format!("expected 0 or 1 arguments, got {}", n))),
            },
            "drop_duplicates" => {
                arity(name, args, 0)?;
                table.drop_duplicates();
                Ok(())
            }
            "fill_null" => {
                arity(name, args, 2)?;
                let column = text_arg(name, args, 0, table)?;
                let fill = match eval(&args[1], table)? {
                    Value::Strategy(strategy) => fill_value(table, &column, &strategy)?,
                    Value::Cell(cell) => cell,
                    Value::List(_) => {
                        return Err(ExecutionError::args(name, "cannot fill with a list"))
                    }
                };
                table.fill_nulls(&column, &fill)?;
                Ok(())
            }
            "cast" => {
                arity(name, args, 2)?;
                let column = text_arg(name, args, 0, table)?;
                let type_name = text_arg(name, args, 1, table)?;
                let target = ColumnType::parse(&type_name).ok_or_else(|| {
                    ExecutionError::args(name, format!("unknown type '{}'", type_name))
                })?;
                table.cast_column(&column, target)?;
                Ok(())
            }
            "filter" => {
                arity(name, args, 3)?;
                let column = text_arg(name, args, 0, table)?;
                let op_text = text_arg(name, args, 1, table)?;
                let op = CompareOp::parse(&op_text).ok_or_else(|| {
                    ExecutionError::args(name, format!("unknown operator '{}'", op_text))
                })?;
                let Value::Cell(value) = eval(&args[2], table)? else {
                    return Err(ExecutionError::args(name, "comparison value must be a scalar"));
                };
                filter_rows(table, &column, op, &value)
            }
            "rename" => {
                arity(name, args, 2)?;
                let from = text_arg(name, args, 0, table)?;
                let to = text_arg(name, args, 1, table)?;
                table.rename_column(&from, &to)?;
                Ok(())
            }
            "strip" | "lower" | "upper" => {
                arity(name, args, 1)?;
                let column = text_arg(name, args, 0, table)?;
                let result = match name {
                    "strip" => table.map_text(&column, |s| s.trim().to_string()),
                    "lower" => table.map_text(&column, str::to_lowercase),
                    _ => table.map_text(&column, str::to_uppercase),
                };
                result.map_err(Into::into)
            }
            other => Err(ExecutionError::Forbidden(other.to_string())),
        }
    }
}

fn arity(name: &str, args: &[Expr], expected: usize) -> Result<(), ExecutionError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExecutionError::args(
            name,
            format!("expected {} arguments, got {}", expected, args.len()),
        ))
    }
}

fn text_arg(name: &str, args: &[Expr], index: usize, table: &Table) -> Result<String, ExecutionError> {
    match args.get(index).map(|arg| eval(arg, table)).transpose()? {
        Some(Value::Cell(Cell::Text(s))) => Ok(s),
        Some(other) => Err(ExecutionError::args(
            name,
            format!("argument {} must be a string, got {}", index + 1, other.render()),
        )),
        None => Err(ExecutionError::args(name, format!("missing argument {}", index + 1))),
    }
}

fn fill_value(table: &Table, column: &str, strategy: &str) -> Result<Cell, ExecutionError> {
    let computed = match strategy {
        "mean" => mean(&table.numeric_values(column)?).map(Cell::Float),
        "median" => median(&table.numeric_values(column)?).map(Cell::Float),
        _ => mode(&table.column_values(column)?),
    };
    computed.ok_or_else(|| {
        ExecutionError::Runtime(format!("column '{}' has no values to compute {}", column, strategy))
    })
}

fn filter_rows(table: &mut Table, column: &str, op: CompareOp, value: &Cell) -> Result<(), ExecutionError> {
    if value.is_null() {
        let keep_nulls = match op {
            CompareOp::Eq => true,
            CompareOp::Ne => false,
            _ => return Err(ExecutionError::args("filter", "null only supports == and !=")),
        };
        table.retain_rows(column, |cell| cell.is_null() == keep_nulls)?;
        return Ok(());
    }

    let mut incomparable = None;
    table.retain_rows(column, |cell| {
        if cell.is_null() {
            return op == CompareOp::Ne;
        }
        match cell.compare(value) {
            Some(ordering) => op.holds(ordering),
            None if matches!(op, CompareOp::Eq | CompareOp::Ne) => op == CompareOp::Ne,
            None => {
                incomparable.get_or_insert_with(|| cell.to_string());
                false
            }
        }
    })?;

    match incomparable {
        Some(found) => Err(ExecutionError::Runtime(format!(
            "cannot compare '{}' with '{}'",
            found, value
        ))),
        None => Ok(()),
    }
}

fn eval(expr: &Expr, table: &Table) -> Result<Value, ExecutionError> {
    match expr {
        Expr::Literal(cell) => Ok(Value::Cell(cell.clone())),
        Expr::Ident(name) => Ok(Value::Strategy(name.clone())),
        Expr::Call { name, args } => eval_call(name, args, table),
    }
}

fn eval_call(name: &str, args: &[Expr], table: &Table) -> Result<Value, ExecutionError> {
    match name {
        "count" => {
            arity(name, args, 0)?;
            Ok(Value::Cell(Cell::Int(table.num_rows() as i64)))
        }
        "columns" => {
            arity(name, args, 0)?;
            Ok(Value::List(table.columns().to_vec()))
        }
        _ => {
            arity(name, args, 1)?;
            let column = text_arg(name, args, 0, table)?;
            aggregate(name, &column, table).map(Value::Cell)
        }
    }
}

fn aggregate(name: &str, column: &str, table: &Table) -> Result<Cell, ExecutionError> {
    let cell = match name {
        "mean" => mean(&table.numeric_values(column)?).map_or(Cell::Null, Cell::Float),
        "median" => median(&table.numeric_values(column)?).map_or(Cell::Null, Cell::Float),
        "sum" => {
            if table.column_type(column)? == ColumnType::Int {
                let mut total: i64 = 0;
                for cell in table.column_values(column)? {
                    if let Cell::Int(value) = cell {
                        total = total.checked_add(*value).ok_or_else(|| {
                            ExecutionError::Runtime(format!("sum of '{}' overflows int64", column))
                        })?;
                    }
                }
                Cell::Int(total)
            } else {
                Cell::Float(table.numeric_values(column)?.iter().sum())
            }
        }
        "min" | "max" => {
            let want = if name == "min" { Ordering::Less } else { Ordering::Greater };
            let mut best: Option<&Cell> = None;
            for cell in table.column_values(column)?.into_iter().filter(|c| !c.is_null()) {
                best = match best {
                    None => Some(cell),
                    Some(current) => match cell.compare(current) {
                        Some(ordering) if ordering == want => Some(cell),
                        Some(_) => Some(current),
                        None => {
                            return Err(ExecutionError::Runtime(format!(
                                "column '{}' mixes incomparable values",
                                column
                            )))
                        }
                    },
                };
            }
            best.cloned().unwrap_or(Cell::Null)
        }
        "count_null" => Cell::Int(
            table
                .column_values(column)?
                .into_iter()
                .filter(|c| c.is_null())
                .count() as i64,
        ),
        "unique" => {
            let mut seen: Vec<&Cell> = Vec::new();
            for cell in table.column_values(column)?.into_iter().filter(|c| !c.is_null()) {
                if !seen.iter().any(|s| s.loosely_equals(cell)) {
                    seen.push(cell);
                }
            }
            Cell::Int(seen.len() as i64)
        }
        other => return Err(ExecutionError::Forbidden(other.to_string())),
    };
    Ok(cell)
}
