//! Snippet parsing and the capability allow-list

use super::ExecutionError;
use crate::data::Cell;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "sandbox/snippet.pest"]
struct SnippetParser;

/// Statements a snippet may call
pub const STATEMENTS: &[&str] = &[
    "drop_column",
    "drop_nulls",
    "drop_duplicates",
    "fill_null",
    "cast",
    "filter",
    "rename",
    "strip",
    "lower",
    "upper",
    "print",
];

/// Functions usable inside expressions
pub const AGGREGATES: &[&str] = &[
    "mean",
    "median",
    "sum",
    "min",
    "max",
    "count_null",
    "unique",
    "count",
    "columns",
];

/// Bare names accepted as `fill_null` strategies
pub const FILL_STRATEGIES: &[&str] = &["mean", "median", "mode"];

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Cell),
    Ident(String),
    Call { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub name: String,
    pub args: Vec<Expr>,
    pub line: usize,
}

/// A parsed snippet
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    pub fn parse(code: &str) -> Result<Self, ExecutionError> {
        let mut pairs = SnippetParser::parse(Rule::program, code).map_err(|e| {
            let line = match e.line_col {
                LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
            };
            ExecutionError::Syntax {
                line,
                message: e.variant.message().to_string(),
            }
        })?;

        let mut statements = Vec::new();
        if let Some(program) = pairs.next() {
            for pair in program.into_inner() {
                if pair.as_rule() == Rule::statement {
                    statements.push(build_statement(pair)?);
                }
            }
        }
        Ok(Self { statements })
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Reject any name outside the allow-list
    pub fn check_allowed(&self) -> Result<(), ExecutionError> {
        for statement in &self.statements {
            if !STATEMENTS.contains(&statement.name.as_str()) {
                return Err(ExecutionError::Forbidden(statement.name.clone()));
            }
            statement.args.iter().try_for_each(check_expr)?;
        }
        Ok(())
    }
}

fn check_expr(expr: &Expr) -> Result<(), ExecutionError> {
    match expr {
        Expr::Literal(_) => Ok(()),
        Expr::Ident(name) if FILL_STRATEGIES.contains(&name.as_str()) => Ok(()),
        Expr::Ident(name) => Err(ExecutionError::Forbidden(name.clone())),
        Expr::Call { name, args } => {
            if !AGGREGATES.contains(&name.as_str()) {
                return Err(ExecutionError::Forbidden(name.clone()));
            }
            args.iter().try_for_each(check_expr)
        }
    }
}

fn syntax(pair: &Pair<'_, Rule>, message: impl Into<String>) -> ExecutionError {
    ExecutionError::Syntax {
        line: pair.as_span().start_pos().line_col().0,
        message: message.into(),
    }
}

fn build_statement(pair: Pair<'_, Rule>) -> Result<Statement, ExecutionError> {
    let line = pair.as_span().start_pos().line_col().0;
    let (name, args) = build_call(pair)?;
    Ok(Statement { name, args, line })
}

fn build_call(pair: Pair<'_, Rule>) -> Result<(String, Vec<Expr>), ExecutionError> {
    let mut inner = pair.clone().into_inner();
    let name = inner
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| syntax(&pair, "missing function name"))?;
    let args = inner.map(build_expr).collect::<Result<Vec<_>, _>>()?;
    Ok((name, args))
}

fn build_expr(pair: Pair<'_, Rule>) -> Result<Expr, ExecutionError> {
    match pair.as_rule() {
        Rule::call => {
            let (name, args) = build_call(pair)?;
            Ok(Expr::Call { name, args })
        }
        Rule::string => {
            let raw = pair.clone().into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Expr::Literal(Cell::Text(unescape(raw))))
        }
        Rule::number => {
            let text = pair.as_str();
            let cell = match text.parse::<i64>() {
                Ok(i) => Cell::Int(i),
                Err(_) => text
                    .parse::<f64>()
                    .map(Cell::Float)
                    .map_err(|_| syntax(&pair, format!("invalid number '{}'", text)))?,
            };
            Ok(Expr::Literal(cell))
        }
        Rule::boolean => Ok(Expr::Literal(Cell::Bool(
            pair.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::null => Ok(Expr::Literal(Cell::Null)),
        Rule::ident => Ok(Expr::Ident(pair.as_str().to_string())),
        other => Err(syntax(&pair, format!("unexpected {:?}", other))),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
