use crate::data::TableError;
use crate::error::{ErrorCode, FlowError};
use thiserror::Error;

/// Failure while compiling or running a snippet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("operation '{0}' is not allowed")]
    Forbidden(String),

    #[error("{name}: {message}")]
    InvalidArguments { name: String, message: String },

    #[error("{0}")]
    Runtime(String),

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("evaluator aborted: {0}")]
    Panicked(String),
}

impl ExecutionError {
    pub fn args(name: &str, message: impl Into<String>) -> Self {
        ExecutionError::InvalidArguments {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            ExecutionError::Syntax { .. } => ErrorCode::PLAN_INVALID_SYNTAX,
            ExecutionError::Forbidden(_) => ErrorCode::EXEC_FORBIDDEN,
            ExecutionError::InvalidArguments { .. } | ExecutionError::Runtime(_) => {
                ErrorCode::EXEC_RUNTIME
            }
            ExecutionError::LimitExceeded(_) => ErrorCode::EXEC_LIMIT_EXCEEDED,
            ExecutionError::Panicked(_) => ErrorCode::EXEC_PANICKED,
        }
    }
}

impl From<TableError> for ExecutionError {
    fn from(err: TableError) -> Self {
        ExecutionError::Runtime(err.to_string())
    }
}

impl From<ExecutionError> for FlowError {
    fn from(err: ExecutionError) -> Self {
        FlowError::execution_with_code(err.code(), err.to_string())
    }
}
