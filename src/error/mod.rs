use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// The unified error type for tabflow
///
/// Component errors (`ExecutionError`, `PlanError`, `WorkerError`, `LlmError`)
/// convert into this type at module boundaries.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Session error: {message}")]
    Session {
        code: u16,
        message: String,
        session_id: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Execution error: {message}")]
    Execution {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Workflow error: {message}")]
    Workflow {
        code: u16,
        message: String,
        worker: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Plan error: {message}")]
    Plan {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] {message}")]
    Other {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl FlowError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a session error with default code
    pub fn session(message: impl Into<String>) -> Self {
        Self::session_with_code(ErrorCode::SESSION_GENERIC, message, None)
    }

    /// Create a session error with specific code and session ID
    pub fn session_with_code(
        code: u16,
        message: impl Into<String>,
        session_id: Option<String>,
    ) -> Self {
        Self::Session {
            code,
            message: message.into(),
            session_id,
            source: None,
        }
    }

    /// Create a storage error with default code
    pub fn storage(message: impl Into<String>) -> Self {
        Self::storage_with_code(ErrorCode::STORAGE_GENERIC, message, None)
    }

    /// Create a storage error with specific code and path
    pub fn storage_with_code(code: u16, message: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path,
            source: None,
        }
    }

    /// Create an execution error with specific code
    pub fn execution_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Execution {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a workflow error with specific code and worker name
    pub fn workflow_with_code(
        code: u16,
        message: impl Into<String>,
        worker: Option<String>,
    ) -> Self {
        Self::Workflow {
            code,
            message: message.into(),
            worker,
            source: None,
        }
    }

    /// Create a plan error with specific code
    pub fn plan_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Plan {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a generic other error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            code: ErrorCode::OTHER_GENERIC,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Session { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Execution { source: src, .. }
            | Self::Workflow { source: src, .. }
            | Self::Plan { source: src, .. }
            | Self::Other { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Add context to the error message
    pub fn with_context(mut self, context: impl Display) -> Self {
        match &mut self {
            Self::Config { message, .. }
            | Self::Session { message, .. }
            | Self::Storage { message, .. }
            | Self::Execution { message, .. }
            | Self::Workflow { message, .. }
            | Self::Plan { message, .. }
            | Self::Other { message, .. } => {
                *message = format!("{}: {}", message, context);
            }
        }
        self
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Session { .. } => 3,
            Self::Storage { .. } => 4,
            Self::Execution { .. } => 5,
            Self::Workflow { .. } => 6,
            Self::Plan { .. } => 7,
            Self::Other { .. } => 1,
        }
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Session { code, .. }
            | Self::Storage { code, .. }
            | Self::Execution { code, .. }
            | Self::Workflow { code, .. }
            | Self::Plan { code, .. }
            | Self::Other { code, .. } => *code,
        }
    }

    /// Get a user-friendly error message
    ///
    /// Every rendering starts with `Error` so callers that look for the
    /// failure marker in response text keep working.
    pub fn user_message(&self) -> String {
        match self {
            Self::Config { message, .. } => format!("Error: configuration problem: {}", message),
            Self::Session {
                message,
                session_id,
                ..
            } => match session_id {
                Some(id) => format!("Error: session {}: {}", id, message),
                None => format!("Error: session: {}", message),
            },
            Self::Storage { message, path, .. } => match path {
                Some(p) => format!("Error: storage at {}: {}", p.display(), message),
                None => format!("Error: storage: {}", message),
            },
            Self::Execution { message, .. } => format!("Error executing code: {}", message),
            Self::Workflow {
                message, worker, ..
            } => match worker {
                Some(name) => format!("Error: {} worker: {}", name, message),
                None => format!("Error: {}", message),
            },
            Self::Plan { message, .. } => format!("Error during cleaning: {}", message),
            Self::Other { message, .. } => format!("Error: {}", message),
        }
    }

    /// Get a developer-friendly error message with full chain
    pub fn developer_message(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(&format!("\n  caused by: {}", err));
            source = err.source();
        }
        out
    }

    /// Whether this error came from a worker that was never constructed
    pub fn is_worker_unavailable(&self) -> bool {
        self.code() == ErrorCode::WORKER_UNAVAILABLE
    }
}

impl From<std::io::Error> for FlowError {
    fn from(err: std::io::Error) -> Self {
        FlowError::storage_with_code(ErrorCode::STORAGE_IO_ERROR, err.to_string(), None)
            .with_source(err)
    }
}

/// Type alias for Results using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = FlowError::session_with_code(
            ErrorCode::SESSION_NOT_FOUND,
            "no such session",
            Some("abc".to_string()),
        );
        assert_eq!(err.to_string(), "[E2001] Session error: no such session");
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.user_message(), "Error: session abc: no such session");
    }

    #[test]
    fn test_user_messages_carry_error_marker() {
        let errors = vec![
            FlowError::config("missing key"),
            FlowError::storage("disk full"),
            FlowError::execution_with_code(ErrorCode::EXEC_RUNTIME, "boom"),
            FlowError::workflow_with_code(
                ErrorCode::WORKER_UNAVAILABLE,
                "unavailable",
                Some("Refinery".to_string()),
            ),
            FlowError::plan_with_code(ErrorCode::PLAN_NO_JSON_OBJECT, "no object"),
            FlowError::other("misc"),
        ];
        for err in errors {
            assert!(err.user_message().contains("Error"), "{}", err.user_message());
        }
    }

    #[test]
    fn test_with_context_and_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = FlowError::storage("read failed")
            .with_context("sessions/abc.json")
            .with_source(io);
        assert_eq!(err.code(), ErrorCode::STORAGE_GENERIC);
        assert!(err.to_string().contains("read failed: sessions/abc.json"));
        assert!(err.developer_message().contains("caused by: gone"));
    }

    #[test]
    fn test_worker_unavailable_detection() {
        let err = FlowError::workflow_with_code(ErrorCode::WORKER_UNAVAILABLE, "missing", None);
        assert!(err.is_worker_unavailable());
        assert!(!FlowError::other("x").is_worker_unavailable());
    }
}
