//! Language model access
//!
//! Workers only see the [`LanguageModel`] trait. [`GeminiModel`] talks to the
//! hosted REST API; [`ScriptedModel`] replays canned responses in tests.

pub mod gemini;
pub mod scripted;

pub use gemini::GeminiModel;
pub use scripted::ScriptedModel;

use crate::error::{ErrorCode, FlowError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingCredentials,

    #[error("model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("model returned no text")]
    EmptyResponse,

    #[error("no scripted response left for prompt")]
    Exhausted,
}

impl From<LlmError> for FlowError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingCredentials => {
                FlowError::config_with_code(ErrorCode::CONFIG_MISSING_CREDENTIALS, err.to_string())
            }
            LlmError::Timeout(_) => FlowError::workflow_with_code(
                ErrorCode::WORKFLOW_MODEL_TIMEOUT,
                err.to_string(),
                None,
            ),
            other => FlowError::workflow_with_code(
                ErrorCode::WORKFLOW_MODEL_FAILED,
                other.to_string(),
                None,
            ),
        }
    }
}

/// Text-in, text-out access to a language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier, for logs
    fn name(&self) -> &str;
}
