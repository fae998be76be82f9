//! Transformation plans returned by the language model

use super::{ExecutionError, Program};
use crate::error::{ErrorCode, FlowError};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("no JSON object found in model response")]
    NoJsonObject,

    #[error("plan is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("plan contains no code")]
    EmptyCode,

    #[error("plan code does not parse: {0}")]
    InvalidSyntax(ExecutionError),
}

impl PlanError {
    pub fn code(&self) -> u16 {
        match self {
            PlanError::NoJsonObject => ErrorCode::PLAN_NO_JSON_OBJECT,
            PlanError::InvalidJson(_) => ErrorCode::PLAN_INVALID_JSON,
            PlanError::EmptyCode => ErrorCode::PLAN_EMPTY_CODE,
            PlanError::InvalidSyntax(_) => ErrorCode::PLAN_INVALID_SYNTAX,
        }
    }
}

impl From<PlanError> for FlowError {
    fn from(err: PlanError) -> Self {
        FlowError::plan_with_code(err.code(), err.to_string())
    }
}

/// Explanation plus code, as produced by the cleaning prompt
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransformationPlan {
    pub explanation: String,
    pub code: String,
}

impl TransformationPlan {
    /// Extract, parse and shape-check a plan from raw model text
    pub fn from_response(text: &str) -> Result<Self, PlanError> {
        let json = extract_json_object(text).ok_or(PlanError::NoJsonObject)?;
        let plan: TransformationPlan = serde_json::from_str(json)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Code must be non-empty and parse as a snippet
    pub fn validate(&self) -> Result<Program, PlanError> {
        if self.code.trim().is_empty() {
            return Err(PlanError::EmptyCode);
        }
        let program = Program::parse(&self.code).map_err(PlanError::InvalidSyntax)?;
        if program.is_empty() {
            return Err(PlanError::EmptyCode);
        }
        Ok(program)
    }
}

/// The outermost balanced `{...}` in `text`, starting at the first `{`
///
/// Braces inside JSON strings are ignored.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Body of the first fenced code block, skipping any language tag
pub fn extract_code_block(text: &str) -> Option<String> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    let body_start = match after_fence.find('\n') {
        Some(newline)
            if after_fence[..newline]
                .trim()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
        {
            newline + 1
        }
        _ => 0,
    };
    let body = &after_fence[body_start..];
    let close = body.find("```")?;
    let code = body[..close].trim();
    (!code.is_empty()).then(|| code.to_string())
}
