/// Error code registry for tabflow
///
/// Error codes are organized by category:
/// - 1000-1999: Configuration errors
/// - 2000-2999: Session errors
/// - 3000-3999: Storage errors
/// - 4000-4999: Generated-code execution errors
/// - 5000-5999: Workflow and worker errors
/// - 6000-6999: Transformation plan errors
/// - 9000-9999: Other errors
pub struct ErrorCode;

impl ErrorCode {
    // Configuration errors (1000-1999)
    pub const CONFIG_GENERIC: u16 = 1000;
    pub const CONFIG_NOT_FOUND: u16 = 1001;
    pub const CONFIG_INVALID_TOML: u16 = 1002;
    pub const CONFIG_INVALID_VALUE: u16 = 1005;
    pub const CONFIG_MISSING_CREDENTIALS: u16 = 1010;

    // Session errors (2000-2999)
    pub const SESSION_GENERIC: u16 = 2000;
    pub const SESSION_NOT_FOUND: u16 = 2001;
    pub const SESSION_CORRUPTED: u16 = 2003;
    pub const SESSION_INVALID_STATE: u16 = 2006;
    pub const SESSION_INVALID_ID: u16 = 2009;

    // Storage errors (3000-3999)
    pub const STORAGE_GENERIC: u16 = 3000;
    pub const STORAGE_IO_ERROR: u16 = 3001;
    pub const STORAGE_NOT_FOUND: u16 = 3004;
    pub const STORAGE_SERIALIZATION_ERROR: u16 = 3011;
    pub const STORAGE_DESERIALIZATION_ERROR: u16 = 3012;

    // Generated-code execution errors (4000-4999)
    pub const EXEC_GENERIC: u16 = 4000;
    pub const EXEC_FORBIDDEN: u16 = 4001;
    pub const EXEC_RUNTIME: u16 = 4002;
    pub const EXEC_LIMIT_EXCEEDED: u16 = 4003;
    pub const EXEC_PANICKED: u16 = 4004;

    // Workflow and worker errors (5000-5999)
    pub const WORKFLOW_GENERIC: u16 = 5000;
    pub const WORKER_UNAVAILABLE: u16 = 5001;
    pub const WORKER_CONSTRUCTION_FAILED: u16 = 5002;
    pub const WORKER_DELEGATION_FAILED: u16 = 5003;
    pub const WORKER_UNSUPPORTED_TASK: u16 = 5004;
    pub const WORKFLOW_MODEL_FAILED: u16 = 5010;
    pub const WORKFLOW_MODEL_TIMEOUT: u16 = 5011;

    // Transformation plan errors (6000-6999)
    pub const PLAN_GENERIC: u16 = 6000;
    pub const PLAN_NO_JSON_OBJECT: u16 = 6001;
    pub const PLAN_INVALID_JSON: u16 = 6002;
    pub const PLAN_EMPTY_CODE: u16 = 6003;
    pub const PLAN_INVALID_SYNTAX: u16 = 6004;

    // Other errors (9000-9999)
    pub const OTHER_GENERIC: u16 = 9000;
}

/// Get a human-readable description for an error code
pub fn describe_error_code(code: u16) -> &'static str {
    match code {
        ErrorCode::CONFIG_GENERIC => "General configuration error",
        ErrorCode::CONFIG_NOT_FOUND => "Configuration file not found",
        ErrorCode::CONFIG_INVALID_TOML => "Configuration file is not valid TOML",
        ErrorCode::CONFIG_INVALID_VALUE => "Configuration value is invalid",
        ErrorCode::CONFIG_MISSING_CREDENTIALS => "No API credentials configured",

        ErrorCode::SESSION_GENERIC => "General session error",
        ErrorCode::SESSION_NOT_FOUND => "Session not found",
        ErrorCode::SESSION_CORRUPTED => "Session record is corrupted",
        ErrorCode::SESSION_INVALID_STATE => "Workflow stage transition not allowed",
        ErrorCode::SESSION_INVALID_ID => "Session id is not valid",

        ErrorCode::STORAGE_GENERIC => "General storage error",
        ErrorCode::STORAGE_IO_ERROR => "Storage I/O failure",
        ErrorCode::STORAGE_NOT_FOUND => "Storage path not found",
        ErrorCode::STORAGE_SERIALIZATION_ERROR => "Failed to serialize record",
        ErrorCode::STORAGE_DESERIALIZATION_ERROR => "Failed to deserialize record",

        ErrorCode::EXEC_GENERIC => "Generated code failed",
        ErrorCode::EXEC_FORBIDDEN => "Generated code used an operation outside the allow-list",
        ErrorCode::EXEC_RUNTIME => "Generated code raised an error",
        ErrorCode::EXEC_LIMIT_EXCEEDED => "Generated code exceeded an execution limit",
        ErrorCode::EXEC_PANICKED => "Generated code aborted the evaluator",

        ErrorCode::WORKFLOW_GENERIC => "General workflow error",
        ErrorCode::WORKER_UNAVAILABLE => "Worker is not registered or failed to construct",
        ErrorCode::WORKER_CONSTRUCTION_FAILED => "Worker factory failed",
        ErrorCode::WORKER_DELEGATION_FAILED => "Worker returned an error",
        ErrorCode::WORKER_UNSUPPORTED_TASK => "Worker cannot handle the requested task",
        ErrorCode::WORKFLOW_MODEL_FAILED => "Language model request failed",
        ErrorCode::WORKFLOW_MODEL_TIMEOUT => "Language model request timed out",

        ErrorCode::PLAN_GENERIC => "Transformation plan error",
        ErrorCode::PLAN_NO_JSON_OBJECT => "No JSON object found in model response",
        ErrorCode::PLAN_INVALID_JSON => "Transformation plan is not valid JSON",
        ErrorCode::PLAN_EMPTY_CODE => "Transformation plan has no code",
        ErrorCode::PLAN_INVALID_SYNTAX => "Transformation code does not parse",

        _ => "Unknown error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_described() {
        assert_eq!(
            describe_error_code(ErrorCode::WORKER_UNAVAILABLE),
            "Worker is not registered or failed to construct"
        );
        assert_eq!(describe_error_code(1), "Unknown error");
    }
}
