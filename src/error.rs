//! Structured error taxonomy (§7).
//!
//! Every fallible path in the core returns `AppError`, a tagged record of
//! `{category, code, message, path, details}`. The CLI layer adapts this to
//! `anyhow::Result` at the outermost call site.

use std::fmt;

use serde_json::Value;

/// Broad error category, orthogonal to the specific `ErrorCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    // Reserved: `compile()` guarantees a single focused leaf by construction,
    // so nothing in this design currently raises a planning-stage error.
    #[allow(dead_code)]
    Planning,
    Emission,
    Execution,
    Environment,
    User,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Validation => "validation",
            ErrorCategory::Planning => "planning",
            ErrorCategory::Emission => "emission",
            ErrorCategory::Execution => "execution",
            ErrorCategory::Environment => "environment",
            ErrorCategory::User => "user",
        };
        f.write_str(s)
    }
}

/// Closed set of error codes (§7), plus the ambient `IoError`/`ParseError`
/// needed by the preset loader (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidLayout,
    InvalidRatio,
    DuplicateName,
    MultipleFocus,
    InvalidEnvKey,
    // Reserved alongside `ErrorCategory::Planning`; see its comment.
    #[allow(dead_code)]
    InvalidPlan,
    MissingTarget,
    // `StepKind` is a closed two-variant enum and every match over it is
    // exhaustive, so this code has no call site in this design.
    #[allow(dead_code)]
    UnsupportedStepKind,
    TemplateTokenUnknown,
    TemplateTokenInvalid,
    TerminalCommandFailed,
    SplitSizeResolutionFailed,
    NotInTmux,
    TmuxNotFound,
    WeztermNotFound,
    UserCancelled,
    CliConflictingFlags,
    UnknownBackend,
    IoError,
    ParseError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidLayout => "INVALID_LAYOUT",
            ErrorCode::InvalidRatio => "INVALID_RATIO",
            ErrorCode::DuplicateName => "DUPLICATE_NAME",
            ErrorCode::MultipleFocus => "MULTIPLE_FOCUS",
            ErrorCode::InvalidEnvKey => "INVALID_ENV_KEY",
            ErrorCode::InvalidPlan => "INVALID_PLAN",
            ErrorCode::MissingTarget => "MISSING_TARGET",
            ErrorCode::UnsupportedStepKind => "UNSUPPORTED_STEP_KIND",
            ErrorCode::TemplateTokenUnknown => "TEMPLATE_TOKEN_UNKNOWN",
            ErrorCode::TemplateTokenInvalid => "TEMPLATE_TOKEN_INVALID",
            ErrorCode::TerminalCommandFailed => "TERMINAL_COMMAND_FAILED",
            ErrorCode::SplitSizeResolutionFailed => "SPLIT_SIZE_RESOLUTION_FAILED",
            ErrorCode::NotInTmux => "NOT_IN_TMUX",
            ErrorCode::TmuxNotFound => "TMUX_NOT_FOUND",
            ErrorCode::WeztermNotFound => "WEZTERM_NOT_FOUND",
            ErrorCode::UserCancelled => "USER_CANCELLED",
            ErrorCode::CliConflictingFlags => "CLI_CONFLICTING_FLAGS",
            ErrorCode::UnknownBackend => "UNKNOWN_BACKEND",
            ErrorCode::IoError => "IO_ERROR",
            ErrorCode::ParseError => "PARSE_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tagged error record, as specified in §7.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {message}")]
pub struct AppError {
    pub category: ErrorCategory,
    pub code: ErrorCode,
    pub message: String,
    pub path: Option<String>,
    pub details: Option<Value>,
}

impl AppError {
    pub fn new(category: ErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            path: None,
            details: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Validation, code, message)
    }

    // See the `Planning` category comment: no current call site.
    #[allow(dead_code)]
    pub fn planning(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Planning, code, message)
    }

    pub fn emission(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Emission, code, message)
    }

    pub fn execution(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Execution, code, message)
    }

    pub fn environment(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Environment, code, message)
    }

    pub fn user(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::User, code, message)
    }
}

/// Build a `TERMINAL_COMMAND_FAILED` execution error from a failed subprocess call.
impl From<crate::cmd::CmdError> for AppError {
    fn from(err: crate::cmd::CmdError) -> Self {
        let mut argv = vec![err.program.clone()];
        argv.extend(err.args.clone());
        AppError::execution(
            ErrorCode::TerminalCommandFailed,
            format!("command failed: {}", argv.join(" ")),
        )
        .with_details(serde_json::json!({
            "command": argv,
            "status": err.status,
            "stderr": err.stderr,
            "stdout": err.stdout,
        }))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_display_matches_spec_string() {
        assert_eq!(ErrorCode::InvalidRatio.to_string(), "INVALID_RATIO");
        assert_eq!(ErrorCode::UserCancelled.to_string(), "USER_CANCELLED");
    }

    #[test]
    fn app_error_carries_path_and_details() {
        let err = AppError::validation(ErrorCode::DuplicateName, "duplicate leaf name: main")
            .with_path("root.1")
            .with_details(serde_json::json!({"name": "main"}));
        assert_eq!(err.category, ErrorCategory::Validation);
        assert_eq!(err.path.as_deref(), Some("root.1"));
        assert!(err.to_string().contains("DUPLICATE_NAME"));
    }
}
