use crate::types::ErrorCode;
use std::path::PathBuf;
use std::time::Duration;

/// Result type for every adapter operation.
pub type BslResult<T> = Result<T, BslError>;

/// Everything that can go wrong between receiving a tool call and returning text.
///
/// The `Display` text is the message without the failure marker; the marker is
/// prepended once, when the result is flattened for the transport
/// (see [`crate::types::CallToolResult::from_outcome`]).
#[derive(Debug, thiserror::Error)]
pub enum BslError {
    #[error(
        "BSL Language Server JAR not found: {}. Set BSL_LANGUAGE_SERVER_JAR or put bsl-language-server.jar into the working directory.",
        .path.display()
    )]
    EngineNotFound { path: PathBuf },

    #[error("path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("BSL Language Server {operation} failed (exit {exit_code}): {output}")]
    EngineFailed {
        operation: &'static str,
        exit_code: ExitCode,
        output: String,
    },

    #[error("BSL Language Server {operation} timed out after {}s: {output}", .timeout.as_secs())]
    TimedOut {
        operation: &'static str,
        timeout: Duration,
        output: String,
    },

    #[error("report was not created: {}\nOutput: {output}", .path.display())]
    ReportMissing { path: PathBuf, output: String },

    #[error("malformed report {}: {source}", .path.display())]
    ReportParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("interrupted while waiting for BSL Language Server: {output}")]
    Interrupted { output: String },

    #[error("specify {field}: {hint}")]
    MissingArgument {
        field: &'static str,
        hint: &'static str,
    },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

impl BslError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            BslError::EngineNotFound { .. } => ErrorCode::DependencyMissing,
            BslError::PathNotFound(_) => ErrorCode::NotFound,
            BslError::EngineFailed { .. } => ErrorCode::EngineFailed,
            BslError::TimedOut { .. } => ErrorCode::Timeout,
            BslError::ReportMissing { .. } => ErrorCode::ReportMissing,
            BslError::ReportParse { .. } => ErrorCode::InternalError,
            BslError::Io(_) => ErrorCode::IoError,
            BslError::Interrupted { .. } => ErrorCode::Interrupted,
            BslError::MissingArgument { .. }
            | BslError::InvalidArguments(_)
            | BslError::UnknownTool(_) => ErrorCode::InvalidInput,
        }
    }
}

/// Exit status of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Code(i32),
    /// Terminated by a signal, no numeric code.
    Signal,
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitCode::Code(c) => write!(f, "{}", c),
            ExitCode::Signal => f.write_str("signal"),
        }
    }
}
