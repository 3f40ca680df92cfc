//! Engine invocations – `analyze` and `format` as child processes.
//!
//! Validation order is fixed: the JAR check runs before the target path check,
//! so a missing JAR is reported even when the path is bogus too.

use crate::context::{AdapterContext, EngineSettings};
use crate::error::{BslError, BslResult};
use crate::process::{self, CommandSpec, OutcomeKind, ProcessOutcome, RunError};
use crate::report::{self, REPORT_FILE};
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const FORMAT_OK: &str = "Formatting completed successfully.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Analyze,
    Format,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Analyze => "analyze",
            Operation::Format => "format",
        }
    }
}

/// Everything needed to start one engine run, derived from the caller's path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub operation: Operation,
    pub target_path: PathBuf,
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl InvocationRequest {
    /// A directory is analyzed in place; a file is analyzed via its parent.
    pub fn analyze(target: &Path) -> Self {
        let dir = if target.is_dir() {
            target.to_path_buf()
        } else {
            parent_or_self(target)
        };
        Self {
            operation: Operation::Analyze,
            target_path: target.to_path_buf(),
            working_dir: dir.clone(),
            output_dir: dir,
        }
    }

    pub fn format(target: &Path) -> Self {
        let dir = parent_or_self(target);
        Self {
            operation: Operation::Format,
            target_path: target.to_path_buf(),
            working_dir: dir.clone(),
            output_dir: dir,
        }
    }

    /// Engine arguments following the JAR path.
    pub fn engine_args(&self) -> Vec<String> {
        match self.operation {
            Operation::Analyze => {
                let dir = self.output_dir.display().to_string();
                vec![
                    "analyze".into(),
                    "--srcDir".into(),
                    dir.clone(),
                    "--reporter".into(),
                    "json".into(),
                    "-o".into(),
                    dir,
                    "-q".into(),
                ]
            }
            Operation::Format => vec![
                "format".into(),
                "--src".into(),
                self.target_path.display().to_string(),
                "-q".into(),
            ],
        }
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }
}

fn parent_or_self(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

/// Successful analyze run whose report file is known to exist.
#[derive(Debug, Clone)]
pub struct AnalyzeRun {
    pub request: InvocationRequest,
    pub outcome: ProcessOutcome,
}

// ===========================================================================
// Public operations
// ===========================================================================

/// Run the engine's analyzer and render its report.
pub async fn analyze(ctx: &AdapterContext, src_dir: &str) -> BslResult<String> {
    let run = run_analyze(ctx, src_dir).await?;
    let report = report::load(&run.request.report_path())?;
    Ok(report::render(&report))
}

/// Run the engine's formatter in place.
pub async fn format(ctx: &AdapterContext, src: &str) -> BslResult<String> {
    run_format(ctx, src).await?;
    Ok(FORMAT_OK.to_string())
}

pub async fn run_analyze(ctx: &AdapterContext, src_dir: &str) -> BslResult<AnalyzeRun> {
    let target = validate(ctx, src_dir)?;
    let request = InvocationRequest::analyze(&target);
    let outcome = execute(ctx, &request).await?;

    let report_path = request.report_path();
    if !report_path.is_file() {
        tracing::warn!(report = %report_path.display(), "engine exited cleanly without a report");
        return Err(BslError::ReportMissing {
            path: report_path,
            output: outcome.combined_output,
        });
    }
    Ok(AnalyzeRun { request, outcome })
}

pub async fn run_format(ctx: &AdapterContext, src: &str) -> BslResult<ProcessOutcome> {
    let target = validate(ctx, src)?;
    let request = InvocationRequest::format(&target);
    execute(ctx, &request).await
}

// ===========================================================================
// Internals
// ===========================================================================

fn validate(ctx: &AdapterContext, raw: &str) -> BslResult<PathBuf> {
    let location = &ctx.engine.location;
    if !location.is_available() {
        return Err(BslError::EngineNotFound {
            path: location.path().to_path_buf(),
        });
    }
    let target = std::path::absolute(raw)?;
    if !target.exists() {
        return Err(BslError::PathNotFound(target));
    }
    Ok(target)
}

/// Build the full command line. The JAR path is made absolute because the
/// child runs in the target's directory, not ours.
pub fn command_spec(
    settings: &EngineSettings,
    request: &InvocationRequest,
) -> BslResult<CommandSpec> {
    let jar = std::path::absolute(settings.location.path())?
        .display()
        .to_string();
    let mut line: Vec<String> = settings.launcher.clone();
    line.push(jar);
    line.extend(request.engine_args());
    let program = line.remove(0);
    Ok(CommandSpec {
        program,
        args: line,
        cwd: request.working_dir.clone(),
        timeout: settings.timeout,
    })
}

async fn execute(
    ctx: &AdapterContext,
    request: &InvocationRequest,
) -> BslResult<ProcessOutcome> {
    let settings = &ctx.engine;
    let spec = command_spec(settings, request)?;
    let operation = request.operation.as_str();
    let start = Instant::now();
    tracing::info!(operation, target = %request.target_path.display(), "running BSL Language Server");

    let outcome = process::run_with_timeout(&spec, &ctx.cancel)
        .await
        .map_err(|e| match e {
            RunError::Spawn { program, source } => BslError::Io(std::io::Error::new(
                source.kind(),
                format!("failed to start {}: {}", program, source),
            )),
            RunError::Wait(e) => BslError::Io(e),
            RunError::Interrupted { output } => BslError::Interrupted { output },
        })?;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    match outcome.kind() {
        OutcomeKind::Success => {
            tracing::info!(operation, elapsed_ms, "BSL Language Server finished");
            Ok(outcome)
        }
        OutcomeKind::TimedOut => Err(BslError::TimedOut {
            operation,
            timeout: settings.timeout,
            output: outcome.combined_output,
        }),
        OutcomeKind::Failed(exit_code) => {
            tracing::warn!(operation, elapsed_ms, %exit_code, "BSL Language Server failed");
            Err(BslError::EngineFailed {
                operation,
                exit_code,
                output: outcome.combined_output,
            })
        }
    }
}
