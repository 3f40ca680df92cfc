//! Run an external command with a time bound, capturing stdout and stderr
//! into a single buffer.

use crate::context::CancelSignal;
use crate::error::ExitCode;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

/// Time allowed for the output pumps to drain after the child is gone.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    /// Command line as a single string, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// What happened to a child that was started successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub combined_output: String,
    /// `None` when the run timed out.
    pub exit_code: Option<ExitCode>,
    pub completed_within_timeout: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    TimedOut,
    Failed(ExitCode),
}

impl ProcessOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match (self.completed_within_timeout, self.exit_code) {
            (false, _) | (true, None) => OutcomeKind::TimedOut,
            (true, Some(ExitCode::Code(0))) => OutcomeKind::Success,
            (true, Some(code)) => OutcomeKind::Failed(code),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("waiting for child: {0}")]
    Wait(#[source] std::io::Error),
    #[error("interrupted")]
    Interrupted { output: String },
}

type Sink = Arc<Mutex<Vec<u8>>>;

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    Elapsed,
    Cancelled,
}

/// Spawn `spec`, wait at most `spec.timeout`, and classify the result.
///
/// The child is killed on timeout or when `cancel` is raised; whatever it wrote
/// up to that point is kept.
pub async fn run_with_timeout(
    spec: &CommandSpec,
    cancel: &CancelSignal,
) -> Result<ProcessOutcome, RunError> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

    tracing::debug!(pid = ?child.id(), cmd = %spec.display(), cwd = %spec.cwd.display(), "spawned");

    let sink: Sink = Arc::new(Mutex::new(Vec::new()));
    let mut pumps = Vec::with_capacity(2);
    if let Some(out) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(out, sink.clone())));
    }
    if let Some(err) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(err, sink.clone())));
    }

    let waited = tokio::select! {
        res = tokio::time::timeout(spec.timeout, child.wait()) => match res {
            Ok(status) => Waited::Exited(status),
            Err(_elapsed) => Waited::Elapsed,
        },
        _ = cancel.cancelled() => Waited::Cancelled,
    };

    let exit_code = match waited {
        Waited::Exited(Ok(status)) => {
            Some(status.code().map_or(ExitCode::Signal, ExitCode::Code))
        }
        Waited::Exited(Err(e)) => {
            let _ = child.kill().await;
            return Err(RunError::Wait(e));
        }
        Waited::Elapsed => {
            tracing::warn!(
                cmd = %spec.display(),
                timeout_secs = spec.timeout.as_secs(),
                "child timed out, killing"
            );
            let _ = child.kill().await;
            None
        }
        Waited::Cancelled => {
            let _ = child.kill().await;
            drain(pumps).await;
            tracing::warn!(cmd = %spec.display(), "cancelled while waiting for child");
            return Err(RunError::Interrupted {
                output: collected(&sink),
            });
        }
    };

    drain(pumps).await;
    Ok(ProcessOutcome {
        combined_output: collected(&sink),
        exit_code,
        completed_within_timeout: exit_code.is_some(),
    })
}

async fn pump<R: AsyncRead + Unpin>(mut reader: R, sink: Sink) {
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        sink.lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(&buf[..n]);
    }
}

/// Wait briefly for the pumps; a grandchild holding the pipe open must not block us.
async fn drain(pumps: Vec<tokio::task::JoinHandle<()>>) {
    for p in pumps {
        let abort = p.abort_handle();
        if tokio::time::timeout(DRAIN_GRACE, p).await.is_err() {
            abort.abort();
        }
    }
}

fn collected(sink: &Sink) -> String {
    let bytes = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    String::from_utf8_lossy(&bytes).into_owned()
}
