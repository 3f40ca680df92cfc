//! Adapter context – engine settings and the shared cancellation signal.

use crate::locator::EngineLocation;
use std::time::Duration;
use tokio::sync::watch;

/// Default bound on a single engine run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How to start the engine. Read-only after startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub location: EngineLocation,
    /// Program and leading arguments placed before the JAR path.
    pub launcher: Vec<String>,
    pub timeout: Duration,
}

impl EngineSettings {
    pub fn new(location: EngineLocation) -> Self {
        Self {
            location,
            launcher: default_launcher(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::new(EngineLocation::default())
    }
}

pub fn default_launcher() -> Vec<String> {
    vec!["java".to_string(), "-jar".to_string()]
}

/// Sender half of the process-wide cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Level-triggered cancellation flag.
///
/// Once raised it stays raised: waiting on it never clears it, so anyone
/// checking after an interrupted call still sees the cancelled state.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx })
    }

    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal is raised; pend forever if it never can be.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|raised| *raised).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Central context passed to every tool call.
#[derive(Debug, Clone)]
pub struct AdapterContext {
    pub engine: EngineSettings,
    pub cancel: CancelSignal,
}

impl AdapterContext {
    pub fn new(engine: EngineSettings, cancel: CancelSignal) -> Self {
        Self { engine, cancel }
    }

    /// Context with engine location from the environment and no cancellation.
    pub fn from_env() -> Self {
        Self::new(
            EngineSettings::new(EngineLocation::resolve(None)),
            CancelSignal::never(),
        )
    }
}
