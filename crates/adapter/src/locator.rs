//! Engine locator – where the BSL Language Server JAR lives.

use std::path::{Path, PathBuf};

/// Environment variable overriding the JAR path.
pub const JAR_ENV: &str = "BSL_LANGUAGE_SERVER_JAR";

/// JAR name looked up relative to the working directory when nothing is configured.
pub const DEFAULT_JAR: &str = "bsl-language-server.jar";

/// Path to the engine JAR, resolved once at startup.
///
/// Availability is not part of the value: the JAR may be provisioned or removed
/// while the server runs, so [`EngineLocation::is_available`] hits the
/// filesystem every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineLocation {
    jar: PathBuf,
}

impl EngineLocation {
    /// Resolve from `BSL_LANGUAGE_SERVER_JAR`, then `configured`, then [`DEFAULT_JAR`].
    pub fn resolve(configured: Option<&str>) -> Self {
        let env = std::env::var(JAR_ENV).ok();
        Self::from_candidates(env.as_deref(), configured)
    }

    fn from_candidates(env: Option<&str>, configured: Option<&str>) -> Self {
        let jar = [env, configured]
            .into_iter()
            .flatten()
            .find(|v| !v.trim().is_empty())
            .unwrap_or(DEFAULT_JAR);
        Self {
            jar: PathBuf::from(jar),
        }
    }

    pub fn new(jar: impl Into<PathBuf>) -> Self {
        Self { jar: jar.into() }
    }

    pub fn path(&self) -> &Path {
        &self.jar
    }

    /// True when the path currently names a regular file.
    pub fn is_available(&self) -> bool {
        self.jar.is_file()
    }
}

impl Default for EngineLocation {
    fn default() -> Self {
        Self::new(DEFAULT_JAR)
    }
}
