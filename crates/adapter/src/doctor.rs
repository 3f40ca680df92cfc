//! Doctor – report whether the engine can be started from here.

use crate::context::EngineSettings;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorReport {
    pub jar_path: String,
    pub jar_available: bool,
    pub launcher: Vec<String>,
    /// First line of `<launcher> -version`, if the launcher answered.
    pub launcher_version: Option<String>,
    pub timeout_secs: u64,
    pub os: String,
    pub arch: String,
}

impl DoctorReport {
    /// Both the JAR and a working launcher were found.
    pub fn ready(&self) -> bool {
        self.jar_available && (self.launcher.is_empty() || self.launcher_version.is_some())
    }
}

pub fn run_doctor(settings: &EngineSettings) -> DoctorReport {
    let location = &settings.location;
    let jar_path = std::path::absolute(location.path())
        .unwrap_or_else(|_| location.path().to_path_buf())
        .display()
        .to_string();
    DoctorReport {
        jar_path,
        jar_available: location.is_available(),
        launcher: settings.launcher.clone(),
        launcher_version: settings
            .launcher
            .first()
            .and_then(|program| run_cmd(program, &["-version"])),
        timeout_secs: settings.timeout.as_secs(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

/// `java -version` prints to stderr, so both streams are checked.
fn run_cmd(cmd: &str, args: &[&str]) -> Option<String> {
    let o = std::process::Command::new(cmd)
        .args(args)
        .stdin(std::process::Stdio::null())
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    let text = if o.stdout.is_empty() { o.stderr } else { o.stdout };
    String::from_utf8_lossy(&text)
        .lines()
        .next()
        .map(|l| l.trim().to_string())
}
