//! Fake engine for tests: a shell script started as `sh <script> <args>`.

use crate::context::{AdapterContext, CancelSignal, EngineSettings};
use crate::locator::EngineLocation;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const SAMPLE_REPORT: &str = r#"{
  "sourceDir": "/work/src",
  "date": "2025-03-01",
  "fileinfos": [
    {
      "path": "file:///work/src/Module.bsl",
      "metrics": { "lines": 12, "ncloc": 9, "procedures": 1, "functions": 1,
                   "cyclomaticComplexity": 2, "cognitiveComplexity": 1 },
      "diagnostics": [
        { "severity": "Warning", "code": "LineLength", "source": "bsl-language-server",
          "message": "Line is too long", "range": { "start": { "line": 5, "character": 2 } } }
      ]
    }
  ]
}"#;

/// Engine whose body is `script`, living in its own directory.
pub(crate) struct FakeEngine {
    pub dir: tempfile::TempDir,
    pub script: PathBuf,
}

impl FakeEngine {
    pub fn new(script: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.sh");
        std::fs::write(&path, script).unwrap();
        std::fs::write(dir.path().join("report.json"), SAMPLE_REPORT).unwrap();
        Self { dir, script: path }
    }

    /// Script that copies the sample report into the `-o` directory.
    pub fn reporting() -> Self {
        Self::new(
            "echo \"$1\" \"$3\"\n\
             if [ \"$1\" = analyze ]; then cp \"$(dirname \"$0\")/report.json\" \"$7/bsl-json.json\"; fi\n",
        )
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            location: EngineLocation::new(&self.script),
            launcher: vec!["sh".into()],
            timeout: Duration::from_secs(10),
        }
    }

    pub fn ctx(&self) -> AdapterContext {
        AdapterContext::new(self.settings(), CancelSignal::never())
    }

    pub fn sidecar(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Context pointing at a JAR that does not exist.
pub(crate) fn missing_engine_ctx(dir: &Path) -> AdapterContext {
    AdapterContext::new(
        EngineSettings::new(EngineLocation::new(dir.join("bsl-language-server.jar"))),
        CancelSignal::never(),
    )
}
