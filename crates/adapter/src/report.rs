//! BSL Language Server JSON report: parsing and text rendering.
//!
//! The engine writes `bsl-json.json` with 0-based LSP positions. The rendered
//! text uses 1-based line/column and is a pure function of the parsed value.

use crate::error::{BslError, BslResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use std::fmt::Write;
use std::path::Path;

/// Report file name the engine writes into the output directory.
pub const REPORT_FILE: &str = "bsl-json.json";

const NO_DIAGNOSTICS: &str = "No diagnostics found.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(default)]
    pub source_dir: JsonText,
    #[serde(default)]
    pub date: JsonText,
    /// `None` when the key is absent or not an array.
    #[serde(default, rename = "fileinfos", deserialize_with = "lenient_vec")]
    pub files: Option<Vec<FileInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub path: JsonText,
    /// `Some` whenever the key is present, even as `null`.
    #[serde(default, deserialize_with = "present_metrics")]
    pub metrics: Option<Metrics>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub diagnostics: Option<Vec<Diagnostic>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(default, deserialize_with = "int_or_zero")]
    pub lines: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub ncloc: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub procedures: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub functions: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub cyclomatic_complexity: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub cognitive_complexity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Diagnostic {
    #[serde(default)]
    pub severity: JsonText,
    #[serde(default)]
    pub code: JsonText,
    #[serde(default)]
    pub source: JsonText,
    #[serde(default)]
    pub message: JsonText,
    #[serde(default, deserialize_with = "object_or_default")]
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Range {
    #[serde(default, deserialize_with = "object_or_default")]
    pub start: Position,
}

/// 0-based position, as the engine reports it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "int_or_zero")]
    pub line: i64,
    #[serde(default, deserialize_with = "int_or_zero")]
    pub character: i64,
}

/// A scalar read as text: strings verbatim, numbers and booleans in their JSON
/// spelling, anything else (null, arrays, objects) as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonText(pub String);

impl JsonText {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JsonText {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for JsonText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JsonText {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let text = match serde_json::Value::deserialize(d)? {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            _ => String::new(),
        };
        Ok(JsonText(text))
    }
}

fn int_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = serde_json::Value::deserialize(d)?;
    Ok(match v {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Objects are deserialized; any other JSON shape, `null` included, is the default.
fn from_object_or_default<T, E>(v: serde_json::Value) -> Result<T, E>
where
    T: DeserializeOwned + Default,
    E: serde::de::Error,
{
    match v {
        v @ serde_json::Value::Object(_) => serde_json::from_value(v).map_err(E::custom),
        _ => Ok(T::default()),
    }
}

fn object_or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    from_object_or_default(serde_json::Value::deserialize(d)?)
}

fn present_metrics<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Metrics>, D::Error> {
    object_or_default(d).map(Some)
}

fn lenient_vec<'de, D, T>(d: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(from_object_or_default::<T, D::Error>)
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

pub fn parse(bytes: &[u8], path: &Path) -> BslResult<AnalysisReport> {
    serde_json::from_slice(bytes).map_err(|source| BslError::ReportParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Read and parse the report file.
pub fn load(path: &Path) -> BslResult<AnalysisReport> {
    let bytes = std::fs::read(path)?;
    tracing::debug!(path = %path.display(), size_bytes = bytes.len(), "loaded report");
    parse(&bytes, path)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Short name for a report path: `file:///` stripped, last path segment kept.
pub fn display_name(path: &str) -> String {
    let stripped = path.strip_prefix("file:///").unwrap_or(path);
    let normalized = stripped.replace('\\', "/");
    match normalized.rfind('/') {
        Some(idx) => normalized[idx + 1..].to_string(),
        None => normalized,
    }
}

pub fn render(report: &AnalysisReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Analysis: {}", report.source_dir);
    let _ = writeln!(out, "Date: {}", report.date);
    out.push('\n');

    let Some(files) = report.files.as_deref() else {
        return out;
    };

    let mut total_diagnostics = 0usize;
    for file in files {
        let diagnostics = file.diagnostics.as_deref().unwrap_or_default();
        if diagnostics.is_empty() && file.metrics.is_none() {
            continue;
        }

        let _ = writeln!(out, "**{}**", display_name(file.path.as_str()));

        if let Some(m) = &file.metrics {
            let _ = writeln!(
                out,
                "  Metrics: lines {}, ncloc {}, procedures {}, functions {}, cyclomatic complexity {}, cognitive complexity {}",
                m.lines,
                m.ncloc,
                m.procedures,
                m.functions,
                m.cyclomatic_complexity,
                m.cognitive_complexity
            );
        }

        for d in diagnostics {
            total_diagnostics += 1;
            let _ = writeln!(
                out,
                "  - [{}] {} ({}) - line {}, col {}: {}",
                d.severity,
                d.code,
                d.source,
                d.range.start.line.saturating_add(1),
                d.range.start.character.saturating_add(1),
                d.message
            );
        }
        out.push('\n');
    }

    if total_diagnostics == 0 && !files.is_empty() {
        out.push_str(NO_DIAGNOSTICS);
        out.push('\n');
    }

    out
}
