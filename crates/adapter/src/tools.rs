//! Tool registry – the two operations exposed to protocol peers.
//!
//! Tools are registered by name and invoked with untyped JSON arguments, which
//! are turned into a typed request before anything touches the engine.

use crate::context::AdapterContext;
use crate::error::{BslError, BslResult};
use crate::runner;
use crate::types::*;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

pub const ANALYZE_TOOL: &str = "bsl_analyze";
pub const FORMAT_TOOL: &str = "bsl_format";

#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    async fn call(&self, args: Value, ctx: &AdapterContext) -> BslResult<String>;
}

// ---------------------------------------------------------------------------
// Typed requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, rename = "srcDir")]
    pub src_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatRequest {
    #[serde(default)]
    pub src: Option<String>,
}

impl AnalyzeRequest {
    pub fn validated(self) -> BslResult<String> {
        required(
            self.src_dir,
            "srcDir",
            "path to a source directory or a .bsl/.os file",
        )
    }
}

impl FormatRequest {
    pub fn validated(self) -> BslResult<String> {
        required(self.src, "src", "path to a file or directory to format")
    }
}

fn required(
    value: Option<String>,
    field: &'static str,
    hint: &'static str,
) -> BslResult<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BslError::MissingArgument { field, hint }),
    }
}

fn parse_args<T: for<'de> Deserialize<'de> + Default>(args: Value) -> BslResult<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| BslError::InvalidArguments(e.to_string()))
}

// ---------------------------------------------------------------------------
// Built-in tools
// ---------------------------------------------------------------------------

pub struct AnalyzeTool;

#[async_trait::async_trait]
impl Tool for AnalyzeTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: ANALYZE_TOOL.to_string(),
            title: "Analyze 1C (BSL) code".to_string(),
            description: "Runs BSL Language Server analysis on 1C (BSL/OneScript) sources. \
                Returns diagnostics and metrics. Requires Java 17+ and the BSL LS JAR \
                (BSL_LANGUAGE_SERVER_JAR)."
                .to_string(),
            input_schema: single_string_schema(
                "srcDir",
                "Path to a source directory or a .bsl/.os file",
            ),
        }
    }

    async fn call(&self, args: Value, ctx: &AdapterContext) -> BslResult<String> {
        let src_dir = parse_args::<AnalyzeRequest>(args)?.validated()?;
        runner::analyze(ctx, &src_dir).await
    }
}

pub struct FormatTool;

#[async_trait::async_trait]
impl Tool for FormatTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: FORMAT_TOOL.to_string(),
            title: "Format 1C (BSL) code".to_string(),
            description: "Formats 1C (BSL/OneScript) files in place with BSL Language Server. \
                The path may be a .bsl/.os file or a directory. Requires Java 17+ and the \
                BSL LS JAR (BSL_LANGUAGE_SERVER_JAR)."
                .to_string(),
            input_schema: single_string_schema(
                "src",
                "Path to a file or directory to format",
            ),
        }
    }

    async fn call(&self, args: Value, ctx: &AdapterContext) -> BslResult<String> {
        let src = parse_args::<FormatRequest>(args)?.validated()?;
        runner::format(ctx, &src).await
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            tools: HashMap::new(),
        };
        reg.register(Box::new(AnalyzeTool));
        reg.register(Box::new(FormatTool));
        reg
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.descriptor().name, tool);
    }

    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Descriptors in name order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.list()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.descriptor())
            .collect()
    }

    /// Call a tool by name and flatten its outcome for the transport.
    pub async fn execute(
        &self,
        name: &str,
        args: Value,
        ctx: &AdapterContext,
    ) -> CallToolResult {
        let run_id = new_run_id();
        let start = Instant::now();

        let outcome = match self.tools.get(name) {
            Some(tool) => tool.call(args, ctx).await,
            None => Err(BslError::UnknownTool(name.to_string())),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => tracing::info!(%run_id, tool = name, elapsed_ms, "tool call succeeded"),
            Err(e) => tracing::warn!(
                %run_id,
                tool = name,
                elapsed_ms,
                code = %e.error_code(),
                error = %e,
                "tool call failed"
            ),
        }
        CallToolResult::from_outcome(outcome)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
