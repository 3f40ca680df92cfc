//! `mcp-1c-bsl` – MCP server for BSL Language Server analysis and formatting.
//!
//! Without a subcommand it serves the tools over MCP on stdio, or over
//! streamable HTTP at `/mcp` when a port is given. The one-shot subcommands
//! run the same tools from a shell.

mod config;
mod logging;
mod serve;

use anyhow::Context;
use bsl_adapter::tools::{ANALYZE_TOOL, FORMAT_TOOL};
use bsl_adapter::{AdapterContext, CallToolResult, CancelSignal, ToolRegistry};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;

/// Overrides every other port source.
const PORT_ENV: &str = "MCP_HTTP_PORT";
const DEFAULT_HTTP_PORT: u16 = 8080;

// ===========================================================================
// CLI definition
// ===========================================================================

#[derive(Parser)]
#[command(
    name = "mcp-1c-bsl",
    version,
    about = "MCP server exposing BSL Language Server analysis and formatting"
)]
struct Cli {
    /// Configuration file (YAML). Defaults to ./mcp-1c-bsl.yaml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    serve: ServeArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
struct ServeArgs {
    /// Serve streamable HTTP at /mcp instead of stdio (port 8080 unless --port is given).
    #[arg(long)]
    http: bool,
    /// HTTP port to listen on.
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tools over stdio or HTTP (the default).
    Serve(ServeArgs),

    /// Analyze a directory or a single .bsl/.os file.
    Analyze {
        path: String,
        /// Print the tool result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Format a file or directory in place.
    Format {
        path: String,
        /// Print the tool result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the exposed tools.
    Tools {
        #[arg(long)]
        json: bool,
    },

    /// Check that the engine can be started.
    Doctor {
        #[arg(long)]
        json: bool,
    },
}

// ===========================================================================
// Main
// ===========================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(cli.config.as_deref()).context("cannot load configuration")?;
    logging::init_logging(&cfg.logging);

    let (cancel_handle, cancel) = CancelSignal::pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping");
            cancel_handle.cancel();
        }
    });

    let settings = cfg.engine_settings();
    tracing::debug!(
        jar = %settings.location.path().display(),
        timeout_secs = settings.timeout.as_secs(),
        "engine settings"
    );
    let ctx = AdapterContext::new(settings, cancel.clone());
    let registry = ToolRegistry::new();

    match cli.command {
        None => cmd_serve(&cli.serve, cfg.server.port, ctx, registry, cancel).await,
        Some(Commands::Serve(args)) => cmd_serve(&args, cfg.server.port, ctx, registry, cancel).await,
        Some(Commands::Analyze { path, json }) => {
            let result = registry
                .execute(ANALYZE_TOOL, json!({ "srcDir": path }), &ctx)
                .await;
            output_result(&result, json);
            Ok(())
        }
        Some(Commands::Format { path, json }) => {
            let result = registry
                .execute(FORMAT_TOOL, json!({ "src": path }), &ctx)
                .await;
            output_result(&result, json);
            Ok(())
        }
        Some(Commands::Tools { json }) => {
            cmd_tools(&registry, json);
            Ok(())
        }
        Some(Commands::Doctor { json }) => {
            cmd_doctor(&ctx, json);
            Ok(())
        }
    }
}

// ===========================================================================
// Subcommand implementations
// ===========================================================================

async fn cmd_serve(
    args: &ServeArgs,
    configured_port: Option<u16>,
    ctx: AdapterContext,
    registry: ToolRegistry,
    cancel: CancelSignal,
) -> anyhow::Result<()> {
    let env_port = std::env::var(PORT_ENV).ok();
    let server = serve::BslServer::new(ctx, registry);
    match resolve_port(env_port.as_deref(), args, configured_port) {
        Some(port) => serve::run_http(server, port, cancel).await,
        None => serve::run_stdio(server, cancel).await,
    }
}

/// Transport selection: `MCP_HTTP_PORT`, then `--port`, then `--http` alone
/// (8080), then the configured port. `None` means stdio.
fn resolve_port(env_port: Option<&str>, args: &ServeArgs, configured: Option<u16>) -> Option<u16> {
    if let Some(raw) = env_port {
        match raw.trim().parse::<u16>() {
            Ok(port) => return Some(port),
            Err(_) => tracing::warn!(value = raw, "ignoring invalid {}", PORT_ENV),
        }
    }
    if let Some(port) = args.port {
        return Some(port);
    }
    if args.http {
        return Some(DEFAULT_HTTP_PORT);
    }
    configured
}

fn cmd_tools(registry: &ToolRegistry, json: bool) {
    let descriptors = registry.descriptors();
    if json {
        let j = serde_json::to_string_pretty(&descriptors).unwrap_or_default();
        println!("{}", j);
        return;
    }
    for d in &descriptors {
        println!("{} – {}", d.name, d.title);
        println!("  {}", d.description);
    }
}

fn cmd_doctor(ctx: &AdapterContext, json: bool) {
    let report = bsl_adapter::doctor::run_doctor(&ctx.engine);
    if json {
        let j = serde_json::to_string_pretty(&report).unwrap_or_default();
        println!("{}", j);
    } else {
        let status = if report.ready() { "READY" } else { "NOT READY" };
        println!("[{}] BSL Language Server", status);
        println!(
            "  jar:      {} ({})",
            report.jar_path,
            if report.jar_available { "found" } else { "missing" }
        );
        println!("  launcher: {}", report.launcher.join(" "));
        println!(
            "  version:  {}",
            report.launcher_version.as_deref().unwrap_or("<no answer>")
        );
        println!("  timeout:  {}s", report.timeout_secs);
        println!("  env:      os={} arch={}", report.os, report.arch);
    }

    if !report.ready() {
        std::process::exit(1);
    }
}

// ===========================================================================
// Output helpers
// ===========================================================================

fn output_result(result: &CallToolResult, json: bool) {
    if json {
        let j = serde_json::to_string_pretty(result).unwrap_or_default();
        println!("{}", j);
    } else {
        println!("{}", result.text());
    }

    if result.is_error {
        std::process::exit(2);
    }
}
