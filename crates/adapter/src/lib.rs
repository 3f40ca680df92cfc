//! BSL adapter – analysis orchestration behind the `mcp-1c-bsl` server.
//!
//! Locates the BSL Language Server JAR, runs it as a child process for
//! `analyze` / `format`, and turns its JSON report into plain text. It knows
//! nothing about the transport, so the CLI can serve it over stdio, HTTP, or
//! call it one-shot.

pub mod context;
pub mod doctor;
pub mod error;
pub mod locator;
pub mod process;
pub mod report;
pub mod runner;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use context::{AdapterContext, CancelHandle, CancelSignal, EngineSettings};
pub use error::{BslError, BslResult};
pub use locator::EngineLocation;
pub use tools::ToolRegistry;
pub use types::{CallToolResult, ErrorCode, ToolDescriptor, FAILURE_MARKER};
