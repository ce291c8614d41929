//! Tool support for voice-assistant
//!
//! This crate provides the tool registry and the MCP client manager that
//! exposes remote tool-provider servers as tools.

pub mod base;
pub mod mcp;
pub mod registry;

pub use base::{Tool, ToolError, ToolSource};
pub use mcp::McpClientManager;
pub use registry::ToolRegistry;
