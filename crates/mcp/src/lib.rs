//! Tool-host channel: JSON-RPC 2.0 over child-process stdio.
//!
//! This crate carries both ends of the channel. [`Client`] spawns a tool
//! host, performs the initialize handshake, lists tools, and invokes them;
//! [`server::Registry`] + [`server::serve`] expose a fixed set of tools on
//! stdin/stdout.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Client, HostConfig};
//! use std::collections::HashMap;
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = HostConfig {
//!     command: "coxswain".to_string(),
//!     args: vec!["serve".to_string()],
//!     env: HashMap::new(),
//! };
//!
//! let client = Client::spawn(&config).await?;
//! client.initialize().await?;
//!
//! for tool in client.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = client
//!     .call_tool("get_stock_price", serde_json::Map::new())
//!     .await?;
//! if result.is_error {
//!     eprintln!("tool reported an error");
//! }
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod protocol;
pub mod server;

pub use client::{Client, HostConfig, DEFAULT_TIMEOUT, MAX_FRAME_SIZE};
pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, PeerInfo, RequestId, ServerCapabilities,
    Tool, ToolContent, PROTOCOL_VERSION,
};
