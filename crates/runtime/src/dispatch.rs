//! The per-query pipeline: open a session to the tool host, list its tools,
//! select one, validate, invoke, report. One session per query, torn down
//! exactly once on every path.

use std::future::Future;

use mcp::{CallToolResult, Client, HostConfig, Tool};
use serde_json::{Map, Value};

use crate::selector::{Selection, Selector};

/// Pipeline stage a session failure occurred in, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initializing,
    ListingTools,
    Invoking,
}

/// The externally observable outcome of one query.
///
/// `Display` renders the fixed user-facing messages; callers print one per
/// query.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// The tool ran and returned text.
    Output(String),
    /// The tool ran, succeeded, but returned no text-typed content.
    NoTextContent,
    /// The tool itself reported failure (`is_error` result).
    ToolError,
    /// The selection named no tool, or a tool outside the advertised set.
    NoToolIdentified,
    /// The host process could not be spawned; no session existed.
    ConnectionFailed(String),
    /// A channel fault after the session was opened.
    SessionFailed(Stage, String),
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Report::Output(text) => write!(f, "{text}"),
            Report::NoTextContent => write!(f, "[agent] Tool returned no text content."),
            Report::ToolError => write!(f, "[agent] Tool error returned by server."),
            Report::NoToolIdentified => {
                write!(f, "[agent] No valid tool identified for this query.")
            }
            Report::ConnectionFailed(e) => write!(f, "[agent] Connection error: {e}"),
            Report::SessionFailed(Stage::Invoking, e) => {
                write!(f, "[agent] Tool call error: {e}")
            }
            Report::SessionFailed(_, e) => write!(f, "[agent] Session error: {e}"),
        }
    }
}

/// One open session channel to a tool host.
///
/// Seam over [`mcp::Client`] so the pipeline can be exercised with fakes,
/// including teardown accounting.
pub trait Channel: Send + Sync {
    fn initialize(&self) -> impl Future<Output = mcp::Result<()>> + Send;
    fn list_tools(&self) -> impl Future<Output = mcp::Result<Vec<Tool>>> + Send;
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = mcp::Result<CallToolResult>> + Send;
    fn close(&self) -> impl Future<Output = ()> + Send;
}

impl Channel for Client {
    async fn initialize(&self) -> mcp::Result<()> {
        Client::initialize(self).await
    }

    async fn list_tools(&self) -> mcp::Result<Vec<Tool>> {
        Client::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> mcp::Result<CallToolResult> {
        Client::call_tool(self, name, arguments).await
    }

    async fn close(&self) {
        Client::close(self).await
    }
}

/// Opens a fresh [`Channel`] for one query.
pub trait Connect: Send + Sync {
    type Channel: Channel;
    fn connect(&self) -> impl Future<Output = mcp::Result<Self::Channel>> + Send;
}

/// Production connector: spawns the configured host process.
pub struct HostConnector {
    config: HostConfig,
}

impl HostConnector {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }
}

impl Connect for HostConnector {
    type Channel = Client;

    async fn connect(&self) -> mcp::Result<Client> {
        Client::spawn(&self.config).await
    }
}

/// Validate a selection against the tools listed in the same session.
///
/// Returns the tool name only when the selection names a member of the
/// advertised set.
pub fn validate<'a>(selection: &'a Selection, tools: &[Tool]) -> Option<&'a str> {
    let name = selection.tool.as_deref()?;
    tools.iter().any(|t| t.name == name).then_some(name)
}

/// Drives one query end-to-end.
///
/// Each call to [`dispatch`] opens a fresh session and a fresh tool listing;
/// nothing is cached across queries, so the pipeline always validates
/// against the host's live capability set.
///
/// [`dispatch`]: Dispatcher::dispatch
pub struct Dispatcher<C, S> {
    connector: C,
    selector: S,
}

impl<C: Connect, S: Selector> Dispatcher<C, S> {
    pub fn new(connector: C, selector: S) -> Self {
        Self { connector, selector }
    }

    /// Resolve one query to at most one tool call and report the outcome.
    ///
    /// Never returns an error: every failure mode maps to a [`Report`]
    /// variant. The session is closed exactly once on every path that
    /// opened one.
    pub async fn dispatch(&self, query: &str) -> Report {
        let channel = match self.connector.connect().await {
            Ok(channel) => channel,
            Err(e) => return Report::ConnectionFailed(e.to_string()),
        };

        let report = self.run(&channel, query).await;
        channel.close().await;
        report
    }

    async fn run(&self, channel: &C::Channel, query: &str) -> Report {
        if let Err(e) = channel.initialize().await {
            return Report::SessionFailed(Stage::Initializing, e.to_string());
        }

        let tools = match channel.list_tools().await {
            Ok(tools) => tools,
            Err(e) => return Report::SessionFailed(Stage::ListingTools, e.to_string()),
        };

        // Selection never fails; the selector absorbs model and parse
        // failures into a null selection.
        let selection = self.selector.select(query, &tools).await;

        let Some(name) = validate(&selection, &tools) else {
            return Report::NoToolIdentified;
        };

        match channel.call_tool(name, selection.arguments.clone()).await {
            Err(e) => Report::SessionFailed(Stage::Invoking, e.to_string()),
            Ok(result) if result.is_error => Report::ToolError,
            Ok(result) => match result.first_text() {
                Some(text) => Report::Output(text.to_string()),
                None => Report::NoTextContent,
            },
        }
    }
}
