//! Server side of the channel: a registry of named tools and a stdio loop
//! that answers `initialize`, `tools/list`, and `tools/call`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, PeerInfo, ServerCapabilities, Tool, ToolsCapability,
    PROTOCOL_VERSION,
};

type Handler =
    Box<dyn Fn(Map<String, Value>) -> Pin<Box<dyn Future<Output = CallToolResult> + Send>> + Send + Sync>;

struct RegisteredTool {
    tool: Tool,
    handler: Handler,
}

/// The set of tools a host advertises, fixed for the process lifetime.
///
/// Each tool carries a name (unique within the registry), a description for
/// the capability catalog, and a JSON schema for its parameters. Handler
/// failures are expressed as `is_error` results so they reach the client as
/// application outcomes rather than protocol errors.
pub struct Registry {
    name: String,
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. A later registration under the same name replaces
    /// the earlier one.
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CallToolResult> + Send + 'static,
    {
        let name = name.into();
        let tool = Tool {
            name: name.clone(),
            description: Some(description.into()),
            input_schema,
        };
        let handler: Handler = Box::new(move |args| Box::pin(handler(args)));

        if let Some(&i) = self.index.get(&name) {
            self.tools[i] = RegisteredTool { tool, handler };
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(RegisteredTool { tool, handler });
        }
    }

    /// Advertised tools, in registration order.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool.clone()).collect()
    }

    /// Answer one request frame. Notifications are consumed silently.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize_result()),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.tools(),
                },
            ),
            "tools/call" => match request
                .params
                .map(serde_json::from_value::<CallToolParams>)
                .transpose()
            {
                Ok(Some(params)) => JsonRpcResponse::success(id, self.call(params).await),
                Ok(None) | Err(_) => JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "invalid tools/call params"),
                ),
            },
            method => JsonRpcResponse::failure(id, JsonRpcError::method_not_found(method)),
        };

        Some(response)
    }

    async fn call(&self, params: CallToolParams) -> CallToolResult {
        let Some(&i) = self.index.get(&params.name) else {
            return CallToolResult::error(format!("unknown tool: {}", params.name));
        };

        let arguments = match params.arguments {
            None => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => {
                return CallToolResult::error("tool arguments must be an object");
            }
        };

        (self.tools[i].handler)(arguments).await
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: PeerInfo {
                name: self.name.clone(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        }
    }
}

/// Serve the registry over this process's stdin/stdout until EOF.
///
/// One frame per line in, one frame per line out. An unparseable frame gets
/// a `-32700` response with a null id; the loop keeps going.
pub async fn serve(registry: Registry) -> std::io::Result<()> {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        if stdin.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => registry.handle(request).await,
            Err(e) => Some(JsonRpcResponse::failure(
                None,
                JsonRpcError::new(JsonRpcError::PARSE_ERROR, e.to_string()),
            )),
        };

        if let Some(response) = response {
            let json = serde_json::to_string(&response)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
}
