//! Tool selection: turn a user query plus a tool catalog into the name of
//! one tool and its arguments, by way of an LLM.
//!
//! The LLM is unreliable by construction, so selection is infallible at this
//! boundary: any backend failure or unparseable reply degrades to a
//! [`Selection`] with no tool, and the caller decides what that means.

mod parse;

pub use parse::{parse_arguments, parse_selection};

use crate::backend::LlmBackend;
use mcp::Tool;
use serde_json::{Map, Value};
use std::future::Future;

/// The structured outcome of tool selection for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The query the selection was made for.
    pub query: String,
    /// Name of the selected tool, if the model identified one.
    pub tool: Option<String>,
    /// Arguments for the call, always a mapping by this point.
    pub arguments: Map<String, Value>,
}

impl Selection {
    /// The null selection: no tool, no arguments.
    pub fn none(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            tool: None,
            arguments: Map::new(),
        }
    }
}

/// Trait for tool selectors.
///
/// Kept as a seam so the dispatch pipeline can be driven by a fake in tests.
pub trait Selector: Send + Sync {
    /// Select a tool for the query from the advertised set. Never fails;
    /// failures are a selection with `tool: None`.
    fn select(&self, query: &str, tools: &[Tool]) -> impl Future<Output = Selection> + Send;
}

const TOOL_IDENTIFIER_PROMPT: &str = r#"
You have been given access to the below MCP Server Tools

{tools_description}

You must identify the appropriate tool only from the above tools required to resolve the user query with the arguments,

{user_query}

Your output should be in json like below format:

{
    user_query: "User Query",
    tool_identified: "Tool Name",
    arguments: "arg1, arg2, ... "
}

Example:

User Query: What is the weather in New York City?

Your Output:
{
    user_query: "What is the weather in New York City?",
    tool_identified: "get_weather",
    arguments: "{'location': 'New York City'}"
}
"#;

/// Render the advertised tools as a human-readable catalog for the prompt.
fn tool_catalog(tools: &[Tool]) -> String {
    let mut catalog = String::new();
    for tool in tools {
        let name = &tool.name;
        let description = tool.description.as_deref().unwrap_or("");
        catalog.push_str(&format!("Tool - {name}: {description}\n\n"));
    }
    catalog
}

fn build_prompt(query: &str, tools: &[Tool]) -> String {
    TOOL_IDENTIFIER_PROMPT
        .replace("{tools_description}", &tool_catalog(tools))
        .replace("{user_query}", query)
}

/// [`Selector`] backed by an [`LlmBackend`].
pub struct LlmSelector<B> {
    backend: B,
}

impl<B: LlmBackend> LlmSelector<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: LlmBackend> Selector for LlmSelector<B> {
    async fn select(&self, query: &str, tools: &[Tool]) -> Selection {
        let prompt = build_prompt(query, tools);
        match self.backend.complete(&prompt).await {
            Ok(raw) => parse_selection(query, &raw),
            // One call per query, no retry: an unreachable model reads the
            // same as an unusable reply.
            Err(_) => Selection::none(query),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Result};
    use serde_json::json;

    fn tool(name: &str, description: &str) -> Tool {
        Tool {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: json!({"type": "object"}),
        }
    }

    struct ScriptedBackend {
        reply: Result<&'static str>,
    }

    impl LlmBackend for ScriptedBackend {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(Error::Network(m)) => Err(Error::Network(m.clone())),
                Err(Error::Api(m)) => Err(Error::Api(m.clone())),
                Err(Error::Config(m)) => Err(Error::Config(m.clone())),
            }
        }
    }

    #[test]
    fn catalog_lists_name_and_description() {
        let tools = vec![
            tool("get_stock_price", "Get the current stock price."),
            tool("compare_stocks", "Compare two stocks."),
        ];
        let catalog = tool_catalog(&tools);
        assert!(catalog.contains("Tool - get_stock_price: Get the current stock price.\n\n"));
        assert!(catalog.contains("Tool - compare_stocks: Compare two stocks.\n\n"));
    }

    #[test]
    fn prompt_embeds_catalog_and_query() {
        let tools = vec![tool("get_stock_price", "Get the current stock price.")];
        let prompt = build_prompt("What is AAPL at?", &tools);
        assert!(prompt.contains("Tool - get_stock_price"));
        assert!(prompt.contains("What is AAPL at?"));
        assert!(prompt.contains("tool_identified"));
        assert!(!prompt.contains("{tools_description}"));
        assert!(!prompt.contains("{user_query}"));
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_null_selection() {
        let selector = LlmSelector::new(ScriptedBackend {
            reply: Err(Error::Network("connection refused".to_string())),
        });
        let selection = selector.select("query", &[]).await;
        assert_eq!(selection, Selection::none("query"));
    }

    #[tokio::test]
    async fn well_formed_reply_is_parsed() {
        let selector = LlmSelector::new(ScriptedBackend {
            reply: Ok(
                r#"{"user_query":"Q","tool_identified":"get_stock_price","arguments":{"symbol":"AAPL"}}"#,
            ),
        });
        let selection = selector.select("Q", &[]).await;
        assert_eq!(selection.tool.as_deref(), Some("get_stock_price"));
        assert_eq!(selection.arguments.get("symbol"), Some(&json!("AAPL")));
    }
}
