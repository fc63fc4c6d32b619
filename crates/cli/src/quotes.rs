//! The built-in tool host: two stock-quote tools over a canned price table.
//!
//! The tools exist so the dispatch pipeline has something real to call;
//! their internals are deliberately trivial. A market-data-backed host
//! would be configured via `[host]` instead.

use mcp::server::Registry;
use mcp::CallToolResult;
use serde_json::{json, Map, Value};

const QUOTES: &[(&str, f64)] = &[
    ("AAPL", 254.63),
    ("AMZN", 228.15),
    ("GOOG", 252.21),
    ("META", 751.44),
    ("MSFT", 517.93),
    ("NVDA", 182.64),
    ("TSLA", 345.98),
];

fn lookup(symbol: &str) -> Option<f64> {
    let symbol = symbol.trim().to_ascii_uppercase();
    QUOTES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, price)| *price)
}

/// Build the registry the `serve` command exposes.
pub fn registry() -> Registry {
    let mut registry = Registry::new("Stock Server");

    registry.register(
        "get_stock_price",
        "Get the current stock price for a given symbol.",
        json!({
            "type": "object",
            "properties": {
                "symbol": {"type": "string", "description": "Ticker symbol, e.g. AAPL"}
            },
            "required": ["symbol"]
        }),
        |args| async move { get_stock_price(&args) },
    );

    registry.register(
        "compare_stocks",
        "Compare two stocks based on their current prices.",
        json!({
            "type": "object",
            "properties": {
                "symbol1": {"type": "string"},
                "symbol2": {"type": "string"}
            },
            "required": ["symbol1", "symbol2"]
        }),
        |args| async move { compare_stocks(&args) },
    );

    registry
}

fn str_arg<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    args.get(name).and_then(Value::as_str)
}

fn get_stock_price(args: &Map<String, Value>) -> CallToolResult {
    let Some(symbol) = str_arg(args, "symbol") else {
        return CallToolResult::error("missing required argument: symbol");
    };

    match lookup(symbol) {
        Some(price) => {
            CallToolResult::text(format!("The current price of {symbol} is ${price:.2}"))
        }
        None => CallToolResult::text(format!(
            "Could not retrieve price for symbol: {symbol}. Market may be closed."
        )),
    }
}

fn compare_stocks(args: &Map<String, Value>) -> CallToolResult {
    let (Some(symbol1), Some(symbol2)) = (str_arg(args, "symbol1"), str_arg(args, "symbol2"))
    else {
        return CallToolResult::error("missing required arguments: symbol1, symbol2");
    };

    let (Some(price1), Some(price2)) = (lookup(symbol1), lookup(symbol2)) else {
        return CallToolResult::text("Could not retrieve prices for comparison.");
    };

    let text = if price1 > price2 {
        format!("{symbol1} is higher than {symbol2}: ${price1:.2} vs ${price2:.2}")
    } else if price1 < price2 {
        format!("{symbol2} is higher than {symbol1}: ${price2:.2} vs ${price1:.2}")
    } else {
        format!("{symbol1} and {symbol2} are equal at ${price1:.2}")
    };

    CallToolResult::text(text)
}
