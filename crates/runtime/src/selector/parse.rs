//! Parsing of model replies into a [`Selection`].
//!
//! The model is asked for strict JSON but routinely returns fenced blocks,
//! near-JSON, or stringified argument mappings. The policy here is fixed:
//! strip fences, parse JSON, and recover arguments through an ordered
//! two-tier chain (strict JSON, then a permissive literal parse). Anything
//! unrecoverable degrades to a null selection; nothing in this module
//! returns an error.

use super::Selection;
use serde_json::{Map, Value};

/// Parse a raw model reply for `query` into a [`Selection`].
pub fn parse_selection(query: &str, raw: &str) -> Selection {
    let cleaned = raw.trim().replace("```json", "").replace("```", "");

    let Ok(Value::Object(reply)) = serde_json::from_str::<Value>(&cleaned) else {
        return Selection::none(query);
    };

    let tool = reply
        .get("tool_identified")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Selection {
        query: query.to_string(),
        tool,
        arguments: parse_arguments(reply.get("arguments")),
    }
}

/// Normalize the reply's `arguments` field into a mapping.
///
/// Ordered fallback chain:
/// 1. already a mapping — used as-is;
/// 2. a string — strict JSON object parse;
/// 3. a string — permissive literal parse (single quotes, bare keys,
///    `True`/`False`/`None`);
/// 4. anything else — empty mapping.
pub fn parse_arguments(value: Option<&Value>) -> Map<String, Value> {
    match value {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(s)) => parse_argument_string(s).unwrap_or_default(),
        _ => Map::new(),
    }
}

fn parse_argument_string(s: &str) -> Option<Map<String, Value>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(s) {
        return Some(map);
    }
    loose::parse_object(s)
}

/// A permissive literal parser for the near-JSON the model emits when it
/// stringifies argument mappings: single- or double-quoted strings, bare
/// identifier keys, Python-style `True`/`False`/`None`, nested objects and
/// arrays. The whole input must be one object; trailing garbage rejects it.
mod loose {
    use serde_json::{Map, Number, Value};

    pub fn parse_object(input: &str) -> Option<Map<String, Value>> {
        let chars: Vec<char> = input.chars().collect();
        let mut p = Parser { chars, pos: 0 };
        p.skip_ws();
        let map = p.object()?;
        p.skip_ws();
        if p.pos == p.chars.len() { Some(map) } else { None }
    }

    struct Parser {
        chars: Vec<char>,
        pos: usize,
    }

    impl Parser {
        fn peek(&self) -> Option<char> {
            self.chars.get(self.pos).copied()
        }

        fn bump(&mut self) -> Option<char> {
            let c = self.peek()?;
            self.pos += 1;
            Some(c)
        }

        fn eat(&mut self, expected: char) -> Option<()> {
            (self.peek() == Some(expected)).then(|| {
                self.pos += 1;
            })
        }

        fn skip_ws(&mut self) {
            while self.peek().is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
        }

        fn object(&mut self) -> Option<Map<String, Value>> {
            self.eat('{')?;
            let mut map = Map::new();
            self.skip_ws();
            if self.eat('}').is_some() {
                return Some(map);
            }
            loop {
                self.skip_ws();
                let key = self.key()?;
                self.skip_ws();
                self.eat(':')?;
                self.skip_ws();
                let value = self.value()?;
                map.insert(key, value);
                self.skip_ws();
                match self.bump()? {
                    ',' => continue,
                    '}' => return Some(map),
                    _ => return None,
                }
            }
        }

        fn array(&mut self) -> Option<Vec<Value>> {
            self.eat('[')?;
            let mut items = Vec::new();
            self.skip_ws();
            if self.eat(']').is_some() {
                return Some(items);
            }
            loop {
                self.skip_ws();
                items.push(self.value()?);
                self.skip_ws();
                match self.bump()? {
                    ',' => continue,
                    ']' => return Some(items),
                    _ => return None,
                }
            }
        }

        fn key(&mut self) -> Option<String> {
            match self.peek()? {
                '\'' | '"' => self.string(),
                c if c.is_alphanumeric() || c == '_' => Some(self.identifier()),
                _ => None,
            }
        }

        fn value(&mut self) -> Option<Value> {
            match self.peek()? {
                '\'' | '"' => self.string().map(Value::String),
                '{' => self.object().map(Value::Object),
                '[' => self.array().map(Value::Array),
                c if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
                c if c.is_alphabetic() => self.word(),
                _ => None,
            }
        }

        fn string(&mut self) -> Option<String> {
            let quote = self.bump()?;
            let mut out = String::new();
            loop {
                match self.bump()? {
                    '\\' => match self.bump()? {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        c => out.push(c),
                    },
                    c if c == quote => return Some(out),
                    c => out.push(c),
                }
            }
        }

        fn identifier(&mut self) -> String {
            let mut out = String::new();
            while let Some(c) = self.peek() {
                if c.is_alphanumeric() || c == '_' {
                    out.push(c);
                    self.pos += 1;
                } else {
                    break;
                }
            }
            out
        }

        fn number(&mut self) -> Option<Value> {
            let start = self.pos;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            if let Ok(n) = text.parse::<i64>() {
                return Some(Value::Number(n.into()));
            }
            let f = text.parse::<f64>().ok()?;
            Number::from_f64(f).map(Value::Number)
        }

        fn word(&mut self) -> Option<Value> {
            match self.identifier().as_str() {
                "true" | "True" => Some(Value::Bool(true)),
                "false" | "False" => Some(Value::Bool(false)),
                "null" | "None" => Some(Value::Null),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        parse_arguments(Some(&value))
    }

    // --- selection parsing ---

    #[test]
    fn plain_json_reply() {
        let raw = r#"{"user_query":"Q","tool_identified":"get_stock_price","arguments":{"symbol":"AAPL"}}"#;
        let selection = parse_selection("Q", raw);
        assert_eq!(selection.query, "Q");
        assert_eq!(selection.tool.as_deref(), Some("get_stock_price"));
        assert_eq!(selection.arguments.get("symbol"), Some(&json!("AAPL")));
    }

    #[test]
    fn fenced_reply_is_unwrapped() {
        let raw = "```json\n{\"tool_identified\": \"get_stock_price\", \"arguments\": {}}\n```";
        let selection = parse_selection("Q", raw);
        assert_eq!(selection.tool.as_deref(), Some("get_stock_price"));
    }

    #[test]
    fn non_json_reply_degrades_to_null() {
        let selection = parse_selection("Q", "I could not find a suitable tool, sorry!");
        assert_eq!(selection, Selection::none("Q"));
    }

    #[test]
    fn json_non_object_degrades_to_null() {
        assert_eq!(parse_selection("Q", "[1, 2, 3]"), Selection::none("Q"));
        assert_eq!(parse_selection("Q", "\"just a string\""), Selection::none("Q"));
    }

    #[test]
    fn missing_keys_degrade_gracefully() {
        let selection = parse_selection("Q", r#"{"user_query": "Q"}"#);
        assert_eq!(selection.tool, None);
        assert!(selection.arguments.is_empty());
    }

    #[test]
    fn null_or_blank_tool_is_none() {
        let selection = parse_selection("Q", r#"{"tool_identified": null}"#);
        assert_eq!(selection.tool, None);
        let selection = parse_selection("Q", r#"{"tool_identified": "  "}"#);
        assert_eq!(selection.tool, None);
    }

    #[test]
    fn single_quoted_argument_string_is_recovered() {
        let raw =
            r#"{"user_query":"Q","tool_identified":"get_price","arguments":"{'symbol':'AAPL'}"}"#;
        let selection = parse_selection("Q", raw);
        assert_eq!(selection.tool.as_deref(), Some("get_price"));
        assert_eq!(selection.arguments.get("symbol"), Some(&json!("AAPL")));
        assert_eq!(selection.arguments.len(), 1);
    }

    // --- argument normalization ---

    #[test]
    fn mapping_passes_through_unchanged() {
        let map = json!({"symbol": "AAPL", "n": 3});
        let parsed = args(map.clone());
        assert_eq!(Value::Object(parsed), map);
    }

    #[test]
    fn json_serialized_mapping_round_trips() {
        let map = json!({"symbol1": "MSFT", "symbol2": "GOOG"});
        let serialized = serde_json::to_string(&map).unwrap();
        let parsed = args(Value::String(serialized));
        assert_eq!(Value::Object(parsed), map);
    }

    #[test]
    fn absent_field_is_empty() {
        assert!(parse_arguments(None).is_empty());
    }

    #[test]
    fn non_string_non_mapping_is_empty() {
        assert!(args(json!(42)).is_empty());
        assert!(args(json!([1, 2])).is_empty());
        assert!(args(json!(null)).is_empty());
    }

    #[test]
    fn unparseable_string_is_empty() {
        assert!(args(json!("symbol=AAPL")).is_empty());
        assert!(args(json!("")).is_empty());
        assert!(args(json!("   ")).is_empty());
    }

    #[test]
    fn json_array_string_is_empty() {
        // A parseable string that is not a mapping still normalizes to empty.
        assert!(args(json!("[1, 2, 3]")).is_empty());
    }

    // --- permissive literal tier ---

    #[test]
    fn single_quotes_and_bare_keys() {
        let parsed = args(json!("{symbol: 'AAPL', 'n': 3}"));
        assert_eq!(parsed.get("symbol"), Some(&json!("AAPL")));
        assert_eq!(parsed.get("n"), Some(&json!(3)));
    }

    #[test]
    fn python_style_words() {
        let parsed = args(json!("{'a': True, 'b': False, 'c': None}"));
        assert_eq!(parsed.get("a"), Some(&json!(true)));
        assert_eq!(parsed.get("b"), Some(&json!(false)));
        assert_eq!(parsed.get("c"), Some(&json!(null)));
    }

    #[test]
    fn nested_structures() {
        let parsed = args(json!("{'outer': {'inner': [1, 2.5, 'x']}}"));
        assert_eq!(
            parsed.get("outer"),
            Some(&json!({"inner": [1, 2.5, "x"]}))
        );
    }

    #[test]
    fn escapes_inside_strings() {
        let parsed = args(json!(r"{'s': 'it\'s'}"));
        assert_eq!(parsed.get("s"), Some(&json!("it's")));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(args(json!("{'a': 1} and more")).is_empty());
    }

    #[test]
    fn unterminated_object_is_rejected() {
        assert!(args(json!("{'a': 1")).is_empty());
        assert!(args(json!("{'a'")).is_empty());
    }

    #[test]
    fn empty_object_literal() {
        assert!(args(json!("{}")).is_empty());
        assert!(args(json!("{ }")).is_empty());
    }

    #[test]
    fn negative_and_float_numbers() {
        let parsed = args(json!("{'a': -3, 'b': 2.75}"));
        assert_eq!(parsed.get("a"), Some(&json!(-3)));
        assert_eq!(parsed.get("b"), Some(&json!(2.75)));
    }
}
